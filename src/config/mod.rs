//! Application Configuration
//!
//! User settings and tuning knobs stored in TOML format. Every threshold
//! the vision and resolution code uses lives here, so the classifier and
//! the resolvers stay pure functions of their inputs.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::vision::arrow::ArrowSettings;

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Capture settings
    pub capture: CaptureSettings,
    /// OCR settings
    pub ocr: OcrSettings,
    /// Arrow classifier settings
    pub arrow: ArrowSettings,
    /// Hint resolution settings
    pub resolver: ResolverSettings,
    /// Remote lookup settings
    pub api: ApiSettings,
    /// Spatial index settings
    pub storage: StorageSettings,
    /// Output settings
    pub output: OutputSettings,
}

/// A fixed rectangle inside the captured frame.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Capture-related settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Target window title (partial match)
    pub window_title: String,
    /// Strip showing the current coordinates, relative to the window
    pub coord_strip: Region,
    /// Extra width added to the width/8 hunt panel crop
    pub panel_width_slack: u32,
    /// Left margin of the arrow band inside the panel
    pub arrow_left_margin: u32,
    /// Vertical padding around the hint box when cropping the arrow band
    pub arrow_pad: u32,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            window_title: "Dofus".to_string(),
            coord_strip: Region {
                x: 0,
                y: 70,
                width: 90,
                height: 25,
            },
            panel_width_slack: 50,
            arrow_left_margin: 10,
            arrow_pad: 20,
        }
    }
}

/// OCR-related settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrSettings {
    /// OCR language tag
    pub language: String,
    /// UI label marking the active hint ("EN COURS" in the French client)
    pub marker_token: String,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            language: "fr-FR".to_string(),
            marker_token: "EN COURS".to_string(),
        }
    }
}

/// Which resolution strategy to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveMode {
    /// Local precomputed spatial index
    #[default]
    Index,
    /// Live remote lookup with sign-flip retries
    Remote,
}

/// Hint resolution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverSettings {
    pub mode: ResolveMode,
    /// Size of the query window ahead of the current position, in map units
    pub window_span: i32,
    /// Bound on coordinate sign-flip retries (remote mode)
    pub max_sign_retries: u32,
    /// Minimum normalized similarity for the fuzzy fallback; unset disables it
    pub fuzzy_threshold: Option<f64>,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            mode: ResolveMode::Index,
            window_span: 10,
            max_sign_retries: 3,
            fuzzy_threshold: Some(0.84),
        }
    }
}

/// Remote lookup settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
    /// Service token; the HUNT_API_TOKEN environment variable overrides this
    pub token: Option<String>,
    /// Language of place names in responses
    pub lang: String,
    /// Page size requested from the service
    pub limit: u32,
    pub timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.dofusdb.fr".to_string(),
            token: None,
            lang: "fr".to_string(),
            limit: 50,
            timeout_secs: 10,
        }
    }
}

/// Spatial index settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Index database path; defaults to hints.db in the app data directory
    pub db_path: Option<PathBuf>,
    /// Static clue dataset used to populate the index on first run
    pub dataset_path: Option<PathBuf>,
}

/// Output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Template for the emitted travel command
    pub travel_template: String,
    /// Play a sound when a target is resolved (needs the `sound` feature)
    pub sound_enabled: bool,
    /// Notification sample path
    pub sound_file: Option<PathBuf>,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            travel_template: "/travel {x} {y}".to_string(),
            sound_enabled: true,
            sound_file: None,
        }
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Load the config at `path` when given, the default location when it
/// exists, and built-in defaults otherwise.
pub fn load_or_default(path: Option<&Path>) -> Result<AppConfig> {
    if let Some(path) = path {
        return load_config(path);
    }
    let default_path = crate::storage::get_config_dir()?.join("config.toml");
    if default_path.exists() {
        load_config(&default_path)
    } else {
        // First run: write the defaults so the user has a file to edit.
        let config = AppConfig::default();
        save_config(&config, &default_path)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_app_config() {
        let config = AppConfig::default();

        assert_eq!(config.capture.window_title, "Dofus");
        assert_eq!(config.capture.coord_strip.y, 70);
        assert_eq!(config.capture.panel_width_slack, 50);

        assert_eq!(config.ocr.marker_token, "EN COURS");

        assert!((config.arrow.canny_low - 50.0).abs() < f32::EPSILON);
        assert!((config.arrow.canny_high - 150.0).abs() < f32::EPSILON);
        assert!((config.arrow.extremity_ratio - 0.7).abs() < f64::EPSILON);
        assert!((config.arrow.neighbor_radius_ratio - 0.2).abs() < f64::EPSILON);

        assert_eq!(config.resolver.mode, ResolveMode::Index);
        assert_eq!(config.resolver.window_span, 10);
        assert_eq!(config.resolver.max_sign_retries, 3);

        assert_eq!(config.api.limit, 50);
        assert!(config.output.sound_enabled);
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = AppConfig::default();

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed.capture.window_title, config.capture.window_title);
        assert_eq!(parsed.ocr.marker_token, config.ocr.marker_token);
        assert_eq!(parsed.resolver.window_span, config.resolver.window_span);
        assert_eq!(parsed.api.base_url, config.api.base_url);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let parsed: AppConfig = toml::from_str(
            r#"
            [ocr]
            marker_token = "IN PROGRESS"

            [resolver]
            mode = "remote"
            "#,
        )
        .unwrap();

        assert_eq!(parsed.ocr.marker_token, "IN PROGRESS");
        assert_eq!(parsed.resolver.mode, ResolveMode::Remote);
        // Untouched sections keep their defaults.
        assert_eq!(parsed.resolver.window_span, 10);
        assert_eq!(parsed.capture.window_title, "Dofus");
    }

    #[test]
    fn test_save_and_load_config() {
        let mut config = AppConfig::default();
        config.capture.window_title = "Test Client".to_string();

        let temp_file = NamedTempFile::new().unwrap();
        save_config(&config, temp_file.path()).unwrap();
        let loaded = load_config(temp_file.path()).unwrap();

        assert_eq!(loaded.capture.window_title, "Test Client");
        assert_eq!(loaded.resolver.max_sign_retries, 3);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/path/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "this is not valid toml {{{{").unwrap();

        let result = load_config(temp_file.path());
        assert!(result.is_err());
    }
}
