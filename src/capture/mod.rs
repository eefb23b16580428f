//! Screen Capture Layer
//!
//! Grabs a single frame of the game window. Read-only: pixels go in,
//! nothing goes back to the game. One capture per cycle, no streaming.

use anyhow::{anyhow, Context, Result};
use image::RgbaImage;
use tracing::info;

/// Capture the first window whose title contains `title` (case-insensitive).
pub fn capture_window(title: &str) -> Result<RgbaImage> {
    let needle = title.to_lowercase();
    let windows = xcap::Window::all().context("failed to enumerate windows")?;

    let window = windows
        .into_iter()
        .find(|w| {
            w.title()
                .map(|t| t.to_lowercase().contains(&needle))
                .unwrap_or(false)
        })
        .ok_or_else(|| anyhow!("no window found with title containing {title:?}"))?;

    let name = window.title().unwrap_or_default();
    info!("capturing window: {name}");
    let frame = window
        .capture_image()
        .with_context(|| format!("failed to capture window {name:?}"))?;
    Ok(frame)
}

/// Load a frame from an image file instead of a live window.
pub fn load_frame(path: &std::path::Path) -> Result<RgbaImage> {
    let image = image::open(path)
        .with_context(|| format!("failed to load frame from {}", path.display()))?;
    Ok(image.to_rgba8())
}
