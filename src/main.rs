//! HuntPilot - Treasure hunt copilot
//!
//! A read-only screen parsing tool that reads the in-game treasure hunt
//! panel, classifies the hint arrow, and resolves the hint to the map
//! coordinates of the next step. No game memory access, no input injection.

mod api;
mod app;
mod capture;
mod config;
mod hotkey;
mod hunt;
mod output;
mod storage;
mod vision;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use image::RgbaImage;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::api::HuntApi;
use crate::config::{AppConfig, ResolveMode};
use crate::hunt::resolver::{HintResolver, IndexResolver, RemoteResolver};
use crate::storage::index::HintIndex;
use crate::vision::{Recognizer, ReplayRecognizer};

/// HuntPilot - Treasure hunt copilot
#[derive(Parser, Debug)]
#[command(name = "hunt-pilot")]
#[command(about = "Reads the treasure hunt panel and resolves the next step")]
struct Args {
    /// Configuration file (defaults to config.toml in the app config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one resolution cycle and print the travel command
    Solve {
        /// Solve from a saved frame instead of capturing the game window
        #[arg(short, long)]
        image: Option<PathBuf>,

        /// Use recorded OCR detections instead of a live OCR backend
        #[arg(short, long)]
        replay: Option<PathBuf>,
    },

    /// Stay resident and run a cycle on every hotkey press
    Watch {
        /// Trigger hotkey
        #[arg(long, default_value = "Ctrl+D")]
        hotkey: String,
    },

    /// Populate the local hint index from a clue dataset
    BuildIndex {
        /// JSON clue dataset
        dataset: PathBuf,

        /// Index database path (defaults to hints.db in the app data dir)
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let config = config::load_or_default(args.config.as_deref())?;

    match args.command {
        Commands::Solve { image, replay } => run_solve(&config, image, replay),
        Commands::Watch { hotkey } => run_watch(&config, &hotkey),
        Commands::BuildIndex { dataset, db } => run_build_index(&config, &dataset, db),
    }
}

fn run_solve(config: &AppConfig, image: Option<PathBuf>, replay: Option<PathBuf>) -> Result<()> {
    let recognizer = build_recognizer(config, replay.as_deref())?;
    let frame = grab_frame(config, image.as_deref())?;

    let target = with_resolver(config, |resolver| {
        app::run_cycle(config, recognizer.as_ref(), resolver, &frame)
    })?;

    if target.is_none() {
        bail!("no step resolved from this frame");
    }
    Ok(())
}

fn run_watch(config: &AppConfig, hotkey: &str) -> Result<()> {
    let recognizer = build_recognizer(config, None)?;
    info!("watching for {hotkey} (window: {:?})", config.capture.window_title);

    with_resolver(config, |resolver| {
        hotkey::run_trigger_loop(hotkey, || {
            let frame = match capture::capture_window(&config.capture.window_title) {
                Ok(frame) => frame,
                Err(err) => {
                    warn!("capture failed: {err:#}");
                    return;
                }
            };
            if let Err(err) = app::run_cycle(config, recognizer.as_ref(), resolver, &frame) {
                warn!("cycle failed: {err:#}");
            }
        })
    })
}

fn run_build_index(config: &AppConfig, dataset: &Path, db: Option<PathBuf>) -> Result<()> {
    let db_path = match db.or_else(|| config.storage.db_path.clone()) {
        Some(path) => path,
        None => storage::get_data_dir()?.join("hints.db"),
    };
    let index = HintIndex::open(&db_path)?;
    index
        .load_dataset(dataset)
        .with_context(|| format!("loading dataset {dataset:?}"))?;
    info!("index built at {db_path:?}");
    Ok(())
}

/// Build the resolver for the configured mode and hand it to `f`. The index
/// connection lives for the duration of the call.
fn with_resolver<T>(
    config: &AppConfig,
    f: impl FnOnce(&dyn HintResolver) -> Result<T>,
) -> Result<T> {
    let r = &config.resolver;
    match r.mode {
        ResolveMode::Index => {
            let index = open_index(config)?;
            let resolver = IndexResolver::new(&index, r.window_span, r.fuzzy_threshold);
            f(&resolver)
        }
        ResolveMode::Remote => {
            let api = HuntApi::new(&config.api)?;
            let resolver = RemoteResolver::new(api, r.max_sign_retries, r.fuzzy_threshold);
            f(&resolver)
        }
    }
}

/// Open the hint index, populating it from the configured dataset when it
/// is still empty.
fn open_index(config: &AppConfig) -> Result<HintIndex> {
    let db_path = match &config.storage.db_path {
        Some(path) => path.clone(),
        None => storage::get_data_dir()?.join("hints.db"),
    };
    let index = HintIndex::open(&db_path)?;

    if !index.is_populated()? {
        match &config.storage.dataset_path {
            Some(dataset) => {
                info!("index at {db_path:?} is empty, loading {dataset:?}");
                index.load_dataset(dataset)?;
            }
            None => bail!(
                "hint index at {db_path:?} is empty; run build-index or set \
                 storage.dataset_path"
            ),
        }
    }
    Ok(index)
}

#[cfg(windows)]
fn build_recognizer(config: &AppConfig, replay: Option<&Path>) -> Result<Box<dyn Recognizer>> {
    match replay {
        Some(path) => Ok(Box::new(ReplayRecognizer::from_file(path)?)),
        None => Ok(Box::new(vision::WindowsOcr::new(&config.ocr.language)?)),
    }
}

#[cfg(not(windows))]
fn build_recognizer(_config: &AppConfig, replay: Option<&Path>) -> Result<Box<dyn Recognizer>> {
    match replay {
        Some(path) => Ok(Box::new(ReplayRecognizer::from_file(path)?)),
        None => bail!("no OCR backend on this platform; pass --replay with recorded detections"),
    }
}

fn grab_frame(config: &AppConfig, image: Option<&Path>) -> Result<RgbaImage> {
    match image {
        Some(path) => capture::load_frame(path),
        None => capture::capture_window(&config.capture.window_title),
    }
}
