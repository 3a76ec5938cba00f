//! ocr-annotator - OCR results to annotation graph
//!
//! Reads an input annotation set, resolves each segment's representatives to
//! pre-extracted frames, replays recorded OCR output for them, and writes
//! the resulting annotation graph as JSON.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use ocr_annotator::capture::DirectoryFrameSource;
use ocr_annotator::config::{self, AnnotatorConfig};
use ocr_annotator::storage::{self, load_input_set};
use ocr_annotator::vision::ReplayOcr;
use ocr_annotator::{AnnotateOptions, Annotator};

/// Annotate video segments with OCR text, spans and geometry
#[derive(Parser, Debug)]
#[command(name = "ocr-annotator")]
#[command(about = "Converts per-frame OCR results into an annotation graph")]
struct Args {
    /// Input annotation set (JSON)
    #[arg(short, long)]
    input: PathBuf,

    /// Recorded OCR output keyed by frame index (JSON)
    #[arg(long)]
    ocr: PathBuf,

    /// Directory of extracted frames (frame_000000.png, ...)
    #[arg(long)]
    frames: PathBuf,

    /// Video frame rate, overriding the input set
    #[arg(long)]
    fps: Option<f64>,

    /// Output graph path (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Configuration file (defaults to config.toml in the config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Only process segments with this label (repeatable)
    #[arg(long = "tf-label")]
    tf_label: Vec<String>,

    /// Worker threads (0 = available parallelism)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = load_or_default_config(args.config.as_deref())?;
    if !args.tf_label.is_empty() {
        config.batch.tf_label = args.tf_label.clone();
    }
    if let Some(workers) = args.workers {
        config.batch.workers = workers;
    }

    // Initialize logging; RUST_LOG wins over config
    let level = if args.verbose { "debug" } else { config.logging.level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let input = load_input_set(&args.input)?;
    info!(
        "Loaded input view {} with {} annotations",
        input.view_id,
        input.annotations.len()
    );

    let fps = args.fps.or(input.video.fps);
    let frames = Arc::new(DirectoryFrameSource::new(&args.frames, fps));
    let ocr = Arc::new(ReplayOcr::load(&args.ocr)?);

    let annotator = Annotator::new(frames, ocr, &config);
    let run = annotator.annotate(&input, &AnnotateOptions::from_config(&config));

    let json = serde_json::to_string_pretty(&run.graph).context("Failed to serialize graph")?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("Failed to write graph to {:?}", path))?;
            info!("Wrote {} records to {:?}", run.graph.len(), path);
        }
        None => println!("{}", json),
    }

    eprintln!("{}", run.summary);
    Ok(())
}

/// Load configuration from an explicit path, the config directory, or defaults
fn load_or_default_config(explicit: Option<&Path>) -> Result<AnnotatorConfig> {
    if let Some(path) = explicit {
        return config::load_config(path).with_context(|| format!("Failed to load config {:?}", path));
    }

    if let Ok(config_dir) = storage::get_config_dir() {
        let config_path = config_dir.join("config.toml");
        if config_path.exists() {
            if let Ok(config) = config::load_config(&config_path) {
                return Ok(config);
            }
        }
    }
    Ok(AnnotatorConfig::default())
}
