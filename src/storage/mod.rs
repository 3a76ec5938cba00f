//! Storage Layer
//!
//! Locates the configuration directory and loads the input annotation set.

pub mod input;

pub use input::{load_input_set, AnnotationIndex, InputSet, Representative, Segment, TimePoint, VideoInfo};

use anyhow::Result;
use std::path::PathBuf;

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("org", "ocr-annotator", "OcrAnnotator")
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

    Ok(proj_dirs.config_dir().to_path_buf())
}
