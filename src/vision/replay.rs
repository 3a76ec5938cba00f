//! Recorded OCR output replayed per frame
//!
//! The recognition model runs outside this crate. Its per-frame output is
//! exported to JSON keyed by frame index and fed back through [`OcrEngine`].

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

use super::ocr::{OcrEngine, RecognitionResult};
use crate::capture::Frame;

/// Recorded pages keyed by frame index
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplayOcr {
    #[serde(default)]
    pub frames: HashMap<u64, RecognitionResult>,
}

impl ReplayOcr {
    pub fn new(frames: HashMap<u64, RecognitionResult>) -> Self {
        Self { frames }
    }

    /// Load recorded pages from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read recorded OCR output {:?}", path))?;
        let replay: ReplayOcr = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse recorded OCR output {:?}", path))?;
        info!("Loaded recorded OCR output for {} frames", replay.frames.len());
        Ok(replay)
    }
}

impl OcrEngine for ReplayOcr {
    fn recognize(&self, frame: &Frame) -> Result<RecognitionResult> {
        match self.frames.get(&frame.index) {
            Some(page) => Ok(page.clone()),
            None => {
                debug!("No recorded OCR output for frame {}, treating as blank", frame.index);
                Ok(RecognitionResult::default())
            }
        }
    }
}
