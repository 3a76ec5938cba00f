//! OCR annotator
//!
//! Converts per-frame OCR results into one annotation graph: a text document
//! per representative frame, paragraph/sentence/token spans with character
//! offsets, pixel bounding boxes, and alignments between time, text and
//! geometry.

pub mod annotation;
pub mod app;
pub mod capture;
pub mod config;
pub mod error;
pub mod storage;
pub mod vision;

pub use annotation::AnnotationGraph;
pub use app::{AnnotateOptions, AnnotationRun, Annotator};
pub use config::AnnotatorConfig;
