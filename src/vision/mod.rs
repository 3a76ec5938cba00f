//! Vision/OCR Layer
//!
//! Recognition output types, the OCR engine seam, and conversion of the
//! engine's relative geometry into pixel space.

pub mod geometry;
pub mod ocr;
pub mod replay;

pub use geometry::{normalize, PixelBox, RelativeGeometry};
pub use ocr::{Block, Line, OcrEngine, RecognitionResult, Word};
pub use replay::ReplayOcr;
