//! Frame data structures for decoded video frames

use image::RgbImage;
use std::sync::Arc;

/// A decoded video frame resolved from a representative time point
#[derive(Debug, Clone)]
pub struct Frame {
    /// Decoded pixels, shared with the source cache
    pub image: Arc<RgbImage>,
    /// Frame index within the video
    pub index: u64,
    /// Timestamp of the time point in milliseconds
    pub timestamp_ms: i64,
}

impl Frame {
    /// Create a new frame
    pub fn new(image: Arc<RgbImage>, index: u64, timestamp_ms: i64) -> Self {
        Self {
            image,
            index,
            timestamp_ms,
        }
    }

    /// Get frame dimensions as (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}
