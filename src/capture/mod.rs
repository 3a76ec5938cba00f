//! Frame Extraction Layer
//!
//! Resolves representative time points to decoded frames. The video decoder
//! itself lives outside this crate; sources only need to hand back a raster
//! image and a timestamp for a time point.

pub mod frame;
pub mod time;

pub use frame::Frame;
pub use time::{convert, frame_index, TimeUnit};

use image::RgbImage;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::error::ResolutionError;
use crate::storage::TimePoint;

/// Frame extraction collaborator
///
/// Must be deterministic for the same time point. Called concurrently from
/// worker threads.
pub trait FrameSource: Send + Sync {
    fn extract(&self, point: &TimePoint) -> Result<Frame, ResolutionError>;
}

/// Frames pre-extracted into a directory as `frame_{index:06}.png` (or `.jpg`)
pub struct DirectoryFrameSource {
    dir: PathBuf,
    fps: Option<f64>,
    cache: Mutex<HashMap<u64, Arc<RgbImage>>>,
}

impl DirectoryFrameSource {
    const EXTENSIONS: [&'static str; 3] = ["png", "jpg", "jpeg"];

    /// Create a source over `dir` for a video running at `fps`
    pub fn new(dir: impl Into<PathBuf>, fps: Option<f64>) -> Self {
        Self {
            dir: dir.into(),
            fps,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn frame_path(&self, index: u64) -> Option<PathBuf> {
        Self::EXTENSIONS
            .iter()
            .map(|ext| self.dir.join(format!("frame_{index:06}.{ext}")))
            .find(|p| p.exists())
    }

    fn load(&self, index: u64) -> Result<Arc<RgbImage>, ResolutionError> {
        if let Some(image) = self.cache.lock().get(&index) {
            return Ok(image.clone());
        }

        let path = self
            .frame_path(index)
            .ok_or_else(|| ResolutionError::frame(index, format!("no frame file in {:?}", self.dir)))?;
        let image = image::open(&path)
            .map_err(|e| ResolutionError::frame(index, e))?
            .to_rgb8();
        debug!("Decoded frame {} from {:?} ({}x{})", index, path, image.width(), image.height());

        // Another worker may have decoded the same frame meanwhile; keep the first.
        let image = Arc::new(image);
        Ok(self.cache.lock().entry(index).or_insert(image).clone())
    }
}

impl FrameSource for DirectoryFrameSource {
    fn extract(&self, point: &TimePoint) -> Result<Frame, ResolutionError> {
        let index = frame_index(point.time_point, point.time_unit, self.fps)?;
        let timestamp = convert(point.time_point, point.time_unit, TimeUnit::Milliseconds, self.fps)?;
        let image = self.load(index)?;
        Ok(Frame::new(image, index, timestamp.round() as i64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_frame(dir: &Path, index: u64, width: u32, height: u32) {
        let img = RgbImage::from_pixel(width, height, image::Rgb([255, 255, 255]));
        img.save(dir.join(format!("frame_{index:06}.png"))).unwrap();
    }

    fn point(value: f64, unit: TimeUnit) -> TimePoint {
        TimePoint::new(value, unit)
    }

    #[test]
    fn test_extract_by_milliseconds() {
        let dir = TempDir::new().unwrap();
        write_frame(dir.path(), 25, 8, 4);

        let source = DirectoryFrameSource::new(dir.path(), Some(25.0));
        let frame = source.extract(&point(1000.0, TimeUnit::Milliseconds)).unwrap();

        assert_eq!(frame.index, 25);
        assert_eq!(frame.timestamp_ms, 1000);
        assert_eq!(frame.dimensions(), (8, 4));
    }

    #[test]
    fn test_extract_by_frame_index() {
        let dir = TempDir::new().unwrap();
        write_frame(dir.path(), 3, 2, 2);

        let source = DirectoryFrameSource::new(dir.path(), Some(10.0));
        let frame = source.extract(&point(3.0, TimeUnit::Frames)).unwrap();

        assert_eq!(frame.index, 3);
        assert_eq!(frame.timestamp_ms, 300);
    }

    #[test]
    fn test_missing_frame_is_resolution_error() {
        let dir = TempDir::new().unwrap();
        let source = DirectoryFrameSource::new(dir.path(), Some(25.0));

        let err = source.extract(&point(40.0, TimeUnit::Milliseconds)).unwrap_err();
        assert!(matches!(err, ResolutionError::Frame { index: 1, .. }));
    }

    #[test]
    fn test_missing_fps_is_resolution_error() {
        let dir = TempDir::new().unwrap();
        let source = DirectoryFrameSource::new(dir.path(), None);

        let err = source.extract(&point(500.0, TimeUnit::Milliseconds)).unwrap_err();
        assert!(matches!(err, ResolutionError::Conversion { .. }));
    }

    #[test]
    fn test_frames_are_cached() {
        let dir = TempDir::new().unwrap();
        write_frame(dir.path(), 0, 2, 2);

        let source = DirectoryFrameSource::new(dir.path(), Some(25.0));
        let first = source.extract(&point(0.0, TimeUnit::Frames)).unwrap();
        let second = source.extract(&point(0.0, TimeUnit::Frames)).unwrap();

        assert!(Arc::ptr_eq(&first.image, &second.image));
    }
}
