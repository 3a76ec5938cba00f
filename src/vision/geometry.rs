//! Relative-to-pixel geometry conversion
//!
//! Recognition engines report regions as two opposite corners in page-relative
//! coordinates (0.0 - 1.0). Annotations need pixel rectangles.

use serde::{Deserialize, Serialize};

use crate::error::GeometryError;

/// Page-relative polygon as emitted by the engine: `[[x, y], [x, y]]`
pub type RelativeGeometry = Vec<Vec<f64>>;

/// Absolute pixel rectangle with `x1 <= x2` and `y1 <= y2`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "[[i64; 2]; 2]", from = "[[i64; 2]; 2]")]
pub struct PixelBox {
    pub x1: i64,
    pub y1: i64,
    pub x2: i64,
    pub y2: i64,
}

impl PixelBox {
    pub fn width(&self) -> i64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i64 {
        self.y2 - self.y1
    }
}

impl From<PixelBox> for [[i64; 2]; 2] {
    fn from(b: PixelBox) -> Self {
        [[b.x1, b.y1], [b.x2, b.y2]]
    }
}

impl From<[[i64; 2]; 2]> for PixelBox {
    fn from(c: [[i64; 2]; 2]) -> Self {
        Self {
            x1: c[0][0].min(c[1][0]),
            y1: c[0][1].min(c[1][1]),
            x2: c[0][0].max(c[1][0]),
            y2: c[0][1].max(c[1][1]),
        }
    }
}

/// Convert two relative corners to a pixel box on a `width` x `height` image.
///
/// Corners may arrive in either diagonal order; min and max are taken per
/// axis. The lower bound is floored and the upper bound ceiled so the pixel
/// box always covers the fractional one.
pub fn normalize(corners: &[Vec<f64>], width: u32, height: u32) -> Result<PixelBox, GeometryError> {
    let [a, b] = corners else {
        return Err(GeometryError::CornerCount(corners.len()));
    };
    let (ax, ay) = point(a)?;
    let (bx, by) = point(b)?;

    let (w, h) = (f64::from(width), f64::from(height));
    Ok(PixelBox {
        x1: (ax.min(bx) * w).floor() as i64,
        y1: (ay.min(by) * h).floor() as i64,
        x2: (ax.max(bx) * w).ceil() as i64,
        y2: (ay.max(by) * h).ceil() as i64,
    })
}

fn point(p: &[f64]) -> Result<(f64, f64), GeometryError> {
    match *p {
        [x, y] if x.is_finite() && y.is_finite() => Ok((x, y)),
        [x, y] => Err(GeometryError::NonFinite { x, y }),
        _ => Err(GeometryError::PointArity(p.len())),
    }
}
