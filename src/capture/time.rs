//! Time unit conversion between frames, seconds and milliseconds

use serde::{Deserialize, Serialize};

use crate::error::ResolutionError;

/// Unit a time point or interval is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    #[serde(alias = "frame")]
    Frames,
    #[serde(alias = "second")]
    Seconds,
    #[default]
    #[serde(alias = "millisecond", alias = "ms")]
    Milliseconds,
}

impl TimeUnit {
    pub fn name(&self) -> &'static str {
        match self {
            TimeUnit::Frames => "frames",
            TimeUnit::Seconds => "seconds",
            TimeUnit::Milliseconds => "milliseconds",
        }
    }
}

/// Convert `value` between units. Frame conversions need a positive, finite fps.
pub fn convert(value: f64, from: TimeUnit, to: TimeUnit, fps: Option<f64>) -> Result<f64, ResolutionError> {
    let fail = |reason| ResolutionError::Conversion {
        value,
        from: from.name(),
        to: to.name(),
        reason,
    };

    if !value.is_finite() {
        return Err(fail("value is not finite"));
    }
    if from == to {
        return Ok(value);
    }

    let needs_fps = from == TimeUnit::Frames || to == TimeUnit::Frames;
    let fps = match fps {
        Some(f) if f.is_finite() && f > 0.0 => f,
        _ if needs_fps => return Err(fail("video fps is missing or invalid")),
        _ => 0.0,
    };

    let ms = match from {
        TimeUnit::Frames => value * 1000.0 / fps,
        TimeUnit::Seconds => value * 1000.0,
        TimeUnit::Milliseconds => value,
    };

    Ok(match to {
        TimeUnit::Frames => ms * fps / 1000.0,
        TimeUnit::Seconds => ms / 1000.0,
        TimeUnit::Milliseconds => ms,
    })
}

/// Frame index a time point falls on
pub fn frame_index(value: f64, unit: TimeUnit, fps: Option<f64>) -> Result<u64, ResolutionError> {
    let frames = convert(value, unit, TimeUnit::Frames, fps)?;
    if frames < 0.0 {
        return Err(ResolutionError::Conversion {
            value,
            from: unit.name(),
            to: TimeUnit::Frames.name(),
            reason: "negative time point",
        });
    }
    Ok(frames.round() as u64)
}
