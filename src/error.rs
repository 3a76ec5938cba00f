//! Error types shared across the annotation layers

use thiserror::Error;

/// Malformed relative geometry from the recognition engine
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometryError {
    #[error("expected 2 corners, got {0}")]
    CornerCount(usize),
    #[error("expected (x, y) point, got {0} values")]
    PointArity(usize),
    #[error("non-finite coordinate ({x}, {y})")]
    NonFinite { x: f64, y: f64 },
}

/// A representative could not be mapped to a frame and timestamp
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("representative {id} not found in input set")]
    UnknownRepresentative { id: String },
    #[error("unsupported representative type {kind} for {id}")]
    UnsupportedType { id: String, kind: String },
    #[error("cannot convert {value} {from} to {to}: {reason}")]
    Conversion {
        value: f64,
        from: &'static str,
        to: &'static str,
        reason: &'static str,
    },
    #[error("frame {index} unavailable: {message}")]
    Frame { index: u64, message: String },
}

impl ResolutionError {
    pub(crate) fn frame(index: u64, err: impl std::fmt::Display) -> Self {
        Self::Frame {
            index,
            message: err.to_string(),
        }
    }
}

/// A block or line that could not be turned into spans
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("block {block}: {source}")]
    Block {
        block: usize,
        #[source]
        source: GeometryError,
    },
    #[error("block {block} line {line}: {source}")]
    Line {
        block: usize,
        line: usize,
        #[source]
        source: GeometryError,
    },
}
