//! Annotation Layer
//!
//! Turns one recognized page into a text document with paragraph, sentence
//! and token spans, bounding boxes and the alignments that tie them together.

pub mod builder;
pub mod graph;
pub mod offsets;

pub use builder::{AnnotationBuilder, BuildSummary};
pub use graph::{
    Aggregate, Alignment, AnnotationGraph, BoundingBox, GraphSink, Node, NodeRef, Record, Span, SpanKind, Subgraph,
    TimePointRecord, Token,
};
pub use offsets::{Located, MatchKind, OffsetTracker, TextRange};
