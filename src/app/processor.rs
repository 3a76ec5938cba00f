//! Segment Processor
//!
//! Resolves one representative to a frame, runs OCR once and builds the
//! resulting document subtree into a private [`Subgraph`].

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error};

use crate::annotation::{AnnotationBuilder, BuildSummary, GraphSink, NodeRef, Subgraph};
use crate::capture::{Frame, FrameSource};
use crate::config::AnnotationSettings;
use crate::error::ResolutionError;
use crate::storage::{Representative, TimePoint};
use crate::vision::OcrEngine;

/// Timestamp reported when a representative cannot be resolved
pub const UNRESOLVED_TIMESTAMP: i64 = -1;

/// How a task ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Text document and spans were built
    Annotated,
    /// Frame resolved but the page rendered no text
    Empty,
    /// Representative could not be mapped to a frame
    Unresolved,
    /// OCR failed or the task panicked
    Failed,
}

/// Result of one representative task
#[derive(Debug, Clone, Serialize)]
pub struct TaskOutcome {
    /// Id of the representative, or of the segment for midpoint tasks
    pub representative: String,
    pub timestamp_ms: i64,
    pub text: Option<String>,
    pub status: TaskStatus,
    #[serde(skip)]
    pub build: BuildSummary,
}

impl TaskOutcome {
    fn new(representative: &Representative, timestamp_ms: i64, status: TaskStatus) -> Self {
        Self {
            representative: representative.label().to_string(),
            timestamp_ms,
            text: None,
            status,
            build: BuildSummary::default(),
        }
    }

    pub(crate) fn unresolved(representative: &Representative) -> Self {
        Self::new(representative, UNRESOLVED_TIMESTAMP, TaskStatus::Unresolved)
    }

    pub(crate) fn failed(representative: &Representative, timestamp_ms: i64) -> Self {
        Self::new(representative, timestamp_ms, TaskStatus::Failed)
    }
}

/// Processes one representative at a time; shared read-only across workers
pub struct SegmentProcessor {
    frames: Arc<dyn FrameSource>,
    ocr: Arc<dyn OcrEngine>,
    settings: AnnotationSettings,
}

impl SegmentProcessor {
    pub fn new(frames: Arc<dyn FrameSource>, ocr: Arc<dyn OcrEngine>, settings: AnnotationSettings) -> Self {
        Self { frames, ocr, settings }
    }

    /// Run one representative. Never fails; errors are logged and reported
    /// through the outcome status with an empty subgraph.
    pub fn process(&self, representative: &Representative) -> (TaskOutcome, Subgraph) {
        let frame = match self.resolve(representative) {
            Ok(frame) => frame,
            Err(e) => {
                error!("Cannot resolve representative {}: {}", representative.label(), e);
                return (TaskOutcome::unresolved(representative), Subgraph::new());
            }
        };
        debug!(
            "Representative {} resolved to frame {} at {}ms",
            representative.label(),
            frame.index,
            frame.timestamp_ms
        );

        let page = match self.ocr.recognize(&frame) {
            Ok(page) => page,
            Err(e) => {
                error!("OCR failed on frame {}: {:#}", frame.index, e);
                return (TaskOutcome::failed(representative, frame.timestamp_ms), Subgraph::new());
            }
        };

        let text = page.render();
        if text.is_empty() {
            return (
                TaskOutcome::new(representative, frame.timestamp_ms, TaskStatus::Empty),
                Subgraph::new(),
            );
        }

        let mut subgraph = Subgraph::new();
        let anchor = anchor(&mut subgraph, representative);
        let document = subgraph.new_text_document(text.clone());
        subgraph.new_alignment(anchor.clone(), document.clone());

        let builder = AnnotationBuilder::new(&self.settings, &text, document, anchor, frame.dimensions());
        let build = builder.build(&mut subgraph, &page);
        debug!(
            "Frame {}: {} paragraphs, {} sentences, {} tokens, {} dropped",
            frame.index, build.paragraphs, build.sentences, build.tokens, build.dropped_words
        );

        let outcome = TaskOutcome {
            representative: representative.label().to_string(),
            timestamp_ms: frame.timestamp_ms,
            text: Some(text),
            status: TaskStatus::Annotated,
            build,
        };
        (outcome, subgraph)
    }

    fn resolve(&self, representative: &Representative) -> Result<Frame, ResolutionError> {
        self.frames.extract(&time_point(representative)?)
    }
}

fn time_point(representative: &Representative) -> Result<TimePoint, ResolutionError> {
    match representative {
        Representative::TimePoint { point, .. } | Representative::Midpoint { point, .. } => Ok(*point),
        Representative::Unsupported { id, kind } => Err(ResolutionError::UnsupportedType {
            id: id.clone(),
            kind: kind.clone(),
        }),
        Representative::Unknown { id } => Err(ResolutionError::UnknownRepresentative { id: id.clone() }),
    }
}

/// Record every alignment of the task hangs off.
///
/// Midpoint tasks get a synthesised time point aligned from their segment.
fn anchor(subgraph: &mut Subgraph, representative: &Representative) -> NodeRef {
    match representative {
        Representative::Midpoint { segment_id, point } => {
            let tp = subgraph.new_time_point(point.time_point, point.time_unit);
            subgraph.new_alignment(NodeRef::External(segment_id.clone()), tp.clone());
            tp
        }
        other => NodeRef::External(other.label().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{Record, SpanKind};
    use crate::capture::TimeUnit;
    use crate::vision::{Block, Line, RecognitionResult, ReplayOcr, Word};
    use image::RgbImage;
    use std::collections::HashMap;

    /// Blank 100x50 frames; one frame per millisecond
    struct BlankFrames;

    impl FrameSource for BlankFrames {
        fn extract(&self, point: &TimePoint) -> Result<Frame, ResolutionError> {
            let ms = crate::capture::convert(point.time_point, point.time_unit, TimeUnit::Milliseconds, None)?;
            Ok(Frame::new(Arc::new(RgbImage::new(100, 50)), ms as u64, ms as i64))
        }
    }

    struct BrokenOcr;

    impl OcrEngine for BrokenOcr {
        fn recognize(&self, _frame: &Frame) -> anyhow::Result<RecognitionResult> {
            anyhow::bail!("model not loaded")
        }
    }

    fn hello_world() -> RecognitionResult {
        let geometry = vec![vec![0.0, 0.0], vec![0.5, 0.5]];
        let word = |value: &str| Word {
            value: value.to_string(),
            confidence: 0.9,
            geometry: geometry.clone(),
        };
        RecognitionResult {
            blocks: vec![Block {
                geometry: geometry.clone(),
                lines: vec![Line {
                    geometry: geometry.clone(),
                    words: vec![word("HELLO"), word("WORLD")],
                }],
            }],
            rendering: None,
        }
    }

    fn processor(pages: HashMap<u64, RecognitionResult>) -> SegmentProcessor {
        SegmentProcessor::new(
            Arc::new(BlankFrames),
            Arc::new(ReplayOcr::new(pages)),
            AnnotationSettings::default(),
        )
    }

    fn time_point_rep(ms: f64) -> Representative {
        Representative::TimePoint {
            id: "v_0:tp_1".into(),
            point: TimePoint::new(ms, TimeUnit::Milliseconds),
        }
    }

    #[test]
    fn test_time_point_builds_document() {
        let p = processor(HashMap::from([(1000, hello_world())]));
        let (outcome, sub) = p.process(&time_point_rep(1000.0));

        assert_eq!(outcome.status, TaskStatus::Annotated);
        assert_eq!(outcome.timestamp_ms, 1000);
        assert_eq!(outcome.text.as_deref(), Some("HELLO WORLD"));
        assert_eq!(outcome.build.tokens, 2);

        assert!(matches!(&sub.records()[0], Record::TextDocument { text } if text == "HELLO WORLD"));
        let first = sub.alignments().next().unwrap();
        assert_eq!(first.source, NodeRef::External("v_0:tp_1".into()));
        assert_eq!(first.target, NodeRef::Local(0));
        assert_eq!(sub.spans(SpanKind::Token).len(), 2);
    }

    #[test]
    fn test_midpoint_synthesises_time_point() {
        let p = processor(HashMap::from([(500, hello_world())]));
        let rep = Representative::Midpoint {
            segment_id: "v_0:tf_1".into(),
            point: TimePoint::new(500.0, TimeUnit::Milliseconds),
        };
        let (outcome, sub) = p.process(&rep);

        assert_eq!(outcome.status, TaskStatus::Annotated);
        assert!(matches!(&sub.records()[0], Record::TimePoint(tp) if tp.time_point == 500.0));

        let edges: Vec<_> = sub.alignments().take(2).collect();
        assert_eq!(edges[0].source, NodeRef::External("v_0:tf_1".into()));
        assert_eq!(edges[0].target, NodeRef::Local(0));
        // document hangs off the synthesised time point
        assert_eq!(edges[1].source, NodeRef::Local(0));
        assert!(matches!(sub.get(&edges[1].target), Some(Record::TextDocument { .. })));
    }

    #[test]
    fn test_zero_blocks_is_empty() {
        let p = processor(HashMap::new());
        let (outcome, sub) = p.process(&time_point_rep(40.0));

        assert_eq!(outcome.status, TaskStatus::Empty);
        assert_eq!(outcome.timestamp_ms, 40);
        assert!(outcome.text.is_none());
        assert!(sub.is_empty());
    }

    #[test]
    fn test_unsupported_representative_is_sentinel() {
        let p = processor(HashMap::new());
        let rep = Representative::Unsupported {
            id: "v_0:bb_1".into(),
            kind: "BoundingBox".into(),
        };
        let (outcome, sub) = p.process(&rep);

        assert_eq!(outcome.status, TaskStatus::Unresolved);
        assert_eq!(outcome.timestamp_ms, UNRESOLVED_TIMESTAMP);
        assert!(outcome.text.is_none());
        assert!(sub.is_empty());
    }

    #[test]
    fn test_ocr_error_is_failed() {
        let p = SegmentProcessor::new(Arc::new(BlankFrames), Arc::new(BrokenOcr), AnnotationSettings::default());
        let (outcome, sub) = p.process(&time_point_rep(10.0));

        assert_eq!(outcome.status, TaskStatus::Failed);
        assert_eq!(outcome.timestamp_ms, 10);
        assert!(sub.is_empty());
    }

    #[test]
    fn test_boxes_use_frame_dimensions() {
        let p = processor(HashMap::from([(0, hello_world())]));
        let (_, sub) = p.process(&time_point_rep(0.0));

        let boxes: Vec<_> = sub
            .records()
            .iter()
            .filter_map(|r| match r {
                Record::BoundingBox(b) => Some(b.coordinates),
                _ => None,
            })
            .collect();
        assert_eq!(boxes.len(), 4);
        assert!(boxes.iter().all(|b| b.x2 == 50 && b.y2 == 25));
    }
}
