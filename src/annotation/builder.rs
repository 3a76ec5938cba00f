//! Paragraph / sentence / token construction for one recognized frame
//!
//! Walks blocks, lines and words strictly in order so the offset cursor only
//! moves forward. A block or line with unusable geometry is logged and
//! skipped; its words still consume document text and its siblings proceed.

use tracing::{debug, warn};

use super::graph::{Aggregate, GraphSink, NodeRef, Span, Token};
use super::offsets::{MatchKind, OffsetTracker};
use crate::config::AnnotationSettings;
use crate::error::BuildError;
use crate::vision::{normalize, Block, Line, PixelBox, RecognitionResult, Word};

/// Counters for one built frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildSummary {
    pub paragraphs: usize,
    pub sentences: usize,
    pub tokens: usize,
    /// Words at or below the acceptance threshold, or with unusable geometry
    pub dropped_words: usize,
    /// Words whose text was not found in the document
    pub fallbacks: usize,
    /// Blocks and lines skipped on structural errors
    pub skipped_units: usize,
}

/// Builds the span subtree of one text document
pub struct AnnotationBuilder<'a> {
    settings: &'a AnnotationSettings,
    tracker: OffsetTracker<'a>,
    document: NodeRef,
    representative: NodeRef,
    width: u32,
    height: u32,
}

impl<'a> AnnotationBuilder<'a> {
    /// `text` must be the content of `document`; boxes are scaled to `width` x `height`
    pub fn new(
        settings: &'a AnnotationSettings,
        text: &'a str,
        document: NodeRef,
        representative: NodeRef,
        (width, height): (u32, u32),
    ) -> Self {
        Self {
            settings,
            tracker: OffsetTracker::new(text),
            document,
            representative,
            width,
            height,
        }
    }

    /// Write all spans, boxes and alignments for `page` into `sink`
    pub fn build(&self, sink: &mut impl GraphSink, page: &RecognitionResult) -> BuildSummary {
        let mut summary = BuildSummary::default();
        let mut cursor = 0;

        for (index, block) in page.blocks.iter().enumerate() {
            match self.build_block(sink, index, block, cursor, &mut summary) {
                Ok(next) => cursor = next,
                Err(e) => {
                    warn!("Skipping malformed region: {}", e);
                    summary.skipped_units += 1;
                    cursor = self.consume(block.lines.iter().flat_map(|l| &l.words), cursor);
                }
            }
        }

        summary
    }

    fn build_block(
        &self,
        sink: &mut impl GraphSink,
        index: usize,
        block: &Block,
        mut cursor: usize,
        summary: &mut BuildSummary,
    ) -> Result<usize, BuildError> {
        let bbox = normalize(&block.geometry, self.width, self.height)
            .map_err(|source| BuildError::Block { block: index, source })?;

        let paragraph = sink.new_span(Span::Paragraph(self.aggregate(block.render())));
        self.attach_box(sink, &paragraph, bbox);
        summary.paragraphs += 1;

        let mut sentences = Vec::with_capacity(block.lines.len());
        for (line_index, line) in block.lines.iter().enumerate() {
            match self.build_line(sink, (index, line_index), line, cursor, summary) {
                Ok((sentence, next)) => {
                    sentences.push(sentence);
                    cursor = next;
                }
                Err(e) => {
                    warn!("Skipping malformed region: {}", e);
                    summary.skipped_units += 1;
                    cursor = self.consume(&line.words, cursor);
                }
            }
        }

        sink.set_targets(&paragraph, sentences);
        Ok(cursor)
    }

    fn build_line(
        &self,
        sink: &mut impl GraphSink,
        (block, line_index): (usize, usize),
        line: &Line,
        mut cursor: usize,
        summary: &mut BuildSummary,
    ) -> Result<(NodeRef, usize), BuildError> {
        let bbox = normalize(&line.geometry, self.width, self.height).map_err(|source| BuildError::Line {
            block,
            line: line_index,
            source,
        })?;

        let sentence = sink.new_span(Span::Sentence(self.aggregate(line.render())));
        self.attach_box(sink, &sentence, bbox);
        summary.sentences += 1;

        let mut tokens = Vec::with_capacity(line.words.len());
        for word in &line.words {
            let located = self.tracker.locate(&word.value, cursor);
            cursor = located.cursor;
            if located.kind == MatchKind::Fallback {
                summary.fallbacks += 1;
                debug!(
                    "Word {:?} not found in rendered text, assuming [{}, {})",
                    word.value, located.range.start, located.range.end
                );
            }

            if word.confidence <= self.settings.acceptance_threshold {
                summary.dropped_words += 1;
                continue;
            }

            let bbox = match normalize(&word.geometry, self.width, self.height) {
                Ok(b) => b,
                Err(e) => {
                    warn!("Dropping word {:?} in block {} line {}: {}", word.value, block, line_index, e);
                    summary.dropped_words += 1;
                    continue;
                }
            };

            let token = sink.new_span(Span::Token(Token {
                document: self.document.clone(),
                text: word.value.clone(),
                range: located.range,
                confidence: word.confidence,
            }));
            self.attach_box(sink, &token, bbox);
            tokens.push(token);
            summary.tokens += 1;
        }

        sink.set_targets(&sentence, tokens);
        Ok((sentence, cursor))
    }

    fn aggregate(&self, text: String) -> Aggregate<NodeRef> {
        Aggregate {
            document: self.document.clone(),
            text,
            range: None,
            targets: Vec::new(),
        }
    }

    /// Box aligned from both the representative and the span
    fn attach_box(&self, sink: &mut impl GraphSink, span: &NodeRef, coordinates: PixelBox) {
        let bbox = sink.new_bounding_box(&self.settings.bbox_label, coordinates);
        sink.new_alignment(self.representative.clone(), bbox.clone());
        sink.new_alignment(span.clone(), bbox);
    }

    /// Advance past the words of a skipped unit
    fn consume<'w>(&self, words: impl IntoIterator<Item = &'w Word>, cursor: usize) -> usize {
        words
            .into_iter()
            .fold(cursor, |cursor, word| self.tracker.locate(&word.value, cursor).cursor)
    }
}
