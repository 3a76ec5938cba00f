//! OCR (Optical Character Recognition) module
//!
//! Hierarchical recognition output for one frame (blocks, lines, words) and
//! the engine seam that produces it.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::geometry::RelativeGeometry;
use crate::capture::Frame;

/// Joins words within a line in the engine's page rendering
pub const WORD_SEPARATOR: &str = " ";
/// Joins lines within a block
pub const LINE_SEPARATOR: &str = "\n";
/// Joins blocks within a page
pub const BLOCK_SEPARATOR: &str = "\n\n";

/// OCR engine collaborator
///
/// One call per frame. Implementations are shared read-only across worker
/// threads for the lifetime of a run.
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, frame: &Frame) -> Result<RecognitionResult>;
}

/// Single recognized word
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Word {
    /// Recognized text
    pub value: String,
    /// Recognition confidence (0.0 - 1.0)
    pub confidence: f32,
    /// Relative bounding corners
    #[serde(default)]
    pub geometry: RelativeGeometry,
}

/// Line of words
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Line {
    #[serde(default)]
    pub geometry: RelativeGeometry,
    #[serde(default)]
    pub words: Vec<Word>,
}

impl Line {
    pub fn render(&self) -> String {
        self.words
            .iter()
            .map(|w| w.value.as_str())
            .collect::<Vec<_>>()
            .join(WORD_SEPARATOR)
    }
}

/// Block of lines, rendered as a paragraph
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Block {
    #[serde(default)]
    pub geometry: RelativeGeometry,
    #[serde(default)]
    pub lines: Vec<Line>,
}

impl Block {
    pub fn render(&self) -> String {
        self.lines
            .iter()
            .map(Line::render)
            .collect::<Vec<_>>()
            .join(LINE_SEPARATOR)
    }
}

/// Full recognition output for one frame
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecognitionResult {
    #[serde(default)]
    pub blocks: Vec<Block>,
    /// Page text as rendered by the engine, when it differs from a plain join
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rendering: Option<String>,
}

impl RecognitionResult {
    /// Canonical page text that span offsets refer to
    pub fn render(&self) -> String {
        if let Some(rendering) = &self.rendering {
            return rendering.clone();
        }
        self.blocks
            .iter()
            .map(Block::render)
            .collect::<Vec<_>>()
            .join(BLOCK_SEPARATOR)
    }

    /// Total number of words across all blocks
    pub fn word_count(&self) -> usize {
        self.blocks
            .iter()
            .flat_map(|b| &b.lines)
            .map(|l| l.words.len())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(value: &str) -> Word {
        Word {
            value: value.to_string(),
            confidence: 0.9,
            geometry: vec![vec![0.0, 0.0], vec![0.1, 0.1]],
        }
    }

    fn line(words: &[&str]) -> Line {
        Line {
            geometry: vec![vec![0.0, 0.0], vec![0.5, 0.1]],
            words: words.iter().map(|w| word(w)).collect(),
        }
    }

    #[test]
    fn test_render_joins_with_separators() {
        let page = RecognitionResult {
            blocks: vec![
                Block {
                    geometry: vec![],
                    lines: vec![line(&["HELLO", "WORLD"]), line(&["again"])],
                },
                Block {
                    geometry: vec![],
                    lines: vec![line(&["bye"])],
                },
            ],
            rendering: None,
        };

        assert_eq!(page.render(), "HELLO WORLD\nagain\n\nbye");
        assert_eq!(page.blocks[0].render(), "HELLO WORLD\nagain");
        assert_eq!(page.word_count(), 4);
    }

    #[test]
    fn test_engine_rendering_wins() {
        let page = RecognitionResult {
            blocks: vec![Block {
                geometry: vec![],
                lines: vec![line(&["cafe"])],
            }],
            rendering: Some("café".to_string()),
        };
        assert_eq!(page.render(), "café");
    }

    #[test]
    fn test_empty_page_renders_empty() {
        assert_eq!(RecognitionResult::default().render(), "");
    }

    #[test]
    fn test_deserialize_missing_geometry() {
        let page: RecognitionResult =
            serde_json::from_str(r#"{"blocks":[{"lines":[{"words":[{"value":"x","confidence":0.5}]}]}]}"#)
                .unwrap();
        assert!(page.blocks[0].geometry.is_empty());
        assert_eq!(page.render(), "x");
    }
}
