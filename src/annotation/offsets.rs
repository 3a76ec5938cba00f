//! Character offsets of recognized words within the rendered page text
//!
//! The engine renders a page to one string but never reports where each word
//! landed in it. Words are located by forward search from a cursor that is
//! threaded through every call and never moves backwards.

use serde::{Deserialize, Serialize};

/// Half-open character range `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

impl TextRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Smallest range covering both
    pub fn cover(self, other: TextRange) -> TextRange {
        TextRange::new(self.start.min(other.start), self.end.max(other.end))
    }
}

/// How a word's range was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// The word text occurs at the range
    Exact,
    /// Not found after the cursor; the cursor was advanced by the word length
    Fallback,
}

/// Result of locating one word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Located {
    pub range: TextRange,
    /// Cursor to pass to the next call
    pub cursor: usize,
    pub kind: MatchKind,
}

/// Locates words in one rendered page
pub struct OffsetTracker<'a> {
    text: &'a str,
    /// Byte offset of every char, plus `text.len()`
    char_starts: Vec<usize>,
}

impl<'a> OffsetTracker<'a> {
    pub fn new(text: &'a str) -> Self {
        let char_starts = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        Self { text, char_starts }
    }

    /// Document length in chars
    pub fn char_len(&self) -> usize {
        self.char_starts.len() - 1
    }

    /// Locate `word` at or after `cursor`.
    ///
    /// The returned range starts no earlier than `cursor` and ends within the
    /// document. On a miss the range is `[cursor, cursor + len)`, cut short
    /// only where the document ends.
    pub fn locate(&self, word: &str, cursor: usize) -> Located {
        let cursor = cursor.min(self.char_len());
        let len = word.chars().count();

        let from = self.char_starts[cursor];
        if let Some(pos) = self.text[from..].find(word) {
            let start = self.char_index(from + pos);
            let range = TextRange::new(start, start + len);
            return Located {
                range,
                cursor: range.end,
                kind: MatchKind::Exact,
            };
        }

        let range = TextRange::new(cursor, (cursor + len).min(self.char_len()));
        Located {
            range,
            cursor: range.end,
            kind: MatchKind::Fallback,
        }
    }

    /// Locate a sequence of words in document order, starting at `cursor`
    pub fn locate_all<'w>(&self, words: impl IntoIterator<Item = &'w str>, mut cursor: usize) -> Vec<Located> {
        words
            .into_iter()
            .map(|word| {
                let located = self.locate(word, cursor);
                cursor = located.cursor;
                located
            })
            .collect()
    }

    /// Document text covered by `range`
    pub fn slice(&self, range: TextRange) -> &'a str {
        let start = self.char_starts[range.start.min(self.char_len())];
        let end = self.char_starts[range.end.min(self.char_len())];
        &self.text[start..end]
    }

    fn char_index(&self, byte: usize) -> usize {
        self.char_starts.partition_point(|&b| b < byte)
    }
}
