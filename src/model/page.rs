//! Page-level types.

use serde::{Deserialize, Serialize};

use super::{Dims, LineBuilder, OcrLine, OcrWord};

/// One recognized page, as produced by one engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrPage {
    /// Page index (0-indexed)
    pub n: usize,

    /// Page dimensions in pixels
    pub dims: Dims,

    /// Rotation (degrees) applied to the image before recognition
    pub angle: f64,

    lines: Vec<OcrLine>,
}

impl OcrPage {
    /// Create an empty page.
    pub fn new(n: usize, dims: Dims) -> Self {
        Self {
            n,
            dims,
            angle: 0.0,
            lines: Vec::new(),
        }
    }

    /// Finish `builder` and append the line. Returns `false` (and appends
    /// nothing) if the line has no words.
    pub fn push_line(&mut self, builder: LineBuilder) -> bool {
        match builder.build() {
            Some(line) => {
                self.lines.push(line);
                true
            }
            None => false,
        }
    }

    pub fn lines(&self) -> &[OcrLine] {
        &self.lines
    }

    pub fn lines_mut(&mut self) -> &mut [OcrLine] {
        &mut self.lines
    }

    /// All words in reading order.
    pub fn words(&self) -> impl Iterator<Item = &OcrWord> {
        self.lines.iter().flat_map(|line| line.words().iter())
    }

    pub fn word_count(&self) -> usize {
        self.lines.iter().map(|line| line.word_count()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Find a word by id.
    pub fn word(&self, id: &str) -> Option<&OcrWord> {
        self.words().find(|w| w.id == id)
    }

    /// Plain text, one line per row.
    pub fn plain_text(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.text())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
