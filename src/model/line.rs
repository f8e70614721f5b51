//! Line-level types.

use serde::{Deserialize, Serialize};

use super::{BBox, Baseline, OcrWord};
use crate::error::Error;

/// A text line. Always holds at least one word, including when deserialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawOcrLine")]
pub struct OcrLine {
    /// Line box in page pixel space
    pub bbox: BBox,
    /// Baseline relative to the bottom-left corner of `bbox`
    pub baseline: Baseline,
    /// Ascender height in pixels
    pub asc_height: f64,
    /// x-height in pixels
    pub x_height: f64,
    words: Vec<OcrWord>,
}

impl OcrLine {
    pub fn words(&self) -> &[OcrWord] {
        &self.words
    }

    /// Mutable access to the words. The slice cannot shrink the line to zero.
    pub fn words_mut(&mut self) -> &mut [OcrWord] {
        &mut self.words
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    /// Space-joined word text.
    pub fn text(&self) -> String {
        self.words
            .iter()
            .map(|w| w.text())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Serialized form of [`OcrLine`], rebuilt through [`LineBuilder`].
#[derive(Deserialize)]
struct RawOcrLine {
    bbox: BBox,
    baseline: Baseline,
    asc_height: f64,
    x_height: f64,
    words: Vec<OcrWord>,
}

impl TryFrom<RawOcrLine> for OcrLine {
    type Error = Error;

    fn try_from(raw: RawOcrLine) -> Result<Self, Error> {
        let mut builder = LineBuilder::new(raw.bbox, raw.baseline, raw.asc_height, raw.x_height);
        for word in raw.words {
            builder.push_word(word);
        }
        builder.build().ok_or(Error::EmptyLine)
    }
}

/// Accumulates words for a line; [`LineBuilder::build`] yields nothing when
/// no word survived.
#[derive(Debug, Clone)]
pub struct LineBuilder {
    bbox: BBox,
    baseline: Baseline,
    asc_height: f64,
    x_height: f64,
    words: Vec<OcrWord>,
}

impl LineBuilder {
    pub fn new(bbox: BBox, baseline: Baseline, asc_height: f64, x_height: f64) -> Self {
        Self {
            bbox,
            baseline,
            asc_height,
            x_height,
            words: Vec::new(),
        }
    }

    /// Box of the line under construction (used by word builders that need
    /// the line origin).
    pub fn bbox(&self) -> &BBox {
        &self.bbox
    }

    pub fn push_word(&mut self, word: OcrWord) {
        self.words.push(word);
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn build(self) -> Option<OcrLine> {
        if self.words.is_empty() {
            return None;
        }
        Some(OcrLine {
            bbox: self.bbox,
            baseline: self.baseline,
            asc_height: self.asc_height,
            x_height: self.x_height,
            words: self.words,
        })
    }
}
