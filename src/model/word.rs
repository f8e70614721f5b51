//! Word and character level types.

use serde::{Deserialize, Serialize};

use super::BBox;
use crate::error::{Error, Result};

/// A single recognized character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrChar {
    /// Character text (usually one grapheme, ligatures may carry more)
    pub text: String,
    /// Character box in page pixel space
    pub bbox: BBox,
}

impl OcrChar {
    pub fn new(text: impl Into<String>, bbox: BBox) -> Self {
        Self {
            text: text.into(),
            bbox,
        }
    }
}

/// Font style of a word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
    SmallCaps,
}

/// Coarse font family classification.
///
/// `Default` is never stored on a word; it means "use the renderer's default".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FontFamily {
    Serif,
    SansSerif,
    Default,
}

impl FontFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            FontFamily::Serif => "SerifDefault",
            FontFamily::SansSerif => "SansDefault",
            FontFamily::Default => "Default",
        }
    }
}

/// A recognized word.
///
/// The text is guaranteed to contain at least one non-whitespace character;
/// [`OcrWord::new`] and [`OcrWord::set_text`] reject anything else, and so
/// does deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawOcrWord")]
pub struct OcrWord {
    text: String,
    /// Word box in page pixel space
    pub bbox: BBox,
    /// Identifier of the form `word_<page + 1>_<n>`
    pub id: String,
    /// Language tag reported by the engine (e.g. "eng")
    pub lang: Option<String>,
    /// Engine confidence, 0-100
    pub conf: f64,
    /// Font style
    pub style: FontStyle,
    /// Font family; `None` means the default rendering font applies
    pub font: Option<FontFamily>,
    /// Characters in reading order
    pub chars: Vec<OcrChar>,
}

impl OcrWord {
    /// Create a word. Fails with [`Error::EmptyWord`] if `text` is blank.
    pub fn new(text: impl Into<String>, bbox: BBox, id: impl Into<String>) -> Result<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(Error::EmptyWord);
        }
        Ok(Self {
            text,
            bbox,
            id: id.into(),
            lang: None,
            conf: 0.0,
            style: FontStyle::Normal,
            font: None,
            chars: Vec::new(),
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replace the word text, keeping the non-blank invariant.
    pub fn set_text(&mut self, text: impl Into<String>) -> Result<()> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(Error::EmptyWord);
        }
        self.text = text;
        Ok(())
    }

    /// Set the font family; `FontFamily::Default` clears it.
    pub fn set_font(&mut self, family: FontFamily) {
        self.font = match family {
            FontFamily::Default => None,
            other => Some(other),
        };
    }

    pub fn is_italic(&self) -> bool {
        self.style == FontStyle::Italic
    }
}

/// Serialized form of [`OcrWord`], checked by [`OcrWord::new`] on the way in.
#[derive(Deserialize)]
struct RawOcrWord {
    text: String,
    bbox: BBox,
    id: String,
    lang: Option<String>,
    conf: f64,
    style: FontStyle,
    font: Option<FontFamily>,
    chars: Vec<OcrChar>,
}

impl TryFrom<RawOcrWord> for OcrWord {
    type Error = Error;

    fn try_from(raw: RawOcrWord) -> Result<Self> {
        let mut word = OcrWord::new(raw.text, raw.bbox, raw.id)?;
        word.lang = raw.lang;
        word.conf = raw.conf;
        word.style = raw.style;
        word.font = raw.font;
        word.chars = raw.chars;
        Ok(word)
    }
}

/// Hands out word identifiers for one page.
///
/// Only words that are actually built should draw an id, so the sequence
/// stays contiguous.
#[derive(Debug, Clone)]
pub struct WordIdAllocator {
    page_number: usize,
    next: usize,
}

impl WordIdAllocator {
    /// Allocator for the zero-based page index `page_index`.
    pub fn new(page_index: usize) -> Self {
        Self {
            page_number: page_index + 1,
            next: 0,
        }
    }

    pub fn next_id(&mut self) -> String {
        let id = format!("word_{}_{}", self.page_number, self.next);
        self.next += 1;
        id
    }

    /// Number of ids handed out so far.
    pub fn issued(&self) -> usize {
        self.next
    }
}
