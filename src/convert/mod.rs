//! Format converters: raw OCR output for one page into an [`OcrPage`].
//!
//! Every converter shares the same contract. Given one page of raw input and
//! [`ConvertParams`], it returns a [`PageResult`] holding the page, any
//! layout/table annotations, a warning descriptor and the set of languages
//! seen. Blank words never get an identifier, lines without words are
//! dropped, and both post-passes run before the page is returned.
//!
//! # Example
//!
//! ```no_run
//! use unocr::convert::{ConverterRegistry, ConvertParams, RawFormat};
//!
//! fn main() -> unocr::Result<()> {
//!     let registry = ConverterRegistry::with_defaults();
//!     let hocr = std::fs::read_to_string("page.hocr")?;
//!     let result = registry.convert(RawFormat::Hocr, &hocr, &ConvertParams::new(0))?;
//!     println!("{} words", result.page.word_count());
//!     Ok(())
//! }
//! ```

mod abbyy;
pub mod blocks;
mod fonts;
mod hocr;
mod markup;
pub mod postpass;
mod stext;

pub use abbyy::AbbyyConverter;
pub use blocks::{convert_blocks, BlocksConverter};
pub use fonts::{determine_sans_serif, is_italic_font_name};
pub use hocr::HocrConverter;
pub use stext::StextConverter;

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{BBox, Dims, LayoutDataTable, OcrPage, PageWarning};
use crate::options::ConvertOptions;

/// Raw input shapes understood by the converters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RawFormat {
    /// Tesseract block tree (JSON)
    Blocks,
    /// hOCR markup
    Hocr,
    /// ABBYY FineReader XML
    Abbyy,
    /// mupdf structured text XML
    Stext,
}

impl RawFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            RawFormat::Blocks => "blocks",
            RawFormat::Hocr => "hocr",
            RawFormat::Abbyy => "abbyy",
            RawFormat::Stext => "stext",
        }
    }

    pub fn all() -> [RawFormat; 4] {
        [
            RawFormat::Blocks,
            RawFormat::Hocr,
            RawFormat::Abbyy,
            RawFormat::Stext,
        ]
    }
}

impl fmt::Display for RawFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RawFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "blocks" | "json" => Ok(RawFormat::Blocks),
            "hocr" | "html" => Ok(RawFormat::Hocr),
            "abbyy" | "xml" => Ok(RawFormat::Abbyy),
            "stext" => Ok(RawFormat::Stext),
            _ => Err(Error::UnknownFormat),
        }
    }
}

/// Per-page conversion parameters.
#[derive(Debug, Clone, Default)]
pub struct ConvertParams {
    /// Page index (0-indexed)
    pub n: usize,

    /// Page dimensions; when absent the converter takes them from the input
    pub dims: Option<Dims>,

    /// Rotation (degrees) applied to the image before recognition
    pub rotate_angle: f64,

    /// Conversion options
    pub options: ConvertOptions,
}

impl ConvertParams {
    pub fn new(n: usize) -> Self {
        Self {
            n,
            ..Default::default()
        }
    }

    pub fn with_dims(mut self, dims: Dims) -> Self {
        self.dims = Some(dims);
        self
    }

    pub fn with_rotate_angle(mut self, angle: f64) -> Self {
        self.rotate_angle = angle;
        self
    }

    pub fn with_options(mut self, options: ConvertOptions) -> Self {
        self.options = options;
        self
    }
}

/// Result of converting one page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult {
    /// The converted page
    pub page: OcrPage,

    /// Table annotations (possibly empty)
    pub layout: LayoutDataTable,

    /// Warning descriptor (possibly empty)
    pub warning: PageWarning,

    /// Languages of the words on the page
    pub lang_set: BTreeSet<String>,
}

impl PageResult {
    /// Wrap a finished page, collecting its language set.
    pub fn new(page: OcrPage, layout: LayoutDataTable, warning: PageWarning) -> Self {
        let lang_set = page.words().filter_map(|w| w.lang.clone()).collect();
        Self {
            page,
            layout,
            warning,
            lang_set,
        }
    }
}

/// Trait for page converters.
///
/// Implement this trait to add support for a new raw OCR format.
pub trait PageConverter: Send + Sync {
    /// The raw format this converter reads.
    fn format(&self) -> RawFormat;

    /// Convert one page of raw input.
    fn convert(&self, raw: &str, params: &ConvertParams) -> Result<PageResult>;

    /// Split a multi-page document into per-page raw strings.
    fn split_pages(&self, raw: &str) -> Result<Vec<String>>;
}

/// Registry of page converters keyed by raw format.
pub struct ConverterRegistry {
    converters: HashMap<RawFormat, Arc<dyn PageConverter>>,
}

impl ConverterRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            converters: HashMap::new(),
        }
    }

    /// Create a registry with all built-in converters.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(BlocksConverter::new()));
        registry.register(Arc::new(HocrConverter::new()));
        registry.register(Arc::new(AbbyyConverter::new()));
        registry.register(Arc::new(StextConverter::new()));
        registry
    }

    /// Register a converter, replacing any previous one for its format.
    pub fn register(&mut self, converter: Arc<dyn PageConverter>) {
        self.converters.insert(converter.format(), converter);
    }

    pub fn get(&self, format: RawFormat) -> Option<Arc<dyn PageConverter>> {
        self.converters.get(&format).cloned()
    }

    pub fn supports(&self, format: RawFormat) -> bool {
        self.converters.contains_key(&format)
    }

    /// Convert one page with the converter for `format`.
    pub fn convert(&self, format: RawFormat, raw: &str, params: &ConvertParams) -> Result<PageResult> {
        let converter = self
            .get(format)
            .ok_or_else(|| Error::Other(format!("No converter for format: {}", format)))?;
        converter.convert(raw, params)
    }

    /// Split a multi-page document with the converter for `format`.
    pub fn split_pages(&self, format: RawFormat, raw: &str) -> Result<Vec<String>> {
        let converter = self
            .get(format)
            .ok_or_else(|| Error::Other(format!("No converter for format: {}", format)))?;
        converter.split_pages(raw)
    }
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Record the rotation and run both post-passes.
pub(crate) fn finish_page(page: &mut OcrPage, rotate_angle: f64) {
    page.angle = rotate_angle;
    postpass::refine_structure(page, rotate_angle);
    postpass::normalize_style(page);
}

const X_HEIGHT_CHARS: &str = "acemnorsuvwxz";
const ASCENDER_CHARS: &str = "bdfhklt";

/// Estimate `(ascender height, x-height)` from character boxes when the input
/// has no row metrics. `baseline_y` is the absolute baseline under the chars.
pub(crate) fn estimate_line_metrics<'a, I>(chars: I, baseline_y: f64) -> (f64, f64)
where
    I: IntoIterator<Item = (&'a str, &'a BBox)>,
{
    let mut x_heights = Vec::new();
    let mut asc_heights = Vec::new();

    for (text, bbox) in chars {
        let mut it = text.chars();
        let (Some(c), None) = (it.next(), it.next()) else {
            continue;
        };
        let height = baseline_y - bbox.top;
        if height <= 0.0 {
            continue;
        }
        if X_HEIGHT_CHARS.contains(c) {
            x_heights.push(height);
        } else if ASCENDER_CHARS.contains(c) {
            asc_heights.push(height);
        }
    }

    let x_height = median(&mut x_heights).unwrap_or(0.0);
    let asc_height = median(&mut asc_heights)
        .map(|h| (h - x_height).max(0.0))
        .unwrap_or(0.0);
    (asc_height, x_height)
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}
