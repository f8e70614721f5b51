//! Canonical document model for recognized pages.
//!
//! Pages own lines, lines own words, words own characters. Geometry is
//! stored exactly as given; converters transform coordinates before building
//! anything here.

mod geometry;
mod layout;
mod line;
mod metrics;
mod page;
mod warning;
mod word;

pub use geometry::{BBox, Baseline, Dims};
pub use layout::{LayoutDataTable, LayoutTable};
pub use line::{LineBuilder, OcrLine};
pub use metrics::PageMetrics;
pub use page::OcrPage;
pub use warning::{summarize_char_warnings, CharWarning, PageWarning};
pub use word::{FontFamily, FontStyle, OcrChar, OcrWord, WordIdAllocator};
