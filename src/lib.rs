//! # unocr
//!
//! Normalizes page-level output of OCR engines into one document model and
//! coordinates recognition/conversion jobs across a worker pool.
//!
//! ## Quick Start
//!
//! ```no_run
//! use unocr::{convert_file, EngineId, render};
//!
//! fn main() -> unocr::Result<()> {
//!     // Convert an hOCR file (format is detected)
//!     let state = convert_file("scan.hocr", &EngineId::user("hocr"))?;
//!
//!     let text = render::to_text(&state, &EngineId::user("hocr"))?;
//!     println!("{}", text);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Four input shapes**: Tesseract block trees, hOCR, ABBYY XML, mupdf stext
//! - **One model**: page/line/word/char with baselines, styles and fonts
//! - **Two-pass recognition**: legacy and LSTM results merged as they arrive
//! - **Parallel conversion**: jobs run on Rayon, merged on the caller's thread

pub mod collab;
pub mod convert;
pub mod detect;
pub mod engine;
pub mod error;
pub mod merge;
pub mod model;
pub mod options;
pub mod orchestrate;
pub mod pool;
pub mod render;

// Re-export commonly used types
pub use collab::{Collaborators, FontLoader, FontSet, Headless, ProgressSink, Viewer, WarningCheck};
pub use convert::{ConvertParams, ConverterRegistry, PageConverter, PageResult, RawFormat};
pub use detect::{detect_format_from_bytes, detect_format_from_path, is_ocr_bytes};
pub use engine::{EngineId, EngineStore};
pub use error::{Error, Result};
pub use merge::{DocumentState, ResultMerge};
pub use model::{
    BBox, Baseline, CharWarning, Dims, FontFamily, FontStyle, LayoutDataTable, LayoutTable,
    OcrChar, OcrLine, OcrPage, OcrWord, PageMetrics, PageWarning,
};
pub use options::{ConvertOptions, PassSelection, RecognizeOptions};
pub use orchestrate::Orchestrator;
pub use pool::{JobHandle, LocalPool, Recognizer, WorkerPool};
pub use render::JsonFormat;

use std::path::Path;

/// A raw OCR document read from disk and split into pages.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub format: RawFormat,
    pub pages: Vec<String>,
}

impl RawDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Read a raw OCR file, detect its format and split it into pages.
///
/// # Example
///
/// ```no_run
/// use unocr::load_file;
///
/// let doc = load_file("scan.xml").unwrap();
/// println!("{} pages of {}", doc.page_count(), doc.format);
/// ```
pub fn load_file<P: AsRef<Path>>(path: P) -> Result<RawDocument> {
    let data = std::fs::read(path)?;
    let format = detect_format_from_bytes(&data)?;
    load_bytes_as(&data, format)
}

/// Split raw bytes of a known format into pages.
pub fn load_bytes_as(data: &[u8], format: RawFormat) -> Result<RawDocument> {
    let text = String::from_utf8_lossy(data);
    let pages = ConverterRegistry::with_defaults().split_pages(format, &text)?;
    log::debug!("loaded {} pages of {}", pages.len(), format);
    Ok(RawDocument { format, pages })
}

/// Convert a raw OCR file into a fresh document state, as the main data
/// source, using a [`LocalPool`] and no UI collaborators.
pub fn convert_file<P: AsRef<Path>>(path: P, engine: &EngineId) -> Result<DocumentState> {
    convert_file_with_options(path, engine, ConvertOptions::default())
}

/// Convert a raw OCR file with custom options.
pub fn convert_file_with_options<P: AsRef<Path>>(
    path: P,
    engine: &EngineId,
    options: ConvertOptions,
) -> Result<DocumentState> {
    let doc = load_file(path)?;
    convert_document(doc, engine, options, Collaborators::headless())
}

/// Convert an already split raw document into a fresh document state.
pub fn convert_document(
    doc: RawDocument,
    engine: &EngineId,
    options: ConvertOptions,
    collab: Collaborators<'_>,
) -> Result<DocumentState> {
    let pool = LocalPool::new();
    let mut state = DocumentState::new(doc.page_count());
    Orchestrator::new(&pool, collab).convert_all(
        &mut state,
        doc.pages,
        true,
        doc.format,
        engine,
        options,
    )?;
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HOCR: &str = "<html><body>\
        <div class='ocr_page' title='bbox 0 0 200 100'>\
        <span class='ocr_line' title='bbox 0 0 200 20'>\
        <span class='ocrx_word' title='bbox 0 0 50 20; x_wconf 95'>first</span>\
        </span></div>\
        <div class='ocr_page' title='bbox 0 0 200 100'>\
        <span class='ocr_line' title='bbox 0 0 200 20'>\
        <span class='ocrx_word' title='bbox 0 0 50 20; x_wconf 95'>second</span>\
        </span></div></body></html>";

    #[test]
    fn test_load_file_detects_and_splits() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(HOCR.as_bytes()).unwrap();

        let doc = load_file(file.path()).unwrap();
        assert_eq!(doc.format, RawFormat::Hocr);
        assert_eq!(doc.page_count(), 2);
    }

    #[test]
    fn test_convert_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(HOCR.as_bytes()).unwrap();

        let engine = EngineId::user("hocr");
        let state = convert_file(file.path(), &engine).unwrap();
        assert_eq!(state.page_count(), 2);
        assert_eq!(
            state.engines().page(&engine, 1).unwrap().plain_text(),
            "second"
        );
        assert_eq!(state.metrics(0).unwrap().dims, Dims::new(200.0, 100.0));
        assert!(state.is_recognized(1));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            load_file("/nonexistent/scan.hocr"),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn test_load_unknown_format() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"plain text, not OCR").unwrap();
        assert!(matches!(load_file(file.path()), Err(Error::UnknownFormat)));
    }
}
