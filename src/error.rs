//! Error types for unocr library.

use std::io;
use thiserror::Error;

/// Result type alias for unocr operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while converting or merging OCR data.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The raw input does not look like any supported OCR format.
    #[error("Unknown OCR data format")]
    UnknownFormat,

    /// Raw input for a converter is malformed.
    #[error("Malformed {format} input: {message}")]
    Malformed {
        format: &'static str,
        message: String,
    },

    /// Attempt to build a word whose text is empty or whitespace only.
    #[error("Word text is empty")]
    EmptyWord,

    /// Attempt to build a line that holds no word.
    #[error("Line has no words")]
    EmptyLine,

    /// A font resource could not be loaded.
    #[error("Font loading failed: {0}")]
    FontLoad(String),

    /// A worker job rejected.
    #[error("Job for page {page} failed: {message}")]
    Job { page: usize, message: String },

    /// A job handle was dropped before delivering a result.
    #[error("Worker pool dropped the job for page {page}")]
    PoolClosed { page: usize },

    /// The worker pool has no recognizer attached.
    #[error("No recognition engine is available")]
    RecognitionUnavailable,

    /// Page index is out of range.
    #[error("Page {0} is out of range (document has {1} pages)")]
    PageOutOfRange(usize, usize),

    /// An engine name that is not registered.
    #[error("Unknown engine: {0}")]
    UnknownEngine(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    pub(crate) fn malformed(format: &'static str, message: impl Into<String>) -> Self {
        Error::Malformed {
            format,
            message: message.into(),
        }
    }
}
