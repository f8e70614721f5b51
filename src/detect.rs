//! Raw OCR format detection.

use crate::convert::RawFormat;
use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// How many leading bytes are sniffed.
const SNIFF_LEN: usize = 64 * 1024;

/// Detect the raw format of a file from its leading bytes.
///
/// # Example
/// ```no_run
/// use unocr::detect::detect_format_from_path;
///
/// let format = detect_format_from_path("scan.hocr").unwrap();
/// println!("format: {}", format);
/// ```
pub fn detect_format_from_path<P: AsRef<Path>>(path: P) -> Result<RawFormat> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file).take(SNIFF_LEN as u64);
    let mut head = Vec::with_capacity(SNIFF_LEN);
    reader.read_to_end(&mut head)?;
    detect_format_from_bytes(&head)
}

/// Detect the raw format from the start of a document.
///
/// JSON input is taken to be a block tree. Markup is classified by the
/// markers each format always carries: `ocr_page`/`ocrx_word` classes for
/// hOCR, `charParams` or the FineReader namespace for ABBYY, and `char`
/// elements with a `quad` for stext.
pub fn detect_format_from_bytes(data: &[u8]) -> Result<RawFormat> {
    let head = &data[..data.len().min(SNIFF_LEN)];
    let text = String::from_utf8_lossy(head);
    let trimmed = text.trim_start_matches('\u{FEFF}').trim_start();

    if trimmed.is_empty() {
        return Err(Error::UnknownFormat);
    }
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return Ok(RawFormat::Blocks);
    }
    if !trimmed.starts_with('<') {
        return Err(Error::UnknownFormat);
    }

    if text.contains("ocr_page") || text.contains("ocrx_word") {
        Ok(RawFormat::Hocr)
    } else if text.contains("charParams") || text.contains("abbyy.com/FineReader") {
        Ok(RawFormat::Abbyy)
    } else if text.contains("<char") && text.contains("quad=") {
        Ok(RawFormat::Stext)
    } else {
        Err(Error::UnknownFormat)
    }
}

/// Check if bytes look like any supported OCR format.
pub fn is_ocr_bytes(data: &[u8]) -> bool {
    detect_format_from_bytes(data).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_blocks() {
        assert_eq!(
            detect_format_from_bytes(b"  [{\"bbox\": {}}]").unwrap(),
            RawFormat::Blocks
        );
        assert_eq!(
            detect_format_from_bytes(b"{\"blocks\": []}").unwrap(),
            RawFormat::Blocks
        );
    }

    #[test]
    fn test_detect_hocr() {
        let data = b"<!DOCTYPE html><html><body><div class='ocr_page'></div></body></html>";
        assert_eq!(detect_format_from_bytes(data).unwrap(), RawFormat::Hocr);
    }

    #[test]
    fn test_detect_abbyy() {
        let data = b"<?xml version=\"1.0\"?><document><page><charParams l=\"1\">a</charParams>";
        assert_eq!(detect_format_from_bytes(data).unwrap(), RawFormat::Abbyy);
    }

    #[test]
    fn test_detect_stext() {
        let data = b"<document><page><line><font><char quad=\"0 0 1 0 0 1 1 1\" c=\"a\"/>";
        assert_eq!(detect_format_from_bytes(data).unwrap(), RawFormat::Stext);
    }

    #[test]
    fn test_detect_unknown() {
        assert!(matches!(detect_format_from_bytes(b""), Err(Error::UnknownFormat)));
        assert!(matches!(
            detect_format_from_bytes(b"%PDF-1.7"),
            Err(Error::UnknownFormat)
        ));
        assert!(!is_ocr_bytes(b"<html><body>plain</body></html>"));
    }
}
