//! Post-passes applied to every converted page.
//!
//! Both passes only reorder or rewrite content in place. They never add or
//! remove lines or words, so the tree shape and the non-empty invariants
//! hold afterwards.

use std::cmp::Ordering;

use unicode_normalization::UnicodeNormalization;

use crate::model::{BBox, FontStyle, OcrLine, OcrPage, OcrWord};

/// Typographic ligatures expanded by [`normalize_style`].
const LIGATURES: &[(char, &str)] = &[
    ('\u{FB00}', "ff"),
    ('\u{FB01}', "fi"),
    ('\u{FB02}', "fl"),
    ('\u{FB03}', "ffi"),
    ('\u{FB04}', "ffl"),
    ('\u{FB05}', "st"),
    ('\u{FB06}', "st"),
];

/// Order lines top to bottom within each column and words within each line
/// along the line direction.
///
/// `angle` is the rotation (degrees) applied to the image before
/// recognition; positions are projected onto the rotated axes. The engine's
/// line order is kept across columns: only runs of consecutive lines that
/// overlap horizontally are sorted, so a second column never interleaves
/// with the first. Both sorts are stable. Lines written in a right-to-left
/// script keep the engine's word order.
pub fn refine_structure(page: &mut OcrPage, angle: f64) {
    let (sin, cos) = angle.to_radians().sin_cos();

    let lines = page.lines_mut();
    let mut start = 0;
    while start < lines.len() {
        let mut end = start + 1;
        let mut span = project_horizontal(&lines[start].bbox, sin, cos);
        while end < lines.len() {
            let next = project_horizontal(&lines[end].bbox, sin, cos);
            if next.0 >= span.1 || next.1 <= span.0 {
                break;
            }
            span = (span.0.min(next.0), span.1.max(next.1));
            end += 1;
        }
        lines[start..end].sort_by(|a, b| {
            let pa = project_vertical(&a.bbox, sin, cos);
            let pb = project_vertical(&b.bbox, sin, cos);
            pa.partial_cmp(&pb).unwrap_or(Ordering::Equal)
        });
        start = end;
    }

    for line in page.lines_mut() {
        if is_rtl_line(line) {
            continue;
        }
        line.words_mut().sort_by(|a, b| {
            let pa = project(a, sin, cos);
            let pb = project(b, sin, cos);
            pa.partial_cmp(&pb).unwrap_or(Ordering::Equal)
        });
    }
}

fn centre(bbox: &BBox) -> (f64, f64) {
    ((bbox.left + bbox.right) / 2.0, (bbox.top + bbox.bottom) / 2.0)
}

fn project(word: &OcrWord, sin: f64, cos: f64) -> f64 {
    let (cx, cy) = centre(&word.bbox);
    cx * cos + cy * sin
}

/// Extent of `bbox` along the rotated horizontal axis.
fn project_horizontal(bbox: &BBox, sin: f64, cos: f64) -> (f64, f64) {
    let corners = [
        (bbox.left, bbox.top),
        (bbox.right, bbox.top),
        (bbox.left, bbox.bottom),
        (bbox.right, bbox.bottom),
    ];
    corners
        .iter()
        .map(|(x, y)| x * cos + y * sin)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| (lo.min(p), hi.max(p)))
}

fn project_vertical(bbox: &BBox, sin: f64, cos: f64) -> f64 {
    let (cx, cy) = centre(bbox);
    cy * cos - cx * sin
}

fn is_rtl_line(line: &OcrLine) -> bool {
    line.words()
        .iter()
        .flat_map(|w| w.text().chars())
        .any(is_rtl_char)
}

fn is_rtl_char(c: char) -> bool {
    // Hebrew, Arabic, Syriac, Thaana, NKo, Samaritan, Mandaic, Arabic Ext
    matches!(c as u32, 0x0590..=0x08FF | 0xFB1D..=0xFDFF | 0xFE70..=0xFEFF)
}

/// Normalize word text and style.
///
/// Text is NFC-normalized and typographic ligatures are expanded. Words with
/// no alphanumeric character (punctuation, dashes) drop italic styling since
/// the engines cannot tell slanted punctuation apart.
pub fn normalize_style(page: &mut OcrPage) {
    for line in page.lines_mut() {
        for word in line.words_mut() {
            let normalized = normalize_text(word.text());
            if normalized != word.text() {
                // NFC and ligature expansion never produce blank text from
                // non-blank input, so this cannot fail in practice.
                if word.set_text(normalized).is_err() {
                    log::warn!("normalization blanked word {}", word.id);
                }
            }

            if word.style == FontStyle::Italic && !word.text().chars().any(char::is_alphanumeric) {
                word.style = FontStyle::Normal;
            }
        }
    }
}

fn normalize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.nfc() {
        match LIGATURES.iter().find(|(lig, _)| *lig == c) {
            Some((_, expanded)) => out.push_str(expanded),
            None => out.push(c),
        }
    }
    out
}
