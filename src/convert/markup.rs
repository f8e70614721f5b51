//! Helpers shared by the markup converters.
//!
//! hOCR is HTML and goes through `scraper`; ABBYY and stext are XML and go
//! through `roxmltree`. This module holds the XML side plus the hOCR `title`
//! property parsing.

use std::collections::HashMap;

use roxmltree::{Document, Node, ParsingOptions};

use crate::error::{Error, Result};

/// Parse an XML document. DOCTYPE declarations are accepted.
pub(crate) fn parse_xml<'i>(raw: &'i str, format: &'static str) -> Result<Document<'i>> {
    let mut options = ParsingOptions::default();
    options.allow_dtd = true;
    Document::parse_with_options(raw, options).map_err(|e| Error::malformed(format, e.to_string()))
}

/// True for an element whose local name is `name`.
pub(crate) fn is_element(node: Node<'_, '_>, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name
}

/// Numeric attribute.
pub(crate) fn attr_f64(node: Node<'_, '_>, name: &str) -> Option<f64> {
    node.attribute(name).and_then(|v| v.trim().parse().ok())
}

/// Concatenated text of every descendant text node.
pub(crate) fn text(node: Node<'_, '_>) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

/// Outermost `page` elements of `raw`, each cut out of the source as its
/// own document.
pub(crate) fn split_xml_pages(raw: &str, format: &'static str) -> Result<Vec<String>> {
    let doc = parse_xml(raw, format)?;
    let pages: Vec<String> = doc
        .descendants()
        .filter(|n| is_element(*n, "page"))
        .filter(|n| !n.ancestors().skip(1).any(|a| is_element(a, "page")))
        .map(|n| raw[n.range()].to_string())
        .collect();

    if pages.is_empty() {
        return Err(Error::malformed(format, "no page element"));
    }
    Ok(pages)
}

/// hOCR `title` properties, e.g. `bbox 1 2 3 4; x_wconf 95`.
pub(crate) fn title_properties(title: &str) -> HashMap<&str, &str> {
    title
        .split(';')
        .filter_map(|part| {
            let part = part.trim();
            if part.is_empty() {
                return None;
            }
            match part.split_once(char::is_whitespace) {
                Some((key, value)) => Some((key, value.trim())),
                None => Some((part, "")),
            }
        })
        .collect()
}

/// Whitespace-separated numbers. Returns `None` if any token fails to parse.
pub(crate) fn numbers(value: &str) -> Option<Vec<f64>> {
    value
        .split_whitespace()
        .map(|v| v.parse::<f64>().ok())
        .collect()
}
