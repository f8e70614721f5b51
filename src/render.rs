//! Plain text and JSON views of one engine's pages.

use serde::Serialize;

use crate::engine::EngineId;
use crate::error::{Error, Result};
use crate::merge::DocumentState;
use crate::model::{LayoutDataTable, OcrPage, PageMetrics, PageWarning};

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}

#[derive(Serialize)]
struct PageView<'a> {
    n: usize,
    metrics: Option<&'a PageMetrics>,
    warning: Option<&'a PageWarning>,
    layout: Option<&'a LayoutDataTable>,
    page: Option<&'a OcrPage>,
}

#[derive(Serialize)]
struct EngineView<'a> {
    engine: &'a str,
    pages: Vec<PageView<'a>>,
}

fn engine_pages<'a>(state: &'a DocumentState, engine: &EngineId) -> Result<&'a [Option<OcrPage>]> {
    state
        .engines()
        .pages(engine)
        .ok_or_else(|| Error::UnknownEngine(engine.to_string()))
}

/// Serialize `engine`'s pages with the per-page metrics, warnings and layout.
pub fn to_json(state: &DocumentState, engine: &EngineId, format: JsonFormat) -> Result<String> {
    let pages = engine_pages(state, engine)?;
    let view = EngineView {
        engine: engine.name(),
        pages: pages
            .iter()
            .enumerate()
            .map(|(n, page)| PageView {
                n,
                metrics: state.metrics(n),
                warning: state.warnings().get(n).and_then(Option::as_ref),
                layout: state.layout(n).filter(|l| !l.is_empty()),
                page: page.as_ref(),
            })
            .collect(),
    };

    let json = match format {
        JsonFormat::Pretty => serde_json::to_string_pretty(&view)?,
        JsonFormat::Compact => serde_json::to_string(&view)?,
    };
    Ok(json)
}

/// Plain text of `engine`'s pages, one line per row and a blank line between
/// pages. Pages without data are empty.
pub fn to_text(state: &DocumentState, engine: &EngineId) -> Result<String> {
    let pages = engine_pages(state, engine)?;
    Ok(pages
        .iter()
        .map(|page| page.as_ref().map(OcrPage::plain_text).unwrap_or_default())
        .collect::<Vec<_>>()
        .join("\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::Collaborators;
    use crate::convert::PageResult;
    use crate::merge::ResultMerge;
    use crate::model::{BBox, Baseline, Dims, LineBuilder, OcrWord};

    fn state_with_text(texts: &[&str]) -> DocumentState {
        let mut state = DocumentState::new(texts.len() + 1);
        let merge = ResultMerge::new(Collaborators::headless());
        for (n, text) in texts.iter().enumerate() {
            let mut page = OcrPage::new(n, Dims::new(10.0, 10.0));
            let mut line = LineBuilder::new(BBox::default(), Baseline::default(), 0.0, 0.0);
            line.push_word(OcrWord::new(*text, BBox::default(), format!("word_{}_0", n + 1)).unwrap());
            page.push_line(line);
            let result = PageResult::new(page, LayoutDataTable::new(), PageWarning::none());
            merge.merge(&mut state, result, n, true, &EngineId::user("hocr")).unwrap();
        }
        state
    }

    #[test]
    fn test_to_text() {
        let state = state_with_text(&["one", "two"]);
        let text = to_text(&state, &EngineId::user("hocr")).unwrap();
        assert_eq!(text, "one\n\ntwo\n\n");
    }

    #[test]
    fn test_to_json_pretty() {
        let state = state_with_text(&["one"]);
        let json = to_json(&state, &EngineId::user("hocr"), JsonFormat::Pretty).unwrap();
        assert!(json.contains("\"engine\": \"hocr\""));
        assert!(json.contains("word_1_0"));
        assert!(json.contains('\n'));
    }

    #[test]
    fn test_to_json_compact() {
        let state = state_with_text(&["one"]);
        let json = to_json(&state, &EngineId::user("hocr"), JsonFormat::Compact).unwrap();
        assert!(!json.contains('\n'));
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["pages"].as_array().unwrap().len(), 2);
        assert!(value["pages"][1]["page"].is_null());
    }

    #[test]
    fn test_unknown_engine() {
        let state = state_with_text(&["one"]);
        assert!(matches!(
            to_text(&state, &EngineId::Lstm),
            Err(Error::UnknownEngine(_))
        ));
    }
}
