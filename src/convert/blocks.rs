//! Converter for the Tesseract block tree
//! (blocks → paragraphs → lines → words → symbols).

use serde::{Deserialize, Serialize};

use super::fonts::{determine_sans_serif, is_italic_font_name};
use super::{finish_page, ConvertParams, PageConverter, PageResult, RawFormat};
use crate::error::{Error, Result};
use crate::model::{
    BBox, Baseline, Dims, FontStyle, LayoutDataTable, LineBuilder, OcrChar, OcrPage, OcrWord,
    PageWarning, WordIdAllocator,
};

/// Box with corner coordinates, as Tesseract reports it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NativeBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl NativeBox {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    fn to_bbox(self) -> BBox {
        BBox::new(self.x0, self.y0, self.x1, self.y1)
    }
}

/// Per-row metrics of a native line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RowAttributes {
    pub row_height: f64,
    pub descenders: f64,
    pub ascenders: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NativeSymbol {
    pub text: String,
    pub bbox: NativeBox,
    #[serde(default)]
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NativeWord {
    pub text: String,
    pub bbox: NativeBox,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub font_name: Option<String>,
    /// Reported by the engine but always false; never consulted.
    #[serde(default)]
    pub is_italic: bool,
    #[serde(default)]
    pub symbols: Vec<NativeSymbol>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NativeLine {
    pub bbox: NativeBox,
    pub baseline: NativeBox,
    #[serde(rename = "rowAttributes", alias = "row_attributes", default)]
    pub row_attributes: RowAttributes,
    #[serde(default)]
    pub words: Vec<NativeWord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NativeParagraph {
    #[serde(default)]
    pub lines: Vec<NativeLine>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NativeBlock {
    #[serde(default)]
    pub bbox: NativeBox,
    #[serde(default)]
    pub paragraphs: Vec<NativeParagraph>,
}

/// Either a bare block array or an object carrying `blocks`.
#[derive(Deserialize)]
#[serde(untagged)]
enum BlocksDocument {
    Bare(Vec<NativeBlock>),
    Wrapped { blocks: Vec<NativeBlock> },
}

/// Convert a native block tree for one page.
pub fn convert_blocks(blocks: &[NativeBlock], params: &ConvertParams) -> PageResult {
    let dims = params.dims.unwrap_or_else(|| extent_of(blocks));
    let keep_italic = params.options.keep_italic;

    let mut page = OcrPage::new(params.n, dims);
    let mut ids = WordIdAllocator::new(params.n);

    for line in blocks
        .iter()
        .flat_map(|b| b.paragraphs.iter())
        .flat_map(|p| p.lines.iter())
    {
        let linebox = line.bbox.to_bbox();

        // Baseline endpoints relative to the bottom-left corner of the line box.
        let x0 = line.baseline.x0 - linebox.left;
        let x1 = line.baseline.x1 - linebox.left;
        let y0 = line.baseline.y0 - linebox.bottom;
        let y1 = line.baseline.y1 - linebox.bottom;
        let baseline = Baseline::from_points(x0, y0, x1, y1);

        let rows = &line.row_attributes;
        let x_height = rows.row_height - rows.descenders - rows.ascenders;

        let mut builder = LineBuilder::new(linebox, baseline, rows.ascenders, x_height);

        for word in &line.words {
            if word.text.trim().is_empty() {
                continue;
            }
            let Ok(mut ocr_word) = OcrWord::new(word.text.as_str(), word.bbox.to_bbox(), ids.next_id())
            else {
                continue;
            };
            ocr_word.lang = word.language.clone();
            ocr_word.conf = word.confidence;

            let font_name = word.font_name.as_deref().unwrap_or("");
            if keep_italic && is_italic_font_name(font_name) {
                ocr_word.style = FontStyle::Italic;
            }
            ocr_word.set_font(determine_sans_serif(font_name));

            ocr_word.chars = word
                .symbols
                .iter()
                .map(|s| OcrChar::new(s.text.as_str(), s.bbox.to_bbox()))
                .collect();

            builder.push_word(ocr_word);
        }

        page.push_line(builder);
    }

    log::debug!(
        "blocks: page {} -> {} lines, {} words",
        params.n,
        page.lines().len(),
        ids.issued()
    );

    finish_page(&mut page, params.rotate_angle);

    PageResult::new(page, LayoutDataTable::new(), PageWarning::none())
}

/// Page extent from the union of block boxes, for callers without dims.
fn extent_of(blocks: &[NativeBlock]) -> Dims {
    let boxes: Vec<BBox> = blocks
        .iter()
        .flat_map(|b| b.paragraphs.iter())
        .flat_map(|p| p.lines.iter())
        .map(|l| l.bbox.to_bbox())
        .collect();
    BBox::union_all(boxes.iter())
        .map(|b| Dims::new(b.right.max(0.0), b.bottom.max(0.0)))
        .unwrap_or_default()
}

fn parse_blocks(raw: &str) -> Result<Vec<NativeBlock>> {
    let doc: BlocksDocument = serde_json::from_str(raw)
        .map_err(|e| Error::malformed("blocks", e.to_string()))?;
    Ok(match doc {
        BlocksDocument::Bare(blocks) => blocks,
        BlocksDocument::Wrapped { blocks } => blocks,
    })
}

/// Block tree converter.
#[derive(Debug, Clone, Default)]
pub struct BlocksConverter {
    _private: (),
}

impl BlocksConverter {
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl PageConverter for BlocksConverter {
    fn format(&self) -> RawFormat {
        RawFormat::Blocks
    }

    fn convert(&self, raw: &str, params: &ConvertParams) -> Result<PageResult> {
        let blocks = parse_blocks(raw)?;
        Ok(convert_blocks(&blocks, params))
    }

    /// A multi-page block document is a JSON array with one block tree per
    /// page; a single tree is one page.
    fn split_pages(&self, raw: &str) -> Result<Vec<String>> {
        let value: serde_json::Value =
            serde_json::from_str(raw).map_err(|e| Error::malformed("blocks", e.to_string()))?;

        let is_page = |v: &serde_json::Value| {
            (v.is_object() && v.get("blocks").is_some())
                || v.as_array()
                    .map(|a| a.iter().all(|b| b.get("paragraphs").is_some()))
                    .unwrap_or(false)
        };

        match &value {
            serde_json::Value::Array(items) if !items.is_empty() && items.iter().all(is_page) => {
                items
                    .iter()
                    .map(|v| serde_json::to_string(v).map_err(Error::from))
                    .collect()
            }
            _ => Ok(vec![raw.to_string()]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ConvertOptions;

    fn word(text: &str, x0: f64, font: &str) -> NativeWord {
        NativeWord {
            text: text.to_string(),
            bbox: NativeBox::new(x0, 10.0, x0 + 40.0, 30.0),
            confidence: 91.0,
            language: Some("eng".to_string()),
            font_name: Some(font.to_string()),
            is_italic: false,
            symbols: text
                .chars()
                .enumerate()
                .map(|(i, c)| NativeSymbol {
                    text: c.to_string(),
                    bbox: NativeBox::new(x0 + i as f64 * 8.0, 10.0, x0 + i as f64 * 8.0 + 8.0, 30.0),
                    confidence: 91.0,
                })
                .collect(),
        }
    }

    fn line(words: Vec<NativeWord>) -> NativeLine {
        NativeLine {
            bbox: NativeBox::new(10.0, 10.0, 210.0, 30.0),
            baseline: NativeBox::new(10.0, 27.0, 210.0, 29.0),
            row_attributes: RowAttributes {
                row_height: 20.0,
                descenders: 4.0,
                ascenders: 6.0,
            },
            words,
        }
    }

    fn page(lines: Vec<NativeLine>) -> Vec<NativeBlock> {
        vec![NativeBlock {
            bbox: NativeBox::default(),
            paragraphs: vec![NativeParagraph { lines }],
        }]
    }

    #[test]
    fn test_line_geometry() {
        let blocks = page(vec![line(vec![word("Hello", 10.0, "Arial")])]);
        let result = convert_blocks(&blocks, &ConvertParams::new(0));
        let l = &result.page.lines()[0];

        assert_eq!(l.bbox, BBox::new(10.0, 10.0, 210.0, 30.0));
        // Rebased endpoints: (0, -3) and (200, -1).
        assert!((l.baseline.slope - 0.01).abs() < 1e-12);
        assert!((l.baseline.intercept + 3.0).abs() < 1e-12);
        assert_eq!(l.asc_height, 6.0);
        assert_eq!(l.x_height, 10.0);
    }

    #[test]
    fn test_blank_words_skipped_without_gaps() {
        let blocks = page(vec![line(vec![
            word("Hello", 10.0, "Arial"),
            word("  ", 60.0, "Arial"),
            word("World", 110.0, "Arial"),
        ])]);
        let result = convert_blocks(&blocks, &ConvertParams::new(0));
        let ids: Vec<&str> = result.page.words().map(|w| w.id.as_str()).collect();
        assert_eq!(ids, vec!["word_1_0", "word_1_1"]);
    }

    #[test]
    fn test_empty_line_dropped_and_ids_continue() {
        let blocks = page(vec![
            line(vec![word("A", 10.0, "Arial")]),
            line(vec![word(" ", 10.0, "Arial")]),
            line(vec![word("B", 10.0, "Arial")]),
        ]);
        let result = convert_blocks(&blocks, &ConvertParams::new(2));
        assert_eq!(result.page.lines().len(), 2);
        let ids: Vec<&str> = result.page.words().map(|w| w.id.as_str()).collect();
        assert_eq!(ids, vec!["word_3_0", "word_3_1"]);
    }

    #[test]
    fn test_italic_requires_request_and_font_name() {
        let blocks = page(vec![line(vec![
            word("slanted", 10.0, "Times_New_Roman_Italic"),
            word("upright", 60.0, "Times_New_Roman"),
        ])]);

        let plain = convert_blocks(&blocks, &ConvertParams::new(0));
        assert!(plain.page.words().all(|w| !w.is_italic()));

        let params =
            ConvertParams::new(0).with_options(ConvertOptions::new().with_keep_italic(true));
        let kept = convert_blocks(&blocks, &params);
        let styles: Vec<bool> = kept.page.words().map(|w| w.is_italic()).collect();
        assert_eq!(styles, vec![true, false]);
    }

    #[test]
    fn test_font_family_and_chars() {
        let blocks = page(vec![line(vec![
            word("serif", 10.0, "Times_New_Roman"),
            word("odd", 60.0, "Wingdings"),
        ])]);
        let result = convert_blocks(&blocks, &ConvertParams::new(0));
        let words: Vec<&OcrWord> = result.page.words().collect();
        assert_eq!(words[0].font, Some(crate::model::FontFamily::Serif));
        assert_eq!(words[1].font, None);
        assert_eq!(words[0].chars.len(), 5);
        assert_eq!(words[0].chars[1].text, "e");
        assert_eq!(words[0].chars[1].bbox.left, 18.0);
        assert_eq!(words[0].lang.as_deref(), Some("eng"));
        assert_eq!(words[0].conf, 91.0);
    }

    #[test]
    fn test_vertical_baseline_tolerated() {
        let mut l = line(vec![word("x", 10.0, "Arial")]);
        l.baseline = NativeBox::new(50.0, 12.0, 50.0, 28.0);
        let result = convert_blocks(&page(vec![l]), &ConvertParams::new(0));
        assert!(result.page.lines()[0].baseline.is_degenerate());
    }

    #[test]
    fn test_rotation_recorded_and_dims_fallback() {
        let blocks = page(vec![line(vec![word("x", 10.0, "Arial")])]);
        let result = convert_blocks(&blocks, &ConvertParams::new(0).with_rotate_angle(1.5));
        assert_eq!(result.page.angle, 1.5);
        assert_eq!(result.page.dims, Dims::new(210.0, 30.0));
        assert!(result.layout.is_empty());
        assert!(result.warning.is_empty());
        assert!(result.lang_set.contains("eng"));
    }

    #[test]
    fn test_parse_wrapped_and_bare() {
        let json = serde_json::to_string(&page(vec![line(vec![word("x", 10.0, "Arial")])])).unwrap();
        let converter = BlocksConverter::new();
        let bare = converter.convert(&json, &ConvertParams::new(0)).unwrap();
        let wrapped = converter
            .convert(&format!("{{\"blocks\": {}}}", json), &ConvertParams::new(0))
            .unwrap();
        assert_eq!(bare.page, wrapped.page);

        assert!(matches!(
            converter.convert("{not json", &ConvertParams::new(0)),
            Err(Error::Malformed { format: "blocks", .. })
        ));
    }

    #[test]
    fn test_split_pages() {
        let one = serde_json::to_string(&page(vec![line(vec![word("x", 10.0, "Arial")])])).unwrap();
        let converter = BlocksConverter::new();
        assert_eq!(converter.split_pages(&one).unwrap().len(), 1);

        let two = format!("[{{\"blocks\": {one}}}, {{\"blocks\": {one}}}]");
        assert_eq!(converter.split_pages(&two).unwrap().len(), 2);
    }
}
