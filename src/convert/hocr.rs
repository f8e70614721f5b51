//! hOCR converter.

use scraper::{ElementRef, Html, Selector};

use super::fonts::{determine_sans_serif, is_italic_font_name};
use super::markup::{numbers, title_properties};
use super::{finish_page, ConvertParams, PageConverter, PageResult, RawFormat};
use crate::error::{Error, Result};
use crate::model::{
    BBox, Baseline, CharWarning, Dims, FontStyle, LayoutDataTable, LayoutTable, LineBuilder,
    OcrChar, OcrPage, OcrWord, PageWarning, WordIdAllocator,
};

const FORMAT: &str = "hocr";

/// Selectors for the hOCR classes the converter reads.
struct Selectors {
    page: Selector,
    line: Selector,
    word: Selector,
    cinfo: Selector,
    table: Selector,
    italic: Selector,
}

impl Selectors {
    fn new() -> Result<Self> {
        Ok(Self {
            page: selector(".ocr_page")?,
            line: selector(".ocr_line, .ocr_textfloat, .ocr_header, .ocr_caption")?,
            word: selector(".ocrx_word")?,
            cinfo: selector(".ocrx_cinfo")?,
            table: selector(".ocr_table")?,
            italic: selector("em, i")?,
        })
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| Error::Other(format!("invalid selector {css}: {e:?}")))
}

fn title_of<'a>(e: ElementRef<'a>) -> &'a str {
    e.value().attr("title").unwrap_or("")
}

fn bbox_of(e: ElementRef<'_>) -> Option<BBox> {
    let props = title_properties(e.value().attr("title")?);
    match numbers(props.get("bbox")?)?.as_slice() {
        [l, t, r, b] => Some(BBox::new(*l, *t, *r, *b)),
        _ => None,
    }
}

/// `lang` of the element or its closest ancestor that has one.
fn inherited_lang<'a>(e: ElementRef<'a>) -> Option<&'a str> {
    e.value().attr("lang").or_else(|| {
        e.ancestors()
            .filter_map(ElementRef::wrap)
            .find_map(|a| a.value().attr("lang"))
    })
}

fn text_of(e: ElementRef<'_>) -> String {
    e.text().collect()
}

#[derive(Default)]
struct CharStats {
    words: usize,
    with_chars: usize,
    invalid: usize,
}

impl CharStats {
    fn warning(&self) -> PageWarning {
        if self.invalid > 0 {
            PageWarning::char(CharWarning::Invalid)
        } else if self.words > 0 && self.with_chars == 0 {
            PageWarning::char(CharWarning::Missing)
        } else {
            PageWarning::none()
        }
    }
}

fn convert_page(raw: &str, params: &ConvertParams) -> Result<PageResult> {
    let sel = Selectors::new()?;
    let html = Html::parse_document(raw);
    let page_elem = html
        .select(&sel.page)
        .next()
        .ok_or_else(|| Error::malformed(FORMAT, "no ocr_page element"))?;

    let dims = match params.dims {
        Some(dims) => dims,
        None => bbox_of(page_elem)
            .map(|b| Dims::new(b.right, b.bottom))
            .ok_or_else(|| Error::malformed(FORMAT, "ocr_page has no bbox"))?,
    };

    // Data written by this library marks italics reliably.
    let keep_italic = params.options.keep_italic || params.options.scribe_mode;

    let mut page = OcrPage::new(params.n, dims);
    let mut ids = WordIdAllocator::new(params.n);
    let mut stats = CharStats::default();

    for line in page_elem.select(&sel.line) {
        let linebox =
            bbox_of(line).ok_or_else(|| Error::malformed(FORMAT, "line without bbox"))?;
        let line_lang = inherited_lang(line);

        let props = title_properties(title_of(line));
        let number = |key: &str| {
            props
                .get(key)
                .and_then(|v| numbers(v))
                .and_then(|v| v.first().copied())
        };

        let baseline = props
            .get("baseline")
            .and_then(|v| numbers(v))
            .and_then(|v| match v.as_slice() {
                [slope, intercept] => Some(Baseline::new(*slope, *intercept)),
                _ => None,
            })
            .unwrap_or_default();

        let asc_height = number("x_ascenders").unwrap_or(0.0);
        let x_height = match number("x_size") {
            Some(size) => size - number("x_descenders").unwrap_or(0.0) - asc_height,
            None => 0.0,
        };

        let mut builder = LineBuilder::new(linebox, baseline, asc_height, x_height);

        for word_elem in line.select(&sel.word) {
            let text = text_of(word_elem);
            if text.trim().is_empty() {
                continue;
            }
            let bbox =
                bbox_of(word_elem).ok_or_else(|| Error::malformed(FORMAT, "word without bbox"))?;
            let mut word = OcrWord::new(text.trim(), bbox, ids.next_id())?;

            let word_props = title_properties(title_of(word_elem));
            word.conf = word_props
                .get("x_wconf")
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.0);
            word.lang = word_elem
                .value()
                .attr("lang")
                .or(line_lang)
                .map(str::to_string);

            let font_name = word_props
                .get("x_font")
                .map(|f| f.trim_matches('"'))
                .unwrap_or("");
            let italic_markup = word_elem.select(&sel.italic).next().is_some();
            if keep_italic && (italic_markup || is_italic_font_name(font_name)) {
                word.style = FontStyle::Italic;
            }
            let small_caps = word_elem
                .value()
                .attr("style")
                .map(|s| s.contains("small-caps"))
                .unwrap_or(false);
            if small_caps {
                word.style = FontStyle::SmallCaps;
            }
            word.set_font(determine_sans_serif(font_name));

            stats.words += 1;
            let mut has_chars = false;
            for c in word_elem.select(&sel.cinfo) {
                has_chars = true;
                let char_box = c
                    .value()
                    .attr("title")
                    .map(title_properties)
                    .and_then(|p| p.get("x_bboxes").and_then(|v| numbers(v)))
                    .and_then(|v| match v.as_slice() {
                        [l, t, r, b] => Some(BBox::new(*l, *t, *r, *b)),
                        _ => None,
                    });
                match char_box {
                    Some(bbox) => word.chars.push(OcrChar::new(text_of(c), bbox)),
                    None => {
                        log::warn!("hocr: skipping char without x_bboxes in {}", word.id);
                        stats.invalid += 1;
                    }
                }
            }
            if has_chars {
                stats.with_chars += 1;
            }

            builder.push_word(word);
        }

        page.push_line(builder);
    }

    let mut layout = LayoutDataTable::new();
    for table in page_elem.select(&sel.table) {
        if let Some(bbox) = bbox_of(table) {
            layout.add_table(LayoutTable::new(bbox));
        }
    }

    let rotate_angle = if params.rotate_angle != 0.0 {
        params.rotate_angle
    } else {
        // Scribe output records the rotation on the page itself.
        title_properties(title_of(page_elem))
            .get("textangle")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0.0)
    };

    log::debug!(
        "hocr: page {} -> {} lines, {} words",
        params.n,
        page.lines().len(),
        ids.issued()
    );

    finish_page(&mut page, rotate_angle);
    Ok(PageResult::new(page, layout, stats.warning()))
}

/// hOCR converter.
#[derive(Debug, Clone, Default)]
pub struct HocrConverter {
    _private: (),
}

impl HocrConverter {
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl PageConverter for HocrConverter {
    fn format(&self) -> RawFormat {
        RawFormat::Hocr
    }

    fn convert(&self, raw: &str, params: &ConvertParams) -> Result<PageResult> {
        convert_page(raw, params)
    }

    /// Each `ocr_page` element becomes its own page, serialized back to
    /// markup so it parses on its own.
    fn split_pages(&self, raw: &str) -> Result<Vec<String>> {
        let page = selector(".ocr_page")?;
        let html = Html::parse_document(raw);
        let pages: Vec<String> = html.select(&page).map(|e| e.html()).collect();
        if pages.is_empty() {
            return Err(Error::malformed(FORMAT, "no ocr_page element"));
        }
        Ok(pages)
    }
}
