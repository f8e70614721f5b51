//! ABBYY FineReader XML converter.
//!
//! Character-level format: every glyph is a `charParams` element with its
//! own box, grouped under `formatting` runs inside each `line`. Words are
//! rebuilt by splitting the character stream on whitespace.

use super::fonts::{determine_sans_serif, is_italic_font_name};
use roxmltree::Node;

use super::markup::{attr_f64, is_element, parse_xml, split_xml_pages, text};
use super::{estimate_line_metrics, finish_page, ConvertParams, PageConverter, PageResult, RawFormat};
use crate::error::{Error, Result};
use crate::model::{
    BBox, Baseline, CharWarning, Dims, FontStyle, LayoutDataTable, LayoutTable, LineBuilder,
    OcrChar, OcrPage, OcrWord, PageWarning, WordIdAllocator,
};

const FORMAT: &str = "abbyy";

/// Map an ABBYY language name to a Tesseract language code.
pub(crate) fn lang_code(name: &str) -> String {
    let code = match name {
        n if n.starts_with("English") => "eng",
        n if n.starts_with("German") => "deu",
        n if n.starts_with("French") => "fra",
        n if n.starts_with("Spanish") => "spa",
        n if n.starts_with("Italian") => "ita",
        n if n.starts_with("Portuguese") => "por",
        n if n.starts_with("Dutch") => "nld",
        "Russian" | "RussianOldSpelling" => "rus",
        "Ukrainian" => "ukr",
        "Greek" => "ell",
        "Polish" => "pol",
        "Czech" => "ces",
        "Latin" => "lat",
        "ChinesePRC" => "chi_sim",
        "ChineseTaiwan" => "chi_tra",
        "Japanese" => "jpn",
        "Korean" => "kor",
        _ => {
            log::warn!("abbyy: unrecognized language {:?}", name);
            return name.to_lowercase();
        }
    };
    code.to_string()
}

fn ltrb(e: Node<'_, '_>) -> Option<BBox> {
    Some(BBox::new(
        attr_f64(e, "l")?,
        attr_f64(e, "t")?,
        attr_f64(e, "r")?,
        attr_f64(e, "b")?,
    ))
}

/// Matching descendants, not descending into matches.
fn outermost<'a, 'i>(e: Node<'a, 'i>, name: &'a str) -> impl Iterator<Item = Node<'a, 'i>> + 'a {
    e.descendants()
        .skip(1)
        .filter(move |n| is_element(*n, name))
        .filter(move |n| {
            !n.ancestors()
                .skip(1)
                .take_while(|a| *a != e)
                .any(|a| is_element(a, name))
        })
}

/// Formatting run attributes applied to the characters under it.
#[derive(Clone, Default)]
struct Format<'a> {
    lang: Option<&'a str>,
    font: &'a str,
    italic: bool,
    small_caps: bool,
}

impl<'a> Format<'a> {
    fn from_element(e: Node<'a, '_>) -> Self {
        let flag = |name: &str| {
            e.attribute(name)
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false)
        };
        Self {
            lang: e.attribute("lang"),
            font: e.attribute("ff").unwrap_or(""),
            italic: flag("italic"),
            small_caps: flag("smallcaps"),
        }
    }
}

struct Glyph<'a> {
    text: String,
    bbox: Option<BBox>,
    conf: Option<f64>,
    format: Format<'a>,
}

fn collect_glyphs<'a>(e: Node<'a, '_>, format: &Format<'a>, out: &mut Vec<Glyph<'a>>) {
    for child in e.children().filter(Node::is_element) {
        match child.tag_name().name() {
            "formatting" => collect_glyphs(child, &Format::from_element(child), out),
            "charParams" => out.push(Glyph {
                text: text(child),
                bbox: ltrb(child),
                conf: attr_f64(child, "charConfidence"),
                format: format.clone(),
            }),
            _ => collect_glyphs(child, format, out),
        }
    }
}

/// Word under construction from consecutive non-space glyphs.
#[derive(Default)]
struct PendingWord<'a> {
    glyphs: Vec<Glyph<'a>>,
}

impl<'a> PendingWord<'a> {
    fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }
}

struct PageBuild<'p> {
    params: &'p ConvertParams,
    ids: WordIdAllocator,
    glyphs: usize,
    invalid: usize,
}

impl PageBuild<'_> {
    fn finish_word(&mut self, pending: PendingWord<'_>, line: &mut LineBuilder) -> Result<()> {
        let text: String = pending.glyphs.iter().map(|g| g.text.as_str()).collect();
        if text.trim().is_empty() {
            return Ok(());
        }

        let boxes: Vec<BBox> = pending.glyphs.iter().filter_map(|g| g.bbox).collect();
        let bbox = BBox::union_all(boxes.iter()).unwrap_or(*line.bbox());

        let mut word = OcrWord::new(text, bbox, self.ids.next_id())?;
        word.conf = pending
            .glyphs
            .iter()
            .filter_map(|g| g.conf)
            .fold(None, |acc: Option<f64>, c| Some(acc.map_or(c, |a| a.min(c))))
            .unwrap_or(0.0);

        let format = &pending.glyphs[0].format;
        word.lang = format.lang.map(lang_code);
        let keep_italic = self.params.options.keep_italic || self.params.options.scribe_mode;
        if format.small_caps {
            word.style = FontStyle::SmallCaps;
        } else if keep_italic && (format.italic || is_italic_font_name(format.font)) {
            word.style = FontStyle::Italic;
        }
        word.set_font(determine_sans_serif(format.font));

        for g in &pending.glyphs {
            if let Some(b) = g.bbox {
                word.chars.push(OcrChar::new(g.text.clone(), b));
            }
        }

        line.push_word(word);
        Ok(())
    }

    fn convert_line(&mut self, e: Node<'_, '_>) -> Result<LineBuilder> {
        let mut glyphs = Vec::new();
        collect_glyphs(e, &Format::default(), &mut glyphs);

        let char_boxes: Vec<BBox> = glyphs.iter().filter_map(|g| g.bbox).collect();
        let linebox = ltrb(e)
            .or_else(|| BBox::union_all(char_boxes.iter()))
            .ok_or_else(|| Error::malformed(FORMAT, "line without coordinates"))?;

        // The baseline attribute is the absolute y of a horizontal baseline.
        let baseline_y = attr_f64(e, "baseline").unwrap_or(linebox.bottom);
        let baseline = Baseline::new(0.0, baseline_y - linebox.bottom);
        let (asc_height, x_height) = estimate_line_metrics(
            glyphs
                .iter()
                .filter_map(|g| g.bbox.as_ref().map(|b| (g.text.as_str(), b))),
            baseline_y,
        );

        let mut line = LineBuilder::new(linebox, baseline, asc_height, x_height);
        let mut pending = PendingWord::default();
        for glyph in glyphs {
            self.glyphs += 1;
            if glyph.bbox.is_none() {
                self.invalid += 1;
            }
            if glyph.text.trim().is_empty() {
                if !pending.is_empty() {
                    self.finish_word(std::mem::take(&mut pending), &mut line)?;
                }
                continue;
            }
            pending.glyphs.push(glyph);
        }
        if !pending.is_empty() {
            self.finish_word(pending, &mut line)?;
        }
        Ok(line)
    }

    fn warning(&self) -> PageWarning {
        if self.invalid > 0 && self.invalid == self.glyphs {
            PageWarning::char(CharWarning::Missing)
        } else if self.invalid > 0 {
            PageWarning::char(CharWarning::Invalid)
        } else {
            PageWarning::none()
        }
    }
}

fn convert_page(raw: &str, params: &ConvertParams) -> Result<PageResult> {
    let doc = parse_xml(raw, FORMAT)?;
    let page_elem = doc
        .descendants()
        .find(|n| is_element(*n, "page"))
        .ok_or_else(|| Error::malformed(FORMAT, "no page element"))?;

    let dims = match params.dims {
        Some(dims) => dims,
        None => match (attr_f64(page_elem, "width"), attr_f64(page_elem, "height")) {
            (Some(w), Some(h)) => Dims::new(w, h),
            _ => return Err(Error::malformed(FORMAT, "page without width/height")),
        },
    };

    let mut page = OcrPage::new(params.n, dims);
    let mut layout = LayoutDataTable::new();
    let mut build = PageBuild {
        params,
        ids: WordIdAllocator::new(params.n),
        glyphs: 0,
        invalid: 0,
    };

    for block in outermost(page_elem, "block") {
        if block.attribute("blockType") == Some("Table") {
            if let Some(bbox) = ltrb(block) {
                let mut table = LayoutTable::new(bbox);
                // Column boxes come from the first row's cells.
                if let Some(row) = block.descendants().find(|n| is_element(*n, "row")) {
                    table.columns = row
                        .children()
                        .filter(|c| is_element(*c, "cell"))
                        .filter_map(ltrb)
                        .collect();
                }
                layout.add_table(table);
            }
        }

        for line in outermost(block, "line") {
            let builder = build.convert_line(line)?;
            page.push_line(builder);
        }
    }

    log::debug!(
        "abbyy: page {} -> {} lines, {} words",
        params.n,
        page.lines().len(),
        build.ids.issued()
    );

    let warning = build.warning();
    finish_page(&mut page, params.rotate_angle);
    Ok(PageResult::new(page, layout, warning))
}

/// ABBYY FineReader XML converter.
#[derive(Debug, Clone, Default)]
pub struct AbbyyConverter {
    _private: (),
}

impl AbbyyConverter {
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl PageConverter for AbbyyConverter {
    fn format(&self) -> RawFormat {
        RawFormat::Abbyy
    }

    fn convert(&self, raw: &str, params: &ConvertParams) -> Result<PageResult> {
        convert_page(raw, params)
    }

    fn split_pages(&self, raw: &str) -> Result<Vec<String>> {
        split_xml_pages(raw, FORMAT)
    }
}
