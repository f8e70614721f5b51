//! mupdf structured text (`stext`) converter.
//!
//! Input is what `mutool draw -F stext` writes: `page` > `block` > `line` >
//! `font` > `char`, with page geometry in points. Each char carries its
//! origin (`x`, `y`) and a quad of four corner points.

use super::fonts::{determine_sans_serif, is_italic_font_name};
use roxmltree::Node;

use super::markup::{attr_f64, is_element, numbers, parse_xml, split_xml_pages};
use super::{estimate_line_metrics, finish_page, ConvertParams, PageConverter, PageResult, RawFormat};
use crate::error::{Error, Result};
use crate::model::{
    BBox, Baseline, CharWarning, Dims, FontStyle, LayoutDataTable, LineBuilder, OcrChar, OcrPage,
    OcrWord, PageWarning, WordIdAllocator,
};

const FORMAT: &str = "stext";

struct Glyph<'a> {
    text: &'a str,
    bbox: Option<BBox>,
    origin: Option<(f64, f64)>,
    font: &'a str,
}

fn collect_glyphs<'a>(e: Node<'a, '_>, font: &'a str, scale: f64, out: &mut Vec<Glyph<'a>>) {
    for child in e.children().filter(Node::is_element) {
        match child.tag_name().name() {
            "font" | "span" => {
                let name = child
                    .attribute("name")
                    .or(child.attribute("font"))
                    .unwrap_or(font);
                collect_glyphs(child, name, scale, out);
            }
            "char" => {
                let bbox = child
                    .attribute("quad")
                    .and_then(numbers)
                    .and_then(|q| quad_bbox(&q))
                    .or_else(|| {
                        child
                            .attribute("bbox")
                            .and_then(numbers)
                            .and_then(|b| match b.as_slice() {
                                [l, t, r, b] => Some(BBox::new(*l, *t, *r, *b)),
                                _ => None,
                            })
                    })
                    .map(|b| scale_box(&b, scale));
                let origin = match (attr_f64(child, "x"), attr_f64(child, "y")) {
                    (Some(x), Some(y)) => Some((x * scale, y * scale)),
                    _ => None,
                };
                out.push(Glyph {
                    text: child.attribute("c").unwrap_or(""),
                    bbox,
                    origin,
                    font,
                });
            }
            _ => collect_glyphs(child, font, scale, out),
        }
    }
}

fn quad_bbox(q: &[f64]) -> Option<BBox> {
    if q.len() != 8 {
        return None;
    }
    let xs = [q[0], q[2], q[4], q[6]];
    let ys = [q[1], q[3], q[5], q[7]];
    let min = |v: &[f64]| v.iter().copied().fold(f64::INFINITY, f64::min);
    let max = |v: &[f64]| v.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Some(BBox::new(min(&xs[..]), min(&ys[..]), max(&xs[..]), max(&ys[..])))
}

fn scale_box(b: &BBox, scale: f64) -> BBox {
    BBox::new(b.left * scale, b.top * scale, b.right * scale, b.bottom * scale)
}

struct PageBuild<'p> {
    params: &'p ConvertParams,
    ids: WordIdAllocator,
    glyphs: usize,
    invalid: usize,
}

impl PageBuild<'_> {
    fn finish_word(&mut self, glyphs: &[Glyph<'_>], line: &mut LineBuilder) -> Result<()> {
        let text: String = glyphs.iter().map(|g| g.text).collect();
        if text.trim().is_empty() {
            return Ok(());
        }
        let boxes: Vec<BBox> = glyphs.iter().filter_map(|g| g.bbox).collect();
        let bbox = BBox::union_all(boxes.iter()).unwrap_or(*line.bbox());

        let mut word = OcrWord::new(text, bbox, self.ids.next_id())?;
        // Born-digital text: no recognition uncertainty.
        word.conf = 100.0;

        let font = glyphs[0].font;
        let keep_italic = self.params.options.keep_italic || self.params.options.scribe_mode;
        if keep_italic && is_italic_font_name(font) {
            word.style = FontStyle::Italic;
        }
        word.set_font(determine_sans_serif(font));

        for g in glyphs {
            if let Some(b) = g.bbox {
                word.chars.push(OcrChar::new(g.text, b));
            }
        }
        line.push_word(word);
        Ok(())
    }

    fn convert_line(&mut self, e: Node<'_, '_>, scale: f64) -> Result<LineBuilder> {
        let mut glyphs = Vec::new();
        collect_glyphs(e, "", scale, &mut glyphs);

        let char_boxes: Vec<BBox> = glyphs.iter().filter_map(|g| g.bbox).collect();
        let linebox = e
            .attribute("bbox")
            .and_then(numbers)
            .and_then(|b| match b.as_slice() {
                [l, t, r, b] => Some(scale_box(&BBox::new(*l, *t, *r, *b), scale)),
                _ => None,
            })
            .or_else(|| BBox::union_all(char_boxes.iter()))
            .ok_or_else(|| Error::malformed(FORMAT, "line without bbox"))?;

        // `dir` is the unit writing direction; the first origin anchors it.
        let (x, y) = glyphs
            .iter()
            .find_map(|g| g.origin)
            .unwrap_or((linebox.left, linebox.bottom));
        let (dx, dy) = e
            .attribute("dir")
            .and_then(numbers)
            .and_then(|d| match d.as_slice() {
                [dx, dy] => Some((*dx, *dy)),
                _ => None,
            })
            .unwrap_or((1.0, 0.0));
        let (x0, y0) = (x - linebox.left, y - linebox.bottom);
        let baseline = Baseline::from_points(x0, y0, x0 + dx, y0 + dy);

        let (asc_height, x_height) = estimate_line_metrics(
            glyphs
                .iter()
                .filter_map(|g| g.bbox.as_ref().map(|b| (g.text, b))),
            y,
        );

        let mut line = LineBuilder::new(linebox, baseline, asc_height, x_height);
        let mut start = 0;
        for (i, g) in glyphs.iter().enumerate() {
            self.glyphs += 1;
            if g.bbox.is_none() {
                self.invalid += 1;
            }
            if g.text.trim().is_empty() {
                self.finish_word(&glyphs[start..i], &mut line)?;
                start = i + 1;
            }
        }
        self.finish_word(&glyphs[start..], &mut line)?;
        Ok(line)
    }
}

fn convert_page(raw: &str, params: &ConvertParams) -> Result<PageResult> {
    let doc = parse_xml(raw, FORMAT)?;
    let page_elem = doc
        .descendants()
        .find(|n| is_element(*n, "page"))
        .ok_or_else(|| Error::malformed(FORMAT, "no page element"))?;

    let native = match (attr_f64(page_elem, "width"), attr_f64(page_elem, "height")) {
        (Some(w), Some(h)) if w > 0.0 && h > 0.0 => Dims::new(w, h),
        _ => return Err(Error::malformed(FORMAT, "page without width/height")),
    };
    // Rescale from points to the caller's pixel space when it is known.
    let (dims, scale) = match params.dims {
        Some(dims) => (dims, dims.width / native.width),
        None => (native, 1.0),
    };

    let mut page = OcrPage::new(params.n, dims);
    let mut build = PageBuild {
        params,
        ids: WordIdAllocator::new(params.n),
        glyphs: 0,
        invalid: 0,
    };

    let lines = page_elem.descendants().filter(|n| is_element(*n, "line"));
    for line in lines {
        let builder = build.convert_line(line, scale)?;
        page.push_line(builder);
    }

    log::debug!(
        "stext: page {} -> {} lines, {} words (scale {:.3})",
        params.n,
        page.lines().len(),
        build.ids.issued(),
        scale
    );

    let warning = if build.invalid > 0 && build.invalid == build.glyphs {
        PageWarning::char(CharWarning::Missing)
    } else if build.invalid > 0 {
        PageWarning::char(CharWarning::Invalid)
    } else {
        PageWarning::none()
    };

    finish_page(&mut page, params.rotate_angle);
    Ok(PageResult::new(page, LayoutDataTable::new(), warning))
}

/// mupdf stext converter.
#[derive(Debug, Clone, Default)]
pub struct StextConverter {
    _private: (),
}

impl StextConverter {
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl PageConverter for StextConverter {
    fn format(&self) -> RawFormat {
        RawFormat::Stext
    }

    fn convert(&self, raw: &str, params: &ConvertParams) -> Result<PageResult> {
        convert_page(raw, params)
    }

    fn split_pages(&self, raw: &str) -> Result<Vec<String>> {
        split_xml_pages(raw, FORMAT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FontFamily;
    use crate::options::ConvertOptions;

    fn chars(text: &str, x: f64) -> String {
        text.chars()
            .enumerate()
            .map(|(i, c)| {
                let l = x + i as f64 * 6.0;
                let t = if "bdfhklt".contains(c) { 90.0 } else { 93.0 };
                format!(
                    "<char quad=\"{l} {t} {r} {t} {l} 100 {r} 100\" x=\"{l}\" y=\"98\" color=\"#000000\" c=\"{c}\"/>",
                    l = l,
                    r = l + 6.0,
                    t = t,
                    c = c
                )
            })
            .collect()
    }

    fn page() -> String {
        format!(
            r#"<?xml version="1.0"?>
<document name="doc.pdf">
{}
</document>"#,
            page_body()
        )
    }

    fn page_body() -> String {
        format!(
            r#"<page id="page1" width="612" height="792">
<block bbox="72 88 300 100">
<line bbox="72 88 300 100" wmode="0" dir="1 0">
<font name="Helvetica-Oblique" size="12">{}<char quad="102 90 108 90 102 100 108 100" x="102" y="98" c=" "/></font>
<font name="Times-Roman" size="12">{}</font>
</line>
</block>
</page>"#,
            chars("hello", 72.0),
            chars("world", 108.0)
        )
    }

    #[test]
    fn test_convert_page() {
        let result = StextConverter::new().convert(&page(), &ConvertParams::new(0)).unwrap();
        let page = &result.page;
        assert_eq!(page.dims, Dims::new(612.0, 792.0));

        let words: Vec<&OcrWord> = page.words().collect();
        assert_eq!(words.len(), 2);
        assert_eq!(words[0].text(), "hello");
        assert_eq!(words[1].id, "word_1_1");
        assert_eq!(words[0].bbox, BBox::new(72.0, 90.0, 102.0, 100.0));
        assert_eq!(words[0].chars.len(), 5);
        assert_eq!(words[0].conf, 100.0);
        assert_eq!(words[0].font, Some(FontFamily::SansSerif));
        assert_eq!(words[1].font, Some(FontFamily::Serif));
        assert!(!words[0].is_italic());

        let line = &page.lines()[0];
        assert_eq!(line.baseline, Baseline::new(0.0, -2.0));
        assert_eq!(line.x_height, 5.0);
        assert_eq!(line.asc_height, 3.0);
        assert!(result.warning.is_empty());
        assert!(result.layout.is_empty());
    }

    #[test]
    fn test_italic_font_when_requested() {
        let params = ConvertParams::new(0).with_options(ConvertOptions::new().with_keep_italic(true));
        let result = StextConverter::new().convert(&page(), &params).unwrap();
        assert!(result.page.word("word_1_0").unwrap().is_italic());
        assert!(!result.page.word("word_1_1").unwrap().is_italic());
    }

    #[test]
    fn test_scaled_to_pixels() {
        let params = ConvertParams::new(0).with_dims(Dims::new(1224.0, 1584.0));
        let result = StextConverter::new().convert(&page(), &params).unwrap();
        let word = result.page.word("word_1_0").unwrap();
        assert_eq!(word.bbox, BBox::new(144.0, 180.0, 204.0, 200.0));
        assert_eq!(result.page.lines()[0].bbox, BBox::new(144.0, 176.0, 600.0, 200.0));
    }

    #[test]
    fn test_sloped_line() {
        let raw = "<page width='100' height='100'><line bbox='0 0 100 20' dir='0.9950 0.0998'>\
            <font name='x'><char quad='10 0 20 0 10 10 20 10' x='10' y='10' c='a'/></font></line></page>";
        let result = StextConverter::new().convert(raw, &ConvertParams::new(0)).unwrap();
        let baseline = result.page.lines()[0].baseline;
        assert!((baseline.slope - 0.0998 / 0.9950).abs() < 1e-12);
        // Passes through the char origin in line-local coordinates.
        assert!((baseline.y_at(10.0) - (10.0 - 20.0)).abs() < 1e-9);
    }

    #[test]
    fn test_vertical_line_keeps_finite_baseline() {
        let raw = "<page width='100' height='100'><line bbox='40 10 60 90' dir='0 1'>\
            <font name='x'><char quad='40 10 60 10 40 30 60 30' x='50' y='20' c='a'/></font></line></page>";
        let result = StextConverter::new().convert(raw, &ConvertParams::new(0)).unwrap();
        let line = &result.page.lines()[0];
        assert!(line.baseline.slope.is_finite());
        assert!(line.baseline.intercept.is_finite());
        assert_eq!(line.baseline.intercept, 20.0 - 90.0);

        let json = serde_json::to_string(&result.page).unwrap();
        let back: OcrPage = serde_json::from_str(&json).unwrap();
        assert_eq!(back.lines()[0].baseline, line.baseline);
    }

    #[test]
    fn test_missing_page_size() {
        assert!(StextConverter::new()
            .convert("<page><line/></page>", &ConvertParams::new(0))
            .is_err());
    }

    #[test]
    fn test_split_pages() {
        let doc = format!("<document>{}<page width='1' height='1'></page></document>", page_body());
        let pages = StextConverter::new().split_pages(&doc).unwrap();
        assert_eq!(pages.len(), 2);
        let empty = StextConverter::new().convert(&pages[1], &ConvertParams::new(1)).unwrap();
        assert!(empty.page.is_empty());
    }
}
