//! Font name heuristics.
//!
//! Engines report a font name per word but their style flags are not
//! trustworthy, so italic and family are inferred from the name itself.

use std::sync::OnceLock;

use regex::Regex;

use crate::model::FontFamily;

fn italic_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)italic|oblique").expect("valid regex"))
}

fn sans_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)sans|arial|helvetica|verdana|calibri|tahoma|trebuchet|futura|franklin|segoe|roboto|carlito|nimbus ?sans|liberation ?sans|dejavu ?sans|frutiger|myriad",
        )
        .expect("valid regex")
    })
}

fn serif_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)serif|times|georgia|garamond|cambria|caladea|century|palatino|baskerville|bookman|book ?antiqua|minion|nimbus ?rom|liberation ?serif|dejavu ?serif|courier|schoolbook|roman",
        )
        .expect("valid regex")
    })
}

/// Whether a font name denotes an italic face.
pub fn is_italic_font_name(font_name: &str) -> bool {
    italic_pattern().is_match(font_name)
}

/// Classify a font name as serif, sans-serif, or unknown (`Default`).
///
/// Sans patterns are checked first so names like "Microsoft Sans Serif"
/// classify as sans.
pub fn determine_sans_serif(font_name: &str) -> FontFamily {
    let name = font_name.trim();
    if name.is_empty() {
        return FontFamily::Default;
    }
    if sans_pattern().is_match(name) {
        FontFamily::SansSerif
    } else if serif_pattern().is_match(name) {
        FontFamily::Serif
    } else {
        FontFamily::Default
    }
}
