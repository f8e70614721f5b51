//! Narrow interfaces to the collaborators that merge and orchestration
//! notify: font loading, the page viewer, progress reporting and the
//! warning check.
//!
//! All methods take `&self`; implementations that record state use interior
//! mutability. [`Headless`] implements every trait as a no-op for batch use.

use std::collections::BTreeSet;

use crate::engine::EngineId;
use crate::error::Result;
use crate::model::PageWarning;

/// Glyph sets that must be loaded before a page using them is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FontSet {
    /// Simplified Chinese glyphs
    ChiSim,
    /// Full built-in fonts, including Cyrillic and Greek
    Extended,
}

impl FontSet {
    /// Font sets required to display text in the given languages.
    pub fn required_for(langs: &BTreeSet<String>) -> Vec<FontSet> {
        let mut sets = Vec::new();
        if langs.contains("chi_sim") {
            sets.push(FontSet::ChiSim);
        }
        if langs.contains("rus") || langs.contains("ell") {
            sets.push(FontSet::Extended);
        }
        sets
    }
}

/// Loads font resources. Loading an already loaded set must be cheap.
pub trait FontLoader {
    fn load(&self, set: FontSet) -> Result<()>;
}

/// The page viewer.
pub trait Viewer {
    /// Page index currently on screen.
    fn current_page(&self) -> usize;

    /// Engine whose data is currently displayed.
    fn active_engine(&self) -> EngineId;

    /// Switch the displayed engine.
    fn select_engine(&self, engine: &EngineId);

    /// Re-render page `n`.
    fn redisplay(&self, n: usize);

    /// Offer debug visualization layers for selection.
    fn enable_debug_vis(&self, names: &[String]);
}

/// Progress indicator.
pub trait ProgressSink {
    /// Reset for an operation with `total` units of work.
    fn start(&self, total: usize);

    fn increment(&self);
}

/// Reviews per-page warnings of the main data source once every page has
/// one.
pub trait WarningCheck {
    fn check(&self, warnings: &[Option<PageWarning>]);
}

/// No-op collaborators.
#[derive(Debug, Clone, Copy, Default)]
pub struct Headless;

impl FontLoader for Headless {
    fn load(&self, _set: FontSet) -> Result<()> {
        Ok(())
    }
}

impl Viewer for Headless {
    fn current_page(&self) -> usize {
        0
    }

    fn active_engine(&self) -> EngineId {
        EngineId::Latest
    }

    fn select_engine(&self, _engine: &EngineId) {}

    fn redisplay(&self, _n: usize) {}

    fn enable_debug_vis(&self, _names: &[String]) {}
}

impl ProgressSink for Headless {
    fn start(&self, _total: usize) {}

    fn increment(&self) {}
}

impl WarningCheck for Headless {
    fn check(&self, warnings: &[Option<PageWarning>]) {
        if let Some(kind) = crate::model::summarize_char_warnings(warnings) {
            log::warn!("character data problem on most pages: {:?}", kind);
        }
    }
}

static HEADLESS: Headless = Headless;

/// The collaborator set handed to merge and orchestration.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub fonts: &'a dyn FontLoader,
    pub viewer: &'a dyn Viewer,
    pub progress: &'a dyn ProgressSink,
    pub warnings: &'a dyn WarningCheck,
}

impl Collaborators<'static> {
    /// Collaborators that do nothing beyond logging.
    pub fn headless() -> Self {
        Self {
            fonts: &HEADLESS,
            viewer: &HEADLESS,
            progress: &HEADLESS,
            warnings: &HEADLESS,
        }
    }
}

impl<'a> Collaborators<'a> {
    pub fn with_progress(mut self, progress: &'a dyn ProgressSink) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_viewer(mut self, viewer: &'a dyn Viewer) -> Self {
        self.viewer = viewer;
        self
    }

    pub fn with_fonts(mut self, fonts: &'a dyn FontLoader) -> Self {
        self.fonts = fonts;
        self
    }

    pub fn with_warnings(mut self, warnings: &'a dyn WarningCheck) -> Self {
        self.warnings = warnings;
        self
    }
}
