//! Result merge: the single entry point that writes converted pages into the
//! shared document state.
//!
//! Every per-engine page, metrics entry, layout annotation, warning and
//! recognized flag is written here and nowhere else. The rules are chosen
//! so that results for different passes of the same page can arrive in any
//! order:
//!
//! - the engine's own page slot is keyed by engine, so passes never collide;
//! - the `Latest` alias follows the pass rank rule of
//!   [`EngineStore::mirror_latest`];
//! - page metrics are created at most once, only the angle is refreshed;
//! - layout annotations are first-writer-wins.

use crate::collab::{Collaborators, FontSet};
use crate::convert::PageResult;
use crate::engine::{EngineId, EngineStore};
use crate::error::{Error, Result};
use crate::model::{LayoutDataTable, PageMetrics, PageWarning};
use crate::pool::DebugVis;

/// Shared state of one loaded document.
#[derive(Debug, Clone, Default)]
pub struct DocumentState {
    engines: EngineStore,
    metrics: Vec<Option<PageMetrics>>,
    layout: Vec<LayoutDataTable>,
    warnings: Vec<Option<PageWarning>>,
    recognized: Vec<bool>,
    debug_vis: Vec<DebugVis>,
}

impl DocumentState {
    /// Empty state for a document with `page_count` pages.
    pub fn new(page_count: usize) -> Self {
        Self {
            engines: EngineStore::new(page_count),
            metrics: vec![None; page_count],
            layout: vec![LayoutDataTable::default(); page_count],
            warnings: vec![None; page_count],
            recognized: vec![false; page_count],
            debug_vis: vec![DebugVis::new(); page_count],
        }
    }

    /// Drop everything for a newly loaded document.
    pub fn reset(&mut self, page_count: usize) {
        *self = Self::new(page_count);
    }

    pub fn page_count(&self) -> usize {
        self.engines.page_count()
    }

    pub fn engines(&self) -> &EngineStore {
        &self.engines
    }

    /// Register `engine` with empty page slots, replacing any earlier data.
    pub fn init_engine(&mut self, engine: EngineId) {
        log::debug!("initializing engine {}", engine);
        self.engines.init_engine(engine);
    }

    pub fn metrics(&self, n: usize) -> Option<&PageMetrics> {
        self.metrics.get(n)?.as_ref()
    }

    /// Seed metrics from a source other than OCR data (e.g. the image size).
    /// Existing entries are kept.
    pub fn seed_metrics(&mut self, n: usize, metrics: PageMetrics) -> Result<()> {
        let count = self.page_count();
        let slot = self
            .metrics
            .get_mut(n)
            .ok_or(Error::PageOutOfRange(n, count))?;
        if slot.is_none() {
            *slot = Some(metrics);
        }
        Ok(())
    }

    pub fn layout(&self, n: usize) -> Option<&LayoutDataTable> {
        self.layout.get(n)
    }

    /// Per-page warnings recorded from the main data source.
    pub fn warnings(&self) -> &[Option<PageWarning>] {
        &self.warnings
    }

    pub fn is_recognized(&self, n: usize) -> bool {
        self.recognized.get(n).copied().unwrap_or(false)
    }

    pub fn debug_vis(&self, n: usize) -> Option<&DebugVis> {
        self.debug_vis.get(n)
    }

    /// Replace the debug visualization layers captured for page `n`.
    pub fn import_debug_vis(&mut self, n: usize, vis: DebugVis) -> Result<()> {
        let count = self.page_count();
        let slot = self
            .debug_vis
            .get_mut(n)
            .ok_or(Error::PageOutOfRange(n, count))?;
        *slot = vis;
        Ok(())
    }

    /// Union of debug layer names over all pages. Names unknown so far are
    /// inserted after the last known name preceding them on their page, so
    /// every page's relative order survives.
    pub fn debug_vis_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for page in &self.debug_vis {
            let mut cursor = 0;
            for (name, _) in page {
                match names.iter().position(|n| n == name) {
                    Some(idx) => cursor = idx + 1,
                    None => {
                        names.insert(cursor, name.clone());
                        cursor += 1;
                    }
                }
            }
        }
        names
    }
}

/// Merges converted pages into a [`DocumentState`], notifying collaborators.
pub struct ResultMerge<'a> {
    collab: Collaborators<'a>,
}

impl<'a> ResultMerge<'a> {
    pub fn new(collab: Collaborators<'a>) -> Self {
        Self { collab }
    }

    /// Merge one converted page.
    ///
    /// `is_main` marks the authoritative data source, whose warnings and
    /// metrics describe the document. Font loading failures abort before
    /// anything is written.
    pub fn merge(
        &self,
        state: &mut DocumentState,
        result: PageResult,
        n: usize,
        is_main: bool,
        engine: &EngineId,
    ) -> Result<()> {
        let count = state.page_count();
        if n >= count {
            return Err(Error::PageOutOfRange(n, count));
        }

        for set in FontSet::required_for(&result.lang_set) {
            log::debug!("loading font set {:?} for page {}", set, n);
            self.collab.fonts.load(set)?;
        }

        let PageResult {
            page,
            layout,
            warning,
            ..
        } = result;

        if is_main {
            state.warnings[n] = Some(warning);
            let metrics = state.metrics[n].get_or_insert_with(|| PageMetrics::new(page.dims));
            metrics.angle = page.angle;
        }

        state.engines.mirror_latest(engine, n, &page);
        state.engines.store(engine, n, page)?;

        state.recognized[n] = true;

        if state.layout[n].is_empty() {
            state.layout[n] = layout;
        }

        let active = self.collab.viewer.active_engine();
        let shown = *engine == active
            || (engine.is_recognition_pass() && active == EngineId::Latest);
        if shown && self.collab.viewer.current_page() == n {
            self.collab.viewer.redisplay(n);
        }

        log::debug!("merged page {} from {} (main: {})", n, engine, is_main);
        self.collab.progress.increment();
        Ok(())
    }
}
