//! Recognition and conversion orchestration.
//!
//! The orchestrator submits one job per page to a [`WorkerPool`] and merges
//! results as they resolve, on the calling thread. Pages complete in any
//! order. Within a page the pass-B handle is not even polled until pass A has
//! merged, which is what keeps A's merge ahead of B's for every page.
//!
//! A recognition run has two barriers. Once every page has its pass-A
//! result, debug layers are offered to the viewer and main-data warnings are
//! checked. The call returns only after every requested pass for every page
//! has merged. Any failure returns at once; pages merged before it stay
//! merged.

use crossbeam_channel::Select;

use crate::collab::Collaborators;
use crate::convert::{ConvertParams, PageResult, RawFormat};
use crate::engine::EngineId;
use crate::error::{Error, Result};
use crate::merge::{DocumentState, ResultMerge};
use crate::options::{ConvertOptions, RecognizeOptions};
use crate::pool::{ConvertJob, JobHandle, PassResult, RecognizeJob, WorkerPool};

const DONE_A: u8 = 0b01;
const DONE_B: u8 = 0b10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    A,
    B,
}

/// Completion state of one page in a recognition run.
struct PageSlot {
    a: Option<JobHandle<PassResult>>,
    b: Option<JobHandle<PassResult>>,
    done: u8,
}

impl PageSlot {
    fn new(mut handles: Vec<JobHandle<PassResult>>) -> Self {
        let b = if handles.len() > 1 { handles.pop() } else { None };
        let a = handles.pop();
        Self { a, b, done: 0 }
    }

    /// The handle to poll next: pass A until it merged, then pass B.
    fn next_handle(&self) -> Option<(Stage, &JobHandle<PassResult>)> {
        match (&self.a, &self.b) {
            (Some(a), _) => Some((Stage::A, a)),
            (None, Some(b)) if self.done & DONE_A != 0 => Some((Stage::B, b)),
            _ => None,
        }
    }

    fn is_done(&self, mask: u8) -> bool {
        self.done & mask == mask
    }
}

/// Wait for whichever pending handle resolves first.
///
/// Returns the key of that handle together with its result. Fails if there is
/// nothing to wait on, if the job failed, or if the pool dropped the job.
fn select_next<'h, K, T, I>(pending: I) -> Result<(K, T)>
where
    K: Copy,
    T: 'h,
    I: IntoIterator<Item = (K, &'h JobHandle<T>)>,
{
    let (keys, handles): (Vec<K>, Vec<&JobHandle<T>>) = pending.into_iter().unzip();
    if handles.is_empty() {
        return Err(Error::Other("no pending jobs to wait on".into()));
    }

    let mut sel = Select::new();
    for handle in &handles {
        sel.recv(handle.receiver());
    }
    let op = sel.select();
    let i = op.index();
    let outcome = op
        .recv(handles[i].receiver())
        .map_err(|_| Error::PoolClosed {
            page: handles[i].page(),
        })?;
    Ok((keys[i], outcome?))
}

/// Drives recognition and conversion runs against a worker pool.
pub struct Orchestrator<'a> {
    pool: &'a dyn WorkerPool,
    collab: Collaborators<'a>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(pool: &'a dyn WorkerPool, collab: Collaborators<'a>) -> Self {
        Self { pool, collab }
    }

    /// Recognize every page of the document with the requested passes.
    ///
    /// Returns only after all requested passes for all pages have merged.
    /// `is_main` marks pass-A results as the document's authoritative data.
    pub fn recognize_all_pages(
        &self,
        state: &mut DocumentState,
        options: &RecognizeOptions,
        is_main: bool,
    ) -> Result<()> {
        let passes = options.passes;
        let Some(engine_a) = passes.pass_a() else {
            log::warn!("recognition requested with no passes");
            return Ok(());
        };
        let engine_b = passes.pass_b();

        if passes.legacy {
            state.init_engine(EngineId::Legacy);
        }
        if passes.lstm {
            state.init_engine(EngineId::Lstm);
        }
        // Latest exists only so results can be shown while recognition runs.
        state.init_engine(EngineId::Latest);
        self.collab.viewer.select_engine(&EngineId::Latest);

        self.pool.wait_ready()?;
        self.pool.init_recognition(options)?;

        let page_count = state.page_count();
        let job_passes: Vec<EngineId> = std::iter::once(engine_a.clone())
            .chain(engine_b.clone())
            .collect();
        self.collab.progress.start(page_count * job_passes.len());

        let mut slots: Vec<PageSlot> = (0..page_count)
            .map(|n| {
                PageSlot::new(self.pool.submit_recognize(RecognizeJob {
                    n,
                    passes: job_passes.clone(),
                    options: options.clone(),
                }))
            })
            .collect();

        let required = if engine_b.is_some() { DONE_A | DONE_B } else { DONE_A };
        let merge = ResultMerge::new(self.collab);
        let mut first_pass_done = false;

        loop {
            if !first_pass_done && slots.iter().all(|s| s.is_done(DONE_A)) {
                first_pass_done = true;
                self.after_first_pass(state, options, is_main);
            }
            if slots.iter().all(|s| s.is_done(required)) {
                break;
            }

            let ((n, stage), pass) = select_next(
                slots
                    .iter()
                    .enumerate()
                    .filter_map(|(n, slot)| slot.next_handle().map(|(stage, h)| ((n, stage), h))),
            )?;

            let slot = &mut slots[n];
            match stage {
                Stage::A => {
                    slot.a = None;
                    if let Some(vis) = pass.debug_vis.filter(|_| options.debug_vis) {
                        state.import_debug_vis(n, vis)?;
                    }
                    // The caller's flag applies even when pass A is LSTM
                    // only, so LSTM-only runs record main metrics and
                    // warnings instead of merging as secondary data.
                    merge.merge(state, pass.result, n, is_main, &engine_a)?;
                    slot.done |= DONE_A;
                }
                Stage::B => {
                    slot.b = None;
                    if let Some(engine) = &engine_b {
                        merge.merge(state, pass.result, n, false, engine)?;
                    }
                    slot.done |= DONE_B;
                }
            }
            log::debug!("page {} pass {:?} merged", n, stage);
        }

        if let Some(engine) = passes.final_engine() {
            self.collab.viewer.select_engine(&engine);
        }
        log::info!("recognition finished for {} pages", page_count);
        Ok(())
    }

    fn after_first_pass(&self, state: &DocumentState, options: &RecognizeOptions, is_main: bool) {
        log::info!("first pass complete for all {} pages", state.page_count());
        if options.debug_vis {
            let names = state.debug_vis_names();
            if !names.is_empty() {
                self.collab.viewer.enable_debug_vis(&names);
            }
        }
        if is_main {
            self.collab.warnings.check(state.warnings());
        }
    }

    /// Convert a whole document already in a known raw format.
    ///
    /// `raw_pages` holds one raw string per page; results merge under
    /// `engine` as they arrive. Returns after every page has merged. An empty
    /// state is sized to the input.
    pub fn convert_all(
        &self,
        state: &mut DocumentState,
        raw_pages: Vec<String>,
        is_main: bool,
        format: RawFormat,
        engine: &EngineId,
        options: ConvertOptions,
    ) -> Result<()> {
        if state.page_count() == 0 {
            state.reset(raw_pages.len());
        }
        let page_count = state.page_count();
        if raw_pages.len() > page_count {
            return Err(Error::PageOutOfRange(raw_pages.len() - 1, page_count));
        }

        self.pool.wait_ready()?;
        self.collab.progress.start(raw_pages.len());

        let mut pending: Vec<Option<JobHandle<PageResult>>> = raw_pages
            .into_iter()
            .enumerate()
            .map(|(n, raw)| {
                let mut params = ConvertParams::new(n).with_options(options.clone());
                if let Some(metrics) = state.metrics(n) {
                    params = params.with_dims(metrics.dims);
                }
                Some(self.pool.submit_convert(ConvertJob { format, raw, params }))
            })
            .collect();

        let merge = ResultMerge::new(self.collab);
        let mut remaining = pending.len();
        while remaining > 0 {
            let (n, result) = select_next(
                pending
                    .iter()
                    .enumerate()
                    .filter_map(|(n, h)| h.as_ref().map(|h| (n, h))),
            )?;
            pending[n] = None;
            remaining -= 1;
            merge.merge(state, result, n, is_main, engine)?;
        }

        if is_main {
            self.collab.warnings.check(state.warnings());
        }
        log::info!("converted {} pages as {} ({})", page_count, engine, format);
        Ok(())
    }
}
