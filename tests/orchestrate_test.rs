//! Integration tests for recognition and conversion runs.

use std::cell::{Cell, RefCell};

use unocr::model::LineBuilder;
use unocr::pool::{job_channel, ConvertJob, JobSender, PassResult, RecognizeJob};
use unocr::{
    BBox, Baseline, Collaborators, Dims, DocumentState, EngineId, Error, FontLoader, FontSet,
    JobHandle, LayoutDataTable, LocalPool, OcrPage, OcrWord, Orchestrator, PageResult,
    PageWarning, PassSelection, ProgressSink, RawFormat, RecognizeOptions, Result, Viewer,
    WarningCheck, WorkerPool,
};

fn page_result(n: usize, text: &str, lang: &str) -> PageResult {
    let mut page = OcrPage::new(n, Dims::new(100.0, 50.0));
    let mut line = LineBuilder::new(BBox::new(0.0, 0.0, 100.0, 20.0), Baseline::default(), 4.0, 8.0);
    let mut word = OcrWord::new(text, BBox::new(0.0, 0.0, 40.0, 20.0), format!("word_{}_0", n + 1))
        .unwrap();
    word.lang = Some(lang.to_string());
    line.push_word(word);
    page.push_line(line);
    PageResult::new(page, LayoutDataTable::new(), PageWarning::none())
}

fn pass_text(engine: &EngineId, n: usize) -> String {
    let tag = if *engine == EngineId::Legacy { "legacy" } else { "lstm" };
    format!("{}-{}", tag, n)
}

/// Pool that answers from the submitting thread. Page 1 resolves pass B
/// before pass A. Jobs for `fail_page` are held until
/// [`ScriptedPool::release_failures`] resolves them with an error.
struct ScriptedPool {
    fail_page: Option<usize>,
    held: RefCell<Vec<JobSender<PassResult>>>,
}

impl ScriptedPool {
    fn new(fail_page: Option<usize>) -> Self {
        Self {
            fail_page,
            held: RefCell::new(Vec::new()),
        }
    }

    fn release_failures(&self) {
        for tx in self.held.borrow_mut().drain(..) {
            let page = tx.page();
            tx.send(Err(Error::Job {
                page,
                message: "worker crashed".into(),
            }));
        }
    }
}

impl WorkerPool for ScriptedPool {
    fn wait_ready(&self) -> Result<()> {
        Ok(())
    }

    fn init_recognition(&self, _options: &RecognizeOptions) -> Result<()> {
        Ok(())
    }

    fn submit_convert(&self, job: ConvertJob) -> JobHandle<PageResult> {
        JobHandle::ready(job.params.n, Err(Error::Other("not used".into())))
    }

    fn submit_recognize(&self, job: RecognizeJob) -> Vec<JobHandle<PassResult>> {
        let n = job.n;
        let (senders, handles): (Vec<_>, Vec<_>) = job.passes.iter().map(|_| job_channel(n)).unzip();

        if self.fail_page == Some(n) {
            self.held.borrow_mut().extend(senders);
            return handles;
        }

        let mut jobs: Vec<_> = job.passes.into_iter().zip(senders).collect();
        if n == 1 {
            jobs.reverse();
        }
        for (engine, tx) in jobs {
            // Page 1 carries distinct scripts per pass to expose merge order.
            let lang = match (n, &engine) {
                (1, EngineId::Legacy) => "rus",
                (1, _) => "chi_sim",
                _ => "eng",
            };
            let text = pass_text(&engine, n);
            tx.send(Ok(PassResult {
                engine,
                result: page_result(n, &text, lang),
                debug_vis: None,
            }));
        }

        handles
    }
}

/// Progress sink that lets the held jobs fail once `release_at` merges
/// have been counted.
struct ReleaseAfter<'a> {
    recorder: &'a Recorder,
    pool: &'a ScriptedPool,
    release_at: usize,
}

impl ProgressSink for ReleaseAfter<'_> {
    fn start(&self, total: usize) {
        self.recorder.start(total);
    }

    fn increment(&self) {
        self.recorder.increment();
        if self.recorder.progress.get() == self.release_at {
            self.pool.release_failures();
        }
    }
}

#[derive(Default)]
struct Recorder {
    fonts: RefCell<Vec<FontSet>>,
    progress: Cell<usize>,
    total: Cell<usize>,
    /// Progress count and number of page warnings seen at each check.
    checks: RefCell<Vec<(usize, usize)>>,
    selected: RefCell<Vec<EngineId>>,
}

impl FontLoader for Recorder {
    fn load(&self, set: FontSet) -> Result<()> {
        self.fonts.borrow_mut().push(set);
        Ok(())
    }
}

impl ProgressSink for Recorder {
    fn start(&self, total: usize) {
        self.total.set(total);
        self.progress.set(0);
    }

    fn increment(&self) {
        self.progress.set(self.progress.get() + 1);
    }
}

impl WarningCheck for Recorder {
    fn check(&self, warnings: &[Option<PageWarning>]) {
        let seen = warnings.iter().filter(|w| w.is_some()).count();
        self.checks.borrow_mut().push((self.progress.get(), seen));
    }
}

impl Viewer for Recorder {
    fn current_page(&self) -> usize {
        0
    }

    fn active_engine(&self) -> EngineId {
        self.selected
            .borrow()
            .last()
            .cloned()
            .unwrap_or(EngineId::Latest)
    }

    fn select_engine(&self, engine: &EngineId) {
        self.selected.borrow_mut().push(engine.clone());
    }

    fn redisplay(&self, _n: usize) {}

    fn enable_debug_vis(&self, _names: &[String]) {}
}

fn collaborators(recorder: &Recorder) -> Collaborators<'_> {
    Collaborators::headless()
        .with_fonts(recorder)
        .with_progress(recorder)
        .with_warnings(recorder)
        .with_viewer(recorder)
}

#[test]
fn test_two_pass_run_merges_every_page() {
    let pool = ScriptedPool::new(None);
    let recorder = Recorder::default();
    let mut state = DocumentState::new(3);

    let options = RecognizeOptions::new().with_passes(PassSelection::both());
    Orchestrator::new(&pool, collaborators(&recorder))
        .recognize_all_pages(&mut state, &options, true)
        .unwrap();

    // Pass B of page 1 resolved first but merged after pass A.
    assert_eq!(*recorder.fonts.borrow(), vec![FontSet::Extended, FontSet::ChiSim]);

    assert_eq!(recorder.total.get(), 6);
    assert_eq!(recorder.progress.get(), 6);
    for n in 0..3 {
        assert!(state.is_recognized(n));
        assert_eq!(
            state.engines().page(&EngineId::Legacy, n).unwrap().plain_text(),
            pass_text(&EngineId::Legacy, n)
        );
        assert_eq!(
            state.engines().page(&EngineId::Lstm, n).unwrap().plain_text(),
            pass_text(&EngineId::Lstm, n)
        );
        assert_eq!(
            state.engines().page(&EngineId::Latest, n).unwrap().plain_text(),
            pass_text(&EngineId::Lstm, n)
        );
        assert_eq!(state.metrics(n).unwrap().dims, Dims::new(100.0, 50.0));
    }

    // One check, after every pass A merged.
    let checks = recorder.checks.borrow();
    assert_eq!(checks.len(), 1);
    assert!(checks[0].0 >= 3);
    assert_eq!(checks[0].1, 3);

    assert_eq!(*recorder.selected.borrow(), vec![EngineId::Latest, EngineId::Lstm]);
}

#[test]
fn test_legacy_only_run() {
    let pool = ScriptedPool::new(None);
    let recorder = Recorder::default();
    let mut state = DocumentState::new(2);

    let options = RecognizeOptions::new().with_passes(PassSelection::legacy_only());
    Orchestrator::new(&pool, collaborators(&recorder))
        .recognize_all_pages(&mut state, &options, true)
        .unwrap();

    assert_eq!(recorder.progress.get(), 2);
    assert!(state.engines().pages(&EngineId::Lstm).is_none());
    assert_eq!(
        state.engines().page(&EngineId::Latest, 1).unwrap().plain_text(),
        "legacy-1"
    );
    assert_eq!(*recorder.selected.borrow(), vec![EngineId::Latest, EngineId::Legacy]);
}

#[test]
fn test_lstm_only_run_records_main_data() {
    let pool = ScriptedPool::new(None);
    let recorder = Recorder::default();
    let mut state = DocumentState::new(2);

    let options = RecognizeOptions::new().with_passes(PassSelection::lstm_only());
    Orchestrator::new(&pool, collaborators(&recorder))
        .recognize_all_pages(&mut state, &options, true)
        .unwrap();

    assert!(state.engines().pages(&EngineId::Legacy).is_none());
    assert_eq!(state.engines().page(&EngineId::Lstm, 0).unwrap().plain_text(), "lstm-0");
    assert_eq!(state.metrics(1).unwrap().dims, Dims::new(100.0, 50.0));
    assert_eq!(*recorder.checks.borrow(), vec![(2, 2)]);
}

#[test]
fn test_failed_page_fails_run_and_keeps_merged_pages() {
    let pool = ScriptedPool::new(Some(2));
    let recorder = Recorder::default();
    // Page 2 fails only after both passes of pages 0 and 1 merged.
    let progress = ReleaseAfter {
        recorder: &recorder,
        pool: &pool,
        release_at: 4,
    };
    let mut state = DocumentState::new(3);

    let options = RecognizeOptions::new().with_passes(PassSelection::both());
    let err = Orchestrator::new(&pool, collaborators(&recorder).with_progress(&progress))
        .recognize_all_pages(&mut state, &options, true)
        .unwrap_err();

    assert!(matches!(err, Error::Job { page: 2, .. }));
    assert_eq!(recorder.progress.get(), 4);
    assert!(state.is_recognized(0));
    assert!(state.is_recognized(1));
    assert!(!state.is_recognized(2));
    assert!(state.engines().page(&EngineId::Legacy, 2).is_none());
    assert!(recorder.checks.borrow().is_empty());
}

#[test]
fn test_convert_all_with_local_pool() {
    let pages: Vec<String> = (0..4)
        .map(|n| {
            format!(
                "<div class='ocr_page' title='bbox 0 0 300 200'>\
                 <span class='ocr_line' title='bbox 10 10 200 30'>\
                 <span class='ocrx_word' title='bbox 10 10 60 30; x_wconf 80' lang='eng'>page{}</span>\
                 </span></div>",
                n
            )
        })
        .collect();

    let pool = LocalPool::new();
    let recorder = Recorder::default();
    let mut state = DocumentState::default();
    let engine = EngineId::user("import");

    Orchestrator::new(&pool, collaborators(&recorder))
        .convert_all(
            &mut state,
            pages,
            true,
            RawFormat::Hocr,
            &engine,
            Default::default(),
        )
        .unwrap();

    assert_eq!(state.page_count(), 4);
    assert_eq!(recorder.progress.get(), 4);
    for n in 0..4 {
        let page = state.engines().page(&engine, n).unwrap();
        assert_eq!(page.plain_text(), format!("page{}", n));
        assert_eq!(page.words().next().unwrap().id, format!("word_{}_0", n + 1));
    }
    assert!(state.engines().pages(&EngineId::Latest).map_or(true, |p| p.iter().all(Option::is_none)));
    assert_eq!(*recorder.checks.borrow(), vec![(4, 4)]);
}

#[test]
fn test_convert_all_keeps_existing_metrics() {
    let raw = "<div class='ocr_page' title='bbox 0 0 300 200'>\
               <span class='ocr_line' title='bbox 10 10 200 30'>\
               <span class='ocrx_word' title='bbox 10 10 60 30'>text</span>\
               </span></div>"
        .to_string();

    let pool = LocalPool::new();
    let orchestrator = Orchestrator::new(&pool, Collaborators::headless());
    let mut state = DocumentState::new(1);

    orchestrator
        .convert_all(&mut state, vec![raw.clone()], true, RawFormat::Hocr, &EngineId::user("a"), Default::default())
        .unwrap();
    let first = state.metrics(0).unwrap().clone();

    orchestrator
        .convert_all(&mut state, vec![raw], true, RawFormat::Hocr, &EngineId::user("b"), Default::default())
        .unwrap();
    assert_eq!(state.metrics(0).unwrap(), &first);
    assert_eq!(state.engines().page(&EngineId::user("b"), 0).unwrap().plain_text(), "text");
}

#[test]
fn test_convert_all_too_many_pages() {
    let pool = LocalPool::new();
    let mut state = DocumentState::new(1);
    let result = Orchestrator::new(&pool, Collaborators::headless()).convert_all(
        &mut state,
        vec![String::new(), String::new()],
        false,
        RawFormat::Hocr,
        &EngineId::user("x"),
        Default::default(),
    );
    assert!(matches!(result, Err(Error::PageOutOfRange(1, 1))));
}
