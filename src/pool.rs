//! Worker pool interface.
//!
//! The orchestrator never runs conversion or recognition itself. It submits
//! jobs to a [`WorkerPool`] and receives one [`JobHandle`] per expected
//! result. A handle is the receiving end of a one-shot channel, so several
//! handles can be waited on together with `crossbeam_channel::Select`.
//!
//! [`LocalPool`] is the in-process implementation: jobs run on rayon's
//! global thread pool.

use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::convert::{ConvertParams, ConverterRegistry, PageResult, RawFormat};
use crate::engine::EngineId;
use crate::error::{Error, Result};
use crate::model::Dims;
use crate::options::{ConvertOptions, RecognizeOptions};

/// Named debug visualization layers captured during recognition, in the
/// order the recognizer produced them (layer name, encoded image).
pub type DebugVis = Vec<(String, Vec<u8>)>;

/// Receiving end of a one-shot job result.
#[derive(Debug)]
pub struct JobHandle<T> {
    page: usize,
    rx: Receiver<Result<T>>,
}

/// Sending end paired with a [`JobHandle`].
#[derive(Debug)]
pub struct JobSender<T> {
    page: usize,
    tx: Sender<Result<T>>,
}

/// Create a connected sender/handle pair for page `page`.
pub fn job_channel<T>(page: usize) -> (JobSender<T>, JobHandle<T>) {
    let (tx, rx) = bounded(1);
    (JobSender { page, tx }, JobHandle { page, rx })
}

impl<T> JobSender<T> {
    pub fn page(&self) -> usize {
        self.page
    }

    /// Deliver the result. A handle that was already dropped is ignored.
    pub fn send(self, result: Result<T>) {
        if self.tx.send(result).is_err() {
            log::debug!("job result for page {} dropped: handle gone", self.page);
        }
    }
}

impl<T> JobHandle<T> {
    pub fn page(&self) -> usize {
        self.page
    }

    /// Underlying receiver, for use with `crossbeam_channel::Select`.
    pub fn receiver(&self) -> &Receiver<Result<T>> {
        &self.rx
    }

    /// Block until the job resolves.
    pub fn wait(self) -> Result<T> {
        self.rx.recv().map_err(|_| Error::PoolClosed { page: self.page })?
    }

    /// A handle that is already resolved.
    pub fn ready(page: usize, result: Result<T>) -> Self {
        let (tx, handle) = job_channel(page);
        tx.send(result);
        handle
    }
}

/// One conversion job: a single page of raw input.
#[derive(Debug, Clone)]
pub struct ConvertJob {
    pub format: RawFormat,
    pub raw: String,
    pub params: ConvertParams,
}

/// One combined recognition job for a page.
#[derive(Debug, Clone)]
pub struct RecognizeJob {
    pub n: usize,
    /// Passes in the order they run; the first is pass A.
    pub passes: Vec<EngineId>,
    pub options: RecognizeOptions,
}

/// Converted output of one recognition pass.
#[derive(Debug, Clone)]
pub struct PassResult {
    pub engine: EngineId,
    pub result: PageResult,
    /// Present when debug capture was requested and the recognizer made one
    pub debug_vis: Option<DebugVis>,
}

/// Executes jobs, usually on other threads.
pub trait WorkerPool {
    /// Block until the pool can take jobs.
    fn wait_ready(&self) -> Result<()>;

    /// Load recognition models and settings before recognition jobs run.
    fn init_recognition(&self, options: &RecognizeOptions) -> Result<()>;

    fn submit_convert(&self, job: ConvertJob) -> JobHandle<PageResult>;

    /// Submit a recognition job. Returns one handle per requested pass, in
    /// pass order.
    fn submit_recognize(&self, job: RecognizeJob) -> Vec<JobHandle<PassResult>>;
}

/// Raw engine output for one pass, before conversion.
#[derive(Debug, Clone)]
pub struct RawRecognition {
    pub format: RawFormat,
    pub raw: String,
    pub dims: Option<Dims>,
    /// Rotation applied to the image before recognition
    pub rotate_angle: f64,
    pub debug_vis: Option<DebugVis>,
}

/// A recognition engine usable from pool threads.
pub trait Recognizer: Send + Sync {
    /// Prepare for a run (load languages, apply settings).
    fn init(&self, options: &RecognizeOptions) -> Result<()>;

    /// Recognize page `n` with `engine`.
    fn recognize(
        &self,
        n: usize,
        engine: &EngineId,
        options: &RecognizeOptions,
    ) -> Result<RawRecognition>;
}

/// In-process pool on rayon's global thread pool.
pub struct LocalPool {
    registry: Arc<ConverterRegistry>,
    recognizer: Option<Arc<dyn Recognizer>>,
}

impl LocalPool {
    /// Pool with the built-in converters and no recognizer.
    pub fn new() -> Self {
        Self {
            registry: Arc::new(ConverterRegistry::with_defaults()),
            recognizer: None,
        }
    }

    pub fn with_registry(mut self, registry: ConverterRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn with_recognizer(mut self, recognizer: Arc<dyn Recognizer>) -> Self {
        self.recognizer = Some(recognizer);
        self
    }
}

impl Default for LocalPool {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkerPool for LocalPool {
    fn wait_ready(&self) -> Result<()> {
        Ok(())
    }

    fn init_recognition(&self, options: &RecognizeOptions) -> Result<()> {
        match &self.recognizer {
            Some(recognizer) => recognizer.init(options),
            None => Err(Error::RecognitionUnavailable),
        }
    }

    fn submit_convert(&self, job: ConvertJob) -> JobHandle<PageResult> {
        let (tx, handle) = job_channel(job.params.n);
        let registry = Arc::clone(&self.registry);
        rayon::spawn(move || {
            let result = registry.convert(job.format, &job.raw, &job.params);
            tx.send(result);
        });
        handle
    }

    fn submit_recognize(&self, job: RecognizeJob) -> Vec<JobHandle<PassResult>> {
        let n = job.n;
        let Some(recognizer) = self.recognizer.clone() else {
            return job
                .passes
                .iter()
                .map(|_| JobHandle::ready(n, Err(Error::RecognitionUnavailable)))
                .collect();
        };

        let (senders, handles): (Vec<_>, Vec<_>) = job.passes.iter().map(|_| job_channel(n)).unzip();
        let registry = Arc::clone(&self.registry);

        rayon::spawn(move || {
            let convert_options = ConvertOptions::new().with_keep_italic(job.options.keep_italic);
            let mut failed: Option<String> = None;

            // Passes run in order and each resolves as soon as it is done.
            for (engine, tx) in job.passes.iter().zip(senders) {
                if let Some(message) = &failed {
                    tx.send(Err(Error::Job {
                        page: n,
                        message: message.clone(),
                    }));
                    continue;
                }

                let result = recognizer
                    .recognize(n, engine, &job.options)
                    .and_then(|raw| {
                        let mut params = ConvertParams::new(n)
                            .with_rotate_angle(raw.rotate_angle)
                            .with_options(convert_options.clone());
                        if let Some(dims) = raw.dims {
                            params = params.with_dims(dims);
                        }
                        let result = registry.convert(raw.format, &raw.raw, &params)?;
                        Ok(PassResult {
                            engine: engine.clone(),
                            result,
                            debug_vis: raw.debug_vis.filter(|_| job.options.debug_vis),
                        })
                    });

                if let Err(e) = &result {
                    failed = Some(e.to_string());
                }
                tx.send(result);
            }
        });

        handles
    }
}
