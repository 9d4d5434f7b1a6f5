use crate::constants::{
    DEFAULT_QUALITY, ERROR_PREFIX, MAX_QUALITY, MIN_QUALITY, SIMULATE_PREFIX, SUCCESS_PREFIX,
    WARNING_PREFIX,
};
use crate::copier::copy_preserving;
use crate::encoder::encode_image;
use crate::error::{CompressionError, Result};
use crate::events::{EventSink, RunEvent};
use crate::probe::{probe, ProbeOutcome};
use crate::scanner::{DirectoryScanner, FileDescriptor};
use crate::stats::{reduction_percent, ProcessingOutcome, RunStatistics};
use std::fs;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use tracing::{error, info, warn};

/// Parameters of one run, validated on construction.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub input_root: PathBuf,
    /// `None` writes outputs next to their sources
    pub output_root: Option<PathBuf>,
    pub quality: u8,
    pub delete_source: bool,
    pub simulate: bool,
}

impl RunOptions {
    pub fn new(
        input_root: impl Into<PathBuf>,
        output_root: Option<PathBuf>,
        quality: Option<u8>,
    ) -> Result<Self> {
        let quality = quality.unwrap_or(DEFAULT_QUALITY);
        if !(MIN_QUALITY..=MAX_QUALITY).contains(&quality) {
            return Err(CompressionError::InvalidQuality(quality));
        }

        Ok(Self {
            input_root: input_root.into(),
            output_root,
            quality,
            delete_source: false,
            simulate: false,
        })
    }

    pub fn delete_source(mut self, delete: bool) -> Self {
        self.delete_source = delete;
        self
    }

    pub fn simulate(mut self, simulate: bool) -> Self {
        self.simulate = simulate;
        self
    }

    /// Checks that the input root exists, is a directory and can be listed.
    pub fn validate(&self) -> Result<()> {
        let root = &self.input_root;
        let invalid = |reason: &str| CompressionError::StartupValidation {
            path: root.clone(),
            reason: reason.to_string(),
        };

        if root.as_os_str().is_empty() {
            return Err(invalid("no input directory given"));
        }
        if !root.exists() {
            return Err(invalid("does not exist"));
        }
        if !root.is_dir() {
            return Err(invalid("is not a directory"));
        }
        fs::read_dir(root).map_err(|e| CompressionError::StartupValidation {
            path: root.clone(),
            reason: format!("cannot be read: {}", e),
        })?;
        Ok(())
    }
}

/// Lifecycle of the controller's current (or most recent) run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Scanning,
    Processing,
    Completed,
    Aborted,
    Failed,
}

impl RunState {
    /// A run is in flight; new start requests are ignored.
    pub fn is_active(&self) -> bool {
        matches!(self, RunState::Scanning | RunState::Processing)
    }
}

/// Cooperative stop signal shared between the front end and the worker.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// What a worker gets from its caller: where to send events and when to stop.
pub struct RunContext {
    cancel: CancellationToken,
    events: Box<dyn EventSink>,
}

impl RunContext {
    pub fn new(events: impl EventSink + 'static) -> Self {
        Self {
            cancel: CancellationToken::new(),
            events: Box::new(events),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn emit(&self, event: RunEvent) {
        self.events.emit(event);
    }

    fn log(&self, line: impl Into<String>) {
        self.emit(RunEvent::Log(line.into()));
    }
}

/// Terminal state and final counters of a run that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub state: RunState,
    pub stats: RunStatistics,
}

/// Handle to a run executing on its own worker thread.
pub struct RunHandle {
    cancel: CancellationToken,
    worker: JoinHandle<Result<RunReport>>,
}

impl RunHandle {
    /// Ask the worker to stop before its next file.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Wait for the worker. Scan-level failures come back as `Err`.
    pub fn join(self) -> Result<RunReport> {
        self.worker
            .join()
            .map_err(|_| CompressionError::WorkerPanicked)?
    }
}

/// Drives runs: scan once, then probe and encode or copy each candidate in
/// order, reporting through the run's [`EventSink`].
///
/// Only one run per controller can be in flight. Clones share that state.
#[derive(Debug, Clone)]
pub struct RunController {
    state: Arc<Mutex<RunState>>,
}

impl Default for RunController {
    fn default() -> Self {
        Self::new()
    }
}

impl RunController {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(RunState::Idle)),
        }
    }

    pub fn state(&self) -> RunState {
        *self.lock_state()
    }

    /// Validate `options` and start a run on a dedicated worker thread.
    ///
    /// # Returns
    /// * `Ok(Some(handle))` - The run started
    /// * `Ok(None)` - Another run is still in flight; nothing happened
    /// * `Err(CompressionError::StartupValidation)` - Bad input root, state unchanged
    pub fn start(&self, options: RunOptions, ctx: RunContext) -> Result<Option<RunHandle>> {
        options.validate()?;
        if !self.try_begin() {
            return Ok(None);
        }

        let cancel = ctx.cancellation_token();
        let controller = self.clone();
        let spawned = thread::Builder::new()
            .name("img-sweep-run".to_string())
            .spawn(move || controller.execute_guarded(&options, &ctx));

        match spawned {
            Ok(worker) => Ok(Some(RunHandle { cancel, worker })),
            Err(e) => {
                self.set_state(RunState::Failed);
                Err(CompressionError::Io(e))
            }
        }
    }

    /// Same as [`start`](Self::start) but runs on the calling thread.
    pub fn run_blocking(&self, options: &RunOptions, ctx: &RunContext) -> Result<Option<RunReport>> {
        options.validate()?;
        if !self.try_begin() {
            return Ok(None);
        }
        self.execute_guarded(options, ctx).map(Some)
    }

    fn lock_state(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_state(&self, state: RunState) {
        *self.lock_state() = state;
    }

    /// Move to `Scanning` unless a run is already active.
    fn try_begin(&self) -> bool {
        let mut state = self.lock_state();
        if state.is_active() {
            return false;
        }
        *state = RunState::Scanning;
        true
    }

    /// Runs [`execute`](Self::execute); a panic anywhere in the pipeline
    /// (decoder, sink) ends the run in `Failed`.
    fn execute_guarded(&self, options: &RunOptions, ctx: &RunContext) -> Result<RunReport> {
        match panic::catch_unwind(AssertUnwindSafe(|| self.execute(options, ctx))) {
            Ok(result) => result,
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                error!(%reason, "run worker panicked");
                self.set_state(RunState::Failed);
                // The sink itself may be what panicked.
                let _ = panic::catch_unwind(AssertUnwindSafe(|| {
                    ctx.emit(RunEvent::Failed(format!("internal error: {}", reason)));
                }));
                Err(CompressionError::WorkerPanicked)
            }
        }
    }

    fn execute(&self, options: &RunOptions, ctx: &RunContext) -> Result<RunReport> {
        info!(
            input = %options.input_root.display(),
            quality = options.quality,
            simulate = options.simulate,
            "run started"
        );
        ctx.log("Starting image compression run");
        match &options.output_root {
            Some(root) => ctx.log(format!("Output directory: {}", root.display())),
            None => ctx.log("No output directory set; compressed files are written next to their sources"),
        }

        ctx.log(format!("Scanning {} for images...", options.input_root.display()));
        let scanner = DirectoryScanner::new(&options.input_root, options.output_root.clone());
        let candidates = match scanner.scan() {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(error = %e, "scan failed");
                self.set_state(RunState::Failed);
                ctx.log(format!("{} Scan failed: {}", ERROR_PREFIX, e));
                ctx.emit(RunEvent::Failed(e.to_string()));
                return Err(e);
            }
        };

        let mut stats = RunStatistics::new(candidates.len());
        ctx.log(format!(
            "Scan finished: {} files to compress",
            candidates.len()
        ));
        if candidates.is_empty() {
            ctx.log("No images need compressing");
            return Ok(self.complete(ctx, stats));
        }

        self.set_state(RunState::Processing);
        for file in &candidates {
            if ctx.cancel.is_cancelled() {
                return Ok(self.abort(ctx, stats));
            }

            let outcome = process_file(file, options, ctx);
            stats.record(&outcome);
            ctx.emit(RunEvent::Progress {
                processed: stats.processed_files,
                total: stats.total_files,
            });
            ctx.emit(RunEvent::Stats(stats));
        }

        Ok(self.complete(ctx, stats))
    }

    fn complete(&self, ctx: &RunContext, stats: RunStatistics) -> RunReport {
        let summary = stats.summary();
        info!(%summary, "run completed");
        ctx.log("All files processed");
        ctx.log(format!("Summary: {}", summary));
        self.set_state(RunState::Completed);
        ctx.emit(RunEvent::Completed(summary));
        RunReport {
            state: RunState::Completed,
            stats,
        }
    }

    fn abort(&self, ctx: &RunContext, stats: RunStatistics) -> RunReport {
        info!(%stats, "run cancelled");
        ctx.log(format!(
            "Run cancelled after {} of {} files",
            stats.processed_files, stats.total_files
        ));
        self.set_state(RunState::Aborted);
        ctx.emit(RunEvent::Aborted(stats));
        RunReport {
            state: RunState::Aborted,
            stats,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Handle one candidate end to end. Never fails: every error becomes an outcome.
fn process_file(file: &FileDescriptor, options: &RunOptions, ctx: &RunContext) -> ProcessingOutcome {
    let rel = file.relative_path.display();

    if options.simulate {
        ctx.log(format!(
            "{} Would compress {} -> {}",
            SIMULATE_PREFIX,
            rel,
            file.output_path.display()
        ));
        if options.delete_source && !file.is_in_place() {
            ctx.log(format!("{} Would delete source {}", SIMULATE_PREFIX, rel));
        }
        return ProcessingOutcome::Simulated;
    }

    ctx.log(format!("Processing: {}", rel));

    if let Some(parent) = file.output_path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            let err = CompressionError::DirectoryCreationFailed(parent.to_path_buf());
            ctx.log(format!("{} Failed: {} - {} ({})", ERROR_PREFIX, rel, err, e));
            return ProcessingOutcome::Failed(err.to_string());
        }
    }

    let outcome = match probe(&file.source_path) {
        ProbeOutcome::Healthy(img) => {
            match encode_image(&img, &file.source_path, &file.output_path, options.quality) {
                Ok(written) => {
                    let reduction = reduction_percent(file.size_bytes, written);
                    ctx.log(format!(
                        "{} Compressed: {} (reduced {:.1}%)",
                        SUCCESS_PREFIX, rel, reduction
                    ));
                    ProcessingOutcome::Compressed(reduction)
                }
                Err(e) => ProcessingOutcome::Failed(e.to_string()),
            }
        }
        ProbeOutcome::Corrupt(reason) => {
            ctx.log(format!("{} Corrupt file detected: {}", WARNING_PREFIX, rel));
            ctx.log(format!("{} Decoder error: {}", WARNING_PREFIX, reason));
            match copy_preserving(&file.source_path, &file.output_path) {
                Ok(_) => {
                    ctx.log(format!(
                        "{} Copied corrupt file unchanged: {}",
                        SUCCESS_PREFIX, rel
                    ));
                    ProcessingOutcome::CopiedCorrupt(reason)
                }
                Err(e) => ProcessingOutcome::Failed(e.to_string()),
            }
        }
    };

    if let ProcessingOutcome::Failed(reason) = &outcome {
        warn!(file = %file.source_path.display(), %reason, "file failed");
        ctx.log(format!("{} Failed: {} - {}", ERROR_PREFIX, rel, reason));
        return outcome;
    }

    // The destination may be the source itself; never delete that.
    if options.delete_source && !file.is_in_place() {
        match fs::remove_file(&file.source_path) {
            Ok(()) => ctx.log(format!("{} Deleted source: {}", SUCCESS_PREFIX, rel)),
            Err(e) => {
                warn!(file = %file.source_path.display(), error = %e, "could not delete source");
                ctx.log(format!(
                    "{} Could not delete source {}: {}",
                    WARNING_PREFIX, rel, e
                ));
            }
        }
    }

    outcome
}
