// src/worker.rs
//
// The batch worker: walks an ordered file list and publishes progress and
// result events over a channel the UI side polls. Sequential by default;
// an explicit thread count turns on the rayon pool.

use crate::engine::{convert, panic_message, ConversionResult, ConversionSettings};
use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{error, info};

/// Hard cap on worker threads; memory use grows with every concurrently
/// decoded image.
pub const MAX_WORKER_THREADS: usize = 8;

/// Explicit worker configuration. Nothing here is ambient: the embedding
/// application decides and passes it in at spawn time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Number of files converted concurrently. 1 = strictly sequential in
    /// file-list order (the default); higher values run on a dedicated
    /// rayon pool and interleave per-file events.
    pub threads: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self { threads: 1 }
    }
}

impl WorkerConfig {
    pub fn sequential() -> Self {
        Self::default()
    }

    pub fn parallel() -> Self {
        Self {
            threads: Self::suggested_parallelism(),
        }
    }

    /// CPU-derived thread count, capped at MAX_WORKER_THREADS.
    pub fn suggested_parallelism() -> usize {
        thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
            .min(MAX_WORKER_THREADS)
    }

    fn effective_threads(&self) -> usize {
        self.threads.clamp(1, MAX_WORKER_THREADS)
    }
}

/// Cooperative cancellation flag, checked between files (never mid-file).
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// One failed file, as listed in the final report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedFile {
    pub file: String,
    pub reason: String,
}

/// Aggregated outcome of a batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: Vec<FailedFile>,
    pub results: Vec<ConversionResult>,
    pub elapsed_secs: f64,
}

impl BatchReport {
    fn record(&mut self, result: ConversionResult) {
        if result.success {
            self.succeeded += 1;
        } else {
            self.failed.push(FailedFile {
                file: file_name(&result.input_path),
                reason: result
                    .failure
                    .as_ref()
                    .map(|f| f.message.clone())
                    .unwrap_or_else(|| "unknown failure".to_string()),
            });
        }
        self.results.push(result);
    }

    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.succeeded as f64 / self.total as f64 * 100.0
    }
}

/// Messages published by the worker, in enqueue order: one `Progress`
/// before each file, one `FileResult` after it, then exactly one terminal
/// `Complete`, `Cancelled` or `Failed`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BatchEvent {
    Progress {
        index: usize,
        total: usize,
        file: String,
    },
    FileResult {
        index: usize,
        result: ConversionResult,
    },
    Complete {
        report: BatchReport,
    },
    Cancelled {
        report: BatchReport,
    },
    Failed {
        message: String,
    },
}

/// Handle to a running batch: the event receiver, the cancellation token,
/// and the worker's join handle.
pub struct BatchHandle {
    events: Receiver<BatchEvent>,
    cancel: CancelToken,
    handle: JoinHandle<()>,
}

impl BatchHandle {
    /// The event channel, for consumers that select/iterate themselves.
    pub fn events(&self) -> &Receiver<BatchEvent> {
        &self.events
    }

    /// Non-blocking poll, the shape a UI refresh loop wants.
    pub fn try_event(&self) -> Option<BatchEvent> {
        self.events.try_recv().ok()
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Wait for the worker thread to exit. Worker panics are already
    /// converted into a `Failed` event, so join errors are swallowed.
    pub fn join(self) {
        let _ = self.handle.join();
    }
}

/// Start a batch on a dedicated worker thread. The file list and settings
/// are moved in and stay immutable for the batch lifetime.
pub fn spawn_batch(
    files: Vec<PathBuf>,
    settings: ConversionSettings,
    config: WorkerConfig,
) -> BatchHandle {
    spawn_batch_with(files, settings, config, CancelToken::new())
}

/// Like [`spawn_batch`], but with a caller-supplied cancellation token, so
/// a shell can wire one token to several batches (or cancel up front).
pub fn spawn_batch_with(
    files: Vec<PathBuf>,
    settings: ConversionSettings,
    config: WorkerConfig,
    cancel: CancelToken,
) -> BatchHandle {
    let (tx, rx) = unbounded();
    let worker_cancel = cancel.clone();

    let handle = thread::spawn(move || {
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            run_batch(&files, &settings, &config, &worker_cancel, &tx)
        }));
        if let Err(panic) = outcome {
            let message = panic_message(&panic);
            error!(message = %message, "batch worker failed");
            let _ = tx.send(BatchEvent::Failed { message });
        }
    });

    BatchHandle {
        events: rx,
        cancel,
        handle,
    }
}

fn run_batch(
    files: &[PathBuf],
    settings: &ConversionSettings,
    config: &WorkerConfig,
    cancel: &CancelToken,
    tx: &Sender<BatchEvent>,
) {
    let started = Instant::now();
    let total = files.len();
    let mut report = BatchReport {
        total,
        ..BatchReport::default()
    };
    info!(total, threads = config.effective_threads(), "batch started");

    let cancelled = if config.effective_threads() > 1 {
        run_files_parallel(files, settings, config, cancel, tx, &mut report)
    } else {
        run_files_sequential(files, settings, cancel, tx, &mut report)
    };

    report.elapsed_secs = started.elapsed().as_secs_f64();
    info!(
        succeeded = report.succeeded,
        failed = report.failed.len(),
        cancelled,
        elapsed_secs = report.elapsed_secs,
        "batch finished"
    );

    let event = if cancelled {
        BatchEvent::Cancelled { report }
    } else {
        BatchEvent::Complete { report }
    };
    let _ = tx.send(event);
}

/// Returns true when the batch was cancelled before completing.
fn run_files_sequential(
    files: &[PathBuf],
    settings: &ConversionSettings,
    cancel: &CancelToken,
    tx: &Sender<BatchEvent>,
    report: &mut BatchReport,
) -> bool {
    let total = files.len();
    for (index, file) in files.iter().enumerate() {
        if cancel.is_cancelled() {
            return true;
        }
        let _ = tx.send(BatchEvent::Progress {
            index,
            total,
            file: file_name(file),
        });
        let result = convert(file, settings);
        report.record(result.clone());
        let _ = tx.send(BatchEvent::FileResult { index, result });
    }
    false
}

/// Parallel variant on a dedicated rayon pool. Per-file events interleave
/// across files, but each still carries its list index, and results are
/// recorded into the report in list order.
fn run_files_parallel(
    files: &[PathBuf],
    settings: &ConversionSettings,
    config: &WorkerConfig,
    cancel: &CancelToken,
    tx: &Sender<BatchEvent>,
    report: &mut BatchReport,
) -> bool {
    use rayon::prelude::*;

    let pool = match rayon::ThreadPoolBuilder::new()
        .num_threads(config.effective_threads())
        .build()
    {
        Ok(pool) => pool,
        Err(e) => {
            tracing::warn!(error = %e, "falling back to sequential batch");
            return run_files_sequential(files, settings, cancel, tx, report);
        }
    };

    let total = files.len();
    let outcomes: Vec<Option<ConversionResult>> = pool.install(|| {
        files
            .par_iter()
            .enumerate()
            .map(|(index, file)| {
                if cancel.is_cancelled() {
                    return None;
                }
                let _ = tx.send(BatchEvent::Progress {
                    index,
                    total,
                    file: file_name(file),
                });
                let result = convert(file, settings);
                let _ = tx.send(BatchEvent::FileResult {
                    index,
                    result: result.clone(),
                });
                Some(result)
            })
            .collect()
    });

    let mut cancelled = false;
    for outcome in outcomes {
        match outcome {
            Some(result) => report.record(result),
            None => cancelled = true,
        }
    }
    cancelled
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
