//! Parallel batch pipeline: dispatcher, worker pool, and shutdown protocol
//!
//! The dispatcher enumerates the source tree and feeds a bounded queue; a
//! fixed pool of worker threads drains it. Once enumeration is exhausted the
//! dispatcher floods the queue with termination markers while polling worker
//! liveness until every worker has been joined. Markers are not addressed,
//! so a worker pulling several of them is harmless.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error, info};

use crate::config::{ResolvedConfig, RunConfig};
use crate::error::{FilePrepError, Result};
use crate::metadata::MetadataLog;
use crate::processing::{enumerate_files, PathMapper, Preprocessor};

pub mod progress;
pub mod queue;
mod worker;

pub use progress::{ConsoleReporter, RunCounters, ThroughputTracker};
pub use queue::{Job, WorkItem, WorkQueue, WorkReceiver};

use worker::{worker_loop, WorkerContext, WorkerStats};

/// Dispatcher checkpoint cadence, in successfully enqueued items
const THROUGHPUT_REPORT_EVERY: u64 = 1000;

/// Sleep between liveness polls while draining
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

type WorkerHandle = (usize, JoinHandle<Result<WorkerStats>>);

/// Batch transformation pipeline
///
/// Owns the run configuration and the transformation capability; `run`
/// executes one full pass over the source tree.
pub struct Pipeline {
    config: Arc<ResolvedConfig>,
    preprocessor: Arc<dyn Preprocessor>,
    reporter: Arc<ConsoleReporter>,
}

impl Pipeline {
    /// Build a pipeline from a user configuration
    ///
    /// Resolves and validates the configuration up front; configuration
    /// defects surface here, before any work starts.
    pub fn new<P: Preprocessor + 'static>(config: &RunConfig, preprocessor: P) -> Result<Self> {
        Ok(Self {
            config: Arc::new(config.resolve()?),
            preprocessor: Arc::new(preprocessor),
            reporter: Arc::new(ConsoleReporter::stdout()),
        })
    }

    /// Replace the console reporter (tests, progress-bar frontends)
    pub fn with_reporter(mut self, reporter: ConsoleReporter) -> Self {
        self.reporter = Arc::new(reporter);
        self
    }

    /// The resolved configuration this pipeline runs with
    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    /// Execute one full run: enumerate, dispatch, drain, summarize
    pub fn run(&self) -> Result<RunSummary> {
        let tracker = Arc::new(ThroughputTracker::new());
        let metadata = Arc::new(MetadataLog::new(&self.config));

        // INIT: prepare the metadata log target and announce the columns
        if metadata.is_enabled() {
            fs::create_dir_all(&self.config.dest_root)
                .map_err(|e| FilePrepError::create_dir(self.config.dest_root.clone(), e))?;
            self.reporter.report(format!(
                "Metadata columns will be: {:?}",
                metadata.column_order()
            ));
        }

        info!(
            workers = self.config.workers,
            queue_capacity = self.config.queue_capacity,
            source = %self.config.source_root.display(),
            dest = %self.config.dest_root.display(),
            "starting worker pool"
        );

        let (queue, receiver) = WorkQueue::bounded(self.config.queue_capacity);

        let mut handles: Vec<WorkerHandle> = Vec::with_capacity(self.config.workers);
        for id in 0..self.config.workers {
            let ctx = WorkerContext {
                id,
                config: Arc::clone(&self.config),
                preprocessor: Arc::clone(&self.preprocessor),
                receiver: receiver.clone(),
                metadata: Arc::clone(&metadata),
                reporter: Arc::clone(&self.reporter),
                tracker: Arc::clone(&tracker),
            };
            let handle = thread::Builder::new()
                .name(format!("fileprep-worker-{}", id))
                .spawn(move || worker_loop(ctx))
                .map_err(|e| {
                    FilePrepError::worker(format!("Failed to spawn worker {}: {}", id, e))
                })?;
            handles.push((id, handle));
        }
        // Workers hold their own clones
        drop(receiver);

        // ENUMERATING
        if let Err(e) = self.dispatch_items(&queue, &tracker) {
            error!(%e, "dispatch aborted");
            return Err(self.abort(queue, handles, e));
        }

        // DRAINING
        self.drain(queue, handles)?;

        // DONE
        self.reporter.report("Done.");

        let counters = tracker.counters();
        info!(
            enqueued = counters.enqueued,
            skipped = counters.skipped,
            succeeded = counters.succeeded,
            failed = counters.failed,
            "run complete"
        );

        Ok(RunSummary {
            enqueued: counters.enqueued,
            skipped: counters.skipped,
            succeeded: counters.succeeded,
            failed: counters.failed,
            elapsed: tracker.elapsed(),
        })
    }

    /// Stream enumerated, mapped, filtered paths into the queue
    fn dispatch_items(&self, queue: &WorkQueue, tracker: &ThroughputTracker) -> Result<()> {
        let mapper = PathMapper::new(&self.config);
        let mut current_dest_dir: Option<PathBuf> = None;

        for entry in enumerate_files(&self.config.source_root, &self.config.input_extension) {
            let source = entry?;
            let dest_dir = mapper.dest_dir(&source);

            // Directories are usually traversed contiguously; create each
            // destination directory when first entered.
            if current_dest_dir.as_deref() != Some(dest_dir.as_path()) {
                if !dest_dir.exists() {
                    self.reporter
                        .report(format!("Will create dir {}", dest_dir.display()));
                    fs::create_dir_all(&dest_dir)
                        .map_err(|e| FilePrepError::create_dir(dest_dir.clone(), e))?;
                }
                current_dest_dir = Some(dest_dir.clone());
            }

            let dest = dest_dir.join(mapper.dest_file_name(&source));
            if dest.exists() {
                self.reporter.report(format!(
                    "Skipping existing file {}",
                    mapper.dest_file_name(&source).to_string_lossy()
                ));
                tracker.record_skipped();
                continue;
            }

            // Blocks while the queue is full: backpressure against a source
            // tree enumerating faster than workers can process.
            queue.push(WorkItem { source, dest })?;

            let count = tracker.record_enqueued();
            if count % THROUGHPUT_REPORT_EVERY == 0 {
                self.reporter.report(tracker.throughput_line(count));
            }
        }

        Ok(())
    }

    /// Flood the queue with termination markers while polling worker
    /// liveness; every worker observes exactly one marker and exits.
    fn drain(&self, queue: WorkQueue, mut pending: Vec<WorkerHandle>) -> Result<()> {
        let mut first_error: Option<FilePrepError> = None;

        while !pending.is_empty() {
            // Saturate the queue; workers still busy pick markers up on
            // their next pop.
            while queue.try_push_shutdown() {}

            let mut still_running = Vec::with_capacity(pending.len());
            for (id, handle) in pending {
                if handle.is_finished() {
                    self.reporter.report(format!("Worker {} exited", id));
                    match handle.join() {
                        Ok(Ok(stats)) => {
                            debug!(worker = id, processed = stats.processed, "joined worker");
                        }
                        Ok(Err(e)) => {
                            error!(worker = id, %e, "worker terminated with error");
                            first_error.get_or_insert(e);
                        }
                        Err(_) => {
                            first_error.get_or_insert(FilePrepError::worker(format!(
                                "Worker {} panicked outside the item boundary",
                                id
                            )));
                        }
                    }
                } else {
                    still_running.push((id, handle));
                }
            }
            pending = still_running;

            if !pending.is_empty() {
                thread::sleep(DRAIN_POLL_INTERVAL);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Abort path: close the queue so workers observe a disconnect after
    /// draining what remains, join them, and surface the most specific
    /// error available.
    fn abort(
        &self,
        queue: WorkQueue,
        handles: Vec<WorkerHandle>,
        cause: FilePrepError,
    ) -> FilePrepError {
        drop(queue);

        let mut worker_error: Option<FilePrepError> = None;
        for (id, handle) in handles {
            match handle.join() {
                Ok(Err(e)) => {
                    error!(worker = id, %e, "worker terminated with error");
                    worker_error.get_or_insert(e);
                }
                Ok(Ok(_)) => {}
                Err(_) => {
                    worker_error.get_or_insert(FilePrepError::worker(format!(
                        "Worker {} panicked outside the item boundary",
                        id
                    )));
                }
            }
        }

        // A disconnected-queue push failure is a symptom of workers dying;
        // their own error is the root cause.
        match (&cause, worker_error) {
            (FilePrepError::WorkerError { .. }, Some(root)) => root,
            (_, _) => cause,
        }
    }
}

/// Result of a completed run
#[derive(Debug, Clone, Copy)]
pub struct RunSummary {
    /// Items handed to workers
    pub enqueued: u64,
    /// Items skipped because the destination already existed
    pub skipped: u64,
    /// Items whose transformation reported success
    pub succeeded: u64,
    /// Items that failed or faulted
    pub failed: u64,
    /// Wall time of the whole run
    pub elapsed: Duration,
}

impl RunSummary {
    /// Total items considered (processed + skipped)
    pub fn total_seen(&self) -> u64 {
        self.enqueued + self.skipped
    }

    /// Average throughput in items per minute
    pub fn items_per_minute(&self) -> f64 {
        let minutes = self.elapsed.as_secs_f64() / 60.0;
        if minutes > 0.0 {
            (self.succeeded + self.failed) as f64 / minutes
        } else {
            0.0
        }
    }

    /// Print a human-readable summary to stdout
    pub fn print_summary(&self) {
        println!("Run results:");
        println!("  Processed: {}", self.succeeded + self.failed);
        println!("  Succeeded: {}", self.succeeded);
        if self.failed > 0 {
            println!("  Failed: {}", self.failed);
        }
        if self.skipped > 0 {
            println!("  Skipped (already present): {}", self.skipped);
        }
        println!("  Duration: {:.2}s", self.elapsed.as_secs_f64());
        if self.succeeded + self.failed > 0 {
            println!("  Speed: {:.1} items/min", self.items_per_minute());
        }
    }
}
