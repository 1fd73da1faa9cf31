//! Worker loop: pull a job, invoke the transformation, record the outcome

use std::fs::File;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::config::ResolvedConfig;
use crate::error::Result;
use crate::metadata::MetadataLog;
use crate::parallel::progress::{ConsoleReporter, ThroughputTracker};
use crate::parallel::queue::{Job, WorkItem, WorkReceiver};
use crate::processing::{Outcome, Preprocessor};

/// Everything one worker needs, captured at spawn time
pub(crate) struct WorkerContext {
    pub id: usize,
    pub config: Arc<ResolvedConfig>,
    pub preprocessor: Arc<dyn Preprocessor>,
    pub receiver: WorkReceiver,
    pub metadata: Arc<MetadataLog>,
    pub reporter: Arc<ConsoleReporter>,
    pub tracker: Arc<ThroughputTracker>,
}

/// Per-worker tallies, returned to the dispatcher at join time
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct WorkerStats {
    pub processed: u64,
    pub failed: u64,
}

/// Result of invoking the transformation capability on one item
enum Invocation {
    /// The capability ran to completion (possibly reporting failure)
    Completed(Outcome),
    /// The capability returned `Err` or panicked; detail for diagnostics
    Fault(String),
}

/// Main loop of a pool worker
///
/// Exits on the first termination marker, or when the queue disconnects
/// (aborted run). A fault in the capability is isolated to its item; only a
/// metadata contract violation terminates the loop with an error.
pub(crate) fn worker_loop(ctx: WorkerContext) -> Result<WorkerStats> {
    let mut stats = WorkerStats::default();

    loop {
        let item = match ctx.receiver.recv() {
            Some(Job::Item(item)) => item,
            Some(Job::Shutdown) => {
                ctx.reporter
                    .report(format!("{{{}}} Got termination signal", ctx.id));
                break;
            }
            None => {
                warn!(worker = ctx.id, "work queue disconnected, exiting");
                break;
            }
        };

        ctx.reporter.report(format!(
            "{{{}}} will process {}",
            ctx.id,
            item.source.display()
        ));

        let outcome = match invoke_capability(&ctx, &item) {
            Invocation::Completed(outcome) => {
                if !outcome.success {
                    write_placeholder(&ctx, &item);
                    ctx.reporter.report(format!(
                        "Reported failure for {} ({})",
                        item.source.display(),
                        outcome.message
                    ));
                }
                outcome
            }
            Invocation::Fault(detail) => {
                ctx.reporter
                    .report(format!("An error happened for {}", item.source.display()));
                ctx.reporter.report(&detail);
                error!(worker = ctx.id, source = %item.source.display(), detail = %detail, "item fault");
                Outcome::default()
            }
        };

        let relative = item
            .source
            .strip_prefix(&ctx.config.source_root)
            .unwrap_or(&item.source);
        let row = ctx.metadata.build_row(relative, &outcome);
        ctx.metadata.append(&row)?;

        ctx.tracker.record_outcome(outcome.success);
        stats.processed += 1;
        if !outcome.success {
            stats.failed += 1;
        }
    }

    debug!(worker = ctx.id, processed = stats.processed, "worker done");
    Ok(stats)
}

/// Run the capability with both failure layers contained: an `Err` return
/// and a panic are each degraded to a per-item fault.
fn invoke_capability(ctx: &WorkerContext, item: &WorkItem) -> Invocation {
    let result = catch_unwind(AssertUnwindSafe(|| {
        ctx.preprocessor.process(&item.source, &item.dest)
    }));

    match result {
        Ok(Ok(outcome)) => Invocation::Completed(outcome),
        Ok(Err(e)) => Invocation::Fault(format!("transformation error: {}", e)),
        Err(payload) => Invocation::Fault(format!(
            "transformation panicked: {}",
            panic_detail(payload.as_ref())
        )),
    }
}

/// Create the empty placeholder marking a reported failure as attempted, so
/// a later run skips the item
fn write_placeholder(ctx: &WorkerContext, item: &WorkItem) {
    if let Err(e) = File::create(&item.dest) {
        ctx.reporter.report(format!(
            "Could not create placeholder {}: {}",
            item.dest.display(),
            e
        ));
        error!(worker = ctx.id, dest = %item.dest.display(), %e, "placeholder write failed");
    }
}

fn panic_detail(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        payload
            .downcast_ref::<String>()
            .cloned()
            .unwrap_or_else(|| "opaque panic payload".to_string())
    }
}
