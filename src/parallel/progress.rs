//! Progress tracking and serialized console output

use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::debug;

/// Serializes operator-facing output from the dispatcher and all workers
///
/// One lock, held only around the write, so multi-line reports from
/// different workers never interleave. Diagnostic logging goes through
/// `tracing` instead; this channel is the run's progress stream.
pub struct ConsoleReporter {
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleReporter {
    /// Reporter writing to stdout
    pub fn stdout() -> Self {
        Self::with_writer(Box::new(std::io::stdout()))
    }

    /// Reporter writing to an arbitrary sink (progress bars, test buffers)
    pub fn with_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(writer),
        }
    }

    /// Write one report line
    ///
    /// Output failures are deliberately ignored; losing a progress line must
    /// not fail the run.
    pub fn report<S: AsRef<str>>(&self, message: S) {
        let mut out = self.out.lock().unwrap();
        let _ = writeln!(out, "{}", message.as_ref());
        let _ = out.flush();
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::stdout()
    }
}

/// Shared run counters
///
/// Updated with relaxed atomics from the dispatcher and every worker; reads
/// are advisory (throughput reporting), not authoritative synchronization.
pub struct ThroughputTracker {
    started: Instant,
    enqueued: AtomicU64,
    skipped: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
}

impl ThroughputTracker {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            enqueued: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            succeeded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    /// Record one enqueued item; returns the running total
    pub fn record_enqueued(&self) -> u64 {
        self.enqueued.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Record one skipped item (pre-existing destination)
    pub fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one processed item's outcome
    pub fn record_outcome(&self, success: bool) {
        if success {
            self.succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        debug!(success, "recorded item outcome");
    }

    /// Elapsed wall time since the tracker was created
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Snapshot of the counters
    pub fn counters(&self) -> RunCounters {
        RunCounters {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }

    /// Throughput report line for the periodic dispatcher checkpoint
    pub fn throughput_line(&self, count: u64) -> String {
        let minutes = self.elapsed().as_secs_f64() / 60.0;
        let per_minute = if minutes > 0.0 {
            count as f64 / minutes
        } else {
            0.0
        };
        format!(
            "{} done, total time {:.2} min, file/min {:.1}",
            count, minutes, per_minute
        )
    }
}

impl Default for ThroughputTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time counter values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunCounters {
    pub enqueued: u64,
    pub skipped: u64,
    pub succeeded: u64,
    pub failed: u64,
}
