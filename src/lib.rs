//! FilePrep - Concurrent Batch File Preprocessor
//!
//! Transforms a directory tree of files through a user-supplied
//! transformation, fanning work out across a fixed pool of workers,
//! mirroring the source layout at a destination root, and recording a
//! per-file metadata log. Designed for dataset preparation pipelines where
//! a run may cover millions of files and must be resumable by re-invocation.
//!
//! # Features
//!
//! - **Fixed worker pool**: bounded queue with blocking hand-off, so memory
//!   stays flat no matter how large the source tree is
//! - **Idempotent runs**: pre-existing outputs are skipped, failed items
//!   leave placeholders, re-runs process only what is missing
//! - **Per-file metadata**: tab-delimited log with user-declared attribute
//!   columns, appended crash-safely one row at a time
//! - **Fault isolation**: a panicking or erroring transformation affects
//!   only its item, never the run
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use fileprep::{Outcome, Pipeline, RunConfig};
//! use std::path::Path;
//!
//! let config = RunConfig::new("~/data/photos", "~/data/photos_out", "jpg")
//!     .metadata("preprocessed.tsv", vec!["bytes".to_string()])
//!     .workers(4);
//!
//! let pipeline = Pipeline::new(&config, |source: &Path, dest: &Path| -> fileprep::Result<Outcome> {
//!     let bytes = std::fs::copy(source, dest)?;
//!     Ok(Outcome::success().with_attribute("bytes", bytes))
//! })?;
//!
//! let summary = pipeline.run()?;
//! println!("processed {} items", summary.succeeded + summary.failed);
//! # Ok::<(), fileprep::FilePrepError>(())
//! ```

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod metadata;
pub mod parallel;
pub mod processing;

// Re-export commonly used types
pub use config::{ResolvedConfig, RunConfig};
pub use error::{FilePrepError, Result};
pub use metadata::{MetadataLog, MetadataRow};
pub use parallel::{ConsoleReporter, Pipeline, RunSummary, WorkItem};
pub use processing::{CopyPreprocessor, Outcome, Preprocessor};

use tracing::{info, warn};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the FilePrep library with default settings
///
/// This sets up logging, validates system requirements, and performs
/// any necessary initialization. Should be called once at program start.
pub fn init() -> Result<()> {
    // Initialize tracing subscriber if not already set
    if tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .finish(),
    )
    .is_ok()
    {
        info!("FilePrep v{} initialized", VERSION);
    }

    // Validate system capabilities
    validate_system_requirements()?;

    Ok(())
}

/// Initialize with an explicit log filter (e.g. "debug", "fileprep=trace")
pub fn init_with_filter(filter: &str) -> Result<()> {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(filter)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_ok() {
        info!("FilePrep v{} initialized with filter {}", VERSION, filter);
    }

    validate_system_requirements()?;

    Ok(())
}

fn validate_system_requirements() -> Result<()> {
    use sysinfo::{System, SystemExt};

    let mut system = System::new_all();
    system.refresh_all();

    // Check available memory
    let available_memory = system.available_memory();
    const MIN_MEMORY_MB: u64 = 256;

    if available_memory < MIN_MEMORY_MB * 1024 * 1024 {
        warn!(
            "Low available memory: {}MB (recommended: >{}MB)",
            available_memory / (1024 * 1024),
            MIN_MEMORY_MB
        );
    }

    // Check CPU count
    let cpu_count = system.physical_core_count().unwrap_or(1);
    info!("Detected {} CPU cores", cpu_count);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
        assert!(VERSION.contains('.'));
    }

    #[test]
    fn test_init() {
        // Should not fail on multiple calls
        let _ = init();
        let _ = init();
    }

    #[test]
    fn test_system_validation() {
        assert!(validate_system_requirements().is_ok());
    }
}
