//! Basic usage example for the FilePrep library
//!
//! Mirrors a tree of .jpg files into ./output using the built-in copy
//! transformation. Re-running skips everything already copied.

use fileprep::{init, CopyPreprocessor, Pipeline, RunConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize the library
    init()?;

    let config = RunConfig::new("input", "output", "jpg").workers(4);

    let pipeline = Pipeline::new(&config, CopyPreprocessor)?;
    let summary = pipeline.run()?;

    println!(
        "Mirrored {} files ({} skipped) in {:.2}s",
        summary.succeeded,
        summary.skipped,
        summary.elapsed.as_secs_f64()
    );

    Ok(())
}
