//! Batch-convert a tree of JPEG images to grayscale PNGs
//!
//! The metadata log records each image's width and height alongside the
//! three fixed columns. Decode and encode problems are reported as expected
//! failures so the run keeps going and the offending files get placeholders.

use std::path::Path;

use fileprep::{init, Outcome, Pipeline, RunConfig};

fn grayscale(source: &Path, dest: &Path) -> fileprep::Result<Outcome> {
    let image = match image::open(source) {
        Ok(image) => image,
        Err(e) => return Ok(Outcome::failure(format!("decode failed: {}", e))),
    };

    let (width, height) = (image.width(), image.height());

    if let Err(e) = image.grayscale().save(dest) {
        return Ok(Outcome::failure(format!("encode failed: {}", e)));
    }

    Ok(Outcome::success()
        .with_attribute("width", width)
        .with_attribute("height", height))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init()?;

    // "testimgs" contains jpg images in various subdirectories;
    // "testimgs_out" is initially empty
    let home = std::env::var("HOME")?;
    let config = RunConfig::new(
        format!("{}/data/testimgs", home),
        format!("{}/data/testimgs_out", home),
        "jpg",
    )
    .output_extension("png")
    .metadata(
        "preprocessed.tsv",
        vec!["width".to_string(), "height".to_string()],
    )
    .workers(4);

    let summary = Pipeline::new(&config, grayscale)?.run()?;
    summary.print_summary();

    Ok(())
}
