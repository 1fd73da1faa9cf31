//! FilePrep CLI - Concurrent Batch File Preprocessor
//!
//! Command-line front end for the fileprep pipeline. The built-in
//! transformation is a byte-for-byte copy, which makes the tool a concurrent
//! tree mirror with skip-if-exists semantics and a per-file metadata log;
//! library users plug in their own transformation.

use std::io::Write;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use fileprep::processing::{enumerate_files, PathMapper};
use fileprep::{init_with_filter, ConsoleReporter, CopyPreprocessor, Pipeline, RunConfig};

/// FilePrep - Concurrent Batch File Preprocessor
#[derive(Parser)]
#[command(
    name = "fileprep",
    version,
    about = "Batch-transform a directory tree through a fixed pool of workers",
    long_about = "FilePrep walks a source tree, mirrors its layout at a destination root, \
                  and pushes every matching file through a pool of worker threads. \
                  Pre-existing outputs are skipped, so interrupted runs can simply be \
                  re-invoked. Outcomes are recorded in a tab-delimited metadata log.",
    arg_required_else_help = false
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Source directory to enumerate
    #[arg(short, long, value_name = "PATH")]
    input: Option<PathBuf>,

    /// Destination root for the mirrored tree
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Extension of input files (with or without the leading dot)
    #[arg(short = 'e', long, value_name = "EXT")]
    input_ext: Option<String>,

    /// Extension of output files (default: same as input)
    #[arg(short = 'E', long, value_name = "EXT")]
    output_ext: Option<String>,

    /// Metadata log file name, created at the destination root
    #[arg(short, long, value_name = "FILE")]
    metadata_file: Option<String>,

    /// Attribute columns of the metadata log (comma-separated)
    #[arg(long, value_name = "COLS", value_delimiter = ',')]
    metadata_columns: Vec<String>,

    /// Number of worker threads (0 = auto-detect)
    #[arg(short, long, default_value = "4", value_name = "COUNT")]
    workers: usize,

    /// Capacity of the bounded work queue
    #[arg(long, default_value = "10", value_name = "SIZE")]
    queue_capacity: usize,

    /// Configuration file (.toml or .yaml); replaces the flags above
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Show what would be processed without actually processing
    #[arg(long)]
    dry_run: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short = 'Q', long, conflicts_with = "verbose")]
    quiet: bool,
}

/// Available subcommands
#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration file
    Config {
        /// Configuration file to validate
        file: PathBuf,
    },
    /// Generate an example configuration file
    ExampleConfig {
        /// Output file path
        #[arg(short, long, default_value = "fileprep.toml")]
        output: PathBuf,
        /// Use YAML format instead of TOML
        #[arg(long)]
        yaml: bool,
    },
    /// Show system information and capabilities
    Info,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };

    if let Err(e) = init_with_filter(log_level) {
        eprintln!(
            "{}: Failed to initialize FilePrep: {}",
            style("Error").red().bold(),
            e
        );
        process::exit(1);
    }

    // Handle subcommands
    if let Some(command) = cli.command {
        if let Err(e) = handle_subcommand(command) {
            eprintln!("{}: {}", style("Error").red().bold(), e);
            process::exit(1);
        }
        return;
    }

    if let Err(e) = run(cli) {
        eprintln!("{}: {}", style("Error").red().bold(), e);
        process::exit(1);
    }
}

/// Main operation: build the configuration and execute a run
fn run(cli: Cli) -> anyhow::Result<()> {
    let config = build_config(&cli)?;

    if cli.dry_run {
        return dry_run(&config);
    }

    // Spinner for interactive feedback; pipeline report lines are routed
    // through it so they don't clobber the bar.
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg} [{elapsed}]")
            .expect("static template"),
    );
    spinner.set_message("processing");
    spinner.enable_steady_tick(std::time::Duration::from_millis(120));

    let reporter = ConsoleReporter::with_writer(Box::new(ProgressWriter::new(spinner.clone())));
    let pipeline = Pipeline::new(&config, CopyPreprocessor)?.with_reporter(reporter);

    let summary = pipeline.run()?;
    spinner.finish_and_clear();

    summary.print_summary();
    Ok(())
}

/// Assemble the run configuration from a config file or from flags
fn build_config(cli: &Cli) -> anyhow::Result<RunConfig> {
    if let Some(config_path) = &cli.config {
        let config = RunConfig::from_file(config_path)?;
        info!("Loaded configuration from: {:?}", config_path);
        return Ok(config);
    }

    let (input, output, input_ext) = match (&cli.input, &cli.output, &cli.input_ext) {
        (Some(input), Some(output), Some(ext)) => (input.clone(), output.clone(), ext.clone()),
        _ => anyhow::bail!(
            "--input, --output and --input-ext are required (or pass --config). \
             Run with --help for usage information"
        ),
    };

    let mut config = RunConfig::new(input, output, input_ext)
        .workers(cli.workers)
        .queue_capacity(cli.queue_capacity);
    if let Some(ext) = &cli.output_ext {
        config = config.output_extension(ext.clone());
    }
    if let Some(filename) = &cli.metadata_file {
        config = config.metadata(filename.clone(), cli.metadata_columns.clone());
    }
    Ok(config)
}

/// List what a run would do, without creating directories or files
fn dry_run(config: &RunConfig) -> anyhow::Result<()> {
    let resolved = config.resolve()?;
    let mapper = PathMapper::new(&resolved);

    let mut to_process = 0u64;
    let mut to_skip = 0u64;
    for entry in enumerate_files(&resolved.source_root, &resolved.input_extension) {
        let source = entry?;
        let dest = mapper.dest_path(&source);
        if dest.exists() {
            to_skip += 1;
        } else {
            println!(
                "{} -> {}",
                mapper.relative_source(&source).display(),
                dest.display()
            );
            to_process += 1;
        }
    }

    println!(
        "Dry run: {} to process, {} already present",
        to_process, to_skip
    );
    Ok(())
}

/// Handle CLI subcommands
fn handle_subcommand(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Config { file } => {
            let config = RunConfig::from_file(&file)?;
            config.validate()?;
            println!(
                "{} Configuration file is valid: {:?}",
                style("OK").green().bold(),
                file
            );
        }
        Commands::ExampleConfig { output, yaml } => {
            let example = RunConfig::new("./input", "./output", "jpg")
                .metadata(
                    "preprocessed.tsv",
                    vec!["width".to_string(), "height".to_string()],
                )
                .workers(4);

            let path = if yaml {
                output.with_extension("yaml")
            } else {
                output
            };
            example.to_file(&path)?;
            println!("Wrote example configuration to {:?}", path);
        }
        Commands::Info => {
            print_system_info();
        }
    }
    Ok(())
}

/// Print system capabilities relevant to sizing a run
fn print_system_info() {
    use sysinfo::{System, SystemExt};

    let mut system = System::new_all();
    system.refresh_all();

    println!("FilePrep v{}", fileprep::VERSION);
    println!(
        "  Physical cores: {}",
        system.physical_core_count().unwrap_or(1)
    );
    println!("  Logical cores: {}", num_cpus::get());
    println!(
        "  Available memory: {:.1} GB",
        system.available_memory() as f64 / 1024.0 / 1024.0 / 1024.0
    );
    println!(
        "  Default workers: {}",
        fileprep::config::DEFAULT_WORKERS
    );
}

/// Routes pipeline report lines through the progress bar so concurrent
/// output doesn't tear the spinner
struct ProgressWriter {
    bar: ProgressBar,
    buffer: Vec<u8>,
}

impl ProgressWriter {
    fn new(bar: ProgressBar) -> Self {
        Self {
            bar,
            buffer: Vec::new(),
        }
    }
}

impl Write for ProgressWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            let text = String::from_utf8_lossy(&line[..line.len() - 1]);
            self.bar.println(text.as_ref());
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
