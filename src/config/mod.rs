//! Configuration management for FilePrep

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FilePrepError, Result};

/// Column names owned by the core; stripped from user-declared column lists
pub const RESERVED_COLUMNS: [&str; 3] = ["path", "success", "message"];

/// Default bound of the dispatcher/worker queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 10;

/// Default worker count when none is configured
pub const DEFAULT_WORKERS: usize = 4;

/// User-facing run configuration
///
/// This is the serde/CLI-friendly form. [`RunConfig::resolve`] normalizes it
/// into the immutable [`ResolvedConfig`] consumed by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Root of the source tree to enumerate
    pub source_root: PathBuf,

    /// Root under which the mirrored output tree is created
    pub dest_root: PathBuf,

    /// Extension of input files; files without it are skipped.
    /// Accepted with or without the leading dot.
    pub input_extension: String,

    /// Extension of output files (None = reuse the input extension)
    #[serde(default)]
    pub output_extension: Option<String>,

    /// Metadata log file name, created at the root of the destination tree.
    /// None disables metadata logging.
    #[serde(default)]
    pub metadata_filename: Option<String>,

    /// Attribute columns of the metadata log. Required when
    /// `metadata_filename` is set.
    #[serde(default)]
    pub metadata_columns: Option<Vec<String>>,

    /// Number of worker threads (0 = auto-detect)
    #[serde(default)]
    pub workers: usize,

    /// Capacity of the bounded work queue
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

impl RunConfig {
    /// Create a configuration with defaults for the optional fields
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>, S: Into<String>>(
        source_root: P,
        dest_root: Q,
        input_extension: S,
    ) -> Self {
        Self {
            source_root: source_root.into(),
            dest_root: dest_root.into(),
            input_extension: input_extension.into(),
            output_extension: None,
            metadata_filename: None,
            metadata_columns: None,
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    /// Set the output extension (defaults to the input extension)
    pub fn output_extension<S: Into<String>>(mut self, ext: S) -> Self {
        self.output_extension = Some(ext.into());
        self
    }

    /// Enable the metadata log with the given file name and attribute columns
    pub fn metadata<S: Into<String>>(mut self, filename: S, columns: Vec<String>) -> Self {
        self.metadata_filename = Some(filename.into());
        self.metadata_columns = Some(columns);
        self
    }

    /// Set the worker count (0 = auto-detect)
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set the work queue capacity
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Load configuration from a TOML or YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| {
            FilePrepError::config(format!(
                "Failed to read config file {:?}: {}",
                path.as_ref(),
                e
            ))
        })?;

        let extension = path
            .as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("");

        match extension.to_lowercase().as_str() {
            "toml" => toml::from_str(&content).map_err(Into::into),
            "yaml" | "yml" => serde_yaml::from_str(&content).map_err(Into::into),
            _ => Err(FilePrepError::config(
                "Unsupported config file format. Use .toml or .yaml",
            )),
        }
    }

    /// Save configuration to a TOML or YAML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let extension = path
            .as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("");

        let content = match extension.to_lowercase().as_str() {
            "toml" => toml::to_string_pretty(self)
                .map_err(|e| FilePrepError::config(format!("TOML serialization failed: {}", e)))?,
            "yaml" | "yml" => serde_yaml::to_string(self)
                .map_err(|e| FilePrepError::config(format!("YAML serialization failed: {}", e)))?,
            _ => {
                return Err(FilePrepError::config(
                    "Unsupported config file format. Use .toml or .yaml",
                ))
            }
        };

        std::fs::write(&path, content).map_err(|e| {
            FilePrepError::config(format!(
                "Failed to write config file {:?}: {}",
                path.as_ref(),
                e
            ))
        })?;

        Ok(())
    }

    /// Validate without resolving
    pub fn validate(&self) -> Result<()> {
        if self.input_extension.trim_matches('.').is_empty() {
            return Err(FilePrepError::config("Input extension must not be empty"));
        }

        if let Some(ext) = &self.output_extension {
            if ext.trim_matches('.').is_empty() {
                return Err(FilePrepError::config("Output extension must not be empty"));
            }
        }

        if self.metadata_filename.is_some() && self.metadata_columns.is_none() {
            return Err(FilePrepError::config(
                "metadata_columns is required when metadata_filename is set",
            ));
        }

        if self.queue_capacity == 0 {
            return Err(FilePrepError::config(
                "Queue capacity must be greater than 0",
            ));
        }

        Ok(())
    }

    /// Validate and normalize into the immutable form used by the pipeline
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        self.validate()?;

        let source_root = absolutize(&self.source_root)?;
        if !source_root.is_dir() {
            return Err(FilePrepError::config(format!(
                "Source root is not a directory: {:?}",
                source_root
            )));
        }
        let dest_root = absolutize(&self.dest_root)?;

        let input_extension = dotted(&self.input_extension);
        let output_extension = self
            .output_extension
            .as_deref()
            .map(dotted)
            .unwrap_or_else(|| input_extension.clone());

        let workers = match self.workers {
            0 => num_cpus::get().min(16),
            n => n,
        };

        // User-declared attribute columns with the fixed columns removed, in
        // declaration order. The fixed columns are prepended afterwards.
        let (metadata_path, attribute_columns, column_order) = match &self.metadata_filename {
            Some(filename) => {
                let columns = self
                    .metadata_columns
                    .as_ref()
                    .expect("validated above")
                    .iter()
                    .filter(|c| !RESERVED_COLUMNS.contains(&c.as_str()))
                    .cloned()
                    .collect::<Vec<_>>();

                let mut order: Vec<String> =
                    RESERVED_COLUMNS.iter().map(|c| c.to_string()).collect();
                order.extend(columns.iter().cloned());

                (Some(dest_root.join(filename)), columns, Some(order))
            }
            None => (None, Vec::new(), None),
        };

        Ok(ResolvedConfig {
            source_root,
            dest_root,
            input_extension,
            output_extension,
            metadata_path,
            attribute_columns,
            column_order,
            workers,
            queue_capacity: self.queue_capacity,
        })
    }
}

/// Normalized, validated configuration
///
/// Immutable for the lifetime of a run; shared by the dispatcher, the
/// workers, and the metadata log.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Absolute source root, no trailing separator
    pub source_root: PathBuf,
    /// Absolute destination root, no trailing separator
    pub dest_root: PathBuf,
    /// Input extension including the leading dot
    pub input_extension: String,
    /// Output extension including the leading dot
    pub output_extension: String,
    /// Full path of the metadata log, if configured
    pub metadata_path: Option<PathBuf>,
    /// Attribute columns (reserved names already stripped)
    pub attribute_columns: Vec<String>,
    /// Full column order: `[path, success, message, ...attribute_columns]`
    pub column_order: Option<Vec<String>>,
    /// Resolved worker count (always >= 1)
    pub workers: usize,
    /// Work queue bound
    pub queue_capacity: usize,
}

/// Prefix the extension with a dot if it lacks one
fn dotted(ext: &str) -> String {
    if ext.starts_with('.') {
        ext.to_string()
    } else {
        format!(".{}", ext)
    }
}

/// Make a path absolute against the current directory and drop any trailing
/// separator. Does not require the path to exist.
fn absolutize(path: &Path) -> Result<PathBuf> {
    let abs = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| FilePrepError::system(format!("Cannot resolve current directory: {}", e)))?
            .join(path)
    };
    // Rebuilding from components normalizes away trailing separators and "."
    Ok(abs.components().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn base_config(src: &Path) -> RunConfig {
        RunConfig::new(src, src.join("out"), "jpg")
    }

    #[test]
    fn test_extension_normalization() {
        let dir = TempDir::new().unwrap();
        let resolved = base_config(dir.path()).resolve().unwrap();
        assert_eq!(resolved.input_extension, ".jpg");
        assert_eq!(resolved.output_extension, ".jpg");

        let resolved = base_config(dir.path())
            .output_extension(".png")
            .resolve()
            .unwrap();
        assert_eq!(resolved.output_extension, ".png");
    }

    #[test]
    fn test_trailing_separator_stripped() {
        let dir = TempDir::new().unwrap();
        let with_slash = format!("{}/", dir.path().display());
        let config = RunConfig::new(&with_slash, dir.path().join("out"), "jpg");
        let resolved = config.resolve().unwrap();
        assert_eq!(resolved.source_root, dir.path().components().collect::<PathBuf>());
        assert!(!resolved.source_root.to_string_lossy().ends_with('/'));
    }

    #[test]
    fn test_metadata_requires_columns() {
        let dir = TempDir::new().unwrap();
        let mut config = base_config(dir.path());
        config.metadata_filename = Some("meta.tsv".to_string());
        assert!(matches!(
            config.resolve(),
            Err(FilePrepError::ConfigError { .. })
        ));
    }

    #[test]
    fn test_reserved_columns_stripped() {
        let dir = TempDir::new().unwrap();
        let config = base_config(dir.path()).metadata(
            "meta.tsv",
            vec![
                "width".to_string(),
                "path".to_string(),
                "height".to_string(),
                "success".to_string(),
            ],
        );
        let resolved = config.resolve().unwrap();
        assert_eq!(resolved.attribute_columns, vec!["width", "height"]);
        assert_eq!(
            resolved.column_order.as_deref().unwrap(),
            ["path", "success", "message", "width", "height"]
        );
        assert_eq!(
            resolved.metadata_path.unwrap(),
            resolved.dest_root.join("meta.tsv")
        );
    }

    #[test]
    fn test_worker_autodetect() {
        let dir = TempDir::new().unwrap();
        let resolved = base_config(dir.path()).workers(0).resolve().unwrap();
        assert!(resolved.workers >= 1);
        assert!(resolved.workers <= 16);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let dir = TempDir::new().unwrap();
        let config = base_config(dir.path()).queue_capacity(0);
        assert!(config.resolve().is_err());
    }

    #[test]
    fn test_missing_source_root_rejected() {
        let dir = TempDir::new().unwrap();
        let config = RunConfig::new(dir.path().join("nope"), dir.path().join("out"), "jpg");
        assert!(config.resolve().is_err());
    }

    #[test]
    fn test_config_file_io() {
        let dir = TempDir::new().unwrap();
        let config = base_config(dir.path())
            .metadata("meta.tsv", vec!["width".to_string()])
            .workers(2);

        let toml_path = dir.path().join("run.toml");
        config.to_file(&toml_path).unwrap();
        let loaded = RunConfig::from_file(&toml_path).unwrap();
        assert_eq!(loaded.workers, 2);
        assert_eq!(loaded.metadata_filename.as_deref(), Some("meta.tsv"));

        let yaml_path = dir.path().join("run.yaml");
        config.to_file(&yaml_path).unwrap();
        let loaded = RunConfig::from_file(&yaml_path).unwrap();
        assert_eq!(loaded.input_extension, "jpg");
    }
}
