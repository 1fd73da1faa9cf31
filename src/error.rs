//! Error types and handling for FilePrep

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for FilePrep operations
pub type Result<T> = std::result::Result<T, FilePrepError>;

/// Main error type for FilePrep operations
#[derive(Debug, Error)]
pub enum FilePrepError {
    /// I/O related errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Directory traversal errors
    #[error("Directory walk error: {0}")]
    WalkError(#[from] walkdir::Error),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Destination directory could not be created
    #[error("Failed to create destination directory {dir:?}: {source}")]
    CreateDirError {
        dir: PathBuf,
        source: std::io::Error,
    },

    /// Metadata row keys do not match the configured column order
    #[error("Metadata contract violation: row columns {row_columns:?} do not match configured columns {expected_columns:?}")]
    MetadataContract {
        row_columns: Vec<String>,
        expected_columns: Vec<String>,
    },

    /// Metadata log file could not be written
    #[error("Failed to append to metadata log {path:?}: {source}")]
    MetadataWriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Worker pool errors (spawn failure, poisoned worker, join failure)
    #[error("Worker pool error: {message}")]
    WorkerError { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    SerdeError(String),

    /// System resource errors
    #[error("System resource error: {message}")]
    SystemError { message: String },
}

impl FilePrepError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new destination-directory creation error
    pub fn create_dir(dir: PathBuf, source: std::io::Error) -> Self {
        Self::CreateDirError { dir, source }
    }

    /// Create a new metadata contract violation
    pub fn metadata_contract(row_columns: Vec<String>, expected_columns: Vec<String>) -> Self {
        Self::MetadataContract {
            row_columns,
            expected_columns,
        }
    }

    /// Create a new metadata write error
    pub fn metadata_write(path: PathBuf, source: std::io::Error) -> Self {
        Self::MetadataWriteError { path, source }
    }

    /// Create a new worker pool error
    pub fn worker<S: Into<String>>(message: S) -> Self {
        Self::WorkerError {
            message: message.into(),
        }
    }

    /// Create a new system error
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::SystemError {
            message: message.into(),
        }
    }

    /// Check if this error is recoverable (the run can continue)
    ///
    /// Per-item failures are recovered at the worker boundary and never
    /// surface as `FilePrepError`, so almost everything here is fatal to the
    /// run. Only plain I/O on an individual file is treated as recoverable.
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Individual file I/O can be isolated to the offending item
            Self::IoError(_) => true,

            // Traversal and dispatcher-level failures abort the run
            Self::WalkError(_) | Self::CreateDirError { .. } => false,

            // Contract and configuration defects must surface
            Self::MetadataContract { .. }
            | Self::MetadataWriteError { .. }
            | Self::ConfigError { .. }
            | Self::SerdeError(_) => false,

            // Pool and system failures stop all processing
            Self::WorkerError { .. } | Self::SystemError { .. } => false,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::IoError(e) => format!("File system error: {}", e),
            Self::WalkError(e) => format!("Failed to enumerate source tree: {}", e),
            Self::CreateDirError { dir, source } => {
                format!("Could not create output directory {:?}: {}", dir, source)
            }
            Self::MetadataContract { .. } => {
                "Metadata row does not match the configured columns. \
                 This indicates a bug in the transformation's attribute set."
                    .to_string()
            }
            other => other.to_string(),
        }
    }
}

// Convert serde errors to our error type
impl From<toml::de::Error> for FilePrepError {
    fn from(err: toml::de::Error) -> Self {
        Self::SerdeError(format!("TOML parsing error: {}", err))
    }
}

impl From<serde_yaml::Error> for FilePrepError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::SerdeError(format!("YAML parsing error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = FilePrepError::config("test message");
        assert!(matches!(err, FilePrepError::ConfigError { .. }));
    }

    #[test]
    fn test_recoverable_errors() {
        let io = FilePrepError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing",
        ));
        assert!(io.is_recoverable());
        assert!(!FilePrepError::config("bad").is_recoverable());
        assert!(!FilePrepError::metadata_contract(vec![], vec!["path".into()]).is_recoverable());
    }

    #[test]
    fn test_user_messages() {
        let err = FilePrepError::metadata_contract(
            vec!["path".into()],
            vec!["path".into(), "success".into()],
        );
        let msg = err.user_message();
        assert!(msg.contains("configured columns"));
    }
}
