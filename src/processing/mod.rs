//! Transformation capability and per-item outcome types
//!
//! The core never interprets file contents itself; it invokes a
//! [`Preprocessor`] for every (source, destination) pair and records the
//! outcome. Format-specific work lives entirely behind that trait.

use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;

use crate::error::Result;

pub mod discover;
pub mod mapping;

pub use discover::*;
pub use mapping::*;

/// Outcome of transforming a single file
///
/// Expected failures are signalled with `success = false` and a message;
/// returning `Err` (or panicking) is reserved for unexpected faults, which
/// the worker isolates to the offending item.
#[derive(Debug, Clone, Default)]
pub struct Outcome {
    /// Whether the transformation produced a usable output
    pub success: bool,
    /// Human-readable note, recorded in the metadata log
    pub message: String,
    /// Extra attributes for the metadata log; missing configured columns are
    /// padded with null before the row is written
    pub attributes: HashMap<String, Value>,
}

impl Outcome {
    /// Successful outcome with no attributes
    pub fn success() -> Self {
        Self {
            success: true,
            message: String::new(),
            attributes: HashMap::new(),
        }
    }

    /// Failed outcome with a message
    pub fn failure<S: Into<String>>(message: S) -> Self {
        Self {
            success: false,
            message: message.into(),
            attributes: HashMap::new(),
        }
    }

    /// Attach an attribute
    pub fn with_attribute<S: Into<String>, V: Into<Value>>(mut self, name: S, value: V) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

/// The transformation capability invoked once per work item
///
/// Implementations must be shareable across worker threads. `dest` names a
/// file in an already-created directory; the implementation is responsible
/// for writing it on success.
pub trait Preprocessor: Send + Sync {
    /// Transform `source` into `dest`, reporting the outcome
    fn process(&self, source: &Path, dest: &Path) -> Result<Outcome>;
}

impl<F> Preprocessor for F
where
    F: Fn(&Path, &Path) -> Result<Outcome> + Send + Sync,
{
    fn process(&self, source: &Path, dest: &Path) -> Result<Outcome> {
        self(source, dest)
    }
}

/// Built-in byte-for-byte copy transformation
///
/// Used by the CLI so the tool is usable standalone; records the copied size
/// under the `bytes` attribute.
#[derive(Debug, Default)]
pub struct CopyPreprocessor;

impl Preprocessor for CopyPreprocessor {
    fn process(&self, source: &Path, dest: &Path) -> Result<Outcome> {
        let bytes = std::fs::copy(source, dest)?;
        Ok(Outcome::success().with_attribute("bytes", bytes))
    }
}
