//! Per-item metadata logging
//!
//! One tab-delimited row is appended per processed work item, in completion
//! order. Each append opens, writes, flushes, and closes the file so a crash
//! between items never leaves a torn row behind; the cost is negligible next
//! to the transformation itself.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use serde_json::Value;

use crate::config::ResolvedConfig;
use crate::error::{FilePrepError, Result};
use crate::processing::Outcome;

/// Append-only metadata log shared by all workers
///
/// Appends are serialized by an internal lock held only for the duration of
/// the write. When no log path is configured every call is a no-op.
pub struct MetadataLog {
    path: Option<PathBuf>,
    column_order: Vec<String>,
    attribute_columns: Vec<String>,
    lock: Mutex<()>,
}

impl MetadataLog {
    /// Create the log writer for a run
    pub fn new(config: &ResolvedConfig) -> Self {
        Self {
            path: config.metadata_path.clone(),
            column_order: config.column_order.clone().unwrap_or_default(),
            attribute_columns: config.attribute_columns.clone(),
            lock: Mutex::new(()),
        }
    }

    /// Whether a log file is configured
    pub fn is_enabled(&self) -> bool {
        self.path.is_some()
    }

    /// The configured column order (empty when logging is disabled)
    pub fn column_order(&self) -> &[String] {
        &self.column_order
    }

    /// Build a row for a processed item
    ///
    /// Pads attribute columns absent from the outcome with null and fills the
    /// three fixed columns. The resulting key set always matches the
    /// configured column order.
    pub fn build_row(&self, relative_path: &std::path::Path, outcome: &Outcome) -> MetadataRow {
        let mut values = outcome.attributes.clone();
        for column in &self.attribute_columns {
            values.entry(column.clone()).or_insert(Value::Null);
        }
        // Attributes outside the configured columns stay in the row and fail
        // the append-time contract check; a transformation emitting them is
        // misconfigured and must not pass silently.

        values.insert(
            "path".to_string(),
            Value::String(relative_path.to_string_lossy().into_owned()),
        );
        values.insert(
            "success".to_string(),
            Value::from(if outcome.success { 1 } else { 0 }),
        );
        values.insert("message".to_string(), Value::String(outcome.message.clone()));

        MetadataRow { values }
    }

    /// Append one row to the log
    ///
    /// Fails with [`FilePrepError::MetadataContract`] if the row's key set
    /// does not exactly match the configured column order; this signals a
    /// defect and must not be swallowed by the caller.
    pub fn append(&self, row: &MetadataRow) -> Result<()> {
        let path = match &self.path {
            Some(path) => path,
            None => return Ok(()),
        };

        if row.values.len() != self.column_order.len()
            || !self.column_order.iter().all(|c| row.values.contains_key(c))
        {
            let mut row_columns: Vec<String> = row.values.keys().cloned().collect();
            row_columns.sort();
            return Err(FilePrepError::metadata_contract(
                row_columns,
                self.column_order.clone(),
            ));
        }

        let line = self
            .column_order
            .iter()
            .map(|column| cell(&row.values[column]))
            .collect::<Vec<_>>()
            .join("\t");

        let _guard = self.lock.lock().unwrap();
        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .map_err(|e| FilePrepError::metadata_write(path.clone(), e))?;
        writeln!(file, "{}", line).map_err(|e| FilePrepError::metadata_write(path.clone(), e))?;
        file.flush()
            .map_err(|e| FilePrepError::metadata_write(path.clone(), e))?;
        Ok(())
    }
}

/// One logged outcome record
#[derive(Debug, Clone)]
pub struct MetadataRow {
    values: HashMap<String, Value>,
}

impl MetadataRow {
    /// Value of a column, if present
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }
}

/// Render one cell; nulls become empty fields, strings are written raw with
/// field-breaking characters replaced
fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.replace(['\t', '\n', '\r'], " "),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;
    use tempfile::TempDir;

    fn log_for(dir: &TempDir) -> (MetadataLog, ResolvedConfig) {
        std::fs::create_dir_all(dir.path().join("out")).unwrap();
        let config = RunConfig::new(dir.path(), dir.path().join("out"), "jpg")
            .metadata("meta.tsv", vec!["width".to_string(), "height".to_string()])
            .resolve()
            .unwrap();
        (MetadataLog::new(&config), config)
    }

    #[test]
    fn test_row_padding_and_order() {
        let dir = TempDir::new().unwrap();
        let (log, config) = log_for(&dir);

        let outcome = Outcome::success().with_attribute("width", 10);
        let row = log.build_row(std::path::Path::new("a/1.jpg"), &outcome);

        assert_eq!(row.get("path").unwrap(), &Value::from("a/1.jpg"));
        assert_eq!(row.get("success").unwrap(), &Value::from(1));
        assert_eq!(row.get("width").unwrap(), &Value::from(10));
        assert_eq!(row.get("height").unwrap(), &Value::Null);

        log.append(&row).unwrap();
        let content = std::fs::read_to_string(config.metadata_path.unwrap()).unwrap();
        assert_eq!(content, "a/1.jpg\t1\t\t10\t\n");
    }

    #[test]
    fn test_append_accumulates_rows() {
        let dir = TempDir::new().unwrap();
        let (log, config) = log_for(&dir);

        for i in 0..3 {
            let outcome = Outcome::failure(format!("bad {}", i));
            let row = log.build_row(std::path::Path::new("x.jpg"), &outcome);
            log.append(&row).unwrap();
        }

        let content = std::fs::read_to_string(config.metadata_path.unwrap()).unwrap();
        assert_eq!(content.lines().count(), 3);
        assert!(content.lines().all(|l| l.starts_with("x.jpg\t0\tbad ")));
    }

    #[test]
    fn test_contract_violation_detected() {
        let dir = TempDir::new().unwrap();
        let (log, _config) = log_for(&dir);

        let mut row = log.build_row(std::path::Path::new("x.jpg"), &Outcome::success());
        row.values.remove("width");

        assert!(matches!(
            log.append(&row),
            Err(FilePrepError::MetadataContract { .. })
        ));
    }

    #[test]
    fn test_unknown_attributes_violate_contract() {
        let dir = TempDir::new().unwrap();
        let (log, _config) = log_for(&dir);

        let outcome = Outcome::success().with_attribute("surprise", 1);
        let row = log.build_row(std::path::Path::new("x.jpg"), &outcome);
        assert!(matches!(
            log.append(&row),
            Err(FilePrepError::MetadataContract { .. })
        ));
    }

    #[test]
    fn test_disabled_log_is_noop() {
        let dir = TempDir::new().unwrap();
        let config = RunConfig::new(dir.path(), dir.path().join("out"), "jpg")
            .resolve()
            .unwrap();
        let log = MetadataLog::new(&config);
        assert!(!log.is_enabled());

        let row = log.build_row(std::path::Path::new("x.jpg"), &Outcome::success());
        log.append(&row).unwrap();
        assert!(!config.dest_root.exists() || std::fs::read_dir(&config.dest_root).unwrap().next().is_none());
    }

    #[test]
    fn test_tab_in_message_sanitized() {
        let dir = TempDir::new().unwrap();
        let (log, config) = log_for(&dir);

        let outcome = Outcome::failure("bad\theader\nline");
        let row = log.build_row(std::path::Path::new("x.jpg"), &outcome);
        log.append(&row).unwrap();

        let content = std::fs::read_to_string(config.metadata_path.unwrap()).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.contains("bad header line"));
    }
}
