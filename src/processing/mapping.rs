//! Destination path derivation
//!
//! Pure functions of the configuration and the input path; the dispatcher is
//! the only caller. The destination tree mirrors the source tree layout with
//! the configured output extension substituted.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::config::ResolvedConfig;

/// Maps source paths into the destination tree
#[derive(Debug, Clone, Copy)]
pub struct PathMapper<'a> {
    config: &'a ResolvedConfig,
}

impl<'a> PathMapper<'a> {
    pub fn new(config: &'a ResolvedConfig) -> Self {
        Self { config }
    }

    /// Destination directory for a source file: the containing directory with
    /// the `source_root` prefix replaced by `dest_root`.
    ///
    /// `source` must be under `source_root` (the enumerator guarantees this).
    pub fn dest_dir(&self, source: &Path) -> PathBuf {
        let parent = source.parent().unwrap_or(&self.config.source_root);
        let relative = parent
            .strip_prefix(&self.config.source_root)
            .expect("enumerated path not under source root");
        self.config.dest_root.join(relative)
    }

    /// Destination file name: the source stem with the output extension
    pub fn dest_file_name(&self, source: &Path) -> OsString {
        let stem = source.file_stem().unwrap_or_default();
        let mut name = OsString::from(stem);
        name.push(&self.config.output_extension);
        name
    }

    /// Full destination path for a source file
    pub fn dest_path(&self, source: &Path) -> PathBuf {
        self.dest_dir(source).join(self.dest_file_name(source))
    }

    /// Source path relative to the source root, as recorded in metadata rows
    pub fn relative_source(&self, source: &Path) -> PathBuf {
        source
            .strip_prefix(&self.config.source_root)
            .expect("enumerated path not under source root")
            .to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;
    use tempfile::TempDir;

    fn resolved(src: &Path, in_ext: &str, out_ext: Option<&str>) -> ResolvedConfig {
        let mut config = RunConfig::new(src, src.join("out"), in_ext);
        config.output_extension = out_ext.map(String::from);
        config.resolve().unwrap()
    }

    #[test]
    fn test_dest_path_mirrors_layout() {
        let dir = TempDir::new().unwrap();
        let config = resolved(dir.path(), "jpg", Some("png"));
        let mapper = PathMapper::new(&config);

        let source = config.source_root.join("a/b/photo.jpg");
        assert_eq!(mapper.dest_dir(&source), config.dest_root.join("a/b"));
        assert_eq!(
            mapper.dest_path(&source),
            config.dest_root.join("a/b/photo.png")
        );
    }

    #[test]
    fn test_extension_defaults_to_input() {
        let dir = TempDir::new().unwrap();
        let config = resolved(dir.path(), "jpg", None);
        let mapper = PathMapper::new(&config);

        let source = config.source_root.join("x.jpg");
        assert_eq!(mapper.dest_path(&source), config.dest_root.join("x.jpg"));
    }

    #[test]
    fn test_root_level_file() {
        let dir = TempDir::new().unwrap();
        let config = resolved(dir.path(), "jpg", Some("png"));
        let mapper = PathMapper::new(&config);

        let source = config.source_root.join("top.jpg");
        assert_eq!(mapper.dest_dir(&source), config.dest_root);
        assert_eq!(
            mapper.relative_source(&source),
            PathBuf::from("top.jpg")
        );
    }

    #[test]
    fn test_relative_source_keeps_subdirs() {
        let dir = TempDir::new().unwrap();
        let config = resolved(dir.path(), "jpg", None);
        let mapper = PathMapper::new(&config);

        let source = config.source_root.join("a/b/c.jpg");
        assert_eq!(mapper.relative_source(&source), PathBuf::from("a/b/c.jpg"));
    }
}
