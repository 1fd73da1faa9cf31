//! Source tree enumeration

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::Result;

/// Lazily enumerate files under `root` whose extension matches `extension`
/// (leading dot included), case-insensitively.
///
/// Directories and non-matching files are silently skipped. Traversal errors
/// surface as `Err` items and are the caller's to propagate. Every yielded
/// path is prefixed by `root`; re-invoke to restart.
pub fn enumerate_files<'a>(
    root: &'a Path,
    extension: &'a str,
) -> impl Iterator<Item = Result<PathBuf>> + 'a {
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(move |entry| match entry {
            Ok(entry) => {
                if !entry.file_type().is_file() {
                    return None;
                }
                if !matches_extension(entry.path(), extension) {
                    return None;
                }
                debug_assert!(entry.path().starts_with(root));
                Some(Ok(entry.path().to_path_buf()))
            }
            Err(e) => Some(Err(e.into())),
        })
}

/// Compare a path's extension against a dotted extension, ignoring case
fn matches_extension(path: &Path, dotted: &str) -> bool {
    let wanted = dotted.strip_prefix('.').unwrap_or(dotted);
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(wanted))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_enumeration_filters_by_extension() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("a/1.jpg"));
        touch(&dir.path().join("a/2.txt"));
        touch(&dir.path().join("b/c/3.jpg"));
        touch(&dir.path().join("4.jpeg"));

        let mut found: Vec<PathBuf> = enumerate_files(dir.path(), ".jpg")
            .collect::<Result<Vec<_>>>()
            .unwrap();
        found.sort();

        assert_eq!(
            found,
            vec![dir.path().join("a/1.jpg"), dir.path().join("b/c/3.jpg")]
        );
    }

    #[test]
    fn test_enumeration_is_case_insensitive() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("upper.JPG"));
        touch(&dir.path().join("mixed.Jpg"));

        let found = enumerate_files(dir.path(), ".jpg")
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_directories_are_skipped() {
        let dir = TempDir::new().unwrap();
        // A directory whose name ends in the extension must not be yielded
        fs::create_dir_all(dir.path().join("folder.jpg")).unwrap();
        touch(&dir.path().join("folder.jpg/inner.jpg"));

        let found = enumerate_files(dir.path(), "jpg")
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(found, vec![dir.path().join("folder.jpg/inner.jpg")]);
    }

    #[test]
    fn test_empty_tree() {
        let dir = TempDir::new().unwrap();
        let found = enumerate_files(dir.path(), ".jpg")
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_extensionless_files_are_skipped() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("README"));
        touch(&dir.path().join("ok.jpg"));

        let found = enumerate_files(dir.path(), "jpg")
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(found.len(), 1);
    }
}
