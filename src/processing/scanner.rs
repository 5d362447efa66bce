//! Folder scanning for image candidates.
//!
//! Walks a directory with `walkdir`, keeping files whose extension is in the
//! image allow-list. Hidden entries are skipped and hidden directories are
//! never descended. This is blocking I/O; async callers go through
//! `tokio::task::spawn_blocking`.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};
use crate::utils::{ConverterError, ConverterResult, is_supported_image};

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// Lazily yields image candidates below `root`.
///
/// Only direct children are listed unless `recursive` is set. An error for the
/// root itself is yielded as `Err`; errors below the root are logged and the
/// offending subtree is skipped.
pub fn candidates(root: &Path, recursive: bool) -> impl Iterator<Item = ConverterResult<PathBuf>> {
    let max_depth = if recursive { usize::MAX } else { 1 };
    WalkDir::new(root)
        .min_depth(1)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        // The root may itself be a dot-directory; only its contents are filtered.
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry))
        .filter_map(|entry| match entry {
            Ok(entry) => {
                if entry.file_type().is_dir() || !is_supported_image(entry.path()) {
                    return None;
                }
                Some(Ok(entry.into_path()))
            }
            Err(e) if e.depth() == 0 => Some(Err(ConverterError::scan(e.to_string()))),
            Err(e) => {
                warn!("Skipping unreadable entry during scan: {}", e);
                None
            }
        })
}

/// Collects every candidate below `root`, in file-name order.
///
/// Fails without partial results when `root` cannot be read.
pub fn scan_folder(root: &Path, recursive: bool) -> ConverterResult<Vec<PathBuf>> {
    let metadata = std::fs::metadata(root)
        .map_err(|e| ConverterError::scan(format!("{}: {}", root.display(), e)))?;
    if !metadata.is_dir() {
        return Err(ConverterError::scan(format!("{} is not a folder", root.display())));
    }

    let found = candidates(root, recursive).collect::<ConverterResult<Vec<_>>>()?;
    debug!("Scanned {} (recursive: {}): {} candidate(s)", root.display(), recursive, found.len());
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"img").unwrap();
    }

    fn names(root: &Path, paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect()
    }

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("b.JPG"));
        touch(&root.join("a.png"));
        touch(&root.join("notes.txt"));
        touch(&root.join(".hidden.png"));
        touch(&root.join("done.webp"));
        touch(&root.join("nested/c.tiff"));
        touch(&root.join("nested/deeper/d.heic"));
        touch(&root.join(".cache/e.png"));
        fs::create_dir_all(root.join("folder.png")).unwrap();
        dir
    }

    #[test]
    fn test_flat_scan_lists_direct_children_only() {
        let dir = fixture();
        let found = scan_folder(dir.path(), false).unwrap();
        assert_eq!(names(dir.path(), &found), vec!["a.png", "b.JPG", "done.webp"]);
    }

    #[test]
    fn test_recursive_scan_walks_subtree_without_hidden() {
        let dir = fixture();
        let found = scan_folder(dir.path(), true).unwrap();
        assert_eq!(
            names(dir.path(), &found),
            vec!["a.png", "b.JPG", "done.webp", "nested/c.tiff", "nested/deeper/d.heic"]
        );
    }

    #[test]
    fn test_missing_folder_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = scan_folder(&dir.path().join("nope"), true).unwrap_err();
        assert!(matches!(err, ConverterError::Scan(_)));
    }

    #[test]
    fn test_file_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.png");
        touch(&file);
        assert!(scan_folder(&file, false).is_err());
    }

    #[test]
    fn test_candidates_is_lazy() {
        let dir = fixture();
        let first = candidates(dir.path(), true).next().unwrap().unwrap();
        assert_eq!(first, dir.path().join("a.png"));
    }
}
