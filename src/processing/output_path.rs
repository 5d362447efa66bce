//! Destination resolution for converted files.
//!
//! Functions of the input path and the [`OutputPolicy`]; nothing here
//! touches the filesystem. Relative paths are resolved against the current
//! directory before comparison.

use std::path::{Component, Path, PathBuf};
use crate::core::OutputPolicy;
use crate::utils::TARGET_EXTENSION;

/// Subfolder appended to the custom destination when `auto_subfolder` is on.
pub const AUTO_SUBFOLDER_NAME: &str = "WebP output";

/// Folds `.` and `..` components without consulting the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component);
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}

/// Absolute, lexically normalized form of `path`; an empty path is the
/// current directory.
fn resolve(path: &Path) -> Option<PathBuf> {
    let path = if path.as_os_str().is_empty() { Path::new(".") } else { path };
    std::path::absolute(path).ok().map(|absolute| normalize(&absolute))
}

/// Path of `dir` relative to `root`, or `None` when `dir` is not inside it.
///
/// Comparison is per component, so `/photos2` is not considered inside `/photos`.
/// The result only ever holds plain names and can be joined onto another root.
pub fn relative_to(dir: &Path, root: &Path) -> Option<PathBuf> {
    let dir = resolve(dir)?;
    let root = resolve(root)?;
    let relative = dir.strip_prefix(&root).ok()?;
    relative
        .components()
        .all(|component| matches!(component, Component::Normal(_)))
        .then(|| relative.to_path_buf())
}

/// Top-level output directory before any structure suffix, or `None` when
/// files are written next to their originals.
pub fn destination_root(policy: &OutputPolicy) -> Option<PathBuf> {
    if policy.save_next_to_original {
        return None;
    }
    let custom = policy.custom_folder.as_ref()?;
    if policy.auto_subfolder {
        Some(custom.join(AUTO_SUBFOLDER_NAME))
    } else {
        Some(custom.clone())
    }
}

/// Directory the converted file for `input` is written to.
pub fn output_directory(input: &Path, policy: &OutputPolicy) -> PathBuf {
    let parent = input.parent().unwrap_or_else(|| Path::new(""));
    let Some(root) = destination_root(policy) else {
        return parent.to_path_buf();
    };

    if policy.preserve_structure {
        if let Some(relative) = policy
            .last_scanned_folder
            .as_deref()
            .and_then(|scanned| relative_to(parent, scanned))
        {
            return root.join(relative);
        }
    }
    root
}

/// Output file name: the input stem with the target extension.
pub fn output_file_name(input: &Path) -> PathBuf {
    // Appended rather than `set_extension`, which would eat a dotted stem.
    let mut name = input.file_stem().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(TARGET_EXTENSION);
    PathBuf::from(name)
}

/// Full output path for `input` under `policy`.
pub fn output_path(input: &Path, policy: &OutputPolicy) -> PathBuf {
    output_directory(input, policy).join(output_file_name(input))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn custom(
        folder: &str,
        auto_subfolder: bool,
        preserve_structure: bool,
        scanned: Option<&str>,
    ) -> OutputPolicy {
        OutputPolicy {
            save_next_to_original: false,
            custom_folder: Some(PathBuf::from(folder)),
            auto_subfolder,
            preserve_structure,
            last_scanned_folder: scanned.map(PathBuf::from),
            ..OutputPolicy::default()
        }
    }

    #[rstest]
    #[case(true, true)]
    #[case(true, false)]
    #[case(false, true)]
    #[case(false, false)]
    fn test_next_to_original_wins(#[case] auto_subfolder: bool, #[case] preserve_structure: bool) {
        let mut policy = custom("/out", auto_subfolder, preserve_structure, Some("/photos"));
        policy.save_next_to_original = true;
        let input = Path::new("/photos/2024/trip/a.png");
        assert_eq!(output_directory(input, &policy), PathBuf::from("/photos/2024/trip"));
        assert_eq!(output_path(input, &policy), PathBuf::from("/photos/2024/trip/a.webp"));
    }

    #[test]
    fn test_missing_custom_folder_falls_back_to_parent() {
        let policy = OutputPolicy {
            save_next_to_original: false,
            custom_folder: None,
            ..OutputPolicy::default()
        };
        assert_eq!(output_directory(Path::new("/in/a.png"), &policy), PathBuf::from("/in"));
    }

    #[rstest]
    #[case("/photos/a.png")]
    #[case("/elsewhere/deep/b.jpg")]
    #[case("/c.gif")]
    fn test_auto_subfolder_flat(#[case] input: &str) {
        let policy = custom("/out", true, false, Some("/photos"));
        assert_eq!(output_directory(Path::new(input), &policy), PathBuf::from("/out/WebP output"));
    }

    #[test]
    fn test_custom_without_subfolder() {
        let policy = custom("/out", false, false, None);
        assert_eq!(output_path(Path::new("/in/x.tiff"), &policy), PathBuf::from("/out/x.webp"));
    }

    #[test]
    fn test_preserve_structure_appends_relative_path() {
        let policy = custom("/out", true, true, Some("/photos"));
        assert_eq!(
            output_path(Path::new("/photos/2024/trip/a.png"), &policy),
            PathBuf::from("/out/WebP output/2024/trip/a.webp")
        );
        // Directly inside the scanned folder: no suffix
        assert_eq!(
            output_directory(Path::new("/photos/a.png"), &policy),
            PathBuf::from("/out/WebP output")
        );
    }

    #[test]
    fn test_preserve_structure_fails_closed_outside_scan_root() {
        let policy = custom("/out", false, true, Some("/photos"));
        assert_eq!(output_directory(Path::new("/photos2/a.png"), &policy), PathBuf::from("/out"));
        assert_eq!(output_directory(Path::new("/other/a.png"), &policy), PathBuf::from("/out"));
    }

    #[rstest]
    #[case(".")]
    #[case("./")]
    #[case("")]
    fn test_current_dir_scan_root_never_escapes_destination(#[case] scanned: &str) {
        let policy = custom("/out", true, true, Some(scanned));
        let dir = output_directory(Path::new("/elsewhere/a.png"), &policy);
        assert!(dir.starts_with("/out"), "{}", dir.display());
        assert_eq!(dir, PathBuf::from("/out/WebP output"));
    }

    #[test]
    fn test_current_dir_scan_root_keeps_relative_structure() {
        let policy = custom("/out", false, true, Some("."));
        assert_eq!(
            output_directory(Path::new("./trip/day1/a.png"), &policy),
            PathBuf::from("/out/trip/day1")
        );
        assert_eq!(output_directory(Path::new("a.png"), &policy), PathBuf::from("/out"));
    }

    #[test]
    fn test_relative_input_under_absolute_root() {
        let cwd = std::env::current_dir().unwrap();
        let policy = custom("/out", false, true, Some(cwd.to_str().unwrap()));
        assert_eq!(output_directory(Path::new("sub/a.png"), &policy), PathBuf::from("/out/sub"));
    }

    #[test]
    fn test_preserve_structure_without_scan_root_is_flat() {
        let policy = custom("/out", false, true, None);
        assert_eq!(output_directory(Path::new("/photos/x/a.png"), &policy), PathBuf::from("/out"));
    }

    #[test]
    fn test_relative_to_normalizes_dots() {
        assert_eq!(
            relative_to(Path::new("/photos/./a/../b"), Path::new("/photos/")),
            Some(PathBuf::from("b"))
        );
        assert_eq!(relative_to(Path::new("/photos/../x"), Path::new("/photos")), None);
    }

    #[rstest]
    #[case("/in/a.png", "a.webp")]
    #[case("/in/archive.tar.png", "archive.tar.webp")]
    #[case("/in/ALREADY.WEBP", "ALREADY.webp")]
    fn test_output_file_name(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(output_file_name(Path::new(input)), PathBuf::from(expected));
    }
}
