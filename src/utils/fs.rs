use std::path::Path;
use tokio::fs;
use crate::utils::{ConverterError, ConverterResult};

/// Get file size in bytes
pub async fn file_size(path: impl AsRef<Path>) -> ConverterResult<u64> {
    fs::metadata(path.as_ref())
        .await
        .map(|m| m.len())
        .map_err(|e| ConverterError::io(format!("Failed to get file size: {}", e)))
}

/// Check if a file or directory exists at `path`
pub async fn path_exists(path: impl AsRef<Path>) -> bool {
    fs::try_exists(path.as_ref()).await.unwrap_or(false)
}

/// Check if directory exists
pub async fn dir_exists(path: impl AsRef<Path>) -> bool {
    fs::metadata(path.as_ref())
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}

/// Create `path` and every missing parent
pub async fn create_dir_all(path: impl AsRef<Path>) -> ConverterResult<()> {
    let path = path.as_ref();
    if dir_exists(path).await {
        return Ok(());
    }
    fs::create_dir_all(path)
        .await
        .map_err(|e| {
            ConverterError::io(format!(
                "Cannot create output directory {}: {}",
                path.display(),
                e
            ))
        })
}

/// Delete a single file
pub async fn remove_file(path: impl AsRef<Path>) -> ConverterResult<()> {
    fs::remove_file(path.as_ref())
        .await
        .map_err(ConverterError::from)
}

/// Display name of `path` for log lines
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
