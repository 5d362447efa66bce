//! Error types for the WebP batch converter.
//!
//! Provides a hierarchy of error types using `thiserror` for ergonomic error handling.

use std::io;
use std::path::PathBuf;
use thiserror::Error;
use serde::Serialize;

/// Validation errors for dropped items and settings.
#[derive(Error, Debug, Serialize)]
pub enum ValidationError {
    /// Path-related validation error
    #[error("Path error: {0}")]
    Path(#[from] PathError),
    /// Invalid settings error
    #[error("Settings error: {0}")]
    Settings(String),
}

/// File path errors.
#[derive(Error, Debug, Serialize)]
pub enum PathError {
    /// File does not exist
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    /// Extension is not in the image allow-list
    #[error("Unsupported file type: .{0}")]
    Unsupported(String),
}

/// Main error type for the converter.
///
/// Errors are local to the entry or operation that raised them; nothing in
/// here aborts a running batch.
#[derive(Error, Debug, Serialize)]
pub enum ConverterError {
    /// Dropped item or settings validation failed
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// File IO error
    #[error("IO error: {0}")]
    IO(String),

    /// Unsupported or invalid image format
    #[error("Format error: {0}")]
    Format(String),

    /// Source folder could not be read
    #[error("Failed to read folder: {0}")]
    Scan(String),

    /// Encoder missing or misconfigured
    #[error("Encoder error: {0}")]
    Encoder(String),

    /// Queue mutation attempted while a batch is in flight
    #[error("Queue is locked while a conversion batch is running")]
    BatchRunning,

    /// Batch requested with nothing queued
    #[error("No files in queue.")]
    EmptyQueue,
}

/// Convenience result type for converter operations.
pub type ConverterResult<T> = Result<T, ConverterError>;

/// Outcome of a single encoder invocation that did not produce a file.
///
/// The `Display` text is the failure detail stored on the entry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// No usable encoder binary was found at startup
    #[error("Bundled cwebp not found or not executable.")]
    NotFound,
    /// The binary exists but could not be started
    #[error("Failed to run cwebp: {0}")]
    Launch(String),
    /// Non-zero exit with nothing on stderr
    #[error("Conversion failed (status {status}) for {file}.")]
    Status { status: i32, file: String },
    /// Non-zero exit, trimmed stderr text
    #[error("{0}")]
    Diagnostic(String),
}

impl ConverterError {
    pub fn io<T: Into<String>>(msg: T) -> Self {
        Self::IO(msg.into())
    }

    pub fn format<T: Into<String>>(msg: T) -> Self {
        Self::Format(msg.into())
    }

    pub fn scan<T: Into<String>>(msg: T) -> Self {
        Self::Scan(msg.into())
    }

    pub fn encoder<T: Into<String>>(msg: T) -> Self {
        Self::Encoder(msg.into())
    }
}

impl ValidationError {
    pub fn path_not_found(path: impl Into<PathBuf>) -> Self {
        Self::Path(PathError::NotFound(path.into()))
    }

    pub fn settings(msg: impl Into<String>) -> Self {
        Self::Settings(msg.into())
    }
}

// Convert std::io::Error to ConverterError
impl From<io::Error> for ConverterError {
    fn from(err: io::Error) -> Self {
        Self::IO(err.to_string())
    }
}

// Convert PathError to ConverterError
impl From<PathError> for ConverterError {
    fn from(err: PathError) -> Self {
        Self::Validation(ValidationError::Path(err))
    }
}
