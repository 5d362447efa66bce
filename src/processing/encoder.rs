//! External WebP encoder.
//!
//! The bundled `cwebp` binary does the actual compression. This module finds
//! it, builds its argument list and reports its exit status; everything else
//! about the conversion lives in the dispatcher.

use std::ffi::OsString;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};
use crate::core::CompressionSettings;
use crate::utils::{ConverterError, ConverterResult, EncodeError, file_name};

/// Name of the encoder executable.
pub const ENCODER_NAME: &str = if cfg!(windows) { "cwebp.exe" } else { "cwebp" };

/// Subdirectory next to the executable that may hold bundled tools.
pub const TOOLS_DIR: &str = "tools";

/// Compression mode passed to the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeMode {
    Lossless,
    Lossy(u8),
}

impl From<&CompressionSettings> for EncodeMode {
    fn from(settings: &CompressionSettings) -> Self {
        if settings.lossless {
            Self::Lossless
        } else {
            Self::Lossy(settings.encoder_quality())
        }
    }
}

/// One encoder invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub mode: EncodeMode,
}

impl EncodeRequest {
    pub fn new(
        input: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        settings: &CompressionSettings,
    ) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            mode: settings.into(),
        }
    }

    /// `<input> [-lossless | -q <n>] -o <output>`
    ///
    /// Paths are passed through as OS strings, untouched.
    pub fn args(&self) -> Vec<OsString> {
        let mut args = vec![self.input.as_os_str().to_owned()];
        match self.mode {
            EncodeMode::Lossless => args.push("-lossless".into()),
            EncodeMode::Lossy(quality) => {
                args.push("-q".into());
                args.push(quality.to_string().into());
            }
        }
        args.push("-o".into());
        args.push(self.output.as_os_str().to_owned());
        args
    }
}

/// Something that turns an input image into a WebP file at `request.output`.
pub trait Encoder: Send + Sync + 'static {
    fn encode(
        &self,
        request: &EncodeRequest,
    ) -> impl Future<Output = Result<(), EncodeError>> + Send;
}

/// Encoder backed by the `cwebp` command-line tool.
#[derive(Debug, Clone)]
pub struct CwebpEncoder {
    /// `None` when discovery found nothing; every job then fails.
    binary: Option<PathBuf>,
}

impl CwebpEncoder {
    /// Uses the binary at `path` without further checks.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { binary: Some(path.into()) }
    }

    /// An encoder that reports [`EncodeError::NotFound`] for every request.
    pub fn unavailable() -> Self {
        Self { binary: None }
    }

    /// Resolves the encoder at startup, falling back to [`Self::unavailable`]
    /// so a missing binary surfaces per entry instead of aborting.
    pub fn discover(explicit: Option<&Path>) -> Self {
        match Self::locate(explicit) {
            Ok(path) => {
                info!("Using encoder at {}", path.display());
                Self::new(path)
            }
            Err(e) => {
                warn!("{}", e);
                Self::unavailable()
            }
        }
    }

    /// Finds an executable encoder.
    ///
    /// Search order: `explicit`, the bundled locations next to the running
    /// executable (`cwebp`, then `tools/cwebp`), then `cwebp` on `PATH`.
    pub fn locate(explicit: Option<&Path>) -> ConverterResult<PathBuf> {
        if let Some(path) = explicit {
            if is_executable(path) {
                return Ok(path.to_path_buf());
            }
            return Err(ConverterError::encoder(format!(
                "Configured encoder {} not found or not executable.",
                path.display()
            )));
        }

        let bundled = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .map(|dir| vec![dir.join(ENCODER_NAME), dir.join(TOOLS_DIR).join(ENCODER_NAME)])
            .unwrap_or_default();

        if let Some(found) = first_executable(&bundled) {
            return Ok(found);
        }
        debug!("No bundled encoder next to the executable; searching PATH");

        which::which(ENCODER_NAME)
            .map_err(|_| ConverterError::encoder("Bundled cwebp not found or not executable."))
    }

    pub fn is_available(&self) -> bool {
        self.binary.is_some()
    }
}

impl Encoder for CwebpEncoder {
    async fn encode(&self, request: &EncodeRequest) -> Result<(), EncodeError> {
        let binary = self.binary.as_ref().ok_or(EncodeError::NotFound)?;

        let output = Command::new(binary)
            .args(request.args())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| EncodeError::Launch(e.to_string()))?;

        if output.status.success() {
            debug!("cwebp finished for {}", request.input.display());
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let trimmed = stderr.trim();
        if trimmed.is_empty() {
            Err(EncodeError::Status {
                status: output.status.code().unwrap_or(-1),
                file: file_name(&request.input),
            })
        } else {
            Err(EncodeError::Diagnostic(trimmed.to_string()))
        }
    }
}

fn first_executable(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates.iter().find(|p| is_executable(p)).cloned()
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
