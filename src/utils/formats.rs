use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use crate::utils::ConverterError;

/// Extension written by the encoder.
pub const TARGET_EXTENSION: &str = "webp";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    PNG,
    JPEG,
    TIFF,
    GIF,
    HEIC,
    BMP,
    WebP,
}

impl ImageFormat {
    pub const ALL: [ImageFormat; 7] = [
        Self::PNG,
        Self::JPEG,
        Self::TIFF,
        Self::GIF,
        Self::HEIC,
        Self::BMP,
        Self::WebP,
    ];

    /// Get file extensions associated with this format
    pub fn extensions(&self) -> &[&str] {
        match self {
            Self::PNG => &["png"],
            Self::JPEG => &["jpg", "jpeg"],
            Self::TIFF => &["tif", "tiff"],
            Self::GIF => &["gif"],
            Self::HEIC => &["heic"],
            Self::BMP => &["bmp"],
            Self::WebP => &["webp"],
        }
    }

    /// Check if the extension matches this format
    pub fn matches_extension(&self, ext: &str) -> bool {
        let ext = ext.to_lowercase();
        self.extensions().contains(&ext.as_str())
    }

}

impl FromStr for ImageFormat {
    type Err = ConverterError;

    fn from_str(ext: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|format| format.matches_extension(ext))
            .ok_or_else(|| ConverterError::format(format!("Unsupported image format: {}", ext)))
    }
}

/// Lowercased extension of `path`, empty when there is none.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default()
}

/// Get format from file extension
pub fn format_from_path(path: &Path) -> Result<ImageFormat, ConverterError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| {
            ConverterError::format(format!("File has no extension: {}", path.display()))
        })?;

    ImageFormat::from_str(ext)
}

/// Extension allow-list check used by the scanner and the drop handler.
pub fn is_supported_image(path: &Path) -> bool {
    format_from_path(path).is_ok()
}

/// True when `path` already carries the target extension.
pub fn is_target_format(path: &Path) -> bool {
    extension_of(path) == TARGET_EXTENSION
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("a.png", Some(ImageFormat::PNG))]
    #[case("a.JPG", Some(ImageFormat::JPEG))]
    #[case("a.jpeg", Some(ImageFormat::JPEG))]
    #[case("scan.TIF", Some(ImageFormat::TIFF))]
    #[case("scan.tiff", Some(ImageFormat::TIFF))]
    #[case("anim.gif", Some(ImageFormat::GIF))]
    #[case("IMG_0001.HEIC", Some(ImageFormat::HEIC))]
    #[case("old.bmp", Some(ImageFormat::BMP))]
    #[case("done.webp", Some(ImageFormat::WebP))]
    #[case("notes.txt", None)]
    #[case("Makefile", None)]
    fn test_format_from_path(#[case] path: &str, #[case] expected: Option<ImageFormat>) {
        assert_eq!(format_from_path(Path::new(path)).ok(), expected);
    }

    #[test]
    fn test_target_detection_ignores_case() {
        assert!(is_target_format(Path::new("/tmp/Photo.WebP")));
        assert!(!is_target_format(Path::new("/tmp/photo.png")));
    }
}
