//! Core types for conversion settings, output policy and per-file results.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use crate::utils::{ConverterError, ValidationError};

/// Compression settings applied to every queued file.
///
/// `quality` is only meaningful when `lossless` is false. It is kept as a
/// float so a slider can drive it; the encoder receives it rounded and
/// clamped via [`CompressionSettings::encoder_quality`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompressionSettings {
    pub lossless: bool,
    pub quality: f64,
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self {
            lossless: false,
            quality: 80.0,
        }
    }
}

impl CompressionSettings {
    pub fn lossy(quality: f64) -> Self {
        Self { lossless: false, quality }
    }

    pub fn lossless() -> Self {
        Self { lossless: true, ..Self::default() }
    }

    /// Quality rounded to the nearest integer and clamped to 0-100.
    pub fn encoder_quality(&self) -> u8 {
        if self.quality.is_nan() {
            return 0;
        }
        self.quality.round().clamp(0.0, 100.0) as u8
    }

    /// Short label used in log lines: `lossless` or `q=80`.
    pub fn label(&self) -> String {
        if self.lossless {
            "lossless".to_string()
        } else {
            format!("q={}", self.encoder_quality())
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(0.0..=100.0).contains(&self.quality) {
            return Err(ValidationError::settings(format!(
                "Invalid quality value: {}. Must be between 0 and 100",
                self.quality
            )));
        }
        Ok(())
    }
}

/// Quick quality presets for common use cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityPreset {
    #[default]
    Custom,
    High,
    Medium,
    Low,
    Tiny,
}

impl QualityPreset {
    pub const ALL: [QualityPreset; 5] =
        [Self::Custom, Self::High, Self::Medium, Self::Low, Self::Tiny];

    /// Quality this preset selects; `None` for `Custom`.
    pub fn quality_value(&self) -> Option<f64> {
        match self {
            Self::Custom => None,
            Self::High => Some(90.0),
            Self::Medium => Some(75.0),
            Self::Low => Some(50.0),
            Self::Tiny => Some(30.0),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Custom => "custom",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Tiny => "tiny",
        }
    }
}

impl FromStr for QualityPreset {
    type Err = ConverterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|preset| preset.name() == s)
            .ok_or_else(|| ValidationError::settings(format!("Unknown preset: {}", s)).into())
    }
}

/// Where converted files are written and what happens around each conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputPolicy {
    /// Write next to the input; wins over every other destination flag
    pub save_next_to_original: bool,
    /// Destination root when not saving next to the original
    pub custom_folder: Option<PathBuf>,
    /// Append the fixed output subfolder to `custom_folder`
    pub auto_subfolder: bool,
    /// Recreate the folder hierarchy below `last_scanned_folder`
    pub preserve_structure: bool,
    /// Skip inputs that are already WebP or whose output already exists
    pub skip_existing_output: bool,
    /// Delete the input after a successful conversion
    pub delete_original_on_success: bool,
    /// Root of the most recent folder scan, used by `preserve_structure`
    pub last_scanned_folder: Option<PathBuf>,
}

impl Default for OutputPolicy {
    fn default() -> Self {
        Self {
            save_next_to_original: true,
            custom_folder: None,
            auto_subfolder: true,
            preserve_structure: false,
            skip_existing_output: true,
            delete_original_on_success: false,
            last_scanned_folder: None,
        }
    }
}

/// Per-entry conversion state. Everything but `Pending` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionStatus {
    #[default]
    Pending,
    Converted,
    Failed,
    Skipped,
}

impl ConversionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Whether `actual_output_size` carries a value for this status.
    pub fn has_output(&self) -> bool {
        matches!(self, Self::Converted | Self::Skipped)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Converted => "Converted",
            Self::Failed => "Failed",
            Self::Skipped => "Skipped",
        }
    }
}

/// Why an entry ended up `Skipped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SkipReason {
    /// The input already has the target extension
    AlreadyTarget,
    /// A file already exists at the resolved output path
    OutputExists,
}

/// Conversion metadata for one queued file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionInfo {
    pub original_size: u64,
    pub estimated_output_size: Option<u64>,
    pub actual_output_size: Option<u64>,
    pub status: ConversionStatus,
    pub skip_reason: Option<SkipReason>,
    /// Failure detail for `Failed` entries
    pub error: Option<String>,
}

impl ConversionInfo {
    pub fn pending(original_size: u64, estimated: u64) -> Self {
        Self {
            original_size,
            estimated_output_size: Some(estimated),
            actual_output_size: None,
            status: ConversionStatus::Pending,
            skip_reason: None,
            error: None,
        }
    }

    /// A file that is already WebP: its own size stands in for the output.
    pub fn already_target(original_size: u64) -> Self {
        Self {
            original_size,
            estimated_output_size: None,
            actual_output_size: Some(original_size),
            status: ConversionStatus::Skipped,
            skip_reason: Some(SkipReason::AlreadyTarget),
            error: None,
        }
    }

    /// Estimate, exposed only while the entry is pending.
    pub fn estimate(&self) -> Option<u64> {
        match self.status {
            ConversionStatus::Pending => self.estimated_output_size,
            _ => None,
        }
    }

    /// Output size, exposed only for converted and skipped entries.
    pub fn output_size(&self) -> Option<u64> {
        if self.status.has_output() {
            self.actual_output_size
        } else {
            None
        }
    }

    /// Projected bytes saved for a pending entry.
    pub fn estimated_savings(&self) -> Option<u64> {
        self.estimate()
            .map(|estimate| self.original_size.saturating_sub(estimate))
            .filter(|savings| *savings > 0)
    }

    /// Actual savings as a percentage of the original size.
    pub fn actual_savings_percent(&self) -> Option<f64> {
        let output = self.output_size()?;
        crate::utils::savings_percent(self.original_size, output)
    }
}

/// Result of one conversion job, produced by a worker and applied to the
/// queue by the batch owner.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResult {
    /// Path to the queued input file
    pub input_path: PathBuf,
    /// Resolved output path, when resolution got that far
    pub output_path: Option<PathBuf>,
    /// Input size in bytes at the time of conversion
    pub original_size: u64,
    /// Output (or existing WebP) size in bytes
    pub output_size: Option<u64>,
    /// Terminal status for the entry
    pub status: ConversionStatus,
    pub skip_reason: Option<SkipReason>,
    /// Failure detail if the conversion failed
    pub error: Option<String>,
    /// Bytes saved (can be negative if file grew)
    pub saved_bytes: i64,
    /// Compression ratio as a percentage
    pub compression_ratio: f64,
}

impl ConversionResult {
    fn new(input_path: PathBuf, original_size: u64, status: ConversionStatus) -> Self {
        Self {
            input_path,
            output_path: None,
            original_size,
            output_size: None,
            status,
            skip_reason: None,
            error: None,
            saved_bytes: 0,
            compression_ratio: 0.0,
        }
    }

    pub fn converted(
        input_path: PathBuf,
        output_path: PathBuf,
        original_size: u64,
        output_size: Option<u64>,
    ) -> Self {
        let mut result = Self::new(input_path, original_size, ConversionStatus::Converted);
        result.output_path = Some(output_path);
        result.with_output_size(output_size)
    }

    pub fn skipped(
        input_path: PathBuf,
        output_path: Option<PathBuf>,
        original_size: u64,
        output_size: Option<u64>,
        reason: SkipReason,
    ) -> Self {
        let mut result = Self::new(input_path, original_size, ConversionStatus::Skipped);
        result.output_path = output_path;
        result.skip_reason = Some(reason);
        result.with_output_size(output_size)
    }

    pub fn failed(
        input_path: PathBuf,
        output_path: Option<PathBuf>,
        original_size: u64,
        error: impl Into<String>,
    ) -> Self {
        let mut result = Self::new(input_path, original_size, ConversionStatus::Failed);
        result.output_path = output_path;
        result.error = Some(error.into());
        result
    }

    fn with_output_size(mut self, output_size: Option<u64>) -> Self {
        self.output_size = output_size;
        if let Some(size) = output_size {
            self.saved_bytes = self.original_size as i64 - size as i64;
            self.compression_ratio =
                crate::utils::savings_percent(self.original_size, size).unwrap_or(0.0);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(80.0, 80)]
    #[case(79.5, 80)]
    #[case(79.4, 79)]
    #[case(-3.0, 0)]
    #[case(140.0, 100)]
    #[case(f64::NAN, 0)]
    fn test_encoder_quality(#[case] quality: f64, #[case] expected: u8) {
        assert_eq!(CompressionSettings::lossy(quality).encoder_quality(), expected);
    }

    #[test]
    fn test_labels() {
        assert_eq!(CompressionSettings::lossy(80.0).label(), "q=80");
        assert_eq!(CompressionSettings::lossless().label(), "lossless");
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        assert!(CompressionSettings::lossy(100.0).validate().is_ok());
        assert!(CompressionSettings::lossy(100.5).validate().is_err());
        assert!(CompressionSettings::lossy(-1.0).validate().is_err());
    }

    #[rstest]
    #[case("high", QualityPreset::High, Some(90.0))]
    #[case("Medium", QualityPreset::Medium, Some(75.0))]
    #[case("low", QualityPreset::Low, Some(50.0))]
    #[case("TINY", QualityPreset::Tiny, Some(30.0))]
    #[case("custom", QualityPreset::Custom, None)]
    fn test_presets(
        #[case] name: &str,
        #[case] preset: QualityPreset,
        #[case] quality: Option<f64>,
    ) {
        let parsed: QualityPreset = name.parse().unwrap();
        assert_eq!(parsed, preset);
        assert_eq!(parsed.quality_value(), quality);
    }

    #[test]
    fn test_unknown_preset() {
        assert!("ultra".parse::<QualityPreset>().is_err());
    }

    #[test]
    fn test_info_accessors_follow_status() {
        let mut info = ConversionInfo::pending(1_000, 800);
        assert_eq!(info.estimate(), Some(800));
        assert_eq!(info.estimated_savings(), Some(200));
        assert_eq!(info.output_size(), None);

        info.status = ConversionStatus::Converted;
        info.actual_output_size = Some(600);
        assert_eq!(info.estimate(), None);
        assert_eq!(info.output_size(), Some(600));
        assert_eq!(info.actual_savings_percent(), Some(40.0));

        info.status = ConversionStatus::Failed;
        assert_eq!(info.output_size(), None);
    }

    #[test]
    fn test_result_ratio() {
        let result =
            ConversionResult::converted("a.png".into(), "a.webp".into(), 1_000_000, Some(600_000));
        assert_eq!(result.saved_bytes, 400_000);
        assert_eq!(result.compression_ratio, 40.0);

        let grown = ConversionResult::converted("b.png".into(), "b.webp".into(), 100, Some(150));
        assert_eq!(grown.saved_bytes, -50);
    }
}
