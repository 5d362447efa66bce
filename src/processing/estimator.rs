//! Projected WebP output size.
//!
//! A fixed heuristic, not measured data: lossless lands around 75% of the
//! original, lossy scales linearly from 20% at quality 0 to 95% at quality 100.

use crate::core::CompressionSettings;

const LOSSLESS_RATIO: f64 = 0.75;
const LOSSY_FLOOR: f64 = 0.2;
const LOSSY_SPAN: f64 = 0.75;

/// Output size ratio for `settings`.
pub fn ratio(settings: &CompressionSettings) -> f64 {
    if settings.lossless {
        LOSSLESS_RATIO
    } else {
        let quality_factor = settings.quality.clamp(0.0, 100.0) / 100.0;
        LOSSY_FLOOR + quality_factor * LOSSY_SPAN
    }
}

/// Estimated output size in bytes for a file of `original_size` bytes.
pub fn estimate(original_size: u64, settings: &CompressionSettings) -> u64 {
    (original_size as f64 * ratio(settings)).floor() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1_000, 0.0, 200)]
    #[case(1_000, 25.0, 387)]
    #[case(1_000, 50.0, 575)]
    #[case(1_000, 75.0, 762)]
    #[case(1_000, 100.0, 950)]
    #[case(2_000, 90.0, 1_750)]
    #[case(1_000_000, 80.0, 800_000)]
    #[case(0, 80.0, 0)]
    fn test_lossy_estimate(#[case] size: u64, #[case] quality: f64, #[case] expected: u64) {
        assert_eq!(estimate(size, &CompressionSettings::lossy(quality)), expected);
    }

    #[rstest]
    #[case(1_000, 750)]
    #[case(12_345, 9_258)]
    #[case(0, 0)]
    fn test_lossless_estimate(#[case] size: u64, #[case] expected: u64) {
        assert_eq!(estimate(size, &CompressionSettings::lossless()), expected);
    }

    #[test]
    fn test_lossless_ignores_quality() {
        let a = CompressionSettings { lossless: true, quality: 0.0 };
        let b = CompressionSettings { lossless: true, quality: 100.0 };
        assert_eq!(estimate(4_096, &a), estimate(4_096, &b));
    }

    #[test]
    fn test_monotonic_in_quality() {
        for size in [0u64, 1, 999, 65_536, 1_000_000, 48_123_457] {
            let mut previous = 0;
            for quality in 0..=100 {
                let current = estimate(size, &CompressionSettings::lossy(quality as f64));
                assert!(current >= previous, "size {size} q {quality}: {current} < {previous}");
                previous = current;
            }
        }
    }
}
