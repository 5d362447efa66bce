//! Byte-count formatting and savings arithmetic shared by the queue report
//! and the CLI.

const UNITS: [&str; 5] = ["bytes", "KB", "MB", "GB", "TB"];

/// Formats a byte count with decimal (1000-based) units, the way file
/// browsers report file sizes.
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1000 {
        return format!("{} {}", bytes, UNITS[0]);
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// Percentage of `original` saved by `output`. `None` when the original is empty.
pub fn savings_percent(original: u64, output: u64) -> Option<f64> {
    if original == 0 {
        return None;
    }
    let saved = original as i64 - output as i64;
    Some(saved as f64 / original as f64 * 100.0)
}

/// Renders a savings percentage; growth is shown as `0%`.
pub fn format_savings(original: u64, output: u64) -> String {
    match savings_percent(original, output) {
        None => "—".to_string(),
        Some(pct) if pct <= 0.0 => "0%".to_string(),
        Some(pct) => format!("{:.1}%", pct),
    }
}
