//! End-of-batch summary.

use serde::Serialize;
use crate::core::{ConversionResult, ConversionStatus};

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub total: usize,
    pub converted: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Error text of the most recently completed failure
    pub last_error: Option<String>,
    pub results: Vec<ConversionResult>,
}

impl BatchReport {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            results: Vec::with_capacity(total),
            ..Self::default()
        }
    }

    pub fn record(&mut self, result: ConversionResult) {
        match result.status {
            ConversionStatus::Converted => self.converted += 1,
            ConversionStatus::Skipped => self.skipped += 1,
            ConversionStatus::Failed => {
                self.failed += 1;
                self.last_error = result.error.clone();
            }
            ConversionStatus::Pending => {}
        }
        self.results.push(result);
    }

    pub fn completed(&self) -> usize {
        self.results.len()
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Net bytes saved by converted entries.
    pub fn saved_bytes(&self) -> i64 {
        self.results
            .iter()
            .filter(|r| r.status == ConversionStatus::Converted)
            .map(|r| r.saved_bytes)
            .sum()
    }

    pub fn summary(&self) -> String {
        match (&self.last_error, self.has_failures()) {
            (Some(error), true) => format!("Finished with errors: {}", error),
            (None, true) => "Finished with errors.".to_string(),
            _ => format!("Finished converting {} file(s).", self.total),
        }
    }
}
