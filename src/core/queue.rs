//! Ordered conversion queue with per-file metadata.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use serde::Serialize;
use crate::core::{
    CompressionSettings, ConversionInfo, ConversionResult, ConversionStatus, SkipReason,
};
use crate::processing::estimator;
use crate::utils::{ConverterError, ConverterResult, is_target_format};

/// One row of the queue as shown to the user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueRow {
    pub path: PathBuf,
    /// `None` until the file size has been read
    pub info: Option<ConversionInfo>,
}

/// Queue of files awaiting conversion.
///
/// Paths are unique and kept in insertion order, which is also batch order.
/// Metadata is created lazily once the file size is known.
#[derive(Debug, Default)]
pub struct QueueStore {
    entries: Vec<PathBuf>,
    info: HashMap<PathBuf, ConversionInfo>,
    running: bool,
}

impl QueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `path`; returns `false` if it was already queued.
    pub fn enqueue(&mut self, path: impl Into<PathBuf>) -> bool {
        let path = path.into();
        if self.contains(&path) {
            return false;
        }
        self.entries.push(path);
        true
    }

    /// Removes `path` and its metadata. Rejected while a batch is running.
    pub fn dequeue(&mut self, path: &Path) -> ConverterResult<bool> {
        self.ensure_idle()?;
        let before = self.entries.len();
        self.entries.retain(|p| p != path);
        self.info.remove(path);
        Ok(self.entries.len() != before)
    }

    /// Empties the queue. Rejected while a batch is running.
    pub fn clear(&mut self) -> ConverterResult<()> {
        self.ensure_idle()?;
        self.entries.clear();
        self.info.clear();
        Ok(())
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.iter().any(|p| p == path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Queued paths in batch order.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.entries.clone()
    }

    pub fn info(&self, path: &Path) -> Option<&ConversionInfo> {
        self.info.get(path)
    }

    pub fn rows(&self) -> Vec<QueueRow> {
        self.entries
            .iter()
            .map(|path| QueueRow {
                path: path.clone(),
                info: self.info.get(path).cloned(),
            })
            .collect()
    }

    /// Records the measured size of a queued file and initialises its metadata.
    ///
    /// A WebP input is marked skipped straight away when `skip_existing` is on
    /// and `true` is returned; anything else becomes pending with a fresh
    /// estimate.
    pub fn record_size(
        &mut self,
        path: &Path,
        size: u64,
        settings: &CompressionSettings,
        skip_existing: bool,
    ) -> bool {
        if !self.contains(path) {
            return false;
        }
        if skip_existing && is_target_format(path) {
            self.info.insert(path.to_path_buf(), ConversionInfo::already_target(size));
            return true;
        }
        let estimate = estimator::estimate(size, settings);
        match self.info.get_mut(path) {
            Some(info) => {
                info.original_size = size;
                if info.status == ConversionStatus::Pending {
                    info.estimated_output_size = Some(estimate);
                }
            }
            None => {
                self.info.insert(path.to_path_buf(), ConversionInfo::pending(size, estimate));
            }
        }
        false
    }

    /// Re-estimates every pending entry. Terminal entries are left alone.
    pub fn refresh_estimates(&mut self, settings: &CompressionSettings) {
        for info in self.info.values_mut() {
            if info.status == ConversionStatus::Pending {
                info.estimated_output_size =
                    Some(estimator::estimate(info.original_size, settings));
            }
        }
    }

    /// Applies a change of the skip-existing toggle to queued WebP files.
    ///
    /// Turning it on marks them skipped. Turning it off returns to pending only
    /// the entries that were skipped for already being WebP. Returns how many
    /// entries changed.
    pub fn apply_skip_policy(&mut self, skip: bool, settings: &CompressionSettings) -> usize {
        let mut changed = 0;
        for path in self.entries.iter().filter(|p| is_target_format(p)) {
            let Some(info) = self.info.get_mut(path) else {
                continue;
            };
            if skip {
                if info.status != ConversionStatus::Skipped {
                    *info = ConversionInfo::already_target(info.original_size);
                    changed += 1;
                }
            } else if info.status == ConversionStatus::Skipped
                && info.skip_reason == Some(SkipReason::AlreadyTarget)
            {
                let estimate = estimator::estimate(info.original_size, settings);
                *info = ConversionInfo::pending(info.original_size, estimate);
                changed += 1;
            }
        }
        changed
    }

    /// Stores the terminal outcome of a conversion job.
    pub fn apply_result(&mut self, result: &ConversionResult) {
        if !self.contains(&result.input_path) {
            return;
        }
        let info = self
            .info
            .entry(result.input_path.clone())
            .or_insert_with(|| ConversionInfo::pending(result.original_size, 0));
        // Failures before the input was measured report zero; keep the measured size.
        if result.original_size > 0 {
            info.original_size = result.original_size;
        }
        info.status = result.status;
        info.estimated_output_size = None;
        info.actual_output_size =
            if result.status.has_output() { result.output_size } else { None };
        info.skip_reason = result.skip_reason;
        info.error = result.error.clone();
    }

    /// Marks the start of a batch; dequeue and clear are refused until
    /// [`Self::finish_batch`].
    pub fn begin_batch(&mut self) -> ConverterResult<Vec<PathBuf>> {
        self.ensure_idle()?;
        if self.entries.is_empty() {
            return Err(ConverterError::EmptyQueue);
        }
        self.running = true;
        Ok(self.paths())
    }

    pub fn finish_batch(&mut self) {
        self.running = false;
    }

    /// Non-empty and nothing left pending.
    pub fn is_batch_complete(&self) -> bool {
        !self.entries.is_empty()
            && self
                .entries
                .iter()
                .all(|p| self.info.get(p).is_some_and(|info| info.status.is_terminal()))
    }

    /// Total size of every sized entry.
    pub fn total_original_size(&self) -> u64 {
        self.entries
            .iter()
            .filter_map(|p| self.info.get(p))
            .map(|info| info.original_size)
            .sum()
    }

    /// Projected savings if every sized entry were converted with `settings`.
    pub fn estimated_savings(&self, settings: &CompressionSettings) -> u64 {
        let total = self.total_original_size();
        total.saturating_sub(estimator::estimate(total, settings))
    }

    /// Actual savings over converted and skipped entries; never negative.
    pub fn total_savings(&self) -> u64 {
        let (original, output) = self
            .entries
            .iter()
            .filter_map(|p| self.info.get(p))
            .filter_map(|info| info.output_size().map(|out| (info.original_size, out)))
            .fold((0u64, 0u64), |(o, w), (a, b)| (o + a, w + b));
        original.saturating_sub(output)
    }

    fn ensure_idle(&self) -> ConverterResult<()> {
        if self.running {
            return Err(ConverterError::BatchRunning);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> CompressionSettings {
        CompressionSettings::lossy(80.0)
    }

    #[test]
    fn test_enqueue_is_idempotent() {
        let mut queue = QueueStore::new();
        assert!(queue.enqueue("/a.png"));
        assert!(queue.enqueue("/b.png"));
        assert!(!queue.enqueue("/a.png"));
        assert_eq!(queue.paths(), vec![PathBuf::from("/a.png"), PathBuf::from("/b.png")]);
    }

    #[test]
    fn test_record_size_initialises_pending_estimate() {
        let mut queue = QueueStore::new();
        queue.enqueue("/a.png");
        assert!(queue.info(Path::new("/a.png")).is_none());

        assert!(!queue.record_size(Path::new("/a.png"), 1_000_000, &settings(), true));
        let info = queue.info(Path::new("/a.png")).unwrap();
        assert_eq!(info.status, ConversionStatus::Pending);
        assert_eq!(info.estimate(), Some(800_000));
    }

    #[test]
    fn test_record_size_ignores_unknown_paths() {
        let mut queue = QueueStore::new();
        queue.record_size(Path::new("/ghost.png"), 10, &settings(), true);
        assert!(queue.info(Path::new("/ghost.png")).is_none());
    }

    #[test]
    fn test_webp_is_skipped_on_arrival() {
        let mut queue = QueueStore::new();
        queue.enqueue("/done.webp");
        assert!(queue.record_size(Path::new("/done.webp"), 5_000, &settings(), true));
        let info = queue.info(Path::new("/done.webp")).unwrap();
        assert_eq!(info.status, ConversionStatus::Skipped);
        assert_eq!(info.actual_output_size, Some(5_000));
        assert_eq!(info.skip_reason, Some(SkipReason::AlreadyTarget));
    }

    #[test]
    fn test_refresh_leaves_terminal_entries() {
        let mut queue = QueueStore::new();
        queue.enqueue("/a.png");
        queue.enqueue("/b.png");
        queue.record_size(Path::new("/a.png"), 1_000, &settings(), true);
        queue.record_size(Path::new("/b.png"), 1_000, &settings(), true);
        let b = ConversionResult::converted("/b.png".into(), "/b.webp".into(), 1_000, Some(420));
        queue.apply_result(&b);

        queue.refresh_estimates(&CompressionSettings::lossless());
        assert_eq!(queue.info(Path::new("/a.png")).unwrap().estimate(), Some(750));
        let b = queue.info(Path::new("/b.png")).unwrap();
        assert_eq!(b.actual_output_size, Some(420));
        assert_eq!(b.estimated_output_size, None);
    }

    #[test]
    fn test_skip_toggle_only_resets_already_webp() {
        let mut queue = QueueStore::new();
        for p in ["/x.webp", "/y.webp", "/z.png"] {
            queue.enqueue(p);
        }
        queue.record_size(Path::new("/x.webp"), 3_000, &settings(), true);
        queue.record_size(Path::new("/y.webp"), 4_000, &settings(), false);
        queue.record_size(Path::new("/z.png"), 1_000, &settings(), true);
        // y.webp was skipped because its output already existed elsewhere
        queue.apply_result(&ConversionResult::skipped(
            "/y.webp".into(),
            Some("/out/y.webp".into()),
            4_000,
            Some(3_900),
            SkipReason::OutputExists,
        ));
        queue.apply_result(&ConversionResult::skipped(
            "/z.png".into(),
            Some("/z.webp".into()),
            1_000,
            Some(700),
            SkipReason::OutputExists,
        ));

        assert_eq!(queue.apply_skip_policy(false, &settings()), 1);
        let x = queue.info(Path::new("/x.webp")).unwrap();
        assert_eq!(x.status, ConversionStatus::Pending);
        assert_eq!(x.actual_output_size, None);
        assert_eq!(x.estimate(), Some(2_400));
        assert_eq!(queue.info(Path::new("/y.webp")).unwrap().status, ConversionStatus::Skipped);
        assert_eq!(queue.info(Path::new("/z.png")).unwrap().status, ConversionStatus::Skipped);

        // And back on again
        assert_eq!(queue.apply_skip_policy(true, &settings()), 1);
        let x = queue.info(Path::new("/x.webp")).unwrap();
        assert_eq!(x.status, ConversionStatus::Skipped);
        assert_eq!(x.actual_output_size, Some(3_000));
    }

    #[test]
    fn test_dequeue_and_clear_are_refused_while_running() {
        let mut queue = QueueStore::new();
        queue.enqueue("/a.png");
        queue.enqueue("/b.png");
        let snapshot = queue.begin_batch().unwrap();
        assert_eq!(snapshot.len(), 2);

        assert!(matches!(queue.dequeue(Path::new("/a.png")), Err(ConverterError::BatchRunning)));
        assert!(matches!(queue.clear(), Err(ConverterError::BatchRunning)));
        assert!(matches!(queue.begin_batch(), Err(ConverterError::BatchRunning)));
        // Enqueue stays open; the new entry joins the next batch
        assert!(queue.enqueue("/c.png"));

        queue.finish_batch();
        assert!(queue.dequeue(Path::new("/a.png")).unwrap());
        assert!(!queue.dequeue(Path::new("/a.png")).unwrap());
        queue.clear().unwrap();
        assert!(queue.is_empty());
    }

    #[test]
    fn test_empty_queue_cannot_start() {
        let mut queue = QueueStore::new();
        assert!(matches!(queue.begin_batch(), Err(ConverterError::EmptyQueue)));
        assert!(!queue.is_running());
    }

    #[test]
    fn test_completion_and_totals() {
        let mut queue = QueueStore::new();
        assert!(!queue.is_batch_complete());
        queue.enqueue("/a.png");
        queue.enqueue("/b.png");
        queue.record_size(Path::new("/a.png"), 1_000, &settings(), true);
        queue.record_size(Path::new("/b.png"), 1_000, &settings(), true);
        assert_eq!(queue.estimated_savings(&settings()), 400);
        assert!(!queue.is_batch_complete());

        let a = ConversionResult::converted("/a.png".into(), "/a.webp".into(), 1_000, Some(300));
        queue.apply_result(&a);
        queue.apply_result(&ConversionResult::failed("/b.png".into(), None, 1_000, "boom"));
        assert!(queue.is_batch_complete());
        assert_eq!(queue.total_savings(), 700);
        assert_eq!(queue.info(Path::new("/b.png")).unwrap().error.as_deref(), Some("boom"));
        assert_eq!(queue.info(Path::new("/a.png")).unwrap().status, ConversionStatus::Converted);
    }
}
