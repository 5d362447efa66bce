//! Application state: the single owner and writer of the queue.

use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use crate::core::{
    BatchReport, CompressionSettings, EventLog, LogEntry, OutputPolicy, Progress, ProgressType,
    QualityPreset, QueueRow, QueueStore,
};
use crate::processing::{ConversionJob, CwebpEncoder, DispatchEvent, Dispatcher, Encoder, scanner};
use crate::utils::formats::extension_of;
use crate::utils::{
    ConverterError, ConverterResult, PathError, ValidationError, file_name, file_size,
    is_supported_image,
};

/// Everything guarded by the session lock.
#[derive(Debug, Default)]
struct Session {
    queue: QueueStore,
    settings: CompressionSettings,
    preset: QualityPreset,
    policy: OutputPolicy,
    scan_subfolders: bool,
    log: EventLog,
    progress: Progress,
}

impl Session {
    fn set_progress(&mut self, progress: Progress, on_progress: &impl Fn(&Progress)) {
        on_progress(&progress);
        self.progress = progress;
    }
}

/// Clears the queue's running flag when a batch future is dropped before it
/// completes.
struct BatchGuard {
    session: Option<Arc<Mutex<Session>>>,
}

impl BatchGuard {
    fn disarm(&mut self) {
        self.session = None;
    }
}

impl Drop for BatchGuard {
    fn drop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        debug!("Batch abandoned before completion; unlocking queue");
        if let Ok(mut locked) = session.try_lock() {
            locked.queue.finish_batch();
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    session.lock().await.queue.finish_batch();
                });
            }
            Err(e) => warn!("Could not unlock queue after abandoned batch: {}", e),
        }
    }
}

/// Queue, controls, event log and progress behind one lock, plus the
/// dispatcher that runs batches.
///
/// Cloning is cheap and every clone shares the same session.
pub struct AppState<E: Encoder = CwebpEncoder> {
    session: Arc<Mutex<Session>>,
    dispatcher: Dispatcher<E>,
}

impl<E: Encoder> Clone for AppState<E> {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
            dispatcher: self.dispatcher.clone(),
        }
    }
}

impl<E: Encoder> AppState<E> {
    pub fn new(encoder: E) -> Self {
        Self::with_workers(encoder, None)
    }

    pub fn with_workers(encoder: E, worker_count: Option<usize>) -> Self {
        let dispatcher = Dispatcher::new(encoder, worker_count);
        debug!("AppState initialized with {} worker(s)", dispatcher.worker_count());
        Self {
            session: Arc::new(Mutex::new(Session::default())),
            dispatcher,
        }
    }

    /// Handles a dropped file or folder.
    ///
    /// Folders are scanned with the current subfolder setting. Returns how many
    /// entries were added; rejected items are logged and leave the queue as is.
    pub async fn add_path(&self, path: &Path) -> ConverterResult<usize> {
        let metadata = match tokio::fs::metadata(path).await {
            Ok(metadata) => metadata,
            Err(_) => {
                self.session.lock().await.log.warn("Could not read dropped file.");
                return Err(ValidationError::path_not_found(path).into());
            }
        };

        if metadata.is_dir() {
            let recursive = {
                let mut session = self.session.lock().await;
                let recursive = session.scan_subfolders;
                session.log.info(format!(
                    "Dropped folder: {} (include subfolders: {})",
                    path.display(),
                    if recursive { "yes" } else { "no" }
                ));
                recursive
            };
            return self.scan_folder(path, recursive).await;
        }

        if !is_supported_image(path) {
            let ext = extension_of(path);
            let err = PathError::Unsupported(ext);
            self.session.lock().await.log.warn(err.to_string());
            return Err(err.into());
        }

        let mut session = self.session.lock().await;
        if !session.queue.enqueue(path) {
            debug!("{} is already queued", path.display());
            return Ok(0);
        }
        session.log.info(format!("Added {} to queue.", file_name(path)));
        Self::measure_size(&mut session, path).await;
        Ok(1)
    }

    /// Scans `root` and queues every new candidate in file-name order.
    ///
    /// On success `root` becomes the base for structure-preserving output.
    pub async fn scan_folder(&self, root: &Path, recursive: bool) -> ConverterResult<usize> {
        self.session.lock().await.log.info(format!("Scanning folder: {}", root.display()));

        let owned = root.to_path_buf();
        let scanned = tokio::task::spawn_blocking(move || scanner::scan_folder(&owned, recursive))
            .await
            .map_err(|e| ConverterError::scan(format!("scan task failed: {}", e)))
            .and_then(|result| result);

        let mut session = self.session.lock().await;
        let found = match scanned {
            Ok(found) => found,
            Err(e) => {
                session.log.error(e.to_string());
                return Err(e);
            }
        };

        session.policy.last_scanned_folder = Some(root.to_path_buf());
        let mut added = 0;
        for path in found {
            if session.queue.enqueue(path.clone()) {
                Self::measure_size(&mut session, &path).await;
                added += 1;
            }
        }

        if added > 0 {
            session.log.info(format!("Added {} file(s) from folder to queue.", added));
        } else {
            session.log.info("No new image files found in selected folder.");
        }
        Ok(added)
    }

    async fn measure_size(session: &mut Session, path: &Path) {
        match file_size(path).await {
            Ok(size) => {
                let settings = session.settings;
                let skip = session.policy.skip_existing_output;
                if session.queue.record_size(path, size, &settings, skip) {
                    session.log.info(format!("Skipped {} (already a WebP file).", file_name(path)));
                }
            }
            Err(e) => debug!("Size of {} unknown: {}", path.display(), e),
        }
    }

    pub async fn remove(&self, path: &Path) -> ConverterResult<bool> {
        self.session.lock().await.queue.dequeue(path)
    }

    pub async fn clear(&self) -> ConverterResult<()> {
        self.session.lock().await.queue.clear()
    }

    /// Sets the lossy quality and switches the preset to `Custom`.
    pub async fn set_quality(&self, quality: f64) -> ConverterResult<()> {
        let mut session = self.session.lock().await;
        let settings = CompressionSettings { quality, ..session.settings };
        settings.validate()?;
        session.settings = settings;
        session.preset = QualityPreset::Custom;
        session.queue.refresh_estimates(&settings);
        Ok(())
    }

    pub async fn apply_preset(&self, preset: QualityPreset) {
        let mut session = self.session.lock().await;
        session.preset = preset;
        if let Some(quality) = preset.quality_value() {
            session.settings.quality = quality;
        }
        let settings = session.settings;
        session.queue.refresh_estimates(&settings);
    }

    pub async fn set_lossless(&self, lossless: bool) {
        let mut session = self.session.lock().await;
        session.settings.lossless = lossless;
        let settings = session.settings;
        session.queue.refresh_estimates(&settings);
    }

    pub async fn set_skip_existing(&self, skip: bool) {
        let mut session = self.session.lock().await;
        if session.policy.skip_existing_output == skip {
            return;
        }
        session.policy.skip_existing_output = skip;
        let settings = session.settings;
        let changed = session.queue.apply_skip_policy(skip, &settings);
        debug!("Skip-existing set to {}: {} queued WebP file(s) updated", skip, changed);
    }

    /// Replaces the output policy; a change of the skip flag is applied to
    /// the queue as with [`Self::set_skip_existing`].
    pub async fn set_output_policy(&self, policy: OutputPolicy) {
        let skip = policy.skip_existing_output;
        {
            let mut session = self.session.lock().await;
            session.policy = OutputPolicy {
                skip_existing_output: session.policy.skip_existing_output,
                ..policy
            };
        }
        self.set_skip_existing(skip).await;
    }

    pub async fn set_scan_subfolders(&self, recursive: bool) {
        self.session.lock().await.scan_subfolders = recursive;
    }

    pub async fn settings(&self) -> CompressionSettings {
        self.session.lock().await.settings
    }

    pub async fn preset(&self) -> QualityPreset {
        self.session.lock().await.preset
    }

    pub async fn output_policy(&self) -> OutputPolicy {
        self.session.lock().await.policy.clone()
    }

    pub async fn scan_subfolders(&self) -> bool {
        self.session.lock().await.scan_subfolders
    }

    pub async fn rows(&self) -> Vec<QueueRow> {
        self.session.lock().await.queue.rows()
    }

    pub async fn queue_len(&self) -> usize {
        self.session.lock().await.queue.len()
    }

    pub async fn is_running(&self) -> bool {
        self.session.lock().await.queue.is_running()
    }

    pub async fn is_batch_complete(&self) -> bool {
        self.session.lock().await.queue.is_batch_complete()
    }

    pub async fn estimated_savings(&self) -> u64 {
        let session = self.session.lock().await;
        session.queue.estimated_savings(&session.settings)
    }

    pub async fn total_savings(&self) -> u64 {
        self.session.lock().await.queue.total_savings()
    }

    pub async fn progress(&self) -> Progress {
        self.session.lock().await.progress.clone()
    }

    pub async fn log_messages(&self) -> Vec<String> {
        self.session.lock().await.log.messages()
    }

    pub async fn status_message(&self) -> Option<String> {
        self.session.lock().await.log.status_message().map(str::to_string)
    }

    /// Converts every queued entry and waits for the batch to finish.
    ///
    /// Settings and policy are captured up front. `on_progress` is called
    /// after each worker event with the session lock held, so it must not
    /// call back into this state. Dropping the future stops reporting but not
    /// the workers already submitted; the queue is unlocked either way.
    pub async fn run_batch(
        &self,
        on_progress: impl Fn(&Progress) + Send,
    ) -> ConverterResult<BatchReport> {
        let jobs = {
            let mut session = self.session.lock().await;
            if session.queue.is_empty() {
                session.log.warn("No files in queue.");
                return Err(ConverterError::EmptyQueue);
            }
            let paths = session.queue.begin_batch()?;
            let settings = session.settings;
            let policy = session.policy.clone();

            let status = format!("Converting {} file(s)…", paths.len());
            session.log.info(status.clone());
            let start = Progress::new(ProgressType::Start, 0, paths.len(), &status);
            session.set_progress(start, &on_progress);

            paths
                .into_iter()
                .map(|input| ConversionJob { input, settings, policy: policy.clone() })
                .collect::<Vec<_>>()
        };

        let mut guard = BatchGuard { session: Some(Arc::clone(&self.session)) };
        let total = jobs.len();
        let mut report = BatchReport::new(total);
        let mut events = self.dispatcher.dispatch(jobs);

        while let Some(event) = events.recv().await {
            let mut session = self.session.lock().await;
            match event {
                DispatchEvent::Started { input } => {
                    let progress =
                        session.progress.clone().with_current_file(Some(file_name(&input)));
                    session.set_progress(progress, &on_progress);
                }
                DispatchEvent::Finished(outcome) => {
                    for message in outcome.messages {
                        session.log.push(message);
                    }
                    session.queue.apply_result(&outcome.result);
                    let current = file_name(&outcome.result.input_path);
                    report.record(outcome.result);

                    let status = session.log.status_message().unwrap_or_default().to_string();
                    let progress =
                        Progress::new(ProgressType::Progress, report.completed(), total, &status)
                            .with_current_file(Some(current));
                    session.set_progress(progress, &on_progress);
                }
            }
        }

        let mut session = self.session.lock().await;
        session.queue.finish_batch();
        guard.disarm();
        let summary = report.summary();
        let (entry, progress_type) = if report.has_failures() {
            (LogEntry::error(summary.clone()), ProgressType::Error)
        } else {
            (LogEntry::info(summary.clone()), ProgressType::Complete)
        };
        session.log.push(entry);
        let current = session.progress.current_file.clone();
        let done = Progress::new(progress_type, report.completed(), total, &summary)
            .with_current_file(current);
        session.set_progress(done, &on_progress);

        Ok(report)
    }
}
