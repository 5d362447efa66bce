//! Bounded-concurrency conversion of queued files.
//!
//! A coordinator task walks the jobs in queue order and waits for a semaphore
//! permit before spawning each worker, so at most `worker_count` encodes are
//! in flight. Workers never touch the queue; they report over a channel and
//! the receiver applies every result.

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, warn};
use crate::core::{CompressionSettings, ConversionResult, LogEntry, OutputPolicy, SkipReason};
use crate::processing::encoder::{EncodeRequest, Encoder};
use crate::processing::output_path::output_path;
use crate::utils::{
    create_dir_all, file_name, file_size, is_target_format, path_exists, remove_file,
};

pub const DEFAULT_WORKERS: usize = 4;

/// One file to convert, with the settings and policy captured at batch start.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    pub input: PathBuf,
    pub settings: CompressionSettings,
    pub policy: OutputPolicy,
}

/// Terminal result of a job plus the log lines it produced.
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub result: ConversionResult,
    pub messages: Vec<LogEntry>,
}

impl JobOutcome {
    fn failed(input: PathBuf, original_size: u64, error: String) -> Self {
        let message = LogEntry::error(format!("Error for {}: {}", file_name(&input), error));
        Self {
            result: ConversionResult::failed(input, None, original_size, error),
            messages: vec![message],
        }
    }
}

#[derive(Debug)]
pub enum DispatchEvent {
    /// A worker slot was granted and the job submitted
    Started { input: PathBuf },
    Finished(JobOutcome),
}

pub struct Dispatcher<E: Encoder> {
    encoder: Arc<E>,
    semaphore: Arc<Semaphore>,
    worker_count: usize,
}

impl<E: Encoder> Clone for Dispatcher<E> {
    fn clone(&self) -> Self {
        Self {
            encoder: Arc::clone(&self.encoder),
            semaphore: Arc::clone(&self.semaphore),
            worker_count: self.worker_count,
        }
    }
}

impl<E: Encoder> Dispatcher<E> {
    pub fn new(encoder: E, worker_count: Option<usize>) -> Self {
        let worker_count = worker_count.unwrap_or(DEFAULT_WORKERS).max(1);
        Self {
            encoder: Arc::new(encoder),
            semaphore: Arc::new(Semaphore::new(worker_count)),
            worker_count,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Starts converting `jobs` and returns the event stream.
    ///
    /// Each job yields exactly one `Started` followed later by one `Finished`.
    /// The stream ends once every worker has reported.
    pub fn dispatch(&self, jobs: Vec<ConversionJob>) -> mpsc::UnboundedReceiver<DispatchEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let encoder = Arc::clone(&self.encoder);
        let semaphore = Arc::clone(&self.semaphore);
        let worker_count = self.worker_count;

        tokio::spawn(async move {
            debug!("Dispatching {} job(s) across {} worker(s)", jobs.len(), worker_count);
            for job in jobs {
                let permit = match Arc::clone(&semaphore).acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        warn!("Failed to acquire semaphore: {}", e);
                        let _ = tx.send(DispatchEvent::Started { input: job.input.clone() });
                        let error = format!("Failed to acquire worker: {}", e);
                        let outcome = JobOutcome::failed(job.input, 0, error);
                        let _ = tx.send(DispatchEvent::Finished(outcome));
                        continue;
                    }
                };
                debug!(
                    "Worker started - Available permits: {}/{}, Task: {}",
                    semaphore.available_permits(),
                    worker_count,
                    job.input.display()
                );
                let _ = tx.send(DispatchEvent::Started { input: job.input.clone() });

                let tx = tx.clone();
                let encoder = Arc::clone(&encoder);
                tokio::spawn(async move {
                    let input = job.input.clone();
                    let outcome = match tokio::spawn(convert_one(encoder, job)).await {
                        Ok(outcome) => outcome,
                        Err(e) => {
                            warn!("Worker for {} did not finish: {}", input.display(), e);
                            JobOutcome::failed(input, 0, format!("Task panicked: {}", e))
                        }
                    };
                    drop(permit);
                    let _ = tx.send(DispatchEvent::Finished(outcome));
                });
            }
        });

        rx
    }
}

/// Runs one job to a terminal state.
async fn convert_one<E: Encoder>(encoder: Arc<E>, job: ConversionJob) -> JobOutcome {
    let ConversionJob { input, settings, policy } = job;
    let name = file_name(&input);

    let original_size = match file_size(&input).await {
        Ok(size) => size,
        Err(e) => return JobOutcome::failed(input, 0, e.to_string()),
    };

    if policy.skip_existing_output && is_target_format(&input) {
        return JobOutcome {
            result: ConversionResult::skipped(
                input,
                None,
                original_size,
                Some(original_size),
                SkipReason::AlreadyTarget,
            ),
            messages: vec![LogEntry::info(format!("Skipped {} (already a WebP file).", name))],
        };
    }

    let output = output_path(&input, &policy);
    if policy.skip_existing_output && path_exists(&output).await {
        let existing = file_size(&output).await.ok();
        return JobOutcome {
            result: ConversionResult::skipped(
                input,
                Some(output),
                original_size,
                existing,
                SkipReason::OutputExists,
            ),
            messages: vec![LogEntry::info(format!("Skipped {} (WebP already exists).", name))],
        };
    }

    if let Some(dir) = output.parent() {
        if let Err(e) = create_dir_all(dir).await {
            return JobOutcome::failed(input, original_size, e.to_string());
        }
    }

    let request = EncodeRequest::new(&input, &output, &settings);
    debug!("Encoding {} -> {}", input.display(), output.display());
    if let Err(e) = encoder.encode(&request).await {
        let detail = e.to_string();
        return JobOutcome {
            messages: vec![LogEntry::error(format!("Error for {}: {}", name, detail))],
            result: ConversionResult::failed(input, Some(output), original_size, detail),
        };
    }

    let output_size = file_size(&output).await.ok();
    let mut messages = vec![LogEntry::info(format!(
        "OK: {} → {} ({})",
        name,
        file_name(&output),
        settings.label()
    ))];

    // A WebP re-encoded in place has no separate original left to delete.
    if policy.delete_original_on_success && output != input {
        match remove_file(&input).await {
            Ok(()) => messages.push(LogEntry::info(format!("Deleted original: {}", name))),
            Err(e) => messages.push(LogEntry::warn(format!(
                "Warning: Could not delete original {}: {}",
                name, e
            ))),
        }
    }

    JobOutcome {
        result: ConversionResult::converted(input, output, original_size, output_size),
        messages,
    }
}
