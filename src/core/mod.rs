//! Core application types and state management.
//!
//! This module contains the fundamental types used throughout the application:
//! - [`AppState`]: owner of the queue, controls, event log and progress
//! - [`QueueStore`]: ordered queue with per-file [`ConversionInfo`]
//! - [`CompressionSettings`] and [`OutputPolicy`]: what every conversion uses
//! - [`ConversionResult`] and [`BatchReport`]: per-entry and per-batch outcomes
//! - [`Progress`]: progress tracking for batch operations

mod state;
mod types;
mod queue;
mod log;
mod progress;
mod report;

pub use state::AppState;
pub use types::{
    CompressionSettings, ConversionInfo, ConversionResult, ConversionStatus, OutputPolicy,
    QualityPreset, SkipReason,
};
pub use queue::{QueueRow, QueueStore};
pub use log::{EventLog, LogEntry, LogLevel, MAX_LOG_MESSAGES};
pub use progress::{Progress, ProgressType};
pub use report::BatchReport;
