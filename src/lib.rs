// Module declarations in dependency order
pub mod utils;
pub mod core;
pub mod processing;

// Public exports for external consumers
pub use crate::core::{
    AppState, BatchReport, CompressionSettings, ConversionInfo, ConversionResult, ConversionStatus,
    OutputPolicy, Progress, ProgressType, QualityPreset, QueueRow,
};
pub use crate::processing::{CwebpEncoder, Encoder};
pub use crate::utils::{ConverterError, ConverterResult};

// This library file is the public API of the converter.
// The command-line entry point is in main.rs.
