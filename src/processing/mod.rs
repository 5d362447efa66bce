pub mod dispatcher;
pub mod encoder;
pub mod estimator;
pub mod output_path;
pub mod scanner;

pub use dispatcher::{ConversionJob, DEFAULT_WORKERS, DispatchEvent, Dispatcher, JobOutcome};
pub use encoder::{CwebpEncoder, EncodeMode, EncodeRequest, Encoder};
pub use scanner::scan_folder;
