pub mod error;
pub mod formats;
pub mod fs;
pub mod size;

pub use error::{ConverterError, ConverterResult, EncodeError, PathError, ValidationError};
pub use formats::{
    ImageFormat, TARGET_EXTENSION, format_from_path, is_supported_image, is_target_format,
};
pub use fs::{create_dir_all, dir_exists, file_name, file_size, path_exists, remove_file};
pub use size::{format_bytes, format_savings, savings_percent};
