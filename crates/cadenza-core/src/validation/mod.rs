//! Server-side validation of uploaded files

pub mod file;
pub mod filename;

pub use file::{detect_content_type, FileValidationError, UploadValidator};
pub use filename::{generate_upload_path, sanitize_file_name};
