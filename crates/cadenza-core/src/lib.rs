//! Cadenza Core Library
//!
//! This crate provides the domain models, error types, configuration, and server-side
//! file validation shared by every Cadenza component.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;
pub mod validation;

// Re-export commonly used types
pub use config::{BaseConfig, Config, UploadConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::Bucket;
pub use storage_types::StorageBackend;
