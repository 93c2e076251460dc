//! Cadenza Storage Library
//!
//! Storage abstraction for direct-to-storage uploads. Every backend can issue a
//! short-lived signed write URL, derive the public read URL of a key, and delete by key.
//!
//! # Storage key format
//!
//! Keys are `{bucket}/{path}` where `bucket` is one of the logical buckets
//! (`audio-submissions`, `submission-images`, `profile-pictures`). Keys must not contain
//! `..` or a leading `/`. Key checks are centralized in the `keys` module.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod signing;
pub mod traits;

// Re-export commonly used types
pub use cadenza_core::StorageBackend;
#[cfg(feature = "storage-local")]
pub use factory::create_local_storage;
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use signing::UploadSigner;
pub use traits::{Storage, StorageError, StorageResult};
