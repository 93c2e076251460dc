//! Shared key handling for storage backends.

use crate::{StorageError, StorageResult};
use cadenza_core::Bucket;

/// Build the storage key for a path inside a bucket.
pub fn storage_key(bucket: Bucket, path: &str) -> StorageResult<String> {
    validate_key(path)?;
    Ok(bucket.storage_key(path))
}

/// Reject keys that could escape their bucket.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
    }
    if key.contains("..") || key.starts_with('/') || key.contains('\\') {
        return Err(StorageError::InvalidKey(
            "Storage key contains invalid characters".to_string(),
        ));
    }
    Ok(())
}

/// Percent-encode each segment of a key for use in a URL path.
pub fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
