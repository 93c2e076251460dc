//! Mock Storage implementation for testing

use async_trait::async_trait;
use bytes::Bytes;
use cadenza_storage::{Storage, StorageBackend, StorageError, StorageResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Mock storage that keeps objects in memory and records deletes
#[derive(Clone)]
pub struct MockStorage {
    files: Arc<Mutex<HashMap<String, (Bytes, String)>>>,
    deleted: Arc<Mutex<Vec<String>>>,
    fail_deletes: Arc<AtomicBool>,
    backend_type: StorageBackend,
}

impl MockStorage {
    pub const PUBLIC_BASE: &'static str = "https://cdn.test";
    pub const UPLOAD_BASE: &'static str = "https://upload.test";

    pub fn new() -> Self {
        Self::with_backend(StorageBackend::S3)
    }

    pub fn with_backend(backend_type: StorageBackend) -> Self {
        Self {
            files: Arc::new(Mutex::new(HashMap::new())),
            deleted: Arc::new(Mutex::new(Vec::new())),
            fail_deletes: Arc::new(AtomicBool::new(false)),
            backend_type,
        }
    }

    pub fn set_file(&self, key: &str, data: impl Into<Bytes>) {
        self.files
            .lock()
            .unwrap()
            .insert(key.to_string(), (data.into(), "application/octet-stream".to_string()));
    }

    pub fn has_file(&self, key: &str) -> bool {
        self.files.lock().unwrap().contains_key(key)
    }

    pub fn get_file(&self, key: &str) -> Option<Bytes> {
        self.files.lock().unwrap().get(key).map(|(data, _)| data.clone())
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        self.files.lock().unwrap().get(key).map(|(_, ct)| ct.clone())
    }

    /// Every key passed to `delete`, including failed attempts
    pub fn deleted_keys(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }
}

impl Default for MockStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for MockStorage {
    async fn signed_upload_url(
        &self,
        storage_key: &str,
        _content_type: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        Ok(format!(
            "{}/{}?expires={}&signature=test",
            Self::UPLOAD_BASE,
            storage_key,
            expires_in.as_secs()
        ))
    }

    fn public_url(&self, storage_key: &str) -> String {
        format!("{}/{}", Self::PUBLIC_BASE, storage_key)
    }

    async fn put(&self, storage_key: &str, data: Bytes, content_type: &str) -> StorageResult<()> {
        self.files
            .lock()
            .unwrap()
            .insert(storage_key.to_string(), (data, content_type.to_string()));
        Ok(())
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        self.deleted.lock().unwrap().push(storage_key.to_string());
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StorageError::DeleteFailed(storage_key.to_string()));
        }
        self.files.lock().unwrap().remove(storage_key);
        Ok(())
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        Ok(self.files.lock().unwrap().contains_key(storage_key))
    }

    fn backend_type(&self) -> StorageBackend {
        self.backend_type
    }
}
