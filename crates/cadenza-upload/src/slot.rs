//! One media slot of a submission form
//!
//! The slot owns the reducer state for a single file. Each `select`, `clear`, and upload
//! start begins a new attempt; outcomes of an older attempt are dropped, so a file picked
//! mid-upload is never overwritten by the previous file's result.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use cadenza_core::Bucket;

use crate::reducer::{
    initial_state, reduce, SelectedFile, UploadAction, UploadState, UploadStatus,
};
use crate::transport::Uploader;

#[derive(Debug)]
struct Current {
    state: Arc<UploadState>,
    attempt: u64,
}

#[derive(Debug)]
pub struct UploadSlot {
    bucket: Bucket,
    current: Mutex<Current>,
}

impl UploadSlot {
    pub fn new(bucket: Bucket) -> Self {
        Self {
            bucket,
            current: Mutex::new(Current {
                state: initial_state(),
                attempt: 0,
            }),
        }
    }

    pub fn bucket(&self) -> Bucket {
        self.bucket
    }

    fn lock(&self) -> MutexGuard<'_, Current> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> Arc<UploadState> {
        Arc::clone(&self.lock().state)
    }

    pub fn dispatch(&self, action: &UploadAction) -> Arc<UploadState> {
        let mut current = self.lock();
        if matches!(
            action,
            UploadAction::SelectFile(_) | UploadAction::Clear | UploadAction::UploadStart
        ) {
            current.attempt += 1;
        }
        current.state = reduce(&current.state, action);
        Arc::clone(&current.state)
    }

    /// Apply an outcome only while `attempt` is still the slot's latest
    fn dispatch_for(&self, attempt: u64, action: &UploadAction) -> Option<Arc<UploadState>> {
        let mut current = self.lock();
        if current.attempt != attempt {
            return None;
        }
        current.state = reduce(&current.state, action);
        Some(Arc::clone(&current.state))
    }

    pub fn select(&self, file: SelectedFile) -> Arc<UploadState> {
        self.dispatch(&UploadAction::SelectFile(Arc::new(file)))
    }

    pub fn clear(&self) -> Arc<UploadState> {
        self.dispatch(&UploadAction::Clear)
    }

    /// Upload the selected file, returning the settled state
    ///
    /// Without a selected file the state is returned unchanged.
    pub async fn upload(&self, uploader: &dyn Uploader) -> Arc<UploadState> {
        let (file, attempt) = {
            let mut current = self.lock();
            let Some(file) = current.state.file.clone() else {
                return Arc::clone(&current.state);
            };
            current.attempt += 1;
            current.state = reduce(&current.state, &UploadAction::UploadStart);
            (file, current.attempt)
        };

        let on_progress = |p: f64| {
            self.dispatch_for(attempt, &UploadAction::UploadProgress(p));
        };

        let outcome = match uploader.upload(self.bucket, &file, &on_progress).await {
            Ok(result) => {
                let path = result.path.clone();
                self.dispatch_for(attempt, &UploadAction::UploadSuccess(result))
                    .ok_or(Some(path))
            }
            Err(e) => {
                tracing::warn!(bucket = %self.bucket, file_name = %file.name, error = %e, "Upload failed");
                self.dispatch_for(attempt, &UploadAction::UploadError(e.to_string()))
                    .ok_or(None)
            }
        };

        outcome.unwrap_or_else(|stored_path| {
            tracing::warn!(
                bucket = %self.bucket,
                file_name = %file.name,
                stored_path = stored_path.as_deref().unwrap_or(""),
                "Upload finished after the slot moved on, result dropped"
            );
            self.state()
        })
    }

    /// Upload the selected file again after a failure; any other state is returned as is
    pub async fn retry(&self, uploader: &dyn Uploader) -> Arc<UploadState> {
        let state = self.state();
        if state.status != UploadStatus::Error || state.file.is_none() {
            return state;
        }
        self.upload(uploader).await
    }
}
