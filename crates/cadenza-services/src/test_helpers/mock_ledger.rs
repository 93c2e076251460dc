//! In-memory upload ledger that records every call

use async_trait::async_trait;
use cadenza_core::models::{PendingUpload, PendingUploadStatus, RegisterPendingUpload};
use cadenza_core::{AppError, Bucket};
use cadenza_db::UploadLedger;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum LedgerCall {
    Register {
        bucket: Bucket,
        path: String,
        related_id: Option<i64>,
    },
    Commit(Uuid),
    CommitMany(Vec<Uuid>),
    Fail(Uuid),
    Delete(Uuid),
    GetExpired(i64),
    Cleanup(i64),
}

#[derive(Default)]
struct Failures {
    register: bool,
    commit: bool,
    fail: bool,
    delete: bool,
}

/// Mock `UploadLedger` with status transitions enforced the same way as the SQL guard
#[derive(Clone, Default)]
pub struct MockUploadLedger {
    rows: Arc<Mutex<HashMap<Uuid, PendingUpload>>>,
    order: Arc<Mutex<Vec<Uuid>>>,
    calls: Arc<Mutex<Vec<LedgerCall>>>,
    failures: Arc<Mutex<Failures>>,
}

impl MockUploadLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_registrations(&self, fail: bool) {
        self.failures.lock().unwrap().register = fail;
    }

    pub fn fail_commits(&self, fail: bool) {
        self.failures.lock().unwrap().commit = fail;
    }

    pub fn fail_fails(&self, fail: bool) {
        self.failures.lock().unwrap().fail = fail;
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.failures.lock().unwrap().delete = fail;
    }

    /// Seed a row directly, bypassing `register`
    pub fn insert(&self, upload: PendingUpload) {
        self.order.lock().unwrap().push(upload.id);
        self.rows.lock().unwrap().insert(upload.id, upload);
    }

    /// Seed a pending row that expired `hours_ago` hours ago
    pub fn insert_expired(&self, bucket: Bucket, path: &str, hours_ago: i64) -> Uuid {
        let now = Utc::now();
        let upload = PendingUpload {
            id: Uuid::new_v4(),
            bucket,
            file_path: path.to_string(),
            file_url: None,
            uploaded_by: None,
            status: PendingUploadStatus::Pending,
            related_table: None,
            related_id: None,
            metadata: None,
            expires_at: now - Duration::hours(hours_ago),
            committed_at: None,
            created_at: now - Duration::hours(hours_ago + 24),
            updated_at: now - Duration::hours(hours_ago + 24),
        };
        let id = upload.id;
        self.insert(upload);
        id
    }

    pub fn calls(&self) -> Vec<LedgerCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, predicate: impl Fn(&LedgerCall) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| predicate(c)).count()
    }

    /// Rows in registration order
    pub fn uploads(&self) -> Vec<PendingUpload> {
        let rows = self.rows.lock().unwrap();
        self.order
            .lock()
            .unwrap()
            .iter()
            .filter_map(|id| rows.get(id).cloned())
            .collect()
    }

    pub fn registered_ids(&self) -> Vec<Uuid> {
        self.uploads().into_iter().map(|u| u.id).collect()
    }

    pub fn status(&self, id: Uuid) -> Option<PendingUploadStatus> {
        self.rows.lock().unwrap().get(&id).map(|u| u.status)
    }

    fn record(&self, call: LedgerCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn transition(&self, id: Uuid, target: PendingUploadStatus) -> Result<(), AppError> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Pending upload {} not found", id)))?;
        if row.status == target {
            return Ok(());
        }
        if !row.status.can_transition_to(target) {
            return Err(AppError::BadRequest(format!(
                "Pending upload {} is {} and cannot become {}",
                id,
                row.status.as_str(),
                target.as_str()
            )));
        }
        let now = Utc::now();
        row.status = target;
        row.updated_at = now;
        if target == PendingUploadStatus::Committed {
            row.committed_at = Some(now);
        }
        Ok(())
    }
}

#[async_trait]
impl UploadLedger for MockUploadLedger {
    async fn register(&self, params: RegisterPendingUpload) -> Result<PendingUpload, AppError> {
        self.record(LedgerCall::Register {
            bucket: params.bucket,
            path: params.file_path.clone(),
            related_id: params.related_id,
        });
        if self.failures.lock().unwrap().register {
            return Err(AppError::Internal("register failed".to_string()));
        }

        let now = Utc::now();
        let upload = PendingUpload {
            id: Uuid::new_v4(),
            bucket: params.bucket,
            expires_at: params.expires_at(now),
            file_path: params.file_path,
            file_url: params.file_url,
            uploaded_by: params.uploaded_by,
            status: PendingUploadStatus::Pending,
            related_table: params.related_table,
            related_id: params.related_id,
            metadata: params.metadata,
            committed_at: None,
            created_at: now,
            updated_at: now,
        };
        self.insert(upload.clone());
        Ok(upload)
    }

    async fn commit(&self, id: Uuid) -> Result<(), AppError> {
        self.record(LedgerCall::Commit(id));
        if self.failures.lock().unwrap().commit {
            return Err(AppError::Internal("commit failed".to_string()));
        }
        self.transition(id, PendingUploadStatus::Committed)
    }

    async fn commit_many(&self, ids: &[Uuid]) -> Result<u64, AppError> {
        self.record(LedgerCall::CommitMany(ids.to_vec()));
        if self.failures.lock().unwrap().commit {
            return Err(AppError::Internal("commit failed".to_string()));
        }
        let mut committed = 0;
        for id in ids {
            if self.status(*id) == Some(PendingUploadStatus::Pending) {
                self.transition(*id, PendingUploadStatus::Committed)?;
                committed += 1;
            }
        }
        Ok(committed)
    }

    async fn fail(&self, id: Uuid) -> Result<(), AppError> {
        self.record(LedgerCall::Fail(id));
        if self.failures.lock().unwrap().fail {
            return Err(AppError::Internal("fail failed".to_string()));
        }
        self.transition(id, PendingUploadStatus::Failed)
    }

    async fn get(&self, id: Uuid) -> Result<Option<PendingUpload>, AppError> {
        Ok(self.rows.lock().unwrap().get(&id).cloned())
    }

    async fn get_expired(&self, limit: i64) -> Result<Vec<PendingUpload>, AppError> {
        self.record(LedgerCall::GetExpired(limit));
        let now = Utc::now();
        let mut expired: Vec<PendingUpload> = self
            .uploads()
            .into_iter()
            .filter(|u| u.is_expired_at(now))
            .collect();
        expired.sort_by_key(|u| u.expires_at);
        expired.truncate(limit.max(0) as usize);
        Ok(expired)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        self.record(LedgerCall::Delete(id));
        if self.failures.lock().unwrap().delete {
            return Err(AppError::Internal("delete failed".to_string()));
        }
        self.order.lock().unwrap().retain(|o| *o != id);
        Ok(self.rows.lock().unwrap().remove(&id).is_some())
    }

    async fn cleanup_old_records(&self, days_to_keep: i64) -> Result<u64, AppError> {
        self.record(LedgerCall::Cleanup(days_to_keep));
        let cutoff = Utc::now() - Duration::days(days_to_keep);
        let stale: Vec<Uuid> = self
            .uploads()
            .into_iter()
            .filter(|u| u.status != PendingUploadStatus::Pending && u.updated_at < cutoff)
            .map(|u| u.id)
            .collect();
        let mut rows = self.rows.lock().unwrap();
        self.order.lock().unwrap().retain(|o| !stale.contains(o));
        for id in &stale {
            rows.remove(id);
        }
        Ok(stale.len() as u64)
    }
}
