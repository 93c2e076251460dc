use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::Bucket;
use crate::constants::DEFAULT_PENDING_UPLOAD_TTL_HOURS;

/// Lifecycle status of a ledger row
///
/// Only `Pending -> Committed` and `Pending -> Failed` are legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "pending_upload_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum PendingUploadStatus {
    Pending,
    Committed,
    Failed,
}

impl PendingUploadStatus {
    pub fn can_transition_to(self, next: PendingUploadStatus) -> bool {
        matches!(
            (self, next),
            (PendingUploadStatus::Pending, PendingUploadStatus::Committed)
                | (PendingUploadStatus::Pending, PendingUploadStatus::Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PendingUploadStatus::Pending => "pending",
            PendingUploadStatus::Committed => "committed",
            PendingUploadStatus::Failed => "failed",
        }
    }
}

/// Tracking record for a storage write whose owning row is not yet confirmed
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PendingUpload {
    pub id: Uuid,
    pub bucket: Bucket,
    pub file_path: String,
    pub file_url: Option<String>,
    pub uploaded_by: Option<String>,
    pub status: PendingUploadStatus,
    pub related_table: Option<String>,
    pub related_id: Option<i64>,
    pub metadata: Option<serde_json::Value>,
    pub expires_at: DateTime<Utc>,
    pub committed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PendingUpload {
    pub fn storage_key(&self) -> String {
        self.bucket.storage_key(&self.file_path)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.status == PendingUploadStatus::Pending && self.expires_at < now
    }
}

/// Parameters for registering a pending upload
#[derive(Debug, Clone)]
pub struct RegisterPendingUpload {
    pub bucket: Bucket,
    pub file_path: String,
    pub file_url: Option<String>,
    pub uploaded_by: Option<String>,
    pub related_table: Option<String>,
    pub related_id: Option<i64>,
    pub metadata: Option<serde_json::Value>,
    pub ttl_hours: i64,
}

impl RegisterPendingUpload {
    pub fn new(bucket: Bucket, file_path: impl Into<String>) -> Self {
        Self {
            bucket,
            file_path: file_path.into(),
            file_url: None,
            uploaded_by: None,
            related_table: None,
            related_id: None,
            metadata: None,
            ttl_hours: DEFAULT_PENDING_UPLOAD_TTL_HOURS,
        }
    }

    pub fn with_file_url(mut self, url: impl Into<String>) -> Self {
        self.file_url = Some(url.into());
        self
    }

    pub fn with_uploaded_by(mut self, user: Option<String>) -> Self {
        self.uploaded_by = user;
        self
    }

    pub fn with_related(mut self, table: impl Into<String>, id: i64) -> Self {
        self.related_table = Some(table.into());
        self.related_id = Some(id);
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_ttl_hours(mut self, ttl_hours: i64) -> Self {
        self.ttl_hours = ttl_hours;
        self
    }

    pub fn expires_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::hours(self.ttl_hours)
    }
}
