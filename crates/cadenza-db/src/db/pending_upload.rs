use async_trait::async_trait;
use cadenza_core::models::{PendingUpload, PendingUploadStatus, RegisterPendingUpload};
use cadenza_core::{AppError, Bucket};
use chrono::{DateTime, Duration, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// Rows returned per `get_expired` call
pub const DEFAULT_EXPIRED_BATCH_SIZE: i64 = 500;

/// Server-side ledger of storage writes awaiting an owning row
///
/// Status moves only from `pending` to `committed` or `failed`. `commit` is idempotent;
/// committing a failed row or failing a committed row is rejected.
#[async_trait]
pub trait UploadLedger: Send + Sync {
    /// Record a fresh upload as pending, expiring `ttl_hours` from now
    async fn register(&self, params: RegisterPendingUpload) -> Result<PendingUpload, AppError>;

    async fn commit(&self, id: Uuid) -> Result<(), AppError>;

    /// Commit several uploads; returns how many rows moved to committed
    async fn commit_many(&self, ids: &[Uuid]) -> Result<u64, AppError>;

    async fn fail(&self, id: Uuid) -> Result<(), AppError>;

    async fn get(&self, id: Uuid) -> Result<Option<PendingUpload>, AppError>;

    /// Pending rows whose `expires_at` is in the past, oldest first
    async fn get_expired(&self, limit: i64) -> Result<Vec<PendingUpload>, AppError>;

    /// Returns whether a row was removed
    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;

    /// Remove committed/failed rows last touched more than `days_to_keep` days ago
    async fn cleanup_old_records(&self, days_to_keep: i64) -> Result<u64, AppError>;
}

#[derive(FromRow)]
struct PendingUploadRow {
    id: Uuid,
    bucket: String,
    file_path: String,
    file_url: Option<String>,
    uploaded_by: Option<String>,
    status: PendingUploadStatus,
    related_table: Option<String>,
    related_id: Option<i64>,
    metadata: Option<serde_json::Value>,
    expires_at: DateTime<Utc>,
    committed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PendingUploadRow> for PendingUpload {
    type Error = AppError;

    fn try_from(row: PendingUploadRow) -> Result<Self, Self::Error> {
        let bucket: Bucket = row
            .bucket
            .parse()
            .map_err(|e: anyhow::Error| AppError::Internal(e.to_string()))?;
        Ok(PendingUpload {
            id: row.id,
            bucket,
            file_path: row.file_path,
            file_url: row.file_url,
            uploaded_by: row.uploaded_by,
            status: row.status,
            related_table: row.related_table,
            related_id: row.related_id,
            metadata: row.metadata,
            expires_at: row.expires_at,
            committed_at: row.committed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const COLUMNS: &str = "id, bucket, file_path, file_url, uploaded_by, status, related_table, \
     related_id, metadata, expires_at, committed_at, created_at, updated_at";

/// Postgres-backed upload ledger
#[derive(Clone)]
pub struct PendingUploadRepository {
    pool: PgPool,
}

impl PendingUploadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn current_status(&self, id: Uuid) -> Result<Option<PendingUploadStatus>, AppError> {
        let status = sqlx::query_scalar::<_, PendingUploadStatus>(
            "SELECT status FROM pending_uploads WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(status)
    }

    /// Explain why a guarded update touched no row
    async fn rejected_transition(
        &self,
        id: Uuid,
        target: PendingUploadStatus,
    ) -> Result<(), AppError> {
        match self.current_status(id).await? {
            None => Err(AppError::NotFound(format!("Pending upload {} not found", id))),
            Some(current) if current == target => Ok(()),
            Some(current) => Err(AppError::BadRequest(format!(
                "Pending upload {} is {} and cannot become {}",
                id,
                current.as_str(),
                target.as_str()
            ))),
        }
    }
}

#[async_trait]
impl UploadLedger for PendingUploadRepository {
    #[tracing::instrument(skip(self, params), fields(bucket = %params.bucket, path = %params.file_path))]
    async fn register(&self, params: RegisterPendingUpload) -> Result<PendingUpload, AppError> {
        let expires_at = params.expires_at(Utc::now());

        let row = sqlx::query_as::<_, PendingUploadRow>(&format!(
            r#"
            INSERT INTO pending_uploads (
                id, bucket, file_path, file_url, uploaded_by, status,
                related_table, related_id, metadata, expires_at
            )
            VALUES ($1, $2, $3, $4, $5, 'pending', $6, $7, $8, $9)
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(params.bucket.as_str())
        .bind(&params.file_path)
        .bind(&params.file_url)
        .bind(&params.uploaded_by)
        .bind(&params.related_table)
        .bind(params.related_id)
        .bind(&params.metadata)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;

        let upload = PendingUpload::try_from(row)?;
        tracing::debug!(upload_id = %upload.id, expires_at = %upload.expires_at, "Registered pending upload");
        Ok(upload)
    }

    #[tracing::instrument(skip(self))]
    async fn commit(&self, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE pending_uploads
            SET status = 'committed', committed_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return self
                .rejected_transition(id, PendingUploadStatus::Committed)
                .await;
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, ids), fields(count = ids.len()))]
    async fn commit_many(&self, ids: &[Uuid]) -> Result<u64, AppError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query(
            r#"
            UPDATE pending_uploads
            SET status = 'committed', committed_at = NOW(), updated_at = NOW()
            WHERE id = ANY($1) AND status = 'pending'
            "#,
        )
        .bind(ids)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    #[tracing::instrument(skip(self))]
    async fn fail(&self, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE pending_uploads
            SET status = 'failed', updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return self.rejected_transition(id, PendingUploadStatus::Failed).await;
        }
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<PendingUpload>, AppError> {
        let row = sqlx::query_as::<_, PendingUploadRow>(&format!(
            "SELECT {} FROM pending_uploads WHERE id = $1",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(PendingUpload::try_from).transpose()
    }

    #[tracing::instrument(skip(self))]
    async fn get_expired(&self, limit: i64) -> Result<Vec<PendingUpload>, AppError> {
        let rows = sqlx::query_as::<_, PendingUploadRow>(&format!(
            r#"
            SELECT {}
            FROM pending_uploads
            WHERE status = 'pending' AND expires_at < NOW()
            ORDER BY expires_at
            LIMIT $1
            "#,
            COLUMNS
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(PendingUpload::try_from).collect()
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM pending_uploads WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self))]
    async fn cleanup_old_records(&self, days_to_keep: i64) -> Result<u64, AppError> {
        let cutoff = Utc::now() - Duration::days(days_to_keep);
        let result = sqlx::query(
            r#"
            DELETE FROM pending_uploads
            WHERE status IN ('committed', 'failed') AND updated_at < $1
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;

        let deleted = result.rows_affected();
        if deleted > 0 {
            tracing::info!(deleted, days_to_keep, "Trimmed old upload records");
        }
        Ok(deleted)
    }
}
