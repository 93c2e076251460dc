use async_trait::async_trait;
use cadenza_core::models::{NewSubmission, Submission};
use cadenza_core::AppError;
use sqlx::PgPool;

/// Owning rows that uploads are committed against
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Reserve a row id before the row exists
    ///
    /// Reservation is atomic across concurrent callers. A reserved id that is never
    /// inserted leaves a gap and is not reused.
    async fn reserve_id(&self) -> Result<i64, AppError>;

    /// Insert a row under a previously reserved id
    async fn insert(&self, submission: NewSubmission) -> Result<Submission, AppError>;
}

#[derive(Clone)]
pub struct SubmissionRepository {
    pool: PgPool,
}

impl SubmissionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubmissionStore for SubmissionRepository {
    async fn reserve_id(&self) -> Result<i64, AppError> {
        let id = sqlx::query_scalar::<_, i64>(
            "SELECT nextval(pg_get_serial_sequence('submissions', 'id'))",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    #[tracing::instrument(skip(self, submission), fields(submission_id = submission.id, round_id = submission.round_id))]
    async fn insert(&self, submission: NewSubmission) -> Result<Submission, AppError> {
        let row = sqlx::query_as::<_, Submission>(
            r#"
            INSERT INTO submissions (
                id, round_id, user_id, audio_file_url, audio_file_path, audio_file_size,
                audio_duration, cover_image_url, cover_image_path, lyrics,
                cool_things_learned, tools_used, happy_accidents, didnt_work
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING id, round_id, user_id, audio_file_url, audio_file_path, audio_file_size,
                audio_duration, cover_image_url, cover_image_path, lyrics,
                cool_things_learned, tools_used, happy_accidents, didnt_work, created_at
            "#,
        )
        .bind(submission.id)
        .bind(submission.round_id)
        .bind(submission.user_id)
        .bind(submission.audio_file_url)
        .bind(submission.audio_file_path)
        .bind(submission.audio_file_size)
        .bind(submission.audio_duration)
        .bind(submission.cover_image_url)
        .bind(submission.cover_image_path)
        .bind(submission.lyrics)
        .bind(submission.cool_things_learned)
        .bind(submission.tools_used)
        .bind(submission.happy_accidents)
        .bind(submission.didnt_work)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }
}
