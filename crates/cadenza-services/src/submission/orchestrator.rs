use std::sync::Arc;

use cadenza_core::constants::{DEFAULT_PENDING_UPLOAD_TTL_HOURS, SUBMISSIONS_TABLE};
use cadenza_core::models::{
    NewSubmission, RegisterPendingUpload, Submission, SubmissionForm, SubmittedFile,
};
use cadenza_core::Bucket;
use cadenza_db::{SubmissionStore, UploadLedger};
use cadenza_storage::keys::encode_key;
use cadenza_storage::Storage;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use super::error::SubmissionError;
use super::rate_limit::{RateLimitDecision, RateLimitStrategy};

/// Runs one submission attempt as a saga across storage and the database
///
/// The owning row id is reserved first so every uploaded file can be registered in the
/// ledger against it before the row exists. After the insert, registered uploads are
/// either committed (insert succeeded) or failed and deleted from storage (insert failed).
/// Ledger and storage errors on these compensating steps are logged and never surface.
pub struct SubmissionOrchestrator {
    ledger: Arc<dyn UploadLedger>,
    submissions: Arc<dyn SubmissionStore>,
    storage: Arc<dyn Storage>,
    rate_limit: Arc<dyn RateLimitStrategy>,
    pending_upload_ttl_hours: i64,
}

impl SubmissionOrchestrator {
    pub fn new(
        ledger: Arc<dyn UploadLedger>,
        submissions: Arc<dyn SubmissionStore>,
        storage: Arc<dyn Storage>,
        rate_limit: Arc<dyn RateLimitStrategy>,
    ) -> Self {
        Self {
            ledger,
            submissions,
            storage,
            rate_limit,
            pending_upload_ttl_hours: DEFAULT_PENDING_UPLOAD_TTL_HOURS,
        }
    }

    pub fn with_pending_upload_ttl_hours(mut self, hours: i64) -> Self {
        self.pending_upload_ttl_hours = hours;
        self
    }

    #[tracing::instrument(skip(self, form), fields(round_id = form.round_id, submission_id = tracing::field::Empty))]
    pub async fn submit(&self, form: SubmissionForm) -> Result<Submission, SubmissionError> {
        form.validate()?;
        let files = form.files();
        for file in &files {
            self.check_location(file)?;
        }

        let key = rate_limit_key(&form);
        if let RateLimitDecision::Denied { retry_after } = self.rate_limit.check(&key).await {
            tracing::info!(key = %key, "Submission rate limited");
            return Err(SubmissionError::RateLimited {
                retry_after_secs: retry_after.as_secs().max(1),
            });
        }

        let submission_id = match self.submissions.reserve_id().await {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(error = %e, "Submission id reservation failed, deleting uploads");
                self.delete_objects(&files).await;
                return Err(SubmissionError::Reservation(e));
            }
        };
        tracing::Span::current().record("submission_id", submission_id);

        let registered = self.register_uploads(&form, &files, submission_id).await;

        match self
            .submissions
            .insert(NewSubmission::from_form(submission_id, &form))
            .await
        {
            Ok(submission) => {
                self.commit_uploads(&registered).await;
                tracing::info!(
                    submission_id,
                    uploads = files.len(),
                    "Submission saved"
                );
                Ok(submission)
            }
            Err(e) => {
                tracing::error!(submission_id, error = %e, "Submission insert failed, rolling back uploads");
                self.fail_uploads(&registered, &files).await;
                Err(SubmissionError::Insert(e))
            }
        }
    }

    /// The URL of an uploaded file must be the public URL of its bucket path
    fn check_location(&self, file: &SubmittedFile<'_>) -> Result<(), SubmissionError> {
        let key = file.bucket.storage_key(file.path);
        let url = file.url.split(['?', '#']).next().unwrap_or_default();
        if url.ends_with(&format!("/{}", key)) || url.ends_with(&format!("/{}", encode_key(&key))) {
            return Ok(());
        }
        Err(SubmissionError::UploadLocation {
            field: match file.bucket {
                Bucket::AudioSubmissions => "audioFileUrl",
                _ => "coverImageUrl",
            },
            bucket: file.bucket.as_str(),
        })
    }

    /// Register each file against the reserved id; returns the ids that were recorded
    async fn register_uploads(
        &self,
        form: &SubmissionForm,
        files: &[SubmittedFile<'_>],
        submission_id: i64,
    ) -> Vec<Uuid> {
        let mut registered = Vec::with_capacity(files.len());
        for file in files {
            let mut params = RegisterPendingUpload::new(file.bucket, file.path)
                .with_file_url(file.url)
                .with_uploaded_by(form.user_id.clone())
                .with_related(SUBMISSIONS_TABLE, submission_id)
                .with_ttl_hours(self.pending_upload_ttl_hours);
            if file.bucket.is_audio() {
                params = params.with_metadata(json!({
                    "fileSize": form.audio_file_size,
                    "duration": form.audio_duration,
                }));
            }

            match self.ledger.register(params).await {
                Ok(upload) => registered.push(upload.id),
                Err(e) => {
                    tracing::warn!(
                        submission_id,
                        bucket = %file.bucket,
                        path = %file.path,
                        error = %e,
                        "Failed to register pending upload, continuing"
                    );
                }
            }
        }
        registered
    }

    async fn commit_uploads(&self, registered: &[Uuid]) {
        match self.ledger.commit_many(registered).await {
            Ok(committed) if committed < registered.len() as u64 => tracing::warn!(
                committed,
                registered = registered.len(),
                "Some pending uploads were no longer pending at commit"
            ),
            Ok(_) => {}
            Err(e) => tracing::error!(
                uploads = registered.len(),
                error = %e,
                "Failed to commit pending uploads"
            ),
        }
    }

    /// Mark registered uploads failed and delete every referenced object
    ///
    /// Objects are deleted even when their registration failed; the insert failure means
    /// nothing will ever own them.
    async fn fail_uploads(&self, registered: &[Uuid], files: &[SubmittedFile<'_>]) {
        for id in registered {
            if let Err(e) = self.ledger.fail(*id).await {
                tracing::error!(upload_id = %id, error = %e, "Failed to mark pending upload failed");
            }
        }

        self.delete_objects(files).await;
    }

    /// Delete every referenced object; errors are logged only
    async fn delete_objects(&self, files: &[SubmittedFile<'_>]) {
        for file in files {
            let key = file.bucket.storage_key(file.path);
            match self.storage.delete(&key).await {
                Ok(()) => tracing::info!(key = %key, "Deleted orphaned upload"),
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Failed to delete orphaned upload")
                }
            }
        }
    }
}

/// Rate-limit per user, or per round for anonymous submissions
fn rate_limit_key(form: &SubmissionForm) -> String {
    match &form.user_id {
        Some(user) => format!("user:{}", user),
        None => format!("round:{}", form.round_id),
    }
}
