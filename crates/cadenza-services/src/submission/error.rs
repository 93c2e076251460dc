use cadenza_core::AppError;
use thiserror::Error;

/// Failures of one submission attempt
///
/// Only validation and rate-limit failures carry detail to the client; everything past
/// the point where rows are written collapses into `AppError::SubmissionFailed`.
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("Validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("{field} does not point at its {bucket} upload")]
    UploadLocation { field: &'static str, bucket: &'static str },

    #[error("Too many submissions, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Could not reserve a submission id: {0}")]
    Reservation(#[source] AppError),

    #[error("Could not insert submission: {0}")]
    Insert(#[source] AppError),
}

impl From<SubmissionError> for AppError {
    fn from(err: SubmissionError) -> Self {
        match err {
            SubmissionError::Validation(e) => AppError::from(e),
            e @ SubmissionError::UploadLocation { .. } => AppError::InvalidInput(e.to_string()),
            SubmissionError::RateLimited { retry_after_secs } => {
                AppError::RateLimited { retry_after_secs }
            }
            e @ (SubmissionError::Reservation(_) | SubmissionError::Insert(_)) => {
                AppError::SubmissionFailed(e.to_string())
            }
        }
    }
}
