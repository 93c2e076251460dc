use crate::error::{ErrorResponse, HttpAppError, ValidatedForm};
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use cadenza_core::models::{SubmissionForm, SubmissionResponse};
use std::sync::Arc;

/// Create a submission from already-uploaded files
///
/// Files referenced by the form are recorded as pending uploads against the new row, then
/// committed once the row is stored. If the row cannot be stored the files are deleted.
#[utoipa::path(
    post,
    path = "/api/v0/submissions",
    tag = "submissions",
    request_body(content = SubmissionForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 201, description = "Submission stored", body = SubmissionResponse),
        (status = 400, description = "Invalid form", body = ErrorResponse),
        (status = 429, description = "Too many submissions", body = ErrorResponse),
        (status = 500, description = "Submission could not be saved", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, form), fields(round_id = form.round_id))]
pub async fn create_submission(
    State(state): State<Arc<AppState>>,
    ValidatedForm(form): ValidatedForm<SubmissionForm>,
) -> Result<impl IntoResponse, HttpAppError> {
    let submission = state.orchestrator.submit(form).await?;

    Ok((
        StatusCode::CREATED,
        Json(SubmissionResponse {
            id: submission.id,
            round_id: submission.round_id,
            created_at: submission.created_at,
        }),
    ))
}
