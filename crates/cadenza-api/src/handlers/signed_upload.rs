use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use cadenza_core::models::{SignedUploadRequest, SignedUploadResponse};
use cadenza_core::validation::generate_upload_path;
use cadenza_storage::keys::storage_key;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use validator::Validate;

/// Issue a signed URL for one direct write into a bucket
///
/// The type and size checks here run against the client's declaration; the bytes never
/// pass through this service unless the local backend is in use.
#[utoipa::path(
    post,
    path = "/api/v0/uploads/signed-url",
    tag = "uploads",
    request_body = SignedUploadRequest,
    responses(
        (status = 200, description = "Signed URL issued", body = SignedUploadResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 413, description = "Declared size exceeds the bucket limit", body = ErrorResponse),
        (status = 415, description = "Content type not accepted by the bucket", body = ErrorResponse),
        (status = 502, description = "Storage backend unavailable", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, request),
    fields(
        bucket = %request.bucket,
        content_type = %request.content_type,
        file_size = request.file_size
    )
)]
pub async fn create_signed_upload(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<SignedUploadRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    request.validate()?;
    state
        .validator
        .validate_declared(request.bucket, &request.content_type, request.file_size)?;

    let path = generate_upload_path(&request.file_name, request.uploaded_by.as_deref());
    let key = storage_key(request.bucket, &path)?;

    let expiry_secs = state.config.signed_url_expiry_secs();
    let signed_url = state
        .storage
        .signed_upload_url(&key, &request.content_type, Duration::from_secs(expiry_secs))
        .await?;
    let public_url = state.storage.public_url(&key);
    let expires_at = Utc::now() + chrono::Duration::seconds(expiry_secs as i64);

    tracing::info!(
        storage_key = %key,
        expires_at = %expires_at,
        "Issued signed upload URL"
    );

    Ok(Json(SignedUploadResponse {
        signed_url,
        public_url,
        path,
        bucket: request.bucket,
        expires_at,
    }))
}
