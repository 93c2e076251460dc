use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
};
use bytes::Bytes;
use cadenza_core::{AppError, Bucket};
use cadenza_storage::keys::validate_key;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SignedWriteQuery {
    /// Unix timestamp (seconds) after which the URL is rejected
    pub expires: i64,
    /// Hex HMAC-SHA256 over the method, key, and expiry
    pub signature: String,
}

/// Receive a direct write issued by the local backend's signed URL
#[utoipa::path(
    put,
    path = "/api/v0/storage/{key}",
    tag = "uploads",
    params(
        ("key" = String, Path, description = "Storage key, `{bucket}/{path}`"),
        SignedWriteQuery
    ),
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    responses(
        (status = 200, description = "Object written"),
        (status = 403, description = "Signature invalid or expired", body = ErrorResponse),
        (status = 404, description = "Backend does not accept direct writes", body = ErrorResponse),
        (status = 413, description = "File exceeds the bucket limit", body = ErrorResponse),
        (status = 415, description = "Content does not match an accepted type", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, key, query, headers, body), fields(storage_key = %key, size = body.len()))]
pub async fn put_object(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Query(query): Query<SignedWriteQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, HttpAppError> {
    let signer = state.upload_signer.as_ref().ok_or_else(|| {
        AppError::NotFound("This storage backend does not accept direct writes".to_string())
    })?;

    validate_key(&key)?;
    signer.verify(&key, query.expires, &query.signature)?;

    let (bucket, _) = Bucket::split_storage_key(&key)
        .ok_or_else(|| AppError::InvalidInput(format!("Unknown bucket in key {}", key)))?;
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
        .ok_or_else(|| AppError::InvalidInput("Content-Type header is required".to_string()))?;

    state
        .validator
        .validate_content(bucket, &content_type, &body)?;

    state.storage.put(&key, body, &content_type).await?;

    tracing::info!(bucket = %bucket, content_type = %content_type, "Stored direct upload");

    Ok(StatusCode::OK)
}
