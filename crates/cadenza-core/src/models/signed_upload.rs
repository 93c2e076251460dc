use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::Bucket;

/// Request for a signed write URL
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignedUploadRequest {
    pub bucket: Bucket,
    /// Original filename, used to derive the stored extension
    #[validate(length(
        min = 1,
        max = 255,
        message = "Filename must be between 1 and 255 characters"
    ))]
    pub file_name: String,
    #[validate(length(
        min = 1,
        max = 255,
        message = "Content type must be between 1 and 255 characters"
    ))]
    pub content_type: String,
    #[validate(range(min = 1, message = "File size must be at least 1 byte"))]
    pub file_size: u64,
    /// Optional owner prefix for the generated path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 128))]
    pub uploaded_by: Option<String>,
}

/// Signed write URL plus the public URL the object will have
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignedUploadResponse {
    pub signed_url: String,
    pub public_url: String,
    /// Path inside the bucket
    pub path: String,
    pub bucket: Bucket,
    pub expires_at: DateTime<Utc>,
}
