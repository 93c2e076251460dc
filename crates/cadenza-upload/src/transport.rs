//! Direct-to-storage upload transport
//!
//! An upload is two requests: a small JSON call to the API for a signed write URL, then a
//! `PUT` of the raw bytes straight to storage. The API server never sees the file body
//! (except for the local backend, whose signed URL points back at the API).

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use cadenza_core::models::{
    AudioMetadata, SignedUploadRequest, SignedUploadResponse, SubmissionPayload,
    SubmissionResponse, UploadMetadata, UploadResult,
};
use cadenza_core::validation::UploadValidator;
use cadenza_core::Bucket;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};
use serde::Deserialize;
use thiserror::Error;

use crate::metadata::audio_duration_blocking;
use crate::payload::to_form_fields;
use crate::reducer::SelectedFile;

pub const DEFAULT_SIGNED_URL_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// API path prefix
pub const API_PREFIX: &str = "/api/v0";

/// Progress callback, percentage in `[0, 100]`
pub type ProgressFn<'a> = &'a (dyn Fn(f64) + Send + Sync);

#[derive(Debug, Error)]
pub enum TransportError {
    /// Rejected locally before any request was made
    #[error("{0}")]
    Validation(String),

    /// No signed URL was issued; nothing reached storage
    #[error("Failed to get upload URL: {0}")]
    SignedUrl(String),

    /// The write to storage failed; an object may or may not exist at the path
    #[error("Upload failed: {0}")]
    DirectUpload(String),

    #[error("{message}")]
    Submission { status: Option<u16>, message: String },

    #[error("Upload cancelled")]
    Cancelled,
}

impl TransportError {
    /// Whether an object might exist in storage after this failure
    pub fn may_have_written(&self) -> bool {
        matches!(self, TransportError::DirectUpload(_) | TransportError::Cancelled)
    }
}

/// Anything that can move a selected file into a bucket
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(
        &self,
        bucket: Bucket,
        file: &SelectedFile,
        progress: ProgressFn<'_>,
    ) -> Result<UploadResult, TransportError>;
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Best-effort human message from an error response
async fn error_message(response: Response) -> String {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => body.error,
        Err(_) if !text.trim().is_empty() => format!("HTTP {}: {}", status.as_u16(), text.trim()),
        Err(_) => format!("HTTP {}", status.as_u16()),
    }
}

/// reqwest-backed transport talking to the Cadenza API and the storage provider
#[derive(Clone, Debug)]
pub struct DirectUploadClient {
    http: Client,
    base_url: String,
    uploaded_by: Option<String>,
    validator: UploadValidator,
    signed_url_timeout: Duration,
    upload_timeout: Duration,
}

impl DirectUploadClient {
    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        let http = Client::builder()
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            uploaded_by: None,
            validator: UploadValidator::default(),
            signed_url_timeout: DEFAULT_SIGNED_URL_TIMEOUT,
            upload_timeout: DEFAULT_UPLOAD_TIMEOUT,
        })
    }

    /// Prefix generated paths with an owner id
    pub fn with_uploaded_by(mut self, owner: impl Into<String>) -> Self {
        self.uploaded_by = Some(owner.into());
        self
    }

    /// Size limits to check files against before requesting a signed URL
    pub fn with_validator(mut self, validator: UploadValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_timeouts(mut self, signed_url: Duration, upload: Duration) -> Self {
        self.signed_url_timeout = signed_url;
        self.upload_timeout = upload;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, API_PREFIX, path)
    }

    pub async fn request_signed_url(
        &self,
        bucket: Bucket,
        file: &SelectedFile,
    ) -> Result<SignedUploadResponse, TransportError> {
        let request = SignedUploadRequest {
            bucket,
            file_name: file.name.clone(),
            content_type: file.content_type.clone(),
            file_size: file.size(),
            uploaded_by: self.uploaded_by.clone(),
        };

        let response = self
            .http
            .post(self.url("/uploads/signed-url"))
            .timeout(self.signed_url_timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| TransportError::SignedUrl(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TransportError::SignedUrl(error_message(response).await));
        }

        response
            .json::<SignedUploadResponse>()
            .await
            .map_err(|e| TransportError::SignedUrl(format!("Invalid response: {}", e)))
    }

    pub async fn put_object(
        &self,
        signed_url: &str,
        file: &SelectedFile,
    ) -> Result<(), TransportError> {
        let response = self
            .http
            .put(signed_url)
            .timeout(self.upload_timeout)
            .header(CONTENT_TYPE, &file.content_type)
            .body(file.data.clone())
            .send()
            .await
            .map_err(|e| TransportError::DirectUpload(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TransportError::DirectUpload(error_message(response).await));
        }
        Ok(())
    }

    /// Post an assembled payload as a url-encoded form
    #[tracing::instrument(skip(self, payload), fields(round_id = payload.round_id))]
    pub async fn submit(
        &self,
        payload: &SubmissionPayload,
    ) -> Result<SubmissionResponse, TransportError> {
        let response = self
            .http
            .post(self.url("/submissions"))
            .timeout(self.signed_url_timeout)
            .form(&to_form_fields(payload))
            .send()
            .await
            .map_err(|e| TransportError::Submission {
                status: None,
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Submission {
                status: Some(status.as_u16()),
                message: error_message(response).await,
            });
        }

        response
            .json::<SubmissionResponse>()
            .await
            .map_err(|e| TransportError::Submission {
                status: Some(status.as_u16()),
                message: format!("Invalid response: {}", e),
            })
    }
}

#[async_trait]
impl Uploader for DirectUploadClient {
    #[tracing::instrument(skip(self, file, progress), fields(bucket = %bucket, file_name = %file.name, size_bytes = file.size()))]
    async fn upload(
        &self,
        bucket: Bucket,
        file: &SelectedFile,
        progress: ProgressFn<'_>,
    ) -> Result<UploadResult, TransportError> {
        self.validator
            .validate_declared(bucket, &file.content_type, file.size())
            .map_err(|e| TransportError::Validation(e.to_string()))?;

        progress(0.0);
        let signed = self.request_signed_url(bucket, file).await?;
        progress(10.0);

        // Decode locally while the bytes are in flight
        let duration = async {
            if bucket.is_audio() {
                audio_duration_blocking(file.data.clone()).await
            } else {
                None
            }
        };
        let (put, duration) = tokio::join!(self.put_object(&signed.signed_url, file), duration);
        put?;
        progress(100.0);

        tracing::debug!(path = %signed.path, "Direct upload complete");

        Ok(UploadResult {
            url: signed.public_url,
            path: signed.path,
            file_size: Some(file.size()),
            mime_type: Some(file.content_type.clone()),
            metadata: duration.map(|d| UploadMetadata {
                audio: Some(AudioMetadata { duration: Some(d) }),
            }),
        })
    }
}
