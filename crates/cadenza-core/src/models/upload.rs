use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Snapshot of a finished upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    /// Public read URL
    pub url: String,
    /// Path inside the bucket
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<UploadMetadata>,
}

impl UploadResult {
    pub fn audio_duration(&self) -> Option<f64> {
        self.metadata
            .as_ref()
            .and_then(|m| m.audio.as_ref())
            .and_then(|a| a.duration)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UploadMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioMetadata>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AudioMetadata {
    /// Duration in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}
