use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Logical storage bucket
///
/// All buckets share one physical backend; the bucket name is the first segment of the
/// storage key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Bucket {
    AudioSubmissions,
    SubmissionImages,
    ProfilePictures,
}

pub const AUDIO_CONTENT_TYPES: &[&str] = &[
    "audio/mpeg",
    "audio/mp3",
    "audio/wav",
    "audio/wave",
    "audio/x-wav",
    "audio/flac",
    "audio/x-flac",
    "audio/ogg",
    "audio/opus",
    "audio/mp4",
    "audio/x-m4a",
    "audio/aiff",
    "audio/x-aiff",
];

pub const IMAGE_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

impl Bucket {
    pub const ALL: [Bucket; 3] = [
        Bucket::AudioSubmissions,
        Bucket::SubmissionImages,
        Bucket::ProfilePictures,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::AudioSubmissions => "audio-submissions",
            Bucket::SubmissionImages => "submission-images",
            Bucket::ProfilePictures => "profile-pictures",
        }
    }

    pub fn allowed_content_types(&self) -> &'static [&'static str] {
        match self {
            Bucket::AudioSubmissions => AUDIO_CONTENT_TYPES,
            Bucket::SubmissionImages | Bucket::ProfilePictures => IMAGE_CONTENT_TYPES,
        }
    }

    pub fn is_audio(&self) -> bool {
        matches!(self, Bucket::AudioSubmissions)
    }

    /// Storage key for a path inside this bucket
    pub fn storage_key(&self, path: &str) -> String {
        format!("{}/{}", self.as_str(), path.trim_start_matches('/'))
    }

    /// Split a storage key back into its bucket and in-bucket path
    pub fn split_storage_key(key: &str) -> Option<(Bucket, &str)> {
        let (bucket, path) = key.split_once('/')?;
        let bucket = bucket.parse().ok()?;
        if path.is_empty() {
            return None;
        }
        Some((bucket, path))
    }
}

impl FromStr for Bucket {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Bucket::ALL
            .into_iter()
            .find(|b| b.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("Unknown bucket: {}", s))
    }
}

impl Display for Bucket {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}
