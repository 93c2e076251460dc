use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use super::Bucket;

/// Longest accepted audio, in seconds
pub const MAX_AUDIO_DURATION_SECONDS: f64 = 30.0 * 60.0;

/// Free-text answers attached to a submission
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextFields {
    pub lyrics: Option<String>,
    pub cool_things_learned: Option<String>,
    pub tools_used: Option<String>,
    pub happy_accidents: Option<String>,
    pub didnt_work: Option<String>,
}

impl TextFields {
    pub fn has_lyrics(&self) -> bool {
        self.lyrics.as_deref().is_some_and(|l| !l.trim().is_empty())
    }
}

/// Flat, transport-ready projection of a submit attempt
///
/// URL and path fields are empty strings when the slot has no upload; size and duration
/// stay `None` so that "unknown" is distinguishable from zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    pub round_id: i64,
    pub audio_file_url: String,
    pub audio_file_path: String,
    pub audio_file_size: Option<u64>,
    pub audio_duration: Option<f64>,
    pub cover_image_url: String,
    pub cover_image_path: String,
    pub lyrics: Option<String>,
    pub cool_things_learned: Option<String>,
    pub tools_used: Option<String>,
    pub happy_accidents: Option<String>,
    pub didnt_work: Option<String>,
}

/// Treats a missing field and an empty string the same way.
pub fn empty_string_as_none<'de, D, T>(de: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let opt = Option::<String>::deserialize(de)?;
    match opt.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => T::from_str(s).map_err(de::Error::custom).map(Some),
    }
}

/// Like `empty_string_as_none` for free text: blank means absent, anything else is kept verbatim
pub fn blank_as_none<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(de)?;
    Ok(opt.filter(|s| !s.trim().is_empty()))
}

/// Submission as received at the HTTP boundary
#[derive(Debug, Clone, Default, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_submission_shape", skip_on_field_errors = false))]
pub struct SubmissionForm {
    #[validate(range(min = 1, message = "Round id must be positive"))]
    pub round_id: i64,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(length(max = 128))]
    pub user_id: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(url(message = "Audio file URL must be a valid URL"))]
    pub audio_file_url: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(custom(function = "validate_storage_path"))]
    pub audio_file_path: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(range(min = 1, message = "Audio file size must be at least 1 byte"))]
    pub audio_file_size: Option<i64>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(custom(function = "validate_audio_duration"))]
    pub audio_duration: Option<f64>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(url(message = "Cover image URL must be a valid URL"))]
    pub cover_image_url: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(custom(function = "validate_storage_path"))]
    pub cover_image_path: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(length(max = 10000))]
    pub lyrics: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(length(max = 10000))]
    pub cool_things_learned: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(length(max = 10000))]
    pub tools_used: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(length(max = 10000))]
    pub happy_accidents: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(length(max = 10000))]
    pub didnt_work: Option<String>,
}

/// An uploaded file referenced by a submission
#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedFile<'a> {
    pub bucket: Bucket,
    pub path: &'a str,
    pub url: &'a str,
}

impl SubmissionForm {
    pub fn audio(&self) -> Option<SubmittedFile<'_>> {
        match (&self.audio_file_path, &self.audio_file_url) {
            (Some(path), Some(url)) => Some(SubmittedFile {
                bucket: Bucket::AudioSubmissions,
                path,
                url,
            }),
            _ => None,
        }
    }

    pub fn cover_image(&self) -> Option<SubmittedFile<'_>> {
        match (&self.cover_image_path, &self.cover_image_url) {
            (Some(path), Some(url)) => Some(SubmittedFile {
                bucket: Bucket::SubmissionImages,
                path,
                url,
            }),
            _ => None,
        }
    }

    /// Every uploaded file the form references, audio first
    pub fn files(&self) -> Vec<SubmittedFile<'_>> {
        self.audio().into_iter().chain(self.cover_image()).collect()
    }

    pub fn has_lyrics(&self) -> bool {
        self.lyrics.is_some()
    }
}

fn validate_storage_path(path: &str) -> Result<(), ValidationError> {
    if path.contains("..") || path.starts_with('/') || path.contains('\\') {
        return Err(ValidationError::new("invalid_path")
            .with_message("File path must stay inside its bucket".into()));
    }
    if path.len() > 512 {
        return Err(ValidationError::new("path_too_long"));
    }
    Ok(())
}

fn validate_audio_duration(duration: f64) -> Result<(), ValidationError> {
    if !duration.is_finite() || duration < 0.0 || duration > MAX_AUDIO_DURATION_SECONDS {
        return Err(ValidationError::new("audio_duration")
            .with_message("Audio must be at most 30 minutes long".into()));
    }
    Ok(())
}

fn validate_submission_shape(form: &SubmissionForm) -> Result<(), ValidationError> {
    if form.audio_file_url.is_some() != form.audio_file_path.is_some() {
        return Err(ValidationError::new("audio_incomplete")
            .with_message("Audio file URL and path must be provided together".into()));
    }
    if form.cover_image_url.is_some() != form.cover_image_path.is_some() {
        return Err(ValidationError::new("cover_incomplete")
            .with_message("Cover image URL and path must be provided together".into()));
    }
    if form.audio().is_none() && !form.has_lyrics() {
        return Err(ValidationError::new("audio_or_lyrics")
            .with_message("Please provide either an audio file or lyrics".into()));
    }
    Ok(())
}

/// Row to insert for a submission whose id was reserved up front
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub id: i64,
    pub round_id: i64,
    pub user_id: Option<String>,
    pub audio_file_url: Option<String>,
    pub audio_file_path: Option<String>,
    pub audio_file_size: Option<i64>,
    pub audio_duration: Option<f64>,
    pub cover_image_url: Option<String>,
    pub cover_image_path: Option<String>,
    pub lyrics: Option<String>,
    pub cool_things_learned: Option<String>,
    pub tools_used: Option<String>,
    pub happy_accidents: Option<String>,
    pub didnt_work: Option<String>,
}

impl NewSubmission {
    pub fn from_form(id: i64, form: &SubmissionForm) -> Self {
        Self {
            id,
            round_id: form.round_id,
            user_id: form.user_id.clone(),
            audio_file_url: form.audio_file_url.clone(),
            audio_file_path: form.audio_file_path.clone(),
            audio_file_size: form.audio_file_size,
            audio_duration: form.audio_duration,
            cover_image_url: form.cover_image_url.clone(),
            cover_image_path: form.cover_image_path.clone(),
            lyrics: form.lyrics.clone(),
            cool_things_learned: form.cool_things_learned.clone(),
            tools_used: form.tools_used.clone(),
            happy_accidents: form.happy_accidents.clone(),
            didnt_work: form.didnt_work.clone(),
        }
    }
}

/// Stored submission
#[derive(Debug, Clone, Serialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: i64,
    pub round_id: i64,
    pub user_id: Option<String>,
    pub audio_file_url: Option<String>,
    pub audio_file_path: Option<String>,
    pub audio_file_size: Option<i64>,
    pub audio_duration: Option<f64>,
    pub cover_image_url: Option<String>,
    pub cover_image_path: Option<String>,
    pub lyrics: Option<String>,
    pub cool_things_learned: Option<String>,
    pub tools_used: Option<String>,
    pub happy_accidents: Option<String>,
    pub didnt_work: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResponse {
    pub id: i64,
    pub round_id: i64,
    pub created_at: DateTime<Utc>,
}
