//! Submit gating over the current upload slots
//!
//! Both functions are pure. `derive_submit_config` runs once per form; `can_submit` runs
//! whenever a slot changes.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::reducer::{initial_state, UploadState, UploadStatus};

pub const WAIT_FOR_UPLOADS: &str = "Please wait for uploads to complete";
pub const AUDIO_REQUIRED: &str = "Audio file is required";
pub const IMAGE_REQUIRED: &str = "Cover image is required";
pub const AUDIO_OR_LYRICS_REQUIRED: &str = "Please provide either an audio file or lyrics";
const UNKNOWN_ERROR: &str = "Unknown error";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaSlot {
    Audio,
    Image,
}

impl MediaSlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaSlot::Audio => "audio",
            MediaSlot::Image => "image",
        }
    }
}

impl fmt::Display for MediaSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current state of both media slots of a submission form
#[derive(Debug, Clone)]
pub struct UploadStates {
    pub audio: Arc<UploadState>,
    pub image: Arc<UploadState>,
}

impl Default for UploadStates {
    fn default() -> Self {
        Self {
            audio: initial_state(),
            image: initial_state(),
        }
    }
}

impl UploadStates {
    fn slots(&self) -> [(MediaSlot, &UploadState); 2] {
        [(MediaSlot::Audio, &*self.audio), (MediaSlot::Image, &*self.image)]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitConfig {
    pub audio_required: bool,
    pub image_required: bool,
    pub audio_or_lyrics_required: bool,
}

/// Requirement flags of one form field; absence means "not enabled"
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldConfig {
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub required_group: Option<String>,
    #[serde(default)]
    pub enabled: Option<bool>,
}

impl FieldConfig {
    fn group(&self) -> Option<&str> {
        self.required_group.as_deref().filter(|g| !g.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormFields {
    #[serde(default)]
    pub audio_file: Option<FieldConfig>,
    #[serde(default)]
    pub cover_image: Option<FieldConfig>,
    #[serde(default)]
    pub lyrics: Option<FieldConfig>,
}

/// Per-round form configuration as delivered by the round settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionFormConfig {
    #[serde(default)]
    pub fields: FormFields,
}

pub fn derive_submit_config(config: &SubmissionFormConfig) -> SubmitConfig {
    let audio = config.fields.audio_file.as_ref();
    let lyrics = config.fields.lyrics.as_ref();
    let cover = config.fields.cover_image.as_ref();

    let audio_group = audio.and_then(FieldConfig::group);
    let lyrics_group = lyrics.and_then(FieldConfig::group);
    let audio_or_lyrics_required = audio_group.is_some() && audio_group == lyrics_group;

    let audio_explicit = audio.and_then(|f| f.required).unwrap_or(false);
    let lyrics_enabled = lyrics.and_then(|f| f.enabled).unwrap_or(false);
    let audio_required =
        (audio_explicit || (audio_group.is_some() && !lyrics_enabled)) && !audio_or_lyrics_required;

    SubmitConfig {
        audio_required,
        image_required: cover.and_then(|f| f.required).unwrap_or(false),
        audio_or_lyrics_required,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CanSubmitResult {
    pub allowed: bool,
    pub errors: Vec<String>,
    pub pending: Vec<MediaSlot>,
}

fn failure_message(label: &str, state: &UploadState) -> Option<String> {
    (state.status == UploadStatus::Error).then(|| {
        format!(
            "{} upload failed: {}",
            label,
            state.error.as_deref().unwrap_or(UNKNOWN_ERROR)
        )
    })
}

/// Decide whether the form may be submitted
///
/// An in-flight upload short-circuits every other rule, so `pending` is never reported
/// alongside a requirement error.
pub fn can_submit(uploads: &UploadStates, config: &SubmitConfig, has_lyrics: bool) -> CanSubmitResult {
    let pending: Vec<MediaSlot> = uploads
        .slots()
        .into_iter()
        .filter(|(_, state)| state.is_uploading())
        .map(|(slot, _)| slot)
        .collect();
    if !pending.is_empty() {
        return CanSubmitResult {
            allowed: false,
            errors: vec![WAIT_FOR_UPLOADS.to_string()],
            pending,
        };
    }

    let audio = &uploads.audio;
    let image = &uploads.image;
    let mut errors = Vec::new();

    if config.audio_required && !audio.is_complete() {
        errors.push(failure_message("Audio", audio).unwrap_or_else(|| AUDIO_REQUIRED.to_string()));
    }

    if config.image_required && !image.is_complete() {
        errors.push(failure_message("Image", image).unwrap_or_else(|| IMAGE_REQUIRED.to_string()));
    }

    if config.audio_or_lyrics_required && !audio.is_complete() && !has_lyrics {
        errors.push(
            failure_message("Audio", audio)
                .unwrap_or_else(|| AUDIO_OR_LYRICS_REQUIRED.to_string()),
        );
    }

    CanSubmitResult {
        allowed: errors.is_empty(),
        errors,
        pending: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reducer::{reduce, SelectedFile, UploadAction};
    use bytes::Bytes;
    use cadenza_core::models::UploadResult;

    fn selected() -> Arc<UploadState> {
        let file = Arc::new(SelectedFile::new("a.mp3", "audio/mpeg", Bytes::from_static(b"x")));
        reduce(&initial_state(), &UploadAction::SelectFile(file))
    }

    fn uploading() -> Arc<UploadState> {
        reduce(&selected(), &UploadAction::UploadStart)
    }

    fn complete() -> Arc<UploadState> {
        reduce(
            &uploading(),
            &UploadAction::UploadSuccess(UploadResult {
                url: "https://cdn.example.com/a.mp3".to_string(),
                path: "a.mp3".to_string(),
                file_size: Some(1),
                mime_type: None,
                metadata: None,
            }),
        )
    }

    fn errored(message: &str) -> Arc<UploadState> {
        reduce(&uploading(), &UploadAction::UploadError(message.to_string()))
    }

    fn audio_required() -> SubmitConfig {
        SubmitConfig {
            audio_required: true,
            ..Default::default()
        }
    }

    #[test]
    fn missing_required_audio_is_reported() {
        let result = can_submit(&UploadStates::default(), &audio_required(), false);
        assert_eq!(
            result,
            CanSubmitResult {
                allowed: false,
                errors: vec!["Audio file is required".to_string()],
                pending: vec![],
            }
        );
    }

    #[test]
    fn in_flight_upload_short_circuits() {
        let uploads = UploadStates {
            audio: uploading(),
            ..Default::default()
        };
        let config = SubmitConfig {
            audio_required: true,
            image_required: true,
            audio_or_lyrics_required: false,
        };
        let result = can_submit(&uploads, &config, false);
        assert!(!result.allowed);
        assert_eq!(result.pending, vec![MediaSlot::Audio]);
        assert_eq!(result.errors, vec![WAIT_FOR_UPLOADS.to_string()]);
    }

    #[test]
    fn both_slots_uploading_are_listed_in_order() {
        let uploads = UploadStates {
            audio: uploading(),
            image: uploading(),
        };
        let result = can_submit(&uploads, &SubmitConfig::default(), true);
        assert_eq!(result.pending, vec![MediaSlot::Audio, MediaSlot::Image]);
    }

    #[test]
    fn failed_upload_reports_its_error() {
        let uploads = UploadStates {
            audio: errored("Network down"),
            image: errored(""),
        };
        let config = SubmitConfig {
            audio_required: true,
            image_required: true,
            audio_or_lyrics_required: false,
        };
        let result = can_submit(&uploads, &config, false);
        assert_eq!(
            result.errors,
            vec![
                "Audio upload failed: Network down".to_string(),
                "Image upload failed: ".to_string(),
            ]
        );
    }

    #[test]
    fn missing_error_text_renders_unknown() {
        let mut state = (*errored("x")).clone();
        state.error = None;
        let uploads = UploadStates {
            audio: Arc::new(state),
            ..Default::default()
        };
        let result = can_submit(&uploads, &audio_required(), false);
        assert_eq!(result.errors, vec!["Audio upload failed: Unknown error".to_string()]);
    }

    #[test]
    fn audio_or_lyrics_accepts_either() {
        let config = SubmitConfig {
            audio_or_lyrics_required: true,
            ..Default::default()
        };
        assert!(can_submit(&UploadStates::default(), &config, true).allowed);

        let uploads = UploadStates {
            audio: complete(),
            ..Default::default()
        };
        assert!(can_submit(&uploads, &config, false).allowed);

        let result = can_submit(&UploadStates::default(), &config, false);
        assert_eq!(result.errors, vec![AUDIO_OR_LYRICS_REQUIRED.to_string()]);
    }

    #[test]
    fn audio_failure_wins_over_combined_message() {
        let config = SubmitConfig {
            audio_or_lyrics_required: true,
            ..Default::default()
        };
        let uploads = UploadStates {
            audio: errored("Too big"),
            ..Default::default()
        };
        let result = can_submit(&uploads, &config, false);
        assert_eq!(result.errors, vec!["Audio upload failed: Too big".to_string()]);
    }

    #[test]
    fn complete_required_uploads_are_allowed() {
        let uploads = UploadStates {
            audio: complete(),
            image: complete(),
        };
        let config = SubmitConfig {
            audio_required: true,
            image_required: true,
            audio_or_lyrics_required: false,
        };
        assert_eq!(
            can_submit(&uploads, &config, false),
            CanSubmitResult {
                allowed: true,
                errors: vec![],
                pending: vec![],
            }
        );
    }

    #[test]
    fn shared_group_means_audio_or_lyrics() {
        let config: SubmissionFormConfig = serde_json::from_value(serde_json::json!({
            "fields": {
                "audioFile": { "requiredGroup": "content" },
                "lyrics": { "requiredGroup": "content", "enabled": true }
            }
        }))
        .unwrap();
        let derived = derive_submit_config(&config);
        assert!(!derived.audio_required);
        assert!(derived.audio_or_lyrics_required);
    }

    #[test]
    fn group_without_lyrics_requires_audio() {
        let config = SubmissionFormConfig {
            fields: FormFields {
                audio_file: Some(FieldConfig {
                    required_group: Some("content".to_string()),
                    ..Default::default()
                }),
                ..Default::default()
            },
        };
        let derived = derive_submit_config(&config);
        assert!(derived.audio_required);
        assert!(!derived.audio_or_lyrics_required);
    }

    #[test]
    fn empty_group_names_do_not_match() {
        let group = |name: &str| FieldConfig {
            required_group: Some(name.to_string()),
            enabled: Some(true),
            ..Default::default()
        };
        let config = SubmissionFormConfig {
            fields: FormFields {
                audio_file: Some(group("")),
                lyrics: Some(group("")),
                ..Default::default()
            },
        };
        assert_eq!(derive_submit_config(&config), SubmitConfig::default());
    }

    #[test]
    fn absent_config_requires_nothing() {
        assert_eq!(
            derive_submit_config(&SubmissionFormConfig::default()),
            SubmitConfig::default()
        );
    }

    #[test]
    fn explicit_flags_are_honoured() {
        let config = SubmissionFormConfig {
            fields: FormFields {
                audio_file: Some(FieldConfig {
                    required: Some(true),
                    ..Default::default()
                }),
                cover_image: Some(FieldConfig {
                    required: Some(true),
                    ..Default::default()
                }),
                lyrics: None,
            },
        };
        assert_eq!(
            derive_submit_config(&config),
            SubmitConfig {
                audio_required: true,
                image_required: true,
                audio_or_lyrics_required: false,
            }
        );
    }
}
