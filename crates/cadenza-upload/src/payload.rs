//! Submit payload assembly
//!
//! `build_payload` projects finished uploads plus free text into a flat record;
//! `to_form_fields` turns that record into the url-encoded wire form.

use cadenza_core::models::{SubmissionPayload, TextFields};

use crate::eligibility::UploadStates;

pub fn build_payload(round_id: i64, uploads: &UploadStates, text: &TextFields) -> SubmissionPayload {
    let audio = uploads.audio.result.as_ref();
    let cover = uploads.image.result.as_ref();

    SubmissionPayload {
        round_id,
        audio_file_url: audio.map(|r| r.url.clone()).unwrap_or_default(),
        audio_file_path: audio.map(|r| r.path.clone()).unwrap_or_default(),
        audio_file_size: audio.and_then(|r| r.file_size),
        audio_duration: audio.and_then(|r| r.audio_duration()),
        cover_image_url: cover.map(|r| r.url.clone()).unwrap_or_default(),
        cover_image_path: cover.map(|r| r.path.clone()).unwrap_or_default(),
        lyrics: text.lyrics.clone(),
        cool_things_learned: text.cool_things_learned.clone(),
        tools_used: text.tools_used.clone(),
        happy_accidents: text.happy_accidents.clone(),
        didnt_work: text.didnt_work.clone(),
    }
}

/// Wire fields of a payload, skipping absent values and empty strings
pub fn to_form_fields(payload: &SubmissionPayload) -> Vec<(&'static str, String)> {
    let candidates: [(&'static str, Option<String>); 12] = [
        ("roundId", Some(payload.round_id.to_string())),
        ("audioFileUrl", Some(payload.audio_file_url.clone())),
        ("audioFilePath", Some(payload.audio_file_path.clone())),
        ("audioFileSize", payload.audio_file_size.map(|s| s.to_string())),
        ("audioDuration", payload.audio_duration.map(|d| d.to_string())),
        ("coverImageUrl", Some(payload.cover_image_url.clone())),
        ("coverImagePath", Some(payload.cover_image_path.clone())),
        ("lyrics", payload.lyrics.clone()),
        ("coolThingsLearned", payload.cool_things_learned.clone()),
        ("toolsUsed", payload.tools_used.clone()),
        ("happyAccidents", payload.happy_accidents.clone()),
        ("didntWork", payload.didnt_work.clone()),
    ];

    candidates
        .into_iter()
        .filter_map(|(key, value)| value.filter(|v| !v.is_empty()).map(|v| (key, v)))
        .collect()
}
