//! Per-file upload state machine
//!
//! `reduce` is the permissive transition function: every action applies its fixed mapping
//! from any current state. `reduce_strict` applies the same mappings but only along the
//! edges of the state diagram (idle → uploading → complete | error, error → uploading).

use std::fmt;
use std::sync::{Arc, OnceLock};

use bytes::Bytes;
use cadenza_core::models::UploadResult;
use serde::Serialize;
use thiserror::Error;

/// A file picked by the user, held in memory until uploaded
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedFile {
    pub name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, data: Bytes) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            data,
        }
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    #[default]
    Idle,
    Uploading,
    Complete,
    Error,
}

impl UploadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStatus::Idle => "idle",
            UploadStatus::Uploading => "uploading",
            UploadStatus::Complete => "complete",
            UploadStatus::Error => "error",
        }
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client-side state of one media slot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadState {
    pub file: Option<Arc<SelectedFile>>,
    pub status: UploadStatus,
    /// Percentage in `[0, 100]`
    pub progress: f64,
    pub result: Option<UploadResult>,
    pub error: Option<String>,
}

impl UploadState {
    pub fn is_complete(&self) -> bool {
        self.status == UploadStatus::Complete
    }

    pub fn is_uploading(&self) -> bool {
        self.status == UploadStatus::Uploading
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UploadAction {
    SelectFile(Arc<SelectedFile>),
    UploadStart,
    /// Callers supply non-decreasing values; the reducer only clamps
    UploadProgress(f64),
    UploadSuccess(UploadResult),
    UploadError(String),
    Clear,
    /// An action this state machine does not know, e.g. replayed from a foreign log
    Unknown(String),
}

impl UploadAction {
    pub fn name(&self) -> &str {
        match self {
            UploadAction::SelectFile(_) => "SELECT_FILE",
            UploadAction::UploadStart => "UPLOAD_START",
            UploadAction::UploadProgress(_) => "UPLOAD_PROGRESS",
            UploadAction::UploadSuccess(_) => "UPLOAD_SUCCESS",
            UploadAction::UploadError(_) => "UPLOAD_ERROR",
            UploadAction::Clear => "CLEAR",
            UploadAction::Unknown(name) => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{action} is not allowed while {from}")]
pub struct TransitionError {
    pub from: UploadStatus,
    pub action: String,
}

/// The shared initial state; `Clear` always returns this exact allocation.
pub fn initial_state() -> Arc<UploadState> {
    static INITIAL: OnceLock<Arc<UploadState>> = OnceLock::new();
    Arc::clone(INITIAL.get_or_init(|| Arc::new(UploadState::default())))
}

fn clamp_progress(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 100.0)
}

/// Apply an action, returning the next state
///
/// Unknown actions return the same `Arc` so callers can detect no-ops with `Arc::ptr_eq`.
pub fn reduce(state: &Arc<UploadState>, action: &UploadAction) -> Arc<UploadState> {
    match action {
        UploadAction::SelectFile(file) => Arc::new(UploadState {
            file: Some(Arc::clone(file)),
            status: UploadStatus::Idle,
            progress: 0.0,
            result: None,
            error: None,
        }),
        UploadAction::UploadStart => Arc::new(UploadState {
            status: UploadStatus::Uploading,
            progress: 0.0,
            error: None,
            ..(**state).clone()
        }),
        UploadAction::UploadProgress(value) => Arc::new(UploadState {
            progress: clamp_progress(*value),
            ..(**state).clone()
        }),
        UploadAction::UploadSuccess(result) => Arc::new(UploadState {
            status: UploadStatus::Complete,
            progress: 100.0,
            result: Some(result.clone()),
            error: None,
            ..(**state).clone()
        }),
        UploadAction::UploadError(message) => Arc::new(UploadState {
            status: UploadStatus::Error,
            progress: 0.0,
            result: None,
            error: Some(message.clone()),
            file: state.file.clone(),
        }),
        UploadAction::Clear => initial_state(),
        UploadAction::Unknown(_) => Arc::clone(state),
    }
}

/// Like `reduce`, but rejects actions that have no edge from the current status
pub fn reduce_strict(
    state: &Arc<UploadState>,
    action: &UploadAction,
) -> Result<Arc<UploadState>, TransitionError> {
    use UploadStatus::*;

    let allowed = match action {
        UploadAction::SelectFile(_) => state.status != Uploading,
        UploadAction::UploadStart => matches!(state.status, Idle | Error) && state.file.is_some(),
        UploadAction::UploadProgress(_)
        | UploadAction::UploadSuccess(_)
        | UploadAction::UploadError(_) => state.status == Uploading,
        UploadAction::Clear | UploadAction::Unknown(_) => true,
    };

    if !allowed {
        return Err(TransitionError {
            from: state.status,
            action: action.name().to_string(),
        });
    }
    Ok(reduce(state, action))
}
