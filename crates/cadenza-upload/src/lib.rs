//! Cadenza upload client
//!
//! Client-side half of the submission flow:
//! - `reducer`: the per-file upload state machine
//! - `eligibility`: whether a form may be submitted given its upload slots
//! - `payload`: assembling the submit payload and its url-encoded wire form
//! - `transport`: signed-URL request plus direct `PUT` to storage (reqwest)
//! - `queue`: multi-file uploads over N lanes with per-item cancellation
//! - `metadata`: local audio duration extraction (lofty)

pub mod eligibility;
pub mod metadata;
pub mod payload;
pub mod queue;
pub mod reducer;
pub mod slot;
pub mod transport;

pub use eligibility::{
    can_submit, derive_submit_config, CanSubmitResult, FieldConfig, FormFields, MediaSlot,
    SubmissionFormConfig, SubmitConfig, UploadStates,
};
pub use payload::{build_payload, to_form_fields};
pub use queue::{QueueEvent, QueueItem, QueueItemStatus, UploadQueue};
pub use reducer::{
    initial_state, reduce, reduce_strict, SelectedFile, TransitionError, UploadAction,
    UploadState, UploadStatus,
};
pub use slot::UploadSlot;
pub use transport::{DirectUploadClient, ProgressFn, TransportError, Uploader};
