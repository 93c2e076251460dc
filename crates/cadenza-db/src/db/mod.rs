//! Database repositories for the data access layer
//
// Upload tracking ledger (two-phase commit between storage and database)
pub mod pending_upload;
//
// Owning rows for uploads
pub mod submission;

pub use pending_upload::{PendingUploadRepository, UploadLedger, DEFAULT_EXPIRED_BATCH_SIZE};
pub use submission::{SubmissionRepository, SubmissionStore};
