//! Cadenza database layer
//!
//! Postgres repositories for the upload ledger and submissions. Services depend on the
//! `UploadLedger` and `SubmissionStore` traits, not on the concrete repositories.

pub mod db;

pub use db::{
    PendingUploadRepository, SubmissionRepository, SubmissionStore, UploadLedger,
    DEFAULT_EXPIRED_BATCH_SIZE,
};
