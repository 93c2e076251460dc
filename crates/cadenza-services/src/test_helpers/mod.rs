//! Test helpers for saga and reclamation tests
//!
//! In-memory implementations of the ledger, submission store, and storage traits. Each
//! mock is cheaply cloneable and shares its state across clones, so a test keeps one
//! handle for assertions and hands another to the code under test.

mod mock_ledger;
mod mock_storage;
mod mock_submission_store;

pub use mock_ledger::{LedgerCall, MockUploadLedger};
pub use mock_storage::MockStorage;
pub use mock_submission_store::MockSubmissionStore;
