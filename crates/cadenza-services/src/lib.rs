//! Cadenza Services Layer
//!
//! Coordination across the database and storage: the two-phase submission saga, the
//! rate-limit strategies it is handed, and the background job that reclaims uploads
//! which never got an owning row. Thin HTTP handling stays in cadenza-api.

#[cfg(feature = "reclamation")]
pub mod reclamation;
pub mod submission;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

#[cfg(feature = "reclamation")]
pub use reclamation::{ReclamationReport, ReclamationService};
pub use submission::{
    NoRateLimit, RateLimitDecision, RateLimitStrategy, SubmissionError, SubmissionOrchestrator,
    TokenBucketLimiter,
};
