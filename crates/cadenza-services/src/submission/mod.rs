//! Two-phase submission commit

mod error;
mod orchestrator;
pub mod rate_limit;

pub use error::SubmissionError;
pub use orchestrator::SubmissionOrchestrator;
pub use rate_limit::{NoRateLimit, RateLimitDecision, RateLimitStrategy, TokenBucketLimiter};
