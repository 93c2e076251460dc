//! Cadenza API Library
//!
//! HTTP surface for signed direct uploads, the local backend's write receiver, and
//! submissions, plus application setup.

mod api_doc;
mod handlers;
mod telemetry;

pub mod constants;
pub mod error;
pub mod setup;
pub mod state;

pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
