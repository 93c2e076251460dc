//! Data models shared by the upload client, the services, and the HTTP layer

mod bucket;
mod pending_upload;
mod signed_upload;
mod submission;
mod upload;

pub use bucket::*;
pub use pending_upload::*;
pub use signed_upload::*;
pub use submission::*;
pub use upload::*;
