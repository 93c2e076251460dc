pub mod health;
pub mod signed_upload;
pub mod storage_put;
pub mod submission;
