//! Shared constants

/// Table name recorded as `related_table` for uploads owned by a submission row.
pub const SUBMISSIONS_TABLE: &str = "submissions";

/// Hours a pending upload may stay uncommitted before reclamation picks it up.
pub const DEFAULT_PENDING_UPLOAD_TTL_HOURS: i64 = 24;

/// Days of committed/failed ledger rows kept for audit.
pub const DEFAULT_UPLOAD_RECORD_RETENTION_DAYS: i64 = 30;

/// Lifetime of a signed write URL.
pub const DEFAULT_SIGNED_URL_EXPIRY_SECS: u64 = 900;

/// Default size limits, in MiB.
pub const DEFAULT_MAX_AUDIO_SIZE_MB: u64 = 100;
pub const DEFAULT_MAX_IMAGE_SIZE_MB: u64 = 10;

pub const MAX_FILENAME_LENGTH: usize = 255;
