//! API constants

/// Every versioned route lives under this prefix
pub const API_PREFIX: &str = "/api/v0";

/// Route of the local backend's signed write receiver, relative to `API_PREFIX`
pub const STORAGE_ROUTE: &str = "/storage";

/// Upper bound for each dependency check in the health endpoints
pub const HEALTH_CHECK_TIMEOUT_SECS: u64 = 5;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_route_matches_local_signed_urls() {
        assert_eq!(
            format!("{}{}", API_PREFIX, STORAGE_ROUTE),
            cadenza_storage::factory::LOCAL_UPLOAD_ROUTE
        );
    }
}
