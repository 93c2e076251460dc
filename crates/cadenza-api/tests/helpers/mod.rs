#![allow(dead_code)]

//! Test helpers: build AppState and router over in-memory mocks.
//!
//! Run with `cargo test -p cadenza-api`. No database or object store is needed; the
//! readiness check reports the database as not configured.

use axum_test::TestServer;
use cadenza_api::constants;
use cadenza_api::setup::routes;
use cadenza_api::state::AppState;
use cadenza_core::{BaseConfig, Config, StorageBackend, UploadConfig};
use cadenza_services::test_helpers::{MockStorage, MockSubmissionStore, MockUploadLedger};
use cadenza_services::{NoRateLimit, RateLimitStrategy, SubmissionOrchestrator};
use cadenza_storage::UploadSigner;
use std::sync::Arc;

pub const SIGNING_SECRET: &str = "0123456789abcdef0123456789abcdef";
pub const MAX_AUDIO_BYTES: u64 = 1024 * 1024;
pub const MAX_IMAGE_BYTES: u64 = 64 * 1024;

pub const PNG: &[u8] = &[
    0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0, 0, 0, 0x0d, b'I', b'H', b'D', b'R',
];
pub const JPEG: &[u8] = &[0xff, 0xd8, 0xff, 0xe0, 0, 0x10, b'J', b'F', b'I', b'F'];

/// API path prefix for tests (e.g. `/api/v0`).
pub fn api_path(path: &str) -> String {
    format!("{}{}", constants::API_PREFIX, path)
}

pub fn test_config(submission_rate_limit_per_hour: u32) -> Config {
    Config::new(
        BaseConfig {
            server_port: 4000,
            cors_origins: vec!["*".to_string()],
            database_url: "postgres://localhost/cadenza_test".to_string(),
            db_max_connections: 1,
            db_timeout_seconds: 1,
            environment: "test".to_string(),
        },
        UploadConfig {
            storage_backend: StorageBackend::Local,
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            aws_region: None,
            local_storage_path: None,
            local_storage_base_url: None,
            local_storage_upload_url: None,
            upload_signing_secret: Some(SIGNING_SECRET.to_string()),
            signed_url_expiry_secs: 900,
            max_audio_size_bytes: MAX_AUDIO_BYTES,
            max_image_size_bytes: MAX_IMAGE_BYTES,
            pending_upload_ttl_hours: 24,
            reclamation_interval_secs: 0,
            upload_record_retention_days: 30,
            submission_rate_limit_per_hour,
        },
    )
}

/// Test application: server plus handles onto the mocks behind it.
pub struct TestApp {
    pub server: TestServer,
    pub ledger: MockUploadLedger,
    pub submissions: MockSubmissionStore,
    pub storage: MockStorage,
    pub signer: UploadSigner,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

pub struct TestAppBuilder {
    rate_limit: Arc<dyn RateLimitStrategy>,
    direct_writes: bool,
}

impl TestAppBuilder {
    pub fn new() -> Self {
        Self {
            rate_limit: Arc::new(NoRateLimit),
            direct_writes: true,
        }
    }

    pub fn rate_limit(mut self, strategy: Arc<dyn RateLimitStrategy>) -> Self {
        self.rate_limit = strategy;
        self
    }

    /// Behave like a backend whose signed URLs point elsewhere
    pub fn without_direct_writes(mut self) -> Self {
        self.direct_writes = false;
        self
    }

    pub fn build(self) -> TestApp {
        let config = test_config(0);
        let ledger = MockUploadLedger::new();
        let submissions = MockSubmissionStore::new();
        let storage = MockStorage::new();
        let signer = UploadSigner::new(SIGNING_SECRET);

        let orchestrator = SubmissionOrchestrator::new(
            Arc::new(ledger.clone()),
            Arc::new(submissions.clone()),
            Arc::new(storage.clone()),
            self.rate_limit,
        );

        let mut state = AppState::new(
            config.clone(),
            Arc::new(storage.clone()),
            Arc::new(orchestrator),
        );
        if self.direct_writes {
            state = state.with_upload_signer(signer.clone());
        }

        let router = routes::setup_routes(&config, Arc::new(state)).expect("routes");
        let server = TestServer::new(router.into_make_service()).expect("Failed to create test server");

        TestApp {
            server,
            ledger,
            submissions,
            storage,
            signer,
        }
    }
}

pub fn setup_test_app() -> TestApp {
    TestAppBuilder::new().build()
}

pub fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}
