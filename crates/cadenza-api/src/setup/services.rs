//! Repositories and services wired into application state

use crate::state::AppState;
use cadenza_core::Config;
use cadenza_db::{PendingUploadRepository, SubmissionRepository, SubmissionStore, UploadLedger};
#[cfg(feature = "reclamation")]
use cadenza_services::ReclamationService;
use cadenza_services::{
    NoRateLimit, RateLimitStrategy, SubmissionOrchestrator, TokenBucketLimiter,
};
use cadenza_storage::{Storage, UploadSigner};
use sqlx::PgPool;
use std::sync::Arc;

/// Submission throttle chosen by `SUBMISSION_RATE_LIMIT_PER_HOUR`; 0 disables it
pub fn submission_rate_limit(config: &Config) -> Arc<dyn RateLimitStrategy> {
    match config.submission_rate_limit_per_hour() {
        0 => {
            tracing::info!("Submission rate limiting disabled");
            Arc::new(NoRateLimit)
        }
        limit => {
            tracing::info!(limit_per_hour = limit, "Submission rate limiting enabled");
            Arc::new(TokenBucketLimiter::per_hour(limit))
        }
    }
}

pub fn initialize_services(
    config: &Config,
    pool: PgPool,
    storage: Arc<dyn Storage>,
    upload_signer: Option<UploadSigner>,
) -> Arc<AppState> {
    let ledger: Arc<dyn UploadLedger> = Arc::new(PendingUploadRepository::new(pool.clone()));
    let submissions: Arc<dyn SubmissionStore> = Arc::new(SubmissionRepository::new(pool.clone()));

    let orchestrator = SubmissionOrchestrator::new(
        ledger.clone(),
        submissions,
        storage.clone(),
        submission_rate_limit(config),
    )
    .with_pending_upload_ttl_hours(config.pending_upload_ttl_hours());
    tracing::info!("Submission orchestrator initialized");

    let mut state = AppState::new(config.clone(), storage.clone(), Arc::new(orchestrator))
        .with_db_pool(pool);
    if let Some(signer) = upload_signer {
        state = state.with_upload_signer(signer);
    }

    #[cfg(feature = "reclamation")]
    {
        if config.reclamation_interval_secs() > 0 {
            let service = ReclamationService::new(ledger, storage)
                .with_interval(std::time::Duration::from_secs(
                    config.reclamation_interval_secs(),
                ))
                .with_retention_days(config.upload_record_retention_days());
            state = state.with_reclamation(Arc::new(service));
            tracing::info!(
                interval_secs = config.reclamation_interval_secs(),
                retention_days = config.upload_record_retention_days(),
                "Upload reclamation configured"
            );
        }
    }

    Arc::new(state)
}
