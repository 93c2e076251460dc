//! Application state shared by every handler

use cadenza_core::validation::UploadValidator;
use cadenza_core::Config;
use cadenza_services::SubmissionOrchestrator;
#[cfg(feature = "reclamation")]
use cadenza_services::ReclamationService;
use cadenza_storage::{Storage, UploadSigner};
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub storage: Arc<dyn Storage>,
    /// Present only when the storage backend routes signed writes back through this service
    pub upload_signer: Option<UploadSigner>,
    pub validator: UploadValidator,
    pub orchestrator: Arc<SubmissionOrchestrator>,
    /// Absent in tests that run without a database
    pub db_pool: Option<PgPool>,
    #[cfg(feature = "reclamation")]
    pub reclamation: Option<Arc<ReclamationService>>,
}

impl AppState {
    pub fn new(
        config: Config,
        storage: Arc<dyn Storage>,
        orchestrator: Arc<SubmissionOrchestrator>,
    ) -> Self {
        let validator = UploadValidator::new(
            config.max_audio_size_bytes(),
            config.max_image_size_bytes(),
        );
        Self {
            config,
            storage,
            upload_signer: None,
            validator,
            orchestrator,
            db_pool: None,
            #[cfg(feature = "reclamation")]
            reclamation: None,
        }
    }

    pub fn with_upload_signer(mut self, signer: UploadSigner) -> Self {
        self.upload_signer = Some(signer);
        self
    }

    pub fn with_db_pool(mut self, pool: PgPool) -> Self {
        self.db_pool = Some(pool);
        self
    }

    #[cfg(feature = "reclamation")]
    pub fn with_reclamation(mut self, service: Arc<ReclamationService>) -> Self {
        self.reclamation = Some(service);
        self
    }

    /// Largest body any upload route accepts
    pub fn max_upload_bytes(&self) -> u64 {
        self.config
            .max_audio_size_bytes()
            .max(self.config.max_image_size_bytes())
    }
}
