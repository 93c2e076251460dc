//! OpenAPI documentation

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use cadenza_core::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Cadenza API",
        version = "0.1.0",
        description = "Direct-to-storage uploads and round submissions. Files are written straight to storage through signed URLs; submissions reference them and commit them in the upload ledger. All endpoints are versioned under /api/v0/."
    ),
    paths(
        handlers::signed_upload::create_signed_upload,
        handlers::storage_put::put_object,
        handlers::submission::create_submission,
        handlers::health::health_check,
        handlers::health::readiness_check,
    ),
    components(schemas(
        models::Bucket,
        models::SignedUploadRequest,
        models::SignedUploadResponse,
        models::SubmissionForm,
        models::SubmissionResponse,
        handlers::health::HealthResponse,
        handlers::health::ReadinessResponse,
        error::ErrorResponse,
    )),
    tags(
        (name = "uploads", description = "Signed direct uploads"),
        (name = "submissions", description = "Round submissions"),
        (name = "health", description = "Liveness and readiness checks")
    )
)]
pub struct ApiDoc;
