use crate::constants::HEALTH_CHECK_TIMEOUT_SECS;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use utoipa::ToSchema;

/// Key that never exists; probing it checks backend connectivity without writing
const STORAGE_PROBE_KEY: &str = "health-check/non-existent-key";

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub storage: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReadinessResponse {
    pub status: String,
    pub database: String,
}

/// Liveness check; storage problems degrade but never fail it
#[utoipa::path(
    get,
    path = "/api/v0/health",
    tag = "health",
    responses((status = 200, description = "Service is alive", body = HealthResponse))
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let timeout = Duration::from_secs(HEALTH_CHECK_TIMEOUT_SECS);

    let storage = match tokio::time::timeout(timeout, state.storage.exists(STORAGE_PROBE_KEY)).await
    {
        Ok(Ok(_)) => "healthy".to_string(),
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Storage health check warning");
            format!("degraded: {}", e)
        }
        Err(_) => {
            tracing::warn!("Storage health check timed out");
            "timeout".to_string()
        }
    };

    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            storage,
        }),
    )
}

/// Readiness check: the database must answer `SELECT 1` in time
#[utoipa::path(
    get,
    path = "/api/v0/health/ready",
    tag = "health",
    responses(
        (status = 200, description = "Ready to accept traffic", body = ReadinessResponse),
        (status = 503, description = "Database unavailable", body = ReadinessResponse)
    )
)]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let timeout = Duration::from_secs(HEALTH_CHECK_TIMEOUT_SECS);

    let (ready, database) = match &state.db_pool {
        None => (false, "not_configured".to_string()),
        Some(pool) => match tokio::time::timeout(timeout, sqlx::query("SELECT 1").execute(pool)).await {
            Ok(Ok(_)) => (true, "ready".to_string()),
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Database readiness check failed");
                (false, format!("not_ready: {}", e))
            }
            Err(_) => {
                tracing::error!("Database readiness check timed out");
                (false, "timeout".to_string())
            }
        },
    };

    let status_code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(ReadinessResponse {
            status: if ready { "ready" } else { "not_ready" }.to_string(),
            database,
        }),
    )
}
