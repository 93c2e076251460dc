//! Server startup and graceful shutdown

use crate::state::AppState;
use anyhow::Result;
use axum::Router;
use cadenza_core::Config;
use std::sync::Arc;

/// Serve until a shutdown signal arrives, running background reclamation alongside
pub async fn start_server(config: &Config, state: Arc<AppState>, app: Router) -> Result<()> {
    let addr = format!("0.0.0.0:{}", config.server_port());
    tracing::info!(addr = %addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    #[cfg(feature = "reclamation")]
    let reclamation = state.reclamation.clone().map(|service| {
        tracing::info!("Started upload reclamation background task");
        service.start()
    });
    #[cfg(not(feature = "reclamation"))]
    let _ = &state;

    tracing::info!(
        max_audio_mb = config.max_audio_size_bytes() / 1024 / 1024,
        max_image_mb = config.max_image_size_bytes() / 1024 / 1024,
        signed_url_expiry_secs = config.signed_url_expiry_secs(),
        "Server ready and accepting connections"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    #[cfg(feature = "reclamation")]
    {
        if let Some(handle) = reclamation {
            handle.abort();
            tracing::info!("Stopped upload reclamation background task");
        }
    }

    Ok(())
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal");
        },
    }

    tracing::info!("Shutting down gracefully...");
}
