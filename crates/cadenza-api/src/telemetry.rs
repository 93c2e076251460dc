//! Tracing subscriber setup

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_FILTER: &str = "cadenza_api=info,cadenza_services=info,tower_http=info";

/// Install the global subscriber: `RUST_LOG` filter, JSON lines when `LOG_FORMAT=json`
pub fn init_telemetry() -> anyhow::Result<()> {
    let json = std::env::var("LOG_FORMAT")
        .map(|f| f.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let fmt_layer = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .compact()
            .with_target(false)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()))
        .with(fmt_layer)
        .try_init()?;

    tracing::info!(json, "Tracing initialized");
    Ok(())
}
