//! Stock dashboard backend: binary entrypoint.
//! Loads settings, initializes logging and metrics, and serves the Axum router.

use std::net::SocketAddr;

use anyhow::Context;
use stock_dashboard::telemetry::{init_logging, LogFormat};
use stock_dashboard::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();

    init_logging("info", LogFormat::from_env())?;

    let settings = Settings::load().context("loading settings")?;
    tracing::info!(
        port = settings.port,
        proxies = settings.price.proxies.len(),
        timeout_secs = settings.upstream_timeout_secs,
        "settings loaded"
    );

    let app = stock_dashboard::app(&settings)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
