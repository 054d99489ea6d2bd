//! farmlink gateway
//!
//! - WebSocket endpoint: /v1/ws?uuid=...&token=...
//! - Envelopes from every session funnel into one dispatcher thread
//! - Ops endpoints: /healthz, /readyz, /metrics
//! - Ctrl-C: stop accepting sessions, drain, exit

use std::net::SocketAddr;
use std::time::Duration;

use tracing_subscriber::{fmt, EnvFilter};

use farmlink_gateway::{app_state, config, router};

const CONFIG_ENV: &str = "FARMLINK_CONFIG";
const PUMP_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var(CONFIG_ENV).ok())
        .unwrap_or_else(|| config::DEFAULT_CONFIG_PATH.to_string());
    let cfg = config::load_from_file(&path)?;
    let listen: SocketAddr = cfg.gateway.listen_addr()?;

    let (state, pump) = app_state::AppState::start(cfg)?;
    let app = router::build_router(state.clone());

    tracing::info!(%listen, config = %path, "farmlink-gateway starting");
    let listener = tokio::net::TcpListener::bind(listen).await?;

    let drain = state.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "ctrl_c handler failed");
            }
            tracing::info!("shutdown requested, draining");
            drain.set_draining();
        })
        .await?;

    // The pump stops once the last inbox sender (held by sessions) is gone.
    drop(state);
    match tokio::time::timeout(PUMP_DRAIN_TIMEOUT, pump).await {
        Ok(Err(e)) => tracing::error!(error = %e, "dispatcher pump panicked"),
        Err(_) => tracing::warn!("dispatcher pump still busy, exiting anyway"),
        Ok(Ok(())) => {}
    }
    tracing::info!("farmlink-gateway stopped");
    Ok(())
}
