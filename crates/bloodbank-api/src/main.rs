//! # bloodbank-api: Binary Entry Point
//!
//! Starts the Axum HTTP server for the blood bank API.

use bloodbank_api::config::AppConfig;
use bloodbank_api::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    bloodbank_api::telemetry::init_tracing(config.log_format, "info");
    tracing::info!(?config, "configuration loaded");

    // Absent DATABASE_URL means in-memory only.
    let db_pool = bloodbank_api::db::init_pool(&config).await.map_err(|e| {
        tracing::error!("database initialization failed: {e}");
        e
    })?;

    let mut state = AppState::from_config(&config, db_pool);
    match bloodbank_api::middleware::metrics::install_recorder() {
        Ok(handle) => state = state.with_metrics(handle),
        Err(e) => tracing::warn!("metrics recorder not installed: {e}. /metrics will return 404."),
    }

    let app = bloodbank_api::app(state);

    let addr = config.socket_addr();
    tracing::info!("blood bank API listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
