//! # bloodbank-api: Axum HTTP Service for the Blood Bank Stack
//!
//! Exposes the request lifecycle and the inventory ledger over JSON/HTTP.
//!
//! ## API Surface
//!
//! | Prefix          | Module                    | Domain                      |
//! |-----------------|---------------------------|-----------------------------|
//! | `/requests/*`   | [`routes::requests`]      | Submission, review, fulfill |
//! | `/inventory/*`  | [`routes::inventory`]     | Stock queries, donations    |
//! | `/health/*`     | this module               | Liveness and readiness      |
//! | `/metrics`      | this module               | Prometheus exposition       |
//! | `/openapi.json` | [`openapi`]               | OpenAPI document            |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → Handler
//! ```
//!
//! Probes and `/metrics` sit outside the stack so scrapes do not count
//! themselves.

pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;
pub mod telemetry;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::middleware::from_fn;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use bloodbank_engine::bounded;

use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::requests::router())
        .merge(routes::inventory::router())
        .merge(openapi::router())
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(middleware::tracing_layer::layer())
        .with_state(state.clone());

    let ops = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .route("/metrics", get(render_metrics))
        .with_state(state);

    Router::new().merge(ops).merge(api)
}

/// Liveness probe: always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: 200 when storage answers, 503 otherwise.
///
/// The in-memory backend is always ready.
async fn readiness(State(state): State<AppState>) -> Response {
    let Some(pool) = state.db_pool.as_ref() else {
        return "ready".into_response();
    };
    let probe = bounded(state.storage_timeout, "readiness", async {
        db::ping(pool)
            .await
            .map_err(|e| bloodbank_engine::StoreError::Unavailable {
                op: "readiness",
                reason: e.to_string(),
            })
    })
    .await;
    match probe {
        Ok(()) => "ready".into_response(),
        Err(err) => {
            tracing::warn!(error = %err, "readiness probe failed");
            (StatusCode::SERVICE_UNAVAILABLE, "storage unavailable").into_response()
        }
    }
}

/// GET /metrics: Prometheus text exposition.
async fn render_metrics(State(state): State<AppState>) -> Response {
    match state.metrics.as_ref() {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}
