//! # Prometheus Metrics
//!
//! Request counters recorded through the `metrics` facade and rendered by
//! `metrics-exporter-prometheus` at `/metrics`.
//!
//! | Metric                                   | Labels             |
//! |------------------------------------------|--------------------|
//! | `bloodbank_http_requests_total`          | `method`, `status` |
//! | `bloodbank_http_errors_total`            | `method`, `status` |
//! | `bloodbank_http_request_duration_seconds`| `method`           |
//!
//! Domain counters (`bloodbank_request_transitions_total`,
//! `bloodbank_inventory_debit_rejected_total`) are recorded by the engine.

use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

/// Latency buckets, in seconds.
const DURATION_BUCKETS: &[f64] = &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0];

/// Install the process-wide Prometheus recorder.
///
/// Fails if a recorder is already installed.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            DURATION_BUCKETS,
        )?
        .install_recorder()?;
    describe();
    Ok(handle)
}

fn describe() {
    metrics::describe_counter!(
        "bloodbank_http_requests_total",
        "HTTP requests served, by method and status"
    );
    metrics::describe_counter!(
        "bloodbank_http_errors_total",
        "HTTP requests answered with a 4xx or 5xx status"
    );
    metrics::describe_histogram!(
        "bloodbank_http_request_duration_seconds",
        metrics::Unit::Seconds,
        "HTTP request latency"
    );
    metrics::describe_counter!(
        "bloodbank_request_transitions_total",
        "Blood request status transitions, by target status"
    );
    metrics::describe_counter!(
        "bloodbank_inventory_debit_rejected_total",
        "Debits refused for insufficient stock"
    );
}

/// Middleware that records request count, error count and latency.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let method = request.method().as_str().to_owned();
    let started = Instant::now();

    let response = next.run(request).await;

    let status = response.status();
    let status_label = status.as_u16().to_string();
    metrics::counter!(
        "bloodbank_http_requests_total",
        "method" => method.clone(),
        "status" => status_label.clone()
    )
    .increment(1);
    if status.is_client_error() || status.is_server_error() {
        metrics::counter!(
            "bloodbank_http_errors_total",
            "method" => method.clone(),
            "status" => status_label
        )
        .increment(1);
    }
    metrics::histogram!("bloodbank_http_request_duration_seconds", "method" => method)
        .record(started.elapsed().as_secs_f64());

    response
}
