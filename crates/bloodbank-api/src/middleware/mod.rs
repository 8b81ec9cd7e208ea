//! HTTP middleware: request metrics and tracing.

pub mod metrics;
pub mod tracing_layer;
