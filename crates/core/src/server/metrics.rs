//! Prometheus metrics.
//!
//! A single process-wide recorder is installed on first use; `/metrics`
//! renders it in the Prometheus text format.

use std::sync::OnceLock;
use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Global Prometheus handle for rendering metrics.
static PROMETHEUS_HANDLE: OnceLock<Option<PrometheusHandle>> = OnceLock::new();

/// Metric names as constants for consistency.
pub mod names {
    pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";
}

/// Install the Prometheus recorder. Safe to call more than once.
///
/// Returns `false` if no recorder could be installed (for example because
/// another global recorder already exists).
pub fn init_metrics() -> bool {
    PROMETHEUS_HANDLE
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => {
                tracing::info!("Prometheus metrics initialized");
                Some(handle)
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install Prometheus recorder");
                None
            }
        })
        .is_some()
}

/// Render all metrics in Prometheus text format.
///
/// Returns `None` if metrics were not initialized.
pub fn render_metrics() -> Option<String> {
    PROMETHEUS_HANDLE
        .get()
        .and_then(Option::as_ref)
        .map(PrometheusHandle::render)
}

/// Middleware recording request count and latency per matched route.
///
/// Uses the route template (`/products/{id}`) rather than the raw path to
/// keep label cardinality bounded.
pub async fn track_http_metrics(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| "unmatched".to_owned(), |p| p.as_str().to_owned());

    let response = next.run(request).await;

    let status = response.status().as_u16().to_string();
    counter!(
        names::HTTP_REQUESTS_TOTAL,
        "method" => method.clone(),
        "path" => path.clone(),
        "status" => status
    )
    .increment(1);
    histogram!(
        names::HTTP_REQUEST_DURATION_SECONDS,
        "method" => method,
        "path" => path
    )
    .record(start.elapsed().as_secs_f64());

    response
}
