//! Prometheus metrics for monitoring bracket server health and activity.
//!
//! Metrics are exposed in Prometheus text format on a dedicated listener
//! when `METRICS_BIND` is configured. Without an installed exporter every
//! recording call is a no-op.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use pb_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::http_requests_total("PUT", "/api/v1/matches/{match_id}/result", 200);
//! metrics::results_recorded(false);
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request.
///
/// Increments the total HTTP request counter with method, path, and status labels.
pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record HTTP request duration in milliseconds.
pub fn http_request_duration_ms(method: &str, path: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// Bracket Metrics
// ============================================================================

/// Increment brackets generated counter.
pub fn brackets_generated(bracket_size: usize, byes_resolved: usize) {
    metrics::counter!("brackets_generated_total",
        "bracket_size" => bracket_size.to_string()
    )
    .increment(1);
    metrics::counter!("byes_resolved_total").increment(byes_resolved as u64);
}

/// Increment recorded results counter.
pub fn results_recorded(tournament_finished: bool) {
    metrics::counter!("results_recorded_total").increment(1);
    if tournament_finished {
        tournaments_finished();
    }
}

/// Increment finished tournaments counter.
pub fn tournaments_finished() {
    metrics::counter!("tournaments_finished_total").increment(1);
}

/// Increment rejected operation counter by error kind.
pub fn bracket_errors_total(kind: &str) {
    metrics::counter!("bracket_errors_total",
        "kind" => kind.to_string()
    )
    .increment(1);
}
