//! Metrics definitions for the Meeting Gateway.
//!
//! All metrics follow Prometheus naming conventions:
//! - `mg_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `status`: 2 values (success, error) on issuance; 3 on HTTP (success, error, timeout)
//! - `view`: 2 values (not_found, setup)
//! - `endpoint`: parameterized paths, unknown paths collapse to `/other`
//! - `error_category`: 5 values (see [`ErrorCategory`](super::ErrorCategory))

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize the Prometheus recorder and return the handle for `/metrics`.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if the recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("mg_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        // Issuance includes the session verification round trip on a cold JWKS cache
        .set_buckets_for_metric(
            Matcher::Prefix("mg_token_issuance".to_string()),
            &[0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000],
        )
        .map_err(|e| format!("Failed to set token issuance buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `mg_http_requests_total`, `mg_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status` / `status_code`
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("mg_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("mg_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Replace the meeting id segment with a placeholder; unknown paths become
/// `/other`.
fn normalize_endpoint(path: &str) -> &'static str {
    match path {
        "/health" => "/health",
        "/ready" => "/ready",
        "/metrics" => "/metrics",
        "/api/v1/stream/token" => "/api/v1/stream/token",
        _ => match path.strip_prefix("/api/v1/meetings/") {
            Some(rest) if !rest.is_empty() && !rest.contains('/') => "/api/v1/meetings/{id}",
            _ => "/other",
        },
    }
}

// ============================================================================
// Token Issuance Metrics
// ============================================================================

/// Record a token issuance attempt
///
/// Metric: `mg_token_issuance_total`, `mg_token_issuance_duration_seconds`
/// Labels: `status`
pub fn record_token_issuance(status: &str, duration: Duration) {
    histogram!("mg_token_issuance_duration_seconds", "status" => status.to_string())
        .record(duration.as_secs_f64());

    counter!("mg_token_issuance_total", "status" => status.to_string()).increment(1);
}

// ============================================================================
// Meeting Metrics
// ============================================================================

/// Record the settled view of a meeting lookup
///
/// Metric: `mg_meeting_lookups_total`
/// Labels: `view`
pub fn record_meeting_lookup(view: &str) {
    counter!("mg_meeting_lookups_total", "view" => view.to_string()).increment(1);
}

// ============================================================================
// Error Metrics
// ============================================================================

/// Record an error returned to a client
///
/// Metric: `mg_errors_total`
/// Labels: `operation`, `error_category`, `status_code`
pub fn record_error(operation: &str, error_category: &str, status_code: u16) {
    counter!("mg_errors_total",
        "operation" => operation.to_string(),
        "error_category" => error_category.to_string(),
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_status_code() {
        assert_eq!(categorize_status_code(200), "success");
        assert_eq!(categorize_status_code(299), "success");
        assert_eq!(categorize_status_code(408), "timeout");
        assert_eq!(categorize_status_code(504), "timeout");
        assert_eq!(categorize_status_code(401), "error");
        assert_eq!(categorize_status_code(503), "error");
    }

    #[test]
    fn test_normalize_endpoint_known_paths() {
        assert_eq!(normalize_endpoint("/health"), "/health");
        assert_eq!(normalize_endpoint("/ready"), "/ready");
        assert_eq!(normalize_endpoint("/metrics"), "/metrics");
        assert_eq!(
            normalize_endpoint("/api/v1/stream/token"),
            "/api/v1/stream/token"
        );
    }

    #[test]
    fn test_normalize_endpoint_meeting_paths() {
        assert_eq!(
            normalize_endpoint("/api/v1/meetings/abc-123"),
            "/api/v1/meetings/{id}"
        );
        assert_eq!(normalize_endpoint("/api/v1/meetings/"), "/other");
        assert_eq!(normalize_endpoint("/api/v1/meetings/a/b"), "/other");
    }

    #[test]
    fn test_normalize_endpoint_unknown_paths() {
        assert_eq!(normalize_endpoint("/"), "/other");
        assert_eq!(normalize_endpoint("/admin"), "/other");
    }

    #[test]
    fn test_record_functions_without_recorder() {
        // No recorder installed: calls are no-ops and must not panic
        record_http_request("GET", "/health", 200, Duration::from_millis(1));
        record_token_issuance("success", Duration::from_millis(3));
        record_meeting_lookup("setup");
        record_error("issue_token", "authentication", 401);
    }
}
