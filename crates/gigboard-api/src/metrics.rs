//! Prometheus metrics for the API server.

use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("failed to install Prometheus recorder: {}", e))
}

/// Metric names as constants for consistency.
pub mod names {
    pub const HTTP_REQUESTS_TOTAL: &str = "gigboard_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "gigboard_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "gigboard_http_requests_in_flight";

    pub const SESSIONS_ISSUED_TOTAL: &str = "gigboard_sessions_issued_total";
    pub const AUTH_FAILURES_TOTAL: &str = "gigboard_auth_failures_total";
    pub const FORBIDDEN_TOTAL: &str = "gigboard_forbidden_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a session issued via POST /jwt.
pub fn record_session_issued() {
    counter!(names::SESSIONS_ISSUED_TOTAL).increment(1);
}

/// Record an authentication failure (missing or invalid token).
pub fn record_auth_failure(reason: &str) {
    let labels = [("reason", reason.to_string())];
    counter!(names::AUTH_FAILURES_TOTAL, &labels).increment(1);
}

/// Record an ownership refusal.
pub fn record_forbidden(action: &str) {
    let labels = [("action", action.to_string())];
    counter!(names::FORBIDDEN_TOTAL, &labels).increment(1);
}

/// Sanitize path for metrics labels (replace ids with placeholders).
fn sanitize_path(path: &str) -> String {
    let path = regex_lite::Regex::new(r"/job/[^/]+")
        .unwrap()
        .replace_all(path, "/job/:id");
    let path = regex_lite::Regex::new(r"/jobs/employer/[^/]+")
        .unwrap()
        .replace_all(&path, "/jobs/employer/:email");
    let path = regex_lite::Regex::new(r"/accepted-tasks/taker/[^/]+")
        .unwrap()
        .replace_all(&path, "/accepted-tasks/taker/:email");
    let path = regex_lite::Regex::new(r"/accepted-tasks/(?:[A-Za-z0-9_-]{16,})")
        .unwrap()
        .replace_all(&path, "/accepted-tasks/:id");
    path.to_string()
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path() {
        assert_eq!(
            sanitize_path("/job/550e8400-e29b-41d4-a716-446655440000"),
            "/job/:id"
        );
        assert_eq!(
            sanitize_path("/jobs/employer/boss@corp.com"),
            "/jobs/employer/:email"
        );
        assert_eq!(
            sanitize_path("/accepted-tasks/taker/taker@x.com"),
            "/accepted-tasks/taker/:email"
        );
        assert_eq!(
            sanitize_path("/accepted-tasks/Aq3fK9slv_x-R7nQm1TzUw8yBvCdEfGh"),
            "/accepted-tasks/:id"
        );
        assert_eq!(sanitize_path("/jobs"), "/jobs");
    }
}
