/// Metrics and telemetry for the Oxbow backend
///
/// Provides Prometheus-compatible metrics for monitoring:
/// - HTTP request counts and latencies
/// - LLM call outcomes and token usage
/// - Mirror generation outcomes and retries
/// - Push notifications and reminder runs

use crate::llm::TokenUsage;
use axum::{extract::Request, middleware::Next, response::Response};
use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};
use std::time::Instant;

lazy_static! {
    // ========== HTTP Metrics ==========

    /// Total HTTP requests by method, path, and status
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    /// HTTP request duration in seconds
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request latencies in seconds",
        &["method", "path"],
        vec![0.005, 0.05, 0.25, 1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0]
    )
    .unwrap();

    // ========== LLM Metrics ==========

    /// LLM calls by label and finish reason
    pub static ref LLM_CALLS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "llm_calls_total",
        "Total number of LLM completion calls",
        &["label", "finish_reason"]
    )
    .unwrap();

    /// LLM call duration in seconds
    pub static ref LLM_CALL_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "llm_call_duration_seconds",
        "LLM completion latencies in seconds",
        &["label"],
        vec![1.0, 5.0, 10.0, 20.0, 30.0, 60.0, 120.0, 240.0]
    )
    .unwrap();

    /// Tokens consumed by label and kind
    pub static ref LLM_TOKENS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "llm_tokens_total",
        "Total tokens reported by the LLM provider",
        &["label", "kind"]
    )
    .unwrap();

    // ========== Mirror Metrics ==========

    /// Mirror generations by type and outcome
    pub static ref MIRROR_GENERATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "mirror_generations_total",
        "Total number of Mirror generation requests",
        &["mirror_type", "outcome"]
    )
    .unwrap();

    /// End-to-end Mirror generation duration
    pub static ref MIRROR_GENERATION_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "mirror_generation_duration_seconds",
        "Mirror generation latencies in seconds",
        &["mirror_type"],
        vec![5.0, 15.0, 30.0, 60.0, 120.0, 240.0, 480.0]
    )
    .unwrap();

    /// Retries taken after a failed assembly attempt
    pub static ref GENERATION_RETRIES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "generation_retries_total",
        "Total number of generation retries",
        &["operation"]
    )
    .unwrap();

    // ========== Notification Metrics ==========

    /// Push notifications by outcome
    pub static ref PUSH_NOTIFICATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "push_notifications_total",
        "Total number of push notifications sent",
        &["kind", "status"]
    )
    .unwrap();

    /// Wednesday reminder runs by outcome
    pub static ref REMINDER_RUNS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "reminder_runs_total",
        "Total number of journal reminder runs",
        &["outcome"]
    )
    .unwrap();

    // ========== Error Metrics ==========

    /// Errors by error type
    pub static ref ERRORS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "errors_total",
        "Total number of errors",
        &["error_type", "module"]
    )
    .unwrap();
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "failed to encode metrics");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration);
}

/// Record one LLM call
pub fn record_llm_call(label: &str, finish_reason: &str, duration: f64) {
    LLM_CALLS_TOTAL
        .with_label_values(&[label, finish_reason])
        .inc();
    LLM_CALL_DURATION_SECONDS
        .with_label_values(&[label])
        .observe(duration);
}

/// Record provider-reported token usage
pub fn record_token_usage(label: &str, usage: &TokenUsage) {
    LLM_TOKENS_TOTAL
        .with_label_values(&[label, "prompt"])
        .inc_by(u64::from(usage.prompt_tokens));
    LLM_TOKENS_TOTAL
        .with_label_values(&[label, "completion"])
        .inc_by(u64::from(usage.completion_tokens));
}

/// Record a finished Mirror generation
pub fn record_mirror_generation(mirror_type: &str, outcome: &str, duration: f64) {
    MIRROR_GENERATIONS_TOTAL
        .with_label_values(&[mirror_type, outcome])
        .inc();
    MIRROR_GENERATION_DURATION_SECONDS
        .with_label_values(&[mirror_type])
        .observe(duration);
}

/// Record a retry after a failed attempt
pub fn record_retry(operation: &str) {
    GENERATION_RETRIES_TOTAL.with_label_values(&[operation]).inc();
}

/// Record a push notification
pub fn record_push_notification(kind: &str, success: bool) {
    PUSH_NOTIFICATIONS_TOTAL
        .with_label_values(&[kind, if success { "success" } else { "failure" }])
        .inc();
}

/// Record a reminder run (`sent`, `skipped` or `failed`)
pub fn record_reminder_run(outcome: &str) {
    REMINDER_RUNS_TOTAL.with_label_values(&[outcome]).inc();
}

/// Record an error
pub fn record_error(error_type: &str, module: &str) {
    ERRORS_TOTAL
        .with_label_values(&[error_type, module])
        .inc();
}

/// Middleware recording request counts and latencies
pub async fn track_http_metrics(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    record_http_request(
        &method,
        &path,
        response.status().as_u16(),
        started.elapsed().as_secs_f64(),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_http_request() {
        record_http_request("POST", "/generate-mirror", 200, 0.05);
        let metrics = render_metrics();
        assert!(metrics.contains("http_requests_total"));
        assert!(metrics.contains("http_request_duration_seconds"));
    }

    #[test]
    fn test_record_llm_call_and_tokens() {
        record_llm_call("core", "stop", 12.5);
        record_token_usage(
            "core",
            &TokenUsage {
                prompt_tokens: 1000,
                completion_tokens: 500,
                total_tokens: 1500,
            },
        );
        let metrics = render_metrics();
        assert!(metrics.contains("llm_calls_total"));
        assert!(metrics.contains("llm_tokens_total"));
    }

    #[test]
    fn test_record_mirror_generation() {
        record_mirror_generation("standard", "completed", 42.0);
        record_retry("standard_mirror");
        let metrics = render_metrics();
        assert!(metrics.contains("mirror_generations_total"));
        assert!(metrics.contains("generation_retries_total"));
    }

    #[test]
    fn test_record_push_and_error() {
        record_push_notification("reminder", true);
        record_reminder_run("sent");
        record_error("timeout", "mirror");
        let metrics = render_metrics();
        assert!(metrics.contains("push_notifications_total"));
        assert!(metrics.contains("reminder_runs_total"));
        assert!(metrics.contains("errors_total"));
    }
}
