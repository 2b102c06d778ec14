use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics exporter
pub fn init_metrics() -> PrometheusHandle {
    let builder = PrometheusBuilder::new();

    let handle = builder
        .install_recorder()
        .expect("Failed to install Prometheus recorder");

    init_metric_descriptions();

    handle
}

/// Initialize metric descriptions (can be called multiple times safely)
fn init_metric_descriptions() {
    describe_counter!(
        "gateway_requests_total",
        "Total number of answer requests reaching the pipeline"
    );
    describe_counter!(
        "gateway_blocked_total",
        "Total number of guardrail rejections"
    );
    describe_counter!(
        "gateway_errors_total",
        "Total number of request errors"
    );
    describe_histogram!(
        "gateway_upstream_duration_seconds",
        "Upstream model call duration in seconds"
    );
}

/// Record a request entering the answer pipeline
pub fn record_request(endpoint: &str) {
    counter!(
        "gateway_requests_total",
        "endpoint" => endpoint.to_string(),
    )
    .increment(1);
}

/// Record a guardrail rejection; `stage` is "input" or "output"
pub fn record_blocked(stage: &str) {
    counter!(
        "gateway_blocked_total",
        "stage" => stage.to_string(),
    )
    .increment(1);
}

/// Record a request error; `kind` is e.g. "bad_body" or "upstream"
pub fn record_error(kind: &str) {
    counter!(
        "gateway_errors_total",
        "kind" => kind.to_string(),
    )
    .increment(1);
}

/// Record the duration of one upstream model call
pub fn record_upstream_duration(duration: Duration) {
    histogram!("gateway_upstream_duration_seconds").record(duration.as_secs_f64());
}
