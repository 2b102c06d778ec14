use crate::handlers::answer::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Handle GET /api/metrics (auth required)
///
/// Returns the pipeline counters as JSON.
pub async fn counters(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.counters.snapshot())
}

/// Handle GET /metrics (Prometheus text exposition, no auth)
pub async fn prometheus(State(handle): State<Arc<PrometheusHandle>>) -> impl IntoResponse {
    let metrics = handle.render();
    (StatusCode::OK, metrics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use arc_swap::ArcSwap;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn test_counters_handler() {
        let config = Arc::new(ArcSwap::from_pointee(Config::default()));
        let state = AppState::new(config).unwrap();
        state.counters.incr_total();
        state.counters.incr_blocked();

        let response = counters(State(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["total"], 1);
        assert_eq!(body["blocked"], 1);
        assert_eq!(body["errors"], 0);
    }

    #[tokio::test]
    async fn test_prometheus_handler() {
        // Create a handle for testing without initializing global recorder
        let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let state = Arc::new(handle);

        let response = prometheus(State(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
