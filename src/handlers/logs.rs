use crate::{audit::MAX_RETURNED_ENTRIES, handlers::answer::AppState};
use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

/// Handle GET /api/logs (auth required)
///
/// Returns the full entry count and the most recent entries, capped at
/// read time; the underlying log is never truncated.
pub async fn list_logs(State(state): State<AppState>) -> impl IntoResponse {
    let logs = state.audit.recent(MAX_RETURNED_ENTRIES);

    Json(json!({
        "count": state.audit.len(),
        "logs": logs,
    }))
}
