use crate::{config::Config, error::AppError};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Header carrying the caller's shared secret.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Authentication middleware
///
/// Validates the `x-api-key` header against the configured shared secret.
/// Runs before every other gate on protected routes; a failure produces no
/// counter increment and no audit entry.
pub async fn auth_middleware(
    State(config): State<Arc<arc_swap::ArcSwap<Config>>>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let presented = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    let config = config.load();

    match presented {
        Some(key) if constant_time_eq(key.as_bytes(), config.auth.api_key.as_bytes()) => {
            Ok(next.run(req).await)
        }
        _ => Err(AppError::Unauthorized("invalid api key".to_string())),
    }
}

/// Equality check that does not short-circuit on the first differing byte.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
