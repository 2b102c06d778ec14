//! Per-client request rate limiting.
//!
//! Fixed-window counters keyed by client network identity, shared across
//! all in-flight requests via `DashMap`. Applied as middleware on the
//! answer route, inside the auth layer, so the auth gate always runs first.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;
use tracing::warn;

use crate::{error::AppError, handlers::answer::AppState};

/// How often the background task sweeps expired windows.
const PRUNE_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Debug)]
struct Window {
    started: Instant,
    count: u32,
}

/// Fixed-window limiter: at most `limit` calls per `window` per identity.
#[derive(Debug)]
pub struct RateLimiter {
    windows: DashMap<String, Window>,
    limit: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            limit,
            window,
        }
    }

    /// Counts one call against `identity`; `false` means over budget.
    pub fn allow(&self, identity: &str) -> bool {
        let now = Instant::now();
        let mut entry = self
            .windows
            .entry(identity.to_string())
            .or_insert_with(|| Window { started: now, count: 0 });

        if now.duration_since(entry.started) >= self.window {
            entry.started = now;
            entry.count = 0;
        }

        if entry.count < self.limit {
            entry.count += 1;
            true
        } else {
            false
        }
    }

    /// Drop windows that have fully elapsed; idle identities cost nothing.
    pub fn prune(&self) {
        let window = self.window;
        self.windows.retain(|_, w| w.started.elapsed() < window);
    }

    pub async fn prune_loop(self: Arc<Self>) {
        let mut interval = tokio::time::interval(PRUNE_INTERVAL);
        loop {
            interval.tick().await;
            self.prune();
        }
    }
}

/// Caller identity resolved for a request, attached as a request extension
/// for downstream log/audit emission.
#[derive(Debug, Clone)]
pub struct ClientIdentity(pub String);

/// Resolve the client identity: first `x-forwarded-for` hop if present,
/// else the peer socket address, else "unknown".
pub fn client_identity(req: &Request) -> String {
    if let Some(forwarded) = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Rate-limiting middleware for the answer route.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let identity = client_identity(&req);

    if !state.limiter.allow(&identity) {
        warn!(client = %identity, "rate limit exceeded");
        return Err(AppError::TooManyRequests);
    }

    req.extensions_mut().insert(ClientIdentity(identity));
    Ok(next.run(req).await)
}
