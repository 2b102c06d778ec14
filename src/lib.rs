pub mod audit;
pub mod auth;
pub mod config;
pub mod error;
pub mod guardrails;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod providers;
pub mod rate_limit;
pub mod server;
pub mod signals;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing/logging
///
/// Structured JSON events, one per line, filtered by RUST_LOG (default
/// "info"). Can only be called once per process.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().with_target(true))
        .init();
}
