use anyhow::{Context, Result};
use arc_swap::ArcSwap;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::{net::SocketAddr, sync::Arc};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::{
    auth,
    config::Config,
    handlers::{self, answer::AppState},
    metrics, rate_limit,
    signals::setup_signal_handlers,
};

/// Maximum accepted request body size. Answer payloads are small JSON
/// documents; anything bigger is abuse.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Start the gateway server
///
/// This function:
/// 1. Initializes metrics
/// 2. Sets up signal handlers for graceful shutdown and config reload
/// 3. Builds shared pipeline state and the Axum application
/// 4. Binds to the configured address
/// 5. Serves requests with graceful shutdown support
pub async fn start_server(config: Config) -> Result<()> {
    info!("Initializing Prometheus metrics...");
    let metrics_handle = Arc::new(metrics::init_metrics());

    // Wrap config in ArcSwap for atomic reload support
    let config_swap = Arc::new(ArcSwap::from_pointee(config.clone()));

    // Setup signal handlers (SIGTERM, SIGINT for shutdown; SIGHUP for reload)
    let (shutdown_tx, signal_handle) = setup_signal_handlers(config_swap.clone());
    let mut shutdown_rx = shutdown_tx.subscribe();

    // Create shared state
    let app_state = AppState::new(config_swap.clone())?;

    // Expired rate-limit windows are swept in the background
    tokio::spawn({
        let limiter = app_state.limiter.clone();
        async move {
            limiter.prune_loop().await;
        }
    });

    // Build the Axum router
    let app = create_router(config_swap.clone(), app_state, metrics_handle)?;

    // Create socket address
    let addr = SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    ));

    info!("Starting guard gateway on {}", addr);
    info!(
        "Configuration: {} input rules, {} output rules, rate limit {}/{}s, upstream model {}",
        config.guardrails.input_patterns.len(),
        config.guardrails.output_patterns.len(),
        config.rate_limit.max_requests,
        config.rate_limit.window_seconds,
        config.upstream.model,
    );

    // Bind to address
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Serve with graceful shutdown; ConnectInfo feeds rate-limit identities
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        // Wait for shutdown signal
        let _ = shutdown_rx.recv().await;
        info!("Shutdown signal received, draining connections...");
    })
    .await?;

    // Wait for signal handler task to complete
    signal_handle.await?;
    info!("Server stopped gracefully");

    Ok(())
}

/// Create the Axum router with all routes and middleware
///
/// The answer route carries the rate-limit layer inside the auth layer, so
/// the auth gate always runs first.
pub fn create_router(
    config: Arc<ArcSwap<Config>>,
    app_state: AppState,
    metrics_handle: Arc<metrics_exporter_prometheus::PrometheusHandle>,
) -> Result<Router> {
    let cors = cors_layer(&config.load())?;

    // Create authenticated routes
    let auth_routes = Router::new()
        .route(
            "/api/answer",
            post(handlers::answer::handle_answer).layer(middleware::from_fn_with_state(
                app_state.clone(),
                rate_limit::rate_limit_middleware,
            )),
        )
        .route("/api/logs", get(handlers::logs::list_logs))
        .route("/api/metrics", get(handlers::metrics_handler::counters))
        .layer(middleware::from_fn_with_state(
            config.clone(),
            auth::auth_middleware,
        ))
        .with_state(app_state);

    // Combine with public routes
    Ok(Router::new()
        // Public endpoints (no auth required)
        .route("/api/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics_handler::prometheus))
        .with_state(metrics_handle)
        // Merge authenticated routes
        .merge(auth_routes)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http()))
}

/// CORS locked to the configured front-end origins
fn cors_layer(config: &Config) -> Result<CorsLayer> {
    let origins = config
        .cors
        .allowed_origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .with_context(|| format!("invalid CORS origin: {}", origin))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static("x-api-key")])
        .allow_credentials(true))
}
