//! Router setup with the relay routes and middleware.
//!
//! Configures the axum Router with CORS, tracing, a request body limit,
//! and the endpoint handlers.

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use jarvis_core::config::RelayConfig;
use jarvis_core::error::JarvisError;

use crate::handlers;
use crate::state::AppState;

/// Build the CORS layer from the configured origin list.
///
/// Origins that are not valid header values are skipped with a warning.
fn cors_layer(config: &RelayConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}

/// Create the axum Router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    let body_limit = state.config.body_limit_bytes;

    Router::new()
        .route("/", get(handlers::health))
        .route("/api/test", get(handlers::health))
        .route(
            "/api/chat",
            post(handlers::chat).layer(DefaultBodyLimit::max(body_limit)),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server on the configured address.
///
/// Binds to `relay.host:relay.port` and serves until the process exits.
pub async fn start_server(config: &RelayConfig, state: AppState) -> Result<(), JarvisError> {
    let addr = format!("{}:{}", config.host, config.port);

    if !state.tts.is_configured() && config.variant == jarvis_core::types::RelayVariant::Audio {
        tracing::warn!("TTS credentials missing; /api/chat will answer 500 until they are set");
    }

    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| JarvisError::Network(format!("Failed to bind {}: {}", addr, e)))?;

    tracing::info!(variant = %config.variant, "Relay server running at http://{}", addr);

    axum::serve(listener, router)
        .await
        .map_err(|e| JarvisError::Network(format!("Server error: {}", e)))?;

    Ok(())
}
