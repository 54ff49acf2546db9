//! HTTP routes for the Meeting Gateway.
//!
//! Defines the Axum router and application state.

use crate::auth::{IdentityProvider, JwksClient};
use crate::config::Config;
use crate::handlers;
use crate::middleware::http_metrics_middleware;
use crate::services::{CallDirectory, TokenIssuer};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Issues video tokens; shares `identity` with the meeting routes.
    pub token_issuer: Arc<TokenIssuer>,

    /// Resolves the signed-in user for meeting views.
    pub identity: Arc<dyn IdentityProvider>,

    /// Looks up calls for meeting views.
    pub calls: Arc<dyn CallDirectory>,

    /// Auth provider key set; readiness checks it loads.
    pub jwks_client: Arc<JwksClient>,
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/health` - Liveness (simple "OK")
/// - `/ready` - Readiness (auth provider JWKS reachable)
/// - `/metrics` - Prometheus metrics endpoint
/// - `POST /api/v1/stream/token` - Video token for the signed-in user
/// - `GET /api/v1/meetings/:id` - Meeting view
/// - TraceLayer for request logging
/// - HTTP metrics middleware
/// - 30 second request timeout
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let api_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/api/v1/stream/token", post(handlers::issue_stream_token))
        .route("/api/v1/meetings/:id", get(handlers::get_meeting_view))
        .with_state(state);

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer (innermost)
    // 2. TraceLayer
    // 3. http_metrics_middleware (outermost)
    api_routes
        .merge(metrics_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(middleware::from_fn(http_metrics_middleware))
}
