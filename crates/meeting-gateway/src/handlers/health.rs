//! Health check handlers.
//!
//! - `/health`: Liveness check - returns OK if the process is running
//! - `/ready`: Readiness check - checks that the auth provider's JWKS can be
//!   loaded, since no session can be verified without it

use crate::models::ReadinessResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use std::sync::Arc;

/// Liveness handler.
///
/// Does NOT check any dependencies.
pub async fn health_check() -> &'static str {
    "OK"
}

/// Readiness handler.
///
/// Returns 200 if the JWKS is cached or can be fetched, 503 otherwise. A
/// cached key set counts as ready until its TTL expires.
#[tracing::instrument(skip_all, name = "mg.health.readiness")]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.jwks_client.ensure_loaded().await {
        Ok(key_count) => (
            StatusCode::OK,
            Json(ReadinessResponse {
                status: "ready",
                auth_jwks: "reachable",
                key_count: Some(key_count),
                error: None,
            }),
        ),
        Err(e) => {
            tracing::warn!(target: "mg.health", error = %e, "Readiness check failed: auth JWKS unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadinessResponse {
                    status: "not_ready",
                    auth_jwks: "unreachable",
                    key_count: None,
                    error: Some("Service dependencies unavailable".to_string()),
                }),
            )
        }
    }
}
