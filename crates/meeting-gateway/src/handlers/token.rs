//! Video token handler.
//!
//! `POST /api/v1/stream/token` issues a video provider user token to the
//! signed-in user.

use crate::auth::SessionCredentials;
use crate::errors::GatewayError;
use crate::models::TokenResponse;
use crate::observability::{metrics, ErrorCategory};
use crate::routes::AppState;
use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::IntoResponse,
    Json,
};
use common::secret::ExposeSecret;
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// Handler for POST /api/v1/stream/token
///
/// # Response
///
/// - 200 OK: token issued (never cached by intermediaries)
/// - 401 Unauthorized: no valid session
/// - 503 Service Unavailable: auth provider unreachable
/// - 500 Internal Server Error: signing failed
#[instrument(
    skip_all,
    name = "mg.stream.token",
    fields(method = "POST", endpoint = "/api/v1/stream/token", status = tracing::field::Empty)
)]
pub async fn issue_stream_token(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, GatewayError> {
    let start = Instant::now();
    let credentials = SessionCredentials::from_headers(&headers);

    let token = match state.token_issuer.issue_token(&credentials).await {
        Ok(token) => token,
        Err(e) => {
            metrics::record_token_issuance("error", start.elapsed());
            metrics::record_error(
                "issue_token",
                ErrorCategory::from(&e).as_str(),
                e.status_code(),
            );
            tracing::Span::current().record("status", "error");
            return Err(e);
        }
    };

    metrics::record_token_issuance("success", start.elapsed());
    tracing::Span::current().record("status", "success");

    let response = TokenResponse {
        token: token.token.expose_secret().to_string(),
        api_key: state.config.stream_api_key.clone(),
        user_id: token.principal_id.as_str().to_string(),
        issued_at: token.issued_at,
        expires_at: token.expires_at,
    };

    Ok(([(header::CACHE_CONTROL, "no-store")], Json(response)))
}
