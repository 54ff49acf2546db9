//! Meeting Gateway API models.

use crate::services::CallObject;
use crate::session_gate::View;
use serde::{Deserialize, Serialize};

/// Response of `POST /api/v1/stream/token`.
///
/// Carries the token itself, so Debug output is redacted.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Signed video provider user token.
    pub token: String,

    /// Public API key the client connects with.
    pub api_key: String,

    pub user_id: String,

    /// `iat` claim of the token (Unix epoch seconds).
    pub issued_at: i64,

    /// `exp` claim of the token, if it expires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("token", &"[REDACTED]")
            .field("api_key", &self.api_key)
            .field("user_id", &"[REDACTED]")
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Response of `GET /api/v1/meetings/:id`.
#[derive(Debug, Clone, Serialize)]
pub struct MeetingViewResponse {
    pub meeting_id: String,

    /// `"not_found"` or `"setup"`.
    pub view: View,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub call: Option<CallObject>,
}

/// Readiness check response.
///
/// Returned by the `/ready` endpoint (readiness check).
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    /// "ready" or "not_ready".
    pub status: &'static str,

    /// Auth provider JWKS: "reachable" or "unreachable".
    pub auth_jwks: &'static str,

    /// Number of signing keys the auth provider publishes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_count: Option<usize>,

    /// Generic error message, no configuration details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
