//! Observability for the Meeting Gateway.
//!
//! # Privacy by Default
//!
//! Handlers and services use `#[instrument(skip_all)]` and add fields
//! explicitly. Fields fall in three groups:
//! - **SAFE**: plain enums and outcomes (view, status)
//! - **HASHED**: user identifiers, via [`hash_for_correlation`]
//! - **NEVER**: session tokens, issued tokens, the API secret

pub mod metrics;

use crate::errors::GatewayError;
use sha2::{Digest, Sha256};

/// Hash a field value for correlation in logs (SHA-256, first 8 hex chars).
///
/// Not suitable for secrets; this is a one-way hash for correlating log
/// entries about the same user.
pub fn hash_for_correlation(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    let prefix: Vec<u8> = digest.iter().take(4).copied().collect();
    hex::encode(prefix)
}

/// Error categories for metrics labels (bounded cardinality).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// No or invalid session
    Authentication,
    /// Malformed client input
    Validation,
    /// Token signing failures
    Cryptographic,
    /// Auth or video provider unreachable
    Upstream,
    Internal,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Authentication => "authentication",
            ErrorCategory::Validation => "validation",
            ErrorCategory::Cryptographic => "cryptographic",
            ErrorCategory::Upstream => "upstream",
            ErrorCategory::Internal => "internal",
        }
    }
}

impl From<&GatewayError> for ErrorCategory {
    fn from(err: &GatewayError) -> Self {
        match err {
            GatewayError::Unauthenticated => ErrorCategory::Authentication,
            GatewayError::BadRequest(_) => ErrorCategory::Validation,
            GatewayError::Signing(_) => ErrorCategory::Cryptographic,
            GatewayError::ServiceUnavailable(_) => ErrorCategory::Upstream,
            GatewayError::Internal => ErrorCategory::Internal,
        }
    }
}
