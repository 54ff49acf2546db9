//! JWT utilities shared across Meeting Gateway crates.
//!
//! This module covers both directions of the token flow:
//!
//! - **Verification** of session tokens issued by the authentication
//!   provider: size limits, `kid` extraction, `iat` validation with clock
//!   skew tolerance, JWK key decoding.
//! - **Issuance** of tokens for the video provider: backdating of the `iat`
//!   claim so that a verifier whose clock runs behind ours does not reject
//!   the token as "used before issued".
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Generic error messages prevent information leakage
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::{backdated_iat, extract_kid, validate_iat, DEFAULT_CLOCK_SKEW, DEFAULT_IAT_BACKDATE};
//!
//! // Verifying an inbound session token
//! let kid = extract_kid(token)?;
//! validate_iat(claims.iat, DEFAULT_CLOCK_SKEW)?;
//!
//! // Issuing an outbound token
//! let iat = backdated_iat(chrono::Utc::now().timestamp(), DEFAULT_IAT_BACKDATE);
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// Session tokens larger than this are rejected before any base64 decode or
/// signature verification. Typical provider session tokens are well under
/// 2KB even with custom claims.
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

/// Default clock skew tolerance for inbound `iat` validation (5 minutes).
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(300);

/// Maximum configurable clock skew tolerance for inbound tokens (10 minutes).
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

/// Default backdating applied to the `iat` claim of issued tokens.
///
/// Absorbs up to this much positive skew between our clock and the
/// verifier's clock.
pub const DEFAULT_IAT_BACKDATE: Duration = Duration::from_secs(10);

/// Maximum configurable `iat` backdating (5 minutes).
///
/// Every second of backdating is a second of token lifetime spent before
/// the token is even handed out.
pub const MAX_IAT_BACKDATE: Duration = Duration::from_secs(300);

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during JWT validation.
///
/// Note: Error messages are intentionally generic to prevent information leakage.
/// Detailed information is logged at debug level for troubleshooting.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("The session token is invalid or expired")]
    TokenTooLarge,

    /// Token format is invalid (not a valid JWT structure).
    #[error("The session token is invalid or expired")]
    MalformedToken,

    /// Token is missing required `kid` header.
    #[error("The session token is invalid or expired")]
    MissingKid,

    /// Token `iat` claim is too far in the future.
    #[error("The session token is invalid or expired")]
    IatTooFarInFuture,
}

// =============================================================================
// Functions
// =============================================================================

/// Compute the `iat` claim for a token issued at `now`.
///
/// Returns `now - backdate`, saturating at the Unix epoch. A `backdate` of
/// zero yields `now` unchanged.
///
/// # Example
///
/// ```rust
/// use common::jwt::backdated_iat;
/// use std::time::Duration;
///
/// assert_eq!(backdated_iat(1_700_000_000, Duration::from_secs(10)), 1_699_999_990);
/// ```
#[must_use]
pub fn backdated_iat(now: i64, backdate: Duration) -> i64 {
    // An oversized Duration must not wrap into the future.
    let backdate_secs = i64::try_from(backdate.as_secs()).unwrap_or(i64::MAX);
    now.saturating_sub(backdate_secs).max(0)
}

/// Extract the `kid` (key ID) from a JWT header without verifying the signature.
///
/// The `kid` selects the provider key to verify against. The token MUST still
/// be verified after the key is fetched.
///
/// # Errors
///
/// - `TokenTooLarge` - Token exceeds `MAX_JWT_SIZE_BYTES`
/// - `MalformedToken` - Wrong structure, bad base64, or invalid JSON header
/// - `MissingKid` - Header has no `kid`, or `kid` is not a non-empty string
pub fn extract_kid(token: &str) -> Result<String, JwtValidationError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    let mut parts = token.split('.');
    let (Some(header_part), Some(_), Some(_), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        tracing::debug!(target: "common.jwt", "Token rejected: invalid JWT format");
        return Err(JwtValidationError::MalformedToken);
    };

    let header_bytes = URL_SAFE_NO_PAD.decode(header_part).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT header base64");
        JwtValidationError::MalformedToken
    })?;

    let header: serde_json::Value = serde_json::from_slice(&header_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT header JSON");
        JwtValidationError::MalformedToken
    })?;

    header
        .get("kid")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .ok_or(JwtValidationError::MissingKid)
}

/// Validate the `iat` (issued-at) claim of an inbound token.
///
/// # Errors
///
/// Returns `JwtValidationError::IatTooFarInFuture` if `iat` is more than
/// `clock_skew` ahead of the current time.
pub fn validate_iat(iat: i64, clock_skew: Duration) -> Result<(), JwtValidationError> {
    let now = chrono::Utc::now().timestamp();
    validate_iat_at(iat, clock_skew, now)
}

/// Deterministic `iat` validation against an explicit `now` timestamp.
///
/// # Errors
///
/// Returns `JwtValidationError::IatTooFarInFuture` if `iat > now + clock_skew`.
pub fn validate_iat_at(iat: i64, clock_skew: Duration, now: i64) -> Result<(), JwtValidationError> {
    let clock_skew_secs = i64::try_from(clock_skew.as_secs()).unwrap_or(i64::MAX);
    let max_iat = now.saturating_add(clock_skew_secs);

    if iat > max_iat {
        tracing::debug!(
            target: "common.jwt",
            iat = iat,
            now = now,
            max_allowed = max_iat,
            clock_skew_secs = clock_skew_secs,
            "Token rejected: iat too far in the future"
        );
        return Err(JwtValidationError::IatTooFarInFuture);
    }

    Ok(())
}

/// Decode an Ed25519 public key from a JWK `x` field (base64url, no padding).
///
/// # Errors
///
/// Returns `base64::DecodeError` if the content cannot be decoded.
pub fn decode_ed25519_public_key_jwk(x_b64url: &str) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_NO_PAD.decode(x_b64url)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::cast_possible_wrap)]
mod tests {
    use super::*;

    fn token_with_header(header: &str) -> String {
        format!("{}.payload.signature", URL_SAFE_NO_PAD.encode(header))
    }

    // -------------------------------------------------------------------------
    // backdated_iat Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_default_backdate_is_10_seconds() {
        assert_eq!(DEFAULT_IAT_BACKDATE, Duration::from_secs(10));
    }

    #[test]
    fn test_backdated_iat_reference_scenario() {
        assert_eq!(
            backdated_iat(1_700_000_000, DEFAULT_IAT_BACKDATE),
            1_699_999_990
        );
    }

    #[test]
    fn test_backdated_iat_zero_offset_is_now() {
        assert_eq!(backdated_iat(1_700_000_000, Duration::ZERO), 1_700_000_000);
    }

    #[test]
    fn test_backdated_iat_strictly_decreases_with_offset() {
        let now = 1_700_000_000;
        let mut previous = backdated_iat(now, Duration::ZERO);
        for secs in 1..=MAX_IAT_BACKDATE.as_secs() {
            let iat = backdated_iat(now, Duration::from_secs(secs));
            assert!(iat < previous, "offset {secs}s did not decrease iat");
            previous = iat;
        }
    }

    #[test]
    fn test_backdated_iat_saturates_at_epoch() {
        assert_eq!(backdated_iat(5, Duration::from_secs(10)), 0);
        assert_eq!(backdated_iat(i64::MAX, Duration::MAX), 0);
    }

    // -------------------------------------------------------------------------
    // extract_kid Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_extract_kid_valid_token() {
        let token = token_with_header(r#"{"alg":"RS256","typ":"JWT","kid":"ins_2abc"}"#);
        assert_eq!(extract_kid(&token).unwrap(), "ins_2abc");
    }

    #[test]
    fn test_extract_kid_missing_kid() {
        let token = token_with_header(r#"{"alg":"RS256","typ":"JWT"}"#);
        assert_eq!(extract_kid(&token), Err(JwtValidationError::MissingKid));
    }

    #[test]
    fn test_extract_kid_empty_or_non_string_kid() {
        let empty = token_with_header(r#"{"alg":"RS256","kid":""}"#);
        let numeric = token_with_header(r#"{"alg":"RS256","kid":42}"#);
        assert_eq!(extract_kid(&empty), Err(JwtValidationError::MissingKid));
        assert_eq!(extract_kid(&numeric), Err(JwtValidationError::MissingKid));
    }

    #[test]
    fn test_extract_kid_wrong_segment_count() {
        assert_eq!(extract_kid(""), Err(JwtValidationError::MalformedToken));
        assert_eq!(extract_kid("a.b"), Err(JwtValidationError::MalformedToken));
        assert_eq!(extract_kid("a.b.c.d"), Err(JwtValidationError::MalformedToken));
    }

    #[test]
    fn test_extract_kid_undecodable_header() {
        assert_eq!(
            extract_kid("!!!.payload.signature"),
            Err(JwtValidationError::MalformedToken)
        );
        assert_eq!(
            extract_kid(&token_with_header("not-json")),
            Err(JwtValidationError::MalformedToken)
        );
    }

    #[test]
    fn test_extract_kid_oversized_token() {
        let oversized = "a".repeat(MAX_JWT_SIZE_BYTES + 1);
        assert_eq!(
            extract_kid(&oversized),
            Err(JwtValidationError::TokenTooLarge)
        );
    }

    // -------------------------------------------------------------------------
    // validate_iat Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_validate_iat_current_and_past() {
        let now = chrono::Utc::now().timestamp();
        assert!(validate_iat(now, DEFAULT_CLOCK_SKEW).is_ok());
        assert!(validate_iat(now - 3600, DEFAULT_CLOCK_SKEW).is_ok());
    }

    #[test]
    fn test_validate_iat_at_boundary() {
        let now = 1_700_000_000_i64;
        assert!(validate_iat_at(now + 300, DEFAULT_CLOCK_SKEW, now).is_ok());
        assert_eq!(
            validate_iat_at(now + 301, DEFAULT_CLOCK_SKEW, now),
            Err(JwtValidationError::IatTooFarInFuture)
        );
    }

    #[test]
    fn test_backdated_token_survives_lagging_verifier() {
        // Issuer is 8s ahead of the verifier and the verifier allows no skew.
        let issuer_now = 1_700_000_008_i64;
        let verifier_now = 1_700_000_000_i64;

        let plain = backdated_iat(issuer_now, Duration::ZERO);
        assert!(validate_iat_at(plain, Duration::ZERO, verifier_now).is_err());

        let backdated = backdated_iat(issuer_now, DEFAULT_IAT_BACKDATE);
        assert!(validate_iat_at(backdated, Duration::ZERO, verifier_now).is_ok());
    }

    // -------------------------------------------------------------------------
    // Key Decoding Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_decode_ed25519_public_key_jwk() {
        let x = "11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo";
        assert_eq!(decode_ed25519_public_key_jwk(x).unwrap().len(), 32);
    }

    #[test]
    fn test_decode_ed25519_public_key_jwk_invalid() {
        assert!(decode_ed25519_public_key_jwk("not-valid-base64url!!!").is_err());
    }
}
