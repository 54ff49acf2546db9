//! Session token verification against the auth provider's JWKS.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - The algorithm is pinned by the JWK's key type; the token header cannot
//!   select a weaker one
//! - `exp` and `nbf` are enforced; `iat` is checked with clock skew tolerance
//! - Every rejection looks the same to the caller: no principal

use crate::auth::claims::SessionClaims;
use crate::auth::jwks::{Jwk, JwksClient};
use crate::auth::{IdentityProvider, Principal, SessionCredentials};
use crate::errors::GatewayError;
use async_trait::async_trait;
use common::jwt::{decode_ed25519_public_key_jwk, extract_kid, validate_iat};
use common::secret::ExposeSecret;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Identity provider that trusts session tokens signed by the auth provider.
pub struct JwksIdentityProvider {
    jwks_client: Arc<JwksClient>,
    clock_skew: Duration,
    issuer: Option<String>,
}

impl JwksIdentityProvider {
    /// Create a new provider.
    ///
    /// # Arguments
    ///
    /// * `jwks_client` - Client for fetching the provider's public keys
    /// * `clock_skew_seconds` - Clock skew tolerance for iat validation
    /// * `issuer` - Required `iss` claim, if any
    pub fn new(jwks_client: Arc<JwksClient>, clock_skew_seconds: i64, issuer: Option<String>) -> Self {
        Self {
            jwks_client,
            clock_skew: Duration::from_secs(clock_skew_seconds.unsigned_abs()),
            issuer,
        }
    }

    /// Verify a session token and return its claims.
    ///
    /// Returns `Ok(None)` for any token that fails verification.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::ServiceUnavailable` if the JWKS cannot be fetched.
    #[instrument(skip_all)]
    pub async fn verify(&self, token: &str) -> Result<Option<SessionClaims>, GatewayError> {
        // 1. Extract kid from JWT header (includes size check via common::jwt)
        let kid = match extract_kid(token) {
            Ok(kid) => kid,
            Err(e) => {
                tracing::debug!(target: "mg.auth.session", error = ?e, "Session token kid extraction failed");
                return Ok(None);
            }
        };

        // 2. Fetch public key from JWKS
        let Some(jwk) = self.jwks_client.get_key(&kid).await? else {
            return Ok(None);
        };

        // 3. Verify signature, exp, nbf and issuer
        let Some(claims) = verify_token(token, &jwk, self.issuer.as_deref()) else {
            return Ok(None);
        };

        // 4. Validate iat with clock skew tolerance
        if let Err(e) = validate_iat(claims.iat, self.clock_skew) {
            tracing::debug!(target: "mg.auth.session", error = ?e, "Session token iat validation failed");
            return Ok(None);
        }

        tracing::debug!(target: "mg.auth.session", "Session token validated");
        Ok(Some(claims))
    }
}

#[async_trait]
impl IdentityProvider for JwksIdentityProvider {
    async fn current_principal(
        &self,
        credentials: &SessionCredentials,
    ) -> Result<Option<Principal>, GatewayError> {
        let Some(token) = credentials.token.as_ref() else {
            tracing::debug!(target: "mg.auth.session", "No session token presented");
            return Ok(None);
        };

        let claims = self.verify(token.expose_secret()).await?;

        Ok(claims
            .filter(|claims| !claims.sub.is_empty())
            .map(|claims| Principal::new(claims.sub)))
    }
}

/// Build the decoding key and pinned algorithm for a JWK.
fn decoding_key_for(jwk: &Jwk) -> Option<(DecodingKey, Algorithm)> {
    match jwk.kty.as_str() {
        "OKP" => {
            if jwk.crv.as_deref().is_some_and(|crv| crv != "Ed25519")
                || jwk.alg.as_deref().is_some_and(|alg| alg != "EdDSA")
            {
                tracing::warn!(target: "mg.auth.session", kid = %jwk.kid, "Unexpected OKP key parameters");
                return None;
            }
            let x = jwk.x.as_ref()?;
            let public_key_bytes = decode_ed25519_public_key_jwk(x)
                .map_err(|e| {
                    tracing::error!(target: "mg.auth.session", error = %e, "Invalid public key encoding");
                })
                .ok()?;
            Some((DecodingKey::from_ed_der(&public_key_bytes), Algorithm::EdDSA))
        }
        "RSA" => {
            if jwk.alg.as_deref().is_some_and(|alg| alg != "RS256") {
                tracing::warn!(target: "mg.auth.session", kid = %jwk.kid, "Unexpected RSA key algorithm");
                return None;
            }
            let (n, e) = (jwk.n.as_ref()?, jwk.e.as_ref()?);
            let key = DecodingKey::from_rsa_components(n, e)
                .map_err(|err| {
                    tracing::error!(target: "mg.auth.session", error = %err, "Invalid RSA key components");
                })
                .ok()?;
            Some((key, Algorithm::RS256))
        }
        other => {
            tracing::warn!(target: "mg.auth.session", kty = %other, "Unsupported JWK key type");
            None
        }
    }
}

fn verify_token(token: &str, jwk: &Jwk, issuer: Option<&str>) -> Option<SessionClaims> {
    let (decoding_key, algorithm) = decoding_key_for(jwk)?;

    let mut validation = Validation::new(algorithm);
    validation.validate_exp = true;
    validation.validate_nbf = true;
    if let Some(issuer) = issuer {
        validation.set_issuer(&[issuer]);
        validation.set_required_spec_claims(&["exp", "iss"]);
    }

    decode::<SessionClaims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!(target: "mg.auth.session", error = %e, "Session token verification failed");
        })
        .ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::jwt::MAX_JWT_SIZE_BYTES;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use mg_test_utils::keys::{TestKeypair, TestRsaKeypair, TestSessionClaims};
    use mg_test_utils::mount_jwks;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ISSUER: &str = "https://clerk.example.com";

    async fn provider_with_keys(keys: Vec<serde_json::Value>) -> (MockServer, JwksIdentityProvider) {
        let server = MockServer::start().await;
        mount_jwks(&server, keys).await;
        let client = Arc::new(JwksClient::new(format!(
            "{}/.well-known/jwks.json",
            server.uri()
        )));
        (server, JwksIdentityProvider::new(client, 300, None))
    }

    async fn principal_for(provider: &JwksIdentityProvider, token: String) -> Option<Principal> {
        provider
            .current_principal(&SessionCredentials::from_token(token))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_valid_ed25519_session_resolves_principal() {
        let keypair = TestKeypair::new(1, "ed-key-01");
        let (_server, provider) = provider_with_keys(vec![keypair.jwk_json()]).await;

        let token = keypair.sign_token(&TestSessionClaims::valid("user_42"));
        let principal = principal_for(&provider, token).await.unwrap();
        assert_eq!(principal.id.as_str(), "user_42");
    }

    #[tokio::test]
    async fn test_valid_rsa_session_resolves_principal() {
        let keypair = TestRsaKeypair::new("ins_rsa_01");
        let (_server, provider) = provider_with_keys(vec![keypair.jwk_json()]).await;

        let token = keypair.sign_token(&TestSessionClaims::valid("user_rsa"));
        let principal = principal_for(&provider, token).await.unwrap();
        assert_eq!(principal.id.as_str(), "user_rsa");
    }

    #[tokio::test]
    async fn test_missing_token_is_anonymous_without_jwks_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let provider =
            JwksIdentityProvider::new(Arc::new(JwksClient::new(server.uri())), 300, None);

        let principal = provider
            .current_principal(&SessionCredentials::anonymous())
            .await
            .unwrap();
        assert!(principal.is_none());
    }

    #[tokio::test]
    async fn test_expired_session_is_anonymous() {
        let keypair = TestKeypair::new(2, "ed-key-02");
        let (_server, provider) = provider_with_keys(vec![keypair.jwk_json()]).await;

        let now = Utc::now().timestamp();
        let claims = TestSessionClaims {
            exp: now - 3600,
            iat: now - 7200,
            ..TestSessionClaims::valid("user_42")
        };
        assert!(principal_for(&provider, keypair.sign_token(&claims)).await.is_none());
    }

    #[tokio::test]
    async fn test_not_yet_valid_session_is_anonymous() {
        let keypair = TestKeypair::new(3, "ed-key-03");
        let (_server, provider) = provider_with_keys(vec![keypair.jwk_json()]).await;

        let now = Utc::now().timestamp();
        let claims = TestSessionClaims {
            nbf: Some(now + 3600),
            exp: now + 7200,
            ..TestSessionClaims::valid("user_42")
        };
        assert!(principal_for(&provider, keypair.sign_token(&claims)).await.is_none());
    }

    #[tokio::test]
    async fn test_iat_too_far_in_future_is_anonymous() {
        let keypair = TestKeypair::new(4, "ed-key-04");
        let (_server, provider) = provider_with_keys(vec![keypair.jwk_json()]).await;

        let now = Utc::now().timestamp();
        let claims = TestSessionClaims {
            iat: now + 3600,
            exp: now + 7200,
            ..TestSessionClaims::valid("user_42")
        };
        assert!(principal_for(&provider, keypair.sign_token(&claims)).await.is_none());
    }

    #[tokio::test]
    async fn test_wrong_signing_key_is_anonymous() {
        let published = TestKeypair::new(5, "ed-key-05");
        let attacker = TestKeypair::new(6, "ed-key-05");
        let (_server, provider) = provider_with_keys(vec![published.jwk_json()]).await;

        let token = attacker.sign_token(&TestSessionClaims::valid("user_42"));
        assert!(principal_for(&provider, token).await.is_none());
    }

    #[tokio::test]
    async fn test_unknown_kid_is_anonymous() {
        let published = TestKeypair::new(7, "ed-key-07");
        let other = TestKeypair::new(7, "ed-key-unknown");
        let (_server, provider) = provider_with_keys(vec![published.jwk_json()]).await;

        let token = other.sign_token(&TestSessionClaims::valid("user_42"));
        assert!(principal_for(&provider, token).await.is_none());
    }

    #[tokio::test]
    async fn test_hs256_token_against_okp_key_is_anonymous() {
        let keypair = TestKeypair::new(8, "ed-key-08");
        let (_server, provider) = provider_with_keys(vec![keypair.jwk_json()]).await;

        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some("ed-key-08".to_string());
        let token = encode(
            &header,
            &TestSessionClaims::valid("user_42"),
            &EncodingKey::from_secret(b"guessable"),
        )
        .unwrap();

        assert!(principal_for(&provider, token).await.is_none());
    }

    #[tokio::test]
    async fn test_issuer_is_enforced_when_configured() {
        let keypair = TestKeypair::new(9, "ed-key-09");
        let server = MockServer::start().await;
        mount_jwks(&server, vec![keypair.jwk_json()]).await;
        let client = Arc::new(JwksClient::new(format!(
            "{}/.well-known/jwks.json",
            server.uri()
        )));
        let provider = JwksIdentityProvider::new(client, 300, Some(ISSUER.to_string()));

        let good = TestSessionClaims {
            iss: Some(ISSUER.to_string()),
            ..TestSessionClaims::valid("user_42")
        };
        assert!(principal_for(&provider, keypair.sign_token(&good)).await.is_some());

        let wrong = TestSessionClaims {
            iss: Some("https://evil.example.com".to_string()),
            ..TestSessionClaims::valid("user_42")
        };
        assert!(principal_for(&provider, keypair.sign_token(&wrong)).await.is_none());

        let missing = TestSessionClaims::valid("user_42");
        assert!(principal_for(&provider, keypair.sign_token(&missing)).await.is_none());
    }

    #[tokio::test]
    async fn test_empty_subject_is_anonymous() {
        let keypair = TestKeypair::new(10, "ed-key-10");
        let (_server, provider) = provider_with_keys(vec![keypair.jwk_json()]).await;

        let token = keypair.sign_token(&TestSessionClaims::valid(""));
        assert!(principal_for(&provider, token).await.is_none());
    }

    #[tokio::test]
    async fn test_oversized_and_malformed_tokens_are_anonymous() {
        let keypair = TestKeypair::new(11, "ed-key-11");
        let (_server, provider) = provider_with_keys(vec![keypair.jwk_json()]).await;

        let oversized = "a".repeat(MAX_JWT_SIZE_BYTES + 1);
        assert!(principal_for(&provider, oversized).await.is_none());
        assert!(principal_for(&provider, "not-a-jwt".to_string()).await.is_none());
    }

    #[tokio::test]
    async fn test_jwks_unavailable_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        let provider =
            JwksIdentityProvider::new(Arc::new(JwksClient::new(server.uri())), 300, None);

        let keypair = TestKeypair::new(12, "ed-key-12");
        let token = keypair.sign_token(&TestSessionClaims::valid("user_42"));
        let result = provider
            .current_principal(&SessionCredentials::from_token(token))
            .await;

        assert!(matches!(result, Err(GatewayError::ServiceUnavailable(_))));
    }

    #[test]
    fn test_decoding_key_rejects_unsupported_key_types() {
        let jwk = Jwk {
            kty: "EC".to_string(),
            kid: "ec-key".to_string(),
            alg: Some("ES256".to_string()),
            crv: Some("P-256".to_string()),
            x: Some("abc".to_string()),
            n: None,
            e: None,
            key_use: Some("sig".to_string()),
        };
        assert!(decoding_key_for(&jwk).is_none());
    }

    #[test]
    fn test_decoding_key_rejects_mismatched_okp_alg() {
        let jwk = Jwk {
            kty: "OKP".to_string(),
            kid: "ed-key".to_string(),
            alg: Some("RS256".to_string()),
            crv: Some("Ed25519".to_string()),
            x: Some("11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo".to_string()),
            n: None,
            e: None,
            key_use: None,
        };
        assert!(decoding_key_for(&jwk).is_none());
    }
}
