//! Token issuance for the video provider.
//!
//! Every request resolves the principal afresh and signs a new token; nothing
//! is cached. The `iat` claim is backdated so a verifier whose clock runs
//! behind ours still accepts the token.

use crate::auth::{IdentityProvider, SessionCredentials};
use crate::clock::Clock;
use crate::errors::GatewayError;
use crate::observability::hash_for_correlation;
use crate::signing::TokenSigner;
use common::jwt::backdated_iat;
use common::secret::{ExposeSecret, SecretString};
use common::types::PrincipalId;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// A freshly signed token for one principal.
#[derive(Debug, Clone)]
pub struct AccessToken {
    /// Signed token, exactly as the signer produced it.
    pub token: SecretString,
    pub principal_id: PrincipalId,
    /// `iat` the token was signed with.
    pub issued_at: i64,
    pub expires_at: Option<i64>,
}

/// Issues video provider tokens to authenticated principals.
pub struct TokenIssuer {
    identity: Arc<dyn IdentityProvider>,
    signer: Arc<dyn TokenSigner>,
    clock: Arc<dyn Clock>,
    iat_backdate: Duration,
}

impl TokenIssuer {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        signer: Arc<dyn TokenSigner>,
        clock: Arc<dyn Clock>,
        iat_backdate: Duration,
    ) -> Self {
        Self {
            identity,
            signer,
            clock,
            iat_backdate,
        }
    }

    /// Issue a token for the principal behind `credentials`.
    ///
    /// # Errors
    ///
    /// - `GatewayError::Unauthenticated` if no principal is signed in; the
    ///   signer is not called
    /// - `GatewayError::ServiceUnavailable` if the identity provider fails
    /// - `GatewayError::Signing` if the signer fails or returns an empty token
    #[instrument(skip_all, name = "mg.services.token_issuer.issue_token")]
    pub async fn issue_token(
        &self,
        credentials: &SessionCredentials,
    ) -> Result<AccessToken, GatewayError> {
        let Some(principal) = self.identity.current_principal(credentials).await? else {
            tracing::debug!(target: "mg.services.token_issuer", "No authenticated principal");
            return Err(GatewayError::Unauthenticated);
        };

        let issued_at = backdated_iat(self.clock.now_unix_seconds(), self.iat_backdate);

        let signed = self
            .signer
            .generate_user_token(principal.id.as_str(), issued_at)?;

        if signed.token.expose_secret().is_empty() {
            return Err(GatewayError::Signing(
                "Signer returned an empty token".to_string(),
            ));
        }

        tracing::info!(
            target: "mg.services.token_issuer",
            principal = %hash_for_correlation(principal.id.as_str()),
            issued_at = issued_at,
            expires_at = ?signed.expires_at,
            "Issued video token"
        );

        Ok(AccessToken {
            token: signed.token,
            principal_id: principal.id,
            issued_at,
            expires_at: signed.expires_at,
        })
    }
}
