//! Stream Video token signing.
//!
//! Stream authenticates clients with HS256 JWTs keyed by the application's
//! API secret. User tokens carry `user_id` and `iat`, plus `exp` when a
//! validity window is configured. Server-side API calls use a token whose
//! only claim is `server: true`.

use crate::config::Config;
use crate::errors::GatewayError;
use crate::signing::{SignedToken, TokenSigner};
use common::secret::{ExposeSecret, SecretString};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Claims of a Stream user token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamUserClaims {
    pub user_id: String,
    pub iat: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

#[derive(Serialize)]
struct StreamServerClaims {
    server: bool,
}

/// Signs Stream tokens with the API secret.
pub struct StreamTokenSigner {
    api_key: String,
    api_secret: SecretString,
    validity: Option<Duration>,
}

impl fmt::Debug for StreamTokenSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamTokenSigner")
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("validity", &self.validity)
            .finish()
    }
}

impl StreamTokenSigner {
    pub fn new(api_key: String, api_secret: SecretString, validity: Option<Duration>) -> Self {
        Self {
            api_key,
            api_secret,
            validity,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.stream_api_key.clone(),
            config.stream_api_secret.clone(),
            config.token_validity,
        )
    }

    /// Public API key the tokens are issued under.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Mint the server-side token used for provider REST calls.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Signing` if encoding fails.
    pub fn generate_server_token(&self) -> Result<SecretString, GatewayError> {
        self.sign(&StreamServerClaims { server: true })
    }

    fn sign<C: Serialize>(&self, claims: &C) -> Result<SecretString, GatewayError> {
        let key = EncodingKey::from_secret(self.api_secret.expose_secret().as_bytes());
        let header = Header::new(Algorithm::HS256);

        encode(&header, claims, &key)
            .map(SecretString::from)
            .map_err(|e| GatewayError::Signing(format!("Failed to encode Stream token: {}", e)))
    }
}

impl TokenSigner for StreamTokenSigner {
    fn generate_user_token(
        &self,
        principal_id: &str,
        issued_at: i64,
    ) -> Result<SignedToken, GatewayError> {
        let exp = self.validity.map(|validity| {
            let secs = i64::try_from(validity.as_secs()).unwrap_or(i64::MAX);
            issued_at.saturating_add(secs)
        });

        let claims = StreamUserClaims {
            user_id: principal_id.to_string(),
            iat: issued_at,
            exp,
        };

        Ok(SignedToken {
            token: self.sign(&claims)?,
            expires_at: exp,
        })
    }
}
