//! Request authentication.
//!
//! The gateway has no ambient "current user": the authenticated principal is
//! resolved per request from the session credentials the client presents.
//!
//! # Components
//!
//! - `claims` - Session token claims
//! - `jwks` - JWKS client with caching
//! - `session` - [`JwksIdentityProvider`], the production [`IdentityProvider`]

pub mod claims;
pub mod jwks;
pub mod session;

pub use claims::SessionClaims;
pub use jwks::JwksClient;
pub use session::JwksIdentityProvider;

use crate::errors::GatewayError;
use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use common::secret::SecretString;
use common::types::PrincipalId;

/// Name of the cookie carrying the auth provider's session token.
pub const SESSION_COOKIE_NAME: &str = "__session";

/// An authenticated user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: PrincipalId,
}

impl Principal {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: PrincipalId::new(id),
        }
    }
}

/// Credentials presented with a request.
///
/// An absent token is not an error here; the identity provider decides that
/// the request is anonymous.
#[derive(Debug, Clone, Default)]
pub struct SessionCredentials {
    pub token: Option<SecretString>,
}

impl SessionCredentials {
    /// Credentials carrying no session token.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn from_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(SecretString::from(token.into())),
        }
    }

    /// Extract the session token from request headers.
    ///
    /// A `Bearer` Authorization header takes precedence over the
    /// `__session` cookie.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let bearer = headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty());

        if let Some(token) = bearer {
            return Self::from_token(token);
        }

        let cookie = headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|h| h.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == SESSION_COOKIE_NAME)
            .map(|(_, value)| value.trim())
            .filter(|token| !token.is_empty());

        match cookie {
            Some(token) => Self::from_token(token),
            None => Self::anonymous(),
        }
    }
}

/// Resolves the authenticated principal behind a set of credentials.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Returns `Ok(None)` when no user is signed in or the session is not
    /// valid.
    ///
    /// # Errors
    ///
    /// Returns an error only when the provider itself cannot be consulted.
    async fn current_principal(
        &self,
        credentials: &SessionCredentials,
    ) -> Result<Option<Principal>, GatewayError>;
}

/// Mock identity provider for testing.
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Mock identity provider with a fixed answer.
    pub struct MockIdentityProvider {
        principal: Option<Principal>,
        should_fail: bool,
        call_count: AtomicUsize,
    }

    impl MockIdentityProvider {
        /// Every request resolves to the given principal.
        pub fn authenticated(id: impl Into<String>) -> Self {
            Self {
                principal: Some(Principal::new(id)),
                should_fail: false,
                call_count: AtomicUsize::new(0),
            }
        }

        /// No user is ever signed in.
        pub fn anonymous() -> Self {
            Self {
                principal: None,
                should_fail: false,
                call_count: AtomicUsize::new(0),
            }
        }

        /// The provider is unreachable.
        pub fn failing() -> Self {
            Self {
                principal: None,
                should_fail: true,
                call_count: AtomicUsize::new(0),
            }
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl IdentityProvider for MockIdentityProvider {
        async fn current_principal(
            &self,
            _credentials: &SessionCredentials,
        ) -> Result<Option<Principal>, GatewayError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);

            if self.should_fail {
                return Err(GatewayError::ServiceUnavailable(
                    "Mock identity provider failure".to_string(),
                ));
            }

            Ok(self.principal.clone())
        }
    }
}
