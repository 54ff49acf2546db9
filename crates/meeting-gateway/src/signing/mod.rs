//! Video provider token signing.

pub mod stream;

pub use stream::StreamTokenSigner;

use crate::errors::GatewayError;
use common::secret::SecretString;

/// A token produced by a [`TokenSigner`].
#[derive(Debug, Clone)]
pub struct SignedToken {
    pub token: SecretString,

    /// `exp` claim the signer embedded, if any.
    pub expires_at: Option<i64>,
}

/// Signs user tokens for the video provider.
///
/// Signing is local and CPU-bound, so the trait is synchronous.
pub trait TokenSigner: Send + Sync {
    /// Sign a token for `principal_id` with the given `iat` claim.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Signing` if the token cannot be produced.
    fn generate_user_token(
        &self,
        principal_id: &str,
        issued_at: i64,
    ) -> Result<SignedToken, GatewayError>;
}

/// Mock signer for testing.
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    /// Mock signer that records every call.
    ///
    /// Tokens are `"signed.<principal_id>.<iat>"`.
    #[derive(Default)]
    pub struct MockTokenSigner {
        should_fail: bool,
        expires_in: Option<i64>,
        calls: Mutex<Vec<(String, i64)>>,
    }

    impl MockTokenSigner {
        pub fn new() -> Self {
            Self::default()
        }

        /// Embed `exp = iat + secs` in every token.
        pub fn with_expiry(secs: i64) -> Self {
            Self {
                expires_in: Some(secs),
                ..Self::default()
            }
        }

        pub fn failing() -> Self {
            Self {
                should_fail: true,
                ..Self::default()
            }
        }

        /// `(principal_id, iat)` of every call so far.
        pub fn calls(&self) -> Vec<(String, i64)> {
            self.calls
                .lock()
                .map(|calls| calls.clone())
                .unwrap_or_default()
        }

        pub fn call_count(&self) -> usize {
            self.calls().len()
        }
    }

    impl TokenSigner for MockTokenSigner {
        fn generate_user_token(
            &self,
            principal_id: &str,
            issued_at: i64,
        ) -> Result<SignedToken, GatewayError> {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push((principal_id.to_string(), issued_at));
            }

            if self.should_fail {
                return Err(GatewayError::Signing("Mock signer failure".to_string()));
            }

            Ok(SignedToken {
                token: SecretString::from(format!("signed.{}.{}", principal_id, issued_at)),
                expires_at: self.expires_in.map(|secs| issued_at.saturating_add(secs)),
            })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::mock::MockTokenSigner;
    use super::*;
    use common::secret::ExposeSecret;

    #[test]
    fn test_mock_signer_records_calls() {
        let signer = MockTokenSigner::with_expiry(60);
        let token = signer.generate_user_token("user_42", 100).unwrap();

        assert_eq!(token.token.expose_secret(), "signed.user_42.100");
        assert_eq!(token.expires_at, Some(160));
        assert_eq!(signer.calls(), vec![("user_42".to_string(), 100)]);
    }

    #[test]
    fn test_mock_signer_failing() {
        let signer = MockTokenSigner::failing();
        let result = signer.generate_user_token("user_42", 100);
        assert!(matches!(result, Err(GatewayError::Signing(_))));
        assert_eq!(signer.call_count(), 1);
    }
}
