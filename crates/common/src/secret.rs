//! Secret types for protecting sensitive values from accidental logging.
//!
//! Re-exports the [`secrecy`] types used across the gateway. `SecretString`
//! and `SecretBox<T>` implement `Debug` with redaction, so a struct that
//! derives `Debug` over a secret field is safe to log. Secrets are zeroized
//! on drop.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct StreamCredentials {
//!     api_key: String,
//!     api_secret: SecretString,
//! }
//!
//! let creds = StreamCredentials {
//!     api_key: "mmhfdzb5evj2".to_string(),
//!     api_secret: SecretString::from("hunter2"),
//! };
//!
//! assert!(!format!("{creds:?}").contains("hunter2"));
//! assert_eq!(creds.api_secret.expose_secret(), "hunter2");
//! ```
//!
//! # Usage Guidelines
//!
//! Use `SecretString` for:
//! - Video provider API secrets
//! - Session tokens read from requests
//! - Issued access tokens until they are written to the response body

pub use secrecy::{ExposeSecret, SecretBox, SecretString};
