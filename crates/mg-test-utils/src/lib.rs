//! # MG Test Utilities
//!
//! Shared test utilities for the Meeting Gateway (MG) service.
//!
//! This crate provides:
//! - Session token signing keys (`TestKeypair`, `TestRsaKeypair`)
//! - Wiremock helpers for the auth provider JWKS and the video provider API
//! - Server test harness (`TestGatewayServer` for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mg_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> Result<(), anyhow::Error> {
//!     let providers = MockServer::start().await;
//!     let keypair = TestKeypair::new(1, "key-1");
//!     mount_jwks(&providers, vec![keypair.jwk_json()]).await;
//!
//!     let server = TestGatewayServer::spawn(&providers).await?;
//!     let token = keypair.sign_token(&TestSessionClaims::valid("user_42"));
//!
//!     let response = reqwest::Client::new()
//!         .post(format!("{}/api/v1/stream/token", server.url()))
//!         .bearer_auth(token)
//!         .send()
//!         .await?;
//!
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod keys;
pub mod providers;
pub mod server_harness;

// Re-export commonly used items
pub use keys::*;
pub use providers::*;
pub use server_harness::*;
pub use wiremock::MockServer;
