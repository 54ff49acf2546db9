//! Meeting Gateway Service Library
//!
//! This library provides the server side of the meeting web app:
//!
//! - Video provider user tokens for the signed-in user
//! - Session gating for meeting pages (loading, not found, setup, room)
//! - Session verification against the auth provider's JWKS
//! - Server-side call lookup against the video provider REST API
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> handlers/*.rs -> services/*.rs -> signing, auth
//!                               \-> session_gate (per-request gate task)
//! ```
//!
//! # Modules
//!
//! - `auth` - Session credentials and the identity provider seam
//! - `clock` - Time source seam
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - HTTP metrics middleware
//! - `models` - Response models
//! - `observability` - Metrics and log correlation helpers
//! - `routes` - Axum router setup
//! - `services` - Token issuance and call lookup
//! - `session_gate` - Meeting view state machine and its runner
//! - `signing` - Token signing seam and the video provider signer

pub mod auth;
pub mod clock;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod routes;
pub mod services;
pub mod session_gate;
pub mod signing;
