//! Service layer for the Meeting Gateway.
//!
//! # Components
//!
//! - `call_directory` - Call lookup against the video provider
//! - `token_issuer` - Video provider token issuance

pub mod call_directory;
pub mod token_issuer;

pub use call_directory::{CallDirectory, CallObject, StreamCallDirectory};
pub use token_issuer::{AccessToken, TokenIssuer};
