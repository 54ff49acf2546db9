//! Common utilities and types shared across Meeting Gateway crates.

#![warn(clippy::pedantic)]

/// Module for meeting and principal identifier types
pub mod types;

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for JWT utilities (iat backdating, validation, constants)
pub mod jwt;
