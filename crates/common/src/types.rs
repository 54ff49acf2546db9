//! Common identifier types for Meeting Gateway components.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Maximum length of a meeting identifier.
pub const MAX_MEETING_ID_LEN: usize = 64;

/// Error returned when a meeting identifier fails validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MeetingIdError {
    /// Identifier was empty.
    #[error("meeting id must not be empty")]
    Empty,

    /// Identifier exceeded [`MAX_MEETING_ID_LEN`].
    #[error("meeting id must be at most {MAX_MEETING_ID_LEN} characters")]
    TooLong,

    /// Identifier contained a character outside `[A-Za-z0-9_-]`.
    #[error("meeting id contains an invalid character")]
    InvalidCharacter,
}

/// Identifier of a meeting (a video provider call id), taken from the route.
///
/// Restricted to `[A-Za-z0-9_-]{1,64}` so it can be embedded in provider
/// URLs without escaping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MeetingId(String);

impl MeetingId {
    /// Validate and wrap a raw meeting identifier.
    ///
    /// # Errors
    ///
    /// Returns a [`MeetingIdError`] describing the first rule violated.
    pub fn parse(raw: &str) -> Result<Self, MeetingIdError> {
        if raw.is_empty() {
            return Err(MeetingIdError::Empty);
        }
        if raw.len() > MAX_MEETING_ID_LEN {
            return Err(MeetingIdError::TooLong);
        }
        if !raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(MeetingIdError::InvalidCharacter);
        }
        Ok(Self(raw.to_string()))
    }

    /// Borrow the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MeetingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for MeetingId {
    type Error = MeetingIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<MeetingId> for String {
    fn from(id: MeetingId) -> Self {
        id.0
    }
}

/// Identifier of an authenticated user as issued by the auth provider.
///
/// Debug output is redacted; use [`PrincipalId::as_str`] where the raw value
/// is needed (token claims, API payloads).
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(String);

impl PrincipalId {
    /// Wrap a provider-issued user identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrincipalId([REDACTED])")
    }
}
