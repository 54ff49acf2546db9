//! Meeting Gateway configuration.
//!
//! Configuration is loaded once at startup from environment variables.
//! Missing signing credentials are a startup failure: the gateway never runs
//! in a mode where it could hand out unsigned or invalid tokens.
//! Secrets are wrapped in `SecretString` and redacted in Debug output.

use common::jwt::{DEFAULT_CLOCK_SKEW, DEFAULT_IAT_BACKDATE, MAX_CLOCK_SKEW, MAX_IAT_BACKDATE};
use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default HTTP bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default video provider API base URL.
pub const DEFAULT_STREAM_BASE_URL: &str = "https://video.stream-io-api.com";

/// Default call type used when looking up calls by id.
pub const DEFAULT_STREAM_CALL_TYPE: &str = "default";

/// Default validity window of issued user tokens (1 hour).
pub const DEFAULT_TOKEN_VALIDITY_SECONDS: u64 = 3600;

/// Maximum validity window of issued user tokens (24 hours).
pub const MAX_TOKEN_VALIDITY_SECONDS: u64 = 86_400;

/// Meeting Gateway configuration.
#[derive(Clone)]
pub struct Config {
    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Video provider API key. Public: handed to clients with their token.
    pub stream_api_key: String,

    /// Video provider API secret used as the HS256 signing key.
    pub stream_api_secret: SecretString,

    /// Video provider REST API base URL.
    pub stream_base_url: String,

    /// Call type for call lookups (e.g. "default").
    pub stream_call_type: String,

    /// Auth provider JWKS endpoint used to verify session tokens.
    pub auth_jwks_url: String,

    /// Expected `iss` claim of session tokens, if enforced.
    pub auth_issuer: Option<String>,

    /// Seconds subtracted from the current time for the `iat` of issued tokens.
    pub iat_backdate: Duration,

    /// Validity window of issued tokens; `None` issues tokens without `exp`.
    pub token_validity: Option<Duration>,

    /// Clock skew tolerance in seconds for session token `iat` validation.
    pub jwt_clock_skew_seconds: i64,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("stream_api_key", &self.stream_api_key)
            .field("stream_api_secret", &"[REDACTED]")
            .field("stream_base_url", &self.stream_base_url)
            .field("stream_call_type", &self.stream_call_type)
            .field("auth_jwks_url", &self.auth_jwks_url)
            .field("auth_issuer", &self.auth_issuer)
            .field("iat_backdate", &self.iat_backdate)
            .field("token_validity", &self.token_validity)
            .field("jwt_clock_skew_seconds", &self.jwt_clock_skew_seconds)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Environment variable must not be empty: {0}")]
    EmptyEnvVar(String),

    #[error("Invalid iat backdate configuration: {0}")]
    InvalidIatBackdate(String),

    #[error("Invalid token validity configuration: {0}")]
    InvalidTokenValidity(String),

    #[error("Invalid JWT clock skew configuration: {0}")]
    InvalidJwtClockSkew(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let stream_api_key = required(vars, "STREAM_API_KEY")?;
        let stream_api_secret = SecretString::from(required(vars, "STREAM_SECRET_KEY")?);
        let auth_jwks_url = required(vars, "AUTH_JWKS_URL")?;

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let stream_base_url = vars
            .get("STREAM_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_STREAM_BASE_URL.to_string());

        let stream_call_type = match vars.get("STREAM_CALL_TYPE") {
            Some(value) if value.trim().is_empty() => {
                return Err(ConfigError::EmptyEnvVar("STREAM_CALL_TYPE".to_string()))
            }
            Some(value) => value.clone(),
            None => DEFAULT_STREAM_CALL_TYPE.to_string(),
        };

        let auth_issuer = vars
            .get("AUTH_ISSUER")
            .filter(|value| !value.trim().is_empty())
            .cloned();

        let iat_backdate = if let Some(value_str) = vars.get("IAT_BACKDATE_SECONDS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidIatBackdate(format!(
                    "IAT_BACKDATE_SECONDS must be a non-negative integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value > MAX_IAT_BACKDATE.as_secs() {
                return Err(ConfigError::InvalidIatBackdate(format!(
                    "IAT_BACKDATE_SECONDS must not exceed {} seconds, got {}",
                    MAX_IAT_BACKDATE.as_secs(),
                    value
                )));
            }

            Duration::from_secs(value)
        } else {
            DEFAULT_IAT_BACKDATE
        };

        let token_validity = if let Some(value_str) = vars.get("TOKEN_VALIDITY_SECONDS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidTokenValidity(format!(
                    "TOKEN_VALIDITY_SECONDS must be a non-negative integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value > MAX_TOKEN_VALIDITY_SECONDS {
                return Err(ConfigError::InvalidTokenValidity(format!(
                    "TOKEN_VALIDITY_SECONDS must not exceed {} seconds, got {}",
                    MAX_TOKEN_VALIDITY_SECONDS, value
                )));
            }

            // 0 disables expiry; the provider then relies on its own policy
            (value > 0).then(|| Duration::from_secs(value))
        } else {
            Some(Duration::from_secs(DEFAULT_TOKEN_VALIDITY_SECONDS))
        };

        let jwt_clock_skew_seconds = if let Some(value_str) = vars.get("JWT_CLOCK_SKEW_SECONDS") {
            let value: i64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be a valid integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value <= 0 {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be positive, got {}",
                    value
                )));
            }

            if value > MAX_CLOCK_SKEW.as_secs() as i64 {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must not exceed {} seconds, got {}",
                    MAX_CLOCK_SKEW.as_secs(),
                    value
                )));
            }

            value
        } else {
            DEFAULT_CLOCK_SKEW.as_secs() as i64
        };

        Ok(Config {
            bind_address,
            stream_api_key,
            stream_api_secret,
            stream_base_url,
            stream_call_type,
            auth_jwks_url,
            auth_issuer,
            iat_backdate,
            token_validity,
            jwt_clock_skew_seconds,
        })
    }
}

fn required(vars: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    let value = vars
        .get(name)
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))?;

    if value.trim().is_empty() {
        return Err(ConfigError::EmptyEnvVar(name.to_string()));
    }

    Ok(value.clone())
}
