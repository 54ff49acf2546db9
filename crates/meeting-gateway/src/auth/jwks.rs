//! JWKS client for fetching and caching the auth provider's public keys.
//!
//! Keys are cached with a TTL so provider key rotations are picked up
//! without a restart. An unknown `kid` forces one early refresh, at most once
//! per minimum refresh interval; a `kid` still unknown after that means the
//! session token was not signed by the provider.

use crate::errors::GatewayError;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::instrument;

/// Default cache TTL in seconds (5 minutes).
const DEFAULT_CACHE_TTL_SECONDS: u64 = 300;

/// Minimum time between fetches triggered by an unknown `kid`.
const DEFAULT_MIN_REFRESH_INTERVAL_SECONDS: u64 = 30;

/// Timeout for JWKS fetches.
const JWKS_REQUEST_TIMEOUT_SECS: u64 = 10;

/// JSON Web Key from the provider's JWKS endpoint.
///
/// Supports Ed25519 (`kty = "OKP"`, `x`) and RSA (`kty = "RSA"`, `n`/`e`)
/// keys; other key types are carried but never match a token.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key type ("OKP" or "RSA").
    pub kty: String,

    /// Key ID - used to select the correct key for verification.
    pub kid: String,

    /// Algorithm ("EdDSA" or "RS256"), if advertised.
    #[serde(default)]
    pub alg: Option<String>,

    /// Curve name ("Ed25519") for OKP keys.
    #[serde(default)]
    pub crv: Option<String>,

    /// OKP public key value (base64url).
    #[serde(default)]
    pub x: Option<String>,

    /// RSA modulus (base64url).
    #[serde(default)]
    pub n: Option<String>,

    /// RSA public exponent (base64url).
    #[serde(default)]
    pub e: Option<String>,

    /// Key use ("sig").
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,
}

/// JWKS document.
#[derive(Debug, Clone, Deserialize)]
pub struct JwksResponse {
    pub keys: Vec<Jwk>,
}

struct CachedJwks {
    keys: HashMap<String, Jwk>,
    fetched_at: Instant,
    expires_at: Instant,
}

/// Thread-safe JWKS client with a TTL cache.
pub struct JwksClient {
    jwks_url: String,
    http_client: reqwest::Client,
    cache: Arc<RwLock<Option<CachedJwks>>>,
    cache_ttl: Duration,
    min_refresh_interval: Duration,
}

impl JwksClient {
    /// Create a new JWKS client with the default cache TTL.
    pub fn new(jwks_url: String) -> Self {
        Self::with_ttl(jwks_url, Duration::from_secs(DEFAULT_CACHE_TTL_SECONDS))
    }

    /// Create a new JWKS client with a custom cache TTL.
    pub fn with_ttl(jwks_url: String, cache_ttl: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(JWKS_REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "mg.auth.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            jwks_url,
            http_client,
            cache: Arc::new(RwLock::new(None)),
            cache_ttl,
            min_refresh_interval: Duration::from_secs(DEFAULT_MIN_REFRESH_INTERVAL_SECONDS),
        }
    }

    /// Override how soon an unknown `kid` may trigger another fetch.
    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    /// Make sure a fresh key set is cached, fetching it if needed.
    ///
    /// Returns the number of cached keys. Used by the readiness check.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::ServiceUnavailable` if the JWKS cannot be fetched.
    pub async fn ensure_loaded(&self) -> Result<usize, GatewayError> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.expires_at > Instant::now() {
                    return Ok(cached.keys.len());
                }
            }
        }

        self.refresh_cache().await?;

        let cache = self.cache.read().await;
        Ok(cache.as_ref().map_or(0, |cached| cached.keys.len()))
    }

    /// Look up a key by `kid`, refreshing the cache when it is empty or stale.
    ///
    /// A `kid` missing from a fresh cache triggers a refresh if the last
    /// fetch is older than the minimum refresh interval.
    ///
    /// Returns `Ok(None)` when the key is unknown to the provider.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::ServiceUnavailable` if the JWKS cannot be fetched.
    #[instrument(skip(self), fields(kid = %kid))]
    pub async fn get_key(&self, kid: &str) -> Result<Option<Jwk>, GatewayError> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.expires_at > Instant::now() {
                    if let Some(key) = cached.keys.get(kid) {
                        tracing::debug!(target: "mg.auth.jwks", kid = %kid, "JWKS cache hit");
                        return Ok(Some(key.clone()));
                    }
                    if cached.fetched_at.elapsed() < self.min_refresh_interval {
                        tracing::debug!(target: "mg.auth.jwks", kid = %kid, "Unknown kid, refresh suppressed");
                        return Ok(None);
                    }
                    tracing::debug!(target: "mg.auth.jwks", kid = %kid, "Unknown kid, forcing JWKS refresh");
                }
            }
        }

        self.refresh_cache().await?;

        let cache = self.cache.read().await;
        let key = cache.as_ref().and_then(|cached| cached.keys.get(kid).cloned());
        if key.is_none() {
            tracing::warn!(target: "mg.auth.jwks", kid = %kid, "Key not found in JWKS after refresh");
        }
        Ok(key)
    }

    #[instrument(skip(self))]
    async fn refresh_cache(&self) -> Result<(), GatewayError> {
        tracing::debug!(target: "mg.auth.jwks", url = %self.jwks_url, "Fetching JWKS from auth provider");

        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "mg.auth.jwks", error = %e, "Failed to fetch JWKS");
                GatewayError::ServiceUnavailable("Authentication provider unavailable".to_string())
            })?;

        if !response.status().is_success() {
            tracing::error!(
                target: "mg.auth.jwks",
                status = %response.status(),
                "JWKS endpoint returned error"
            );
            return Err(GatewayError::ServiceUnavailable(
                "Authentication provider unavailable".to_string(),
            ));
        }

        let jwks: JwksResponse = response.json().await.map_err(|e| {
            tracing::error!(target: "mg.auth.jwks", error = %e, "Failed to parse JWKS response");
            GatewayError::ServiceUnavailable("Authentication provider unavailable".to_string())
        })?;

        let keys: HashMap<String, Jwk> = jwks
            .keys
            .into_iter()
            .map(|key| (key.kid.clone(), key))
            .collect();

        tracing::info!(
            target: "mg.auth.jwks",
            key_count = keys.len(),
            "JWKS cache refreshed"
        );

        let now = Instant::now();
        let mut cache = self.cache.write().await;
        *cache = Some(CachedJwks {
            keys,
            fetched_at: now,
            expires_at: now + self.cache_ttl,
        });

        Ok(())
    }
}
