//! Test server harness for E2E testing
//!
//! Provides `TestGatewayServer` for spawning real gateway instances in tests.
//! The gateway is wired exactly as `main` wires it; both providers are
//! expected to be served by one wiremock `MockServer`.

use crate::providers::jwks_url;
use meeting_gateway::auth::jwks::JwksClient;
use meeting_gateway::auth::session::JwksIdentityProvider;
use meeting_gateway::auth::IdentityProvider;
use meeting_gateway::clock::SystemClock;
use meeting_gateway::config::Config;
use meeting_gateway::observability::metrics::init_metrics_recorder;
use meeting_gateway::routes::{self, AppState};
use meeting_gateway::services::{CallDirectory, StreamCallDirectory, TokenIssuer};
use meeting_gateway::signing::StreamTokenSigner;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;
use wiremock::MockServer;

/// Video provider API key used by test servers.
pub const TEST_STREAM_API_KEY: &str = "test-stream-key";

/// Video provider API secret used by test servers.
pub const TEST_STREAM_SECRET: &str = "test-stream-secret-do-not-use";

/// The global recorder can only be installed once per test binary.
static TEST_METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn metrics_handle() -> PrometheusHandle {
    TEST_METRICS_HANDLE
        .get_or_init(|| {
            init_metrics_recorder()
                .unwrap_or_else(|_| PrometheusBuilder::new().build_recorder().handle())
        })
        .clone()
}

/// Test harness for spawning the Meeting Gateway in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_health_e2e() -> Result<(), anyhow::Error> {
///     let providers = MockServer::start().await;
///     let server = TestGatewayServer::spawn(&providers).await?;
///
///     let response = reqwest::get(format!("{}/health", server.url())).await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestGatewayServer {
    addr: SocketAddr,
    config: Config,
    _handle: JoinHandle<()>,
}

impl TestGatewayServer {
    /// Spawn a gateway whose auth provider and video provider are `providers`.
    pub async fn spawn(providers: &MockServer) -> Result<Self, anyhow::Error> {
        Self::spawn_with_vars(providers, HashMap::new()).await
    }

    /// Spawn a gateway with extra environment variables layered over the
    /// test defaults (e.g. `IAT_BACKDATE_SECONDS`, `AUTH_ISSUER`).
    pub async fn spawn_with_vars(
        providers: &MockServer,
        overrides: HashMap<String, String>,
    ) -> Result<Self, anyhow::Error> {
        let mut vars = HashMap::from([
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            (
                "STREAM_API_KEY".to_string(),
                TEST_STREAM_API_KEY.to_string(),
            ),
            (
                "STREAM_SECRET_KEY".to_string(),
                TEST_STREAM_SECRET.to_string(),
            ),
            ("STREAM_BASE_URL".to_string(), providers.uri()),
            ("AUTH_JWKS_URL".to_string(), jwks_url(providers)),
        ]);
        vars.extend(overrides);

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let jwks_client = Arc::new(JwksClient::new(config.auth_jwks_url.clone()));
        let identity: Arc<dyn IdentityProvider> = Arc::new(JwksIdentityProvider::new(
            jwks_client.clone(),
            config.jwt_clock_skew_seconds,
            config.auth_issuer.clone(),
        ));
        let signer = Arc::new(StreamTokenSigner::from_config(&config));
        let calls: Arc<dyn CallDirectory> = Arc::new(
            StreamCallDirectory::from_config(&config, signer.clone())
                .map_err(|e| anyhow::anyhow!("Failed to create call directory: {}", e))?,
        );
        let token_issuer = Arc::new(TokenIssuer::new(
            identity.clone(),
            signer,
            Arc::new(SystemClock),
            config.iat_backdate,
        ));

        let state = Arc::new(AppState {
            config: config.clone(),
            token_issuer,
            identity,
            calls,
            jwks_client,
        });

        // Build routes using meeting-gateway's real route builder
        let app = routes::build_routes(state, metrics_handle());

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for TestGatewayServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_server_spawns_successfully() -> Result<(), anyhow::Error> {
        let providers = MockServer::start().await;
        let server = TestGatewayServer::spawn(&providers).await?;

        assert!(server.url().starts_with("http://127.0.0.1:"));

        let response = reqwest::get(format!("{}/health", server.url())).await?;
        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await?, "OK");

        Ok(())
    }

    #[tokio::test]
    async fn test_server_provides_config_access() -> Result<(), anyhow::Error> {
        let providers = MockServer::start().await;
        let server = TestGatewayServer::spawn(&providers).await?;

        let config = server.config();
        assert_eq!(config.stream_api_key, TEST_STREAM_API_KEY);
        assert_eq!(config.stream_base_url, providers.uri());
        assert_eq!(config.auth_jwks_url, jwks_url(&providers));

        Ok(())
    }

    #[tokio::test]
    async fn test_overrides_apply() -> Result<(), anyhow::Error> {
        let providers = MockServer::start().await;
        let server = TestGatewayServer::spawn_with_vars(
            &providers,
            HashMap::from([("IAT_BACKDATE_SECONDS".to_string(), "0".to_string())]),
        )
        .await?;

        assert!(server.config().iat_backdate.is_zero());
        Ok(())
    }

    #[tokio::test]
    async fn test_multiple_servers_different_ports() -> Result<(), anyhow::Error> {
        let providers = MockServer::start().await;
        let server1 = TestGatewayServer::spawn(&providers).await?;
        let server2 = TestGatewayServer::spawn(&providers).await?;

        assert_ne!(server1.addr(), server2.addr());
        Ok(())
    }
}
