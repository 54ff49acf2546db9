//! Meeting Gateway
//!
//! Entry point for the meeting web app's server side. Issues video tokens
//! and resolves meeting views.

use meeting_gateway::auth::jwks::JwksClient;
use meeting_gateway::auth::session::JwksIdentityProvider;
use meeting_gateway::auth::IdentityProvider;
use meeting_gateway::clock::SystemClock;
use meeting_gateway::config::Config;
use meeting_gateway::observability::metrics::init_metrics_recorder;
use meeting_gateway::routes::{self, AppState};
use meeting_gateway::services::{CallDirectory, StreamCallDirectory, TokenIssuer};
use meeting_gateway::signing::StreamTokenSigner;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "meeting_gateway=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Meeting Gateway");

    // Load configuration; missing signing credentials stop startup here
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        bind_address = %config.bind_address,
        stream_base_url = %config.stream_base_url,
        stream_call_type = %config.stream_call_type,
        iat_backdate_seconds = config.iat_backdate.as_secs(),
        jwt_clock_skew_seconds = config.jwt_clock_skew_seconds,
        "Configuration loaded successfully"
    );

    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics recorder: {}", e);
        e
    })?;

    let jwks_client = Arc::new(JwksClient::new(config.auth_jwks_url.clone()));
    let identity: Arc<dyn IdentityProvider> = Arc::new(JwksIdentityProvider::new(
        jwks_client.clone(),
        config.jwt_clock_skew_seconds,
        config.auth_issuer.clone(),
    ));

    let signer = Arc::new(StreamTokenSigner::from_config(&config));
    let calls: Arc<dyn CallDirectory> = Arc::new(
        StreamCallDirectory::from_config(&config, signer.clone()).map_err(|e| {
            error!("Failed to create video provider client: {}", e);
            e
        })?,
    );

    let token_issuer = Arc::new(TokenIssuer::new(
        identity.clone(),
        signer,
        Arc::new(SystemClock),
        config.iat_backdate,
    ));

    // Parse bind address before moving config
    let bind_address = config.bind_address.clone();

    let state = Arc::new(AppState {
        config,
        token_issuer,
        identity,
        calls,
        jwks_client,
    });

    let app = routes::build_routes(state, metrics_handle);

    let addr: SocketAddr = bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("Meeting Gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Meeting Gateway shutdown complete");

    Ok(())
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
/// Returns when a shutdown signal is received and drain period is complete.
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    let drain_secs: u64 = std::env::var("MG_DRAIN_SECONDS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(5);

    if drain_secs > 0 {
        warn!("Draining connections for {} seconds...", drain_secs);
        tokio::time::sleep(Duration::from_secs(drain_secs)).await;
        info!("Drain period complete");
    } else {
        info!("Skipping drain period (MG_DRAIN_SECONDS=0)");
    }
}
