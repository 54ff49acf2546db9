//! Call lookup against the video provider.
//!
//! # Security
//!
//! - Requests authenticate with a server token minted per call
//! - Meeting ids are validated before they reach the URL
//! - Errors are logged server-side with generic messages returned

use crate::config::Config;
use crate::errors::GatewayError;
use crate::signing::StreamTokenSigner;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::secret::ExposeSecret;
use common::types::MeetingId;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, instrument, warn};

/// Default timeout for provider API requests in seconds.
const STREAM_REQUEST_TIMEOUT_SECS: u64 = 10;

/// A call (meeting session) known to the video provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallObject {
    pub id: String,

    /// Fully qualified id, `"<type>:<id>"`.
    pub cid: String,

    #[serde(rename = "type")]
    pub call_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Resolves meeting identifiers to calls.
#[async_trait]
pub trait CallDirectory: Send + Sync {
    /// Returns `Ok(None)` when no call exists for `meeting_id`.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::ServiceUnavailable` if the provider cannot be
    /// consulted.
    async fn get_call_by_id(&self, meeting_id: &MeetingId)
        -> Result<Option<CallObject>, GatewayError>;
}

#[derive(Deserialize)]
struct GetCallResponse {
    call: CallObject,
}

/// `CallDirectory` backed by the Stream Video REST API.
pub struct StreamCallDirectory {
    client: Client,
    base_url: String,
    call_type: String,
    signer: Arc<StreamTokenSigner>,
}

impl StreamCallDirectory {
    /// # Errors
    ///
    /// Returns `GatewayError::Internal` if the HTTP client cannot be built.
    pub fn new(
        base_url: String,
        call_type: String,
        signer: Arc<StreamTokenSigner>,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(STREAM_REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| {
                error!(target: "mg.services.call_directory", error = %e, "Failed to build HTTP client");
                GatewayError::Internal
            })?;

        Ok(Self {
            client,
            base_url,
            call_type,
            signer,
        })
    }

    /// # Errors
    ///
    /// Returns `GatewayError::Internal` if the HTTP client cannot be built.
    pub fn from_config(config: &Config, signer: Arc<StreamTokenSigner>) -> Result<Self, GatewayError> {
        Self::new(
            config.stream_base_url.clone(),
            config.stream_call_type.clone(),
            signer,
        )
    }
}

#[async_trait]
impl CallDirectory for StreamCallDirectory {
    #[instrument(skip_all, fields(meeting_id = %meeting_id))]
    async fn get_call_by_id(
        &self,
        meeting_id: &MeetingId,
    ) -> Result<Option<CallObject>, GatewayError> {
        let url = format!(
            "{}/video/call/{}/{}",
            self.base_url, self.call_type, meeting_id
        );
        let server_token = self.signer.generate_server_token()?;

        let response = self
            .client
            .get(&url)
            .query(&[("api_key", self.signer.api_key())])
            .header("Authorization", server_token.expose_secret())
            .header("stream-auth-type", "jwt")
            .send()
            .await
            .map_err(|e| {
                warn!(target: "mg.services.call_directory", error = %e, "Video provider request failed");
                GatewayError::ServiceUnavailable("Video provider is unavailable".to_string())
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                tracing::debug!(target: "mg.services.call_directory", "Call not found");
                Ok(None)
            }
            status if status.is_success() => {
                let body: GetCallResponse = response.json().await.map_err(|e| {
                    error!(target: "mg.services.call_directory", error = %e, "Failed to parse call response");
                    GatewayError::ServiceUnavailable("Invalid response from video provider".to_string())
                })?;
                Ok(Some(body.call))
            }
            status => {
                warn!(
                    target: "mg.services.call_directory",
                    status = %status,
                    "Video provider returned error"
                );
                Err(GatewayError::ServiceUnavailable(
                    "Video provider is unavailable".to_string(),
                ))
            }
        }
    }
}

/// Mock call directory for testing.
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Outcome {
        Found(CallObject),
        Missing,
        Failing,
        Pending,
    }

    /// Mock call directory with a fixed answer.
    pub struct MockCallDirectory {
        outcome: Outcome,
        delay: Option<Duration>,
        call_count: AtomicUsize,
    }

    impl MockCallDirectory {
        fn with_outcome(outcome: Outcome) -> Self {
            Self {
                outcome,
                delay: None,
                call_count: AtomicUsize::new(0),
            }
        }

        /// Every lookup resolves to a call with the requested id.
        pub fn found() -> Self {
            Self::with_outcome(Outcome::Found(CallObject {
                id: String::new(),
                cid: String::new(),
                call_type: "default".to_string(),
                created_at: None,
            }))
        }

        /// Every lookup resolves to exactly this call.
        pub fn with_call(call: CallObject) -> Self {
            Self::with_outcome(Outcome::Found(call))
        }

        pub fn missing() -> Self {
            Self::with_outcome(Outcome::Missing)
        }

        pub fn failing() -> Self {
            Self::with_outcome(Outcome::Failing)
        }

        /// Lookups never complete.
        pub fn pending() -> Self {
            Self::with_outcome(Outcome::Pending)
        }

        /// Delay every answer by `delay`.
        pub fn delayed(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CallDirectory for MockCallDirectory {
        async fn get_call_by_id(
            &self,
            meeting_id: &MeetingId,
        ) -> Result<Option<CallObject>, GatewayError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            match &self.outcome {
                Outcome::Found(call) if call.id.is_empty() => Ok(Some(CallObject {
                    id: meeting_id.to_string(),
                    cid: format!("{}:{}", call.call_type, meeting_id),
                    ..call.clone()
                })),
                Outcome::Found(call) => Ok(Some(call.clone())),
                Outcome::Missing => Ok(None),
                Outcome::Failing => Err(GatewayError::ServiceUnavailable(
                    "Mock call directory failure".to_string(),
                )),
                Outcome::Pending => std::future::pending().await,
            }
        }
    }
}
