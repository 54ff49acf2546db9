//! Meeting view handler.
//!
//! `GET /api/v1/meetings/:id` mounts a session gate for the meeting, waits
//! for both loads and reports the view the page should show.

use crate::auth::SessionCredentials;
use crate::errors::GatewayError;
use crate::models::MeetingViewResponse;
use crate::observability::{metrics, ErrorCategory};
use crate::routes::AppState;
use crate::session_gate::SessionRunner;
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use common::types::MeetingId;
use std::sync::Arc;
use tracing::instrument;

/// Handler for GET /api/v1/meetings/:id
///
/// # Response
///
/// - 200 OK: `view` is `"not_found"` or `"setup"`
/// - 400 Bad Request: malformed meeting id
/// - 503 Service Unavailable: auth or video provider unreachable
#[instrument(
    skip_all,
    name = "mg.meeting.view",
    fields(method = "GET", endpoint = "/api/v1/meetings/{id}", view = tracing::field::Empty)
)]
pub async fn get_meeting_view(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<MeetingViewResponse>, GatewayError> {
    let meeting_id = MeetingId::parse(&id).map_err(|e| {
        let err = GatewayError::from(e);
        metrics::record_error("meeting_view", ErrorCategory::from(&err).as_str(), err.status_code());
        err
    })?;

    let mut runner = SessionRunner::spawn(
        meeting_id.clone(),
        SessionCredentials::from_headers(&headers),
        state.identity.clone(),
        state.calls.clone(),
    );

    let settled = runner.settled().await;
    runner.shutdown().await;

    let snapshot = settled.map_err(|e| {
        metrics::record_error("meeting_view", ErrorCategory::from(&e).as_str(), e.status_code());
        e
    })?;

    metrics::record_meeting_lookup(snapshot.view.as_str());
    tracing::Span::current().record("view", snapshot.view.as_str());

    Ok(Json(MeetingViewResponse {
        meeting_id: meeting_id.to_string(),
        view: snapshot.view,
        call: snapshot.call,
    }))
}
