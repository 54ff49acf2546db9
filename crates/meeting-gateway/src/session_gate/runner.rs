//! Async driver for a [`SessionGate`].
//!
//! One task owns the gate. It starts the principal and call loads, applies
//! their completions and the setup signal one at a time, and publishes every
//! change on a `watch` channel. Cancelling the token or dropping the runner
//! ends the task; loads still in flight are dropped with it and never reach
//! the gate.

use crate::auth::{IdentityProvider, Principal, SessionCredentials};
use crate::errors::GatewayError;
use crate::services::{CallDirectory, CallObject};
use crate::session_gate::{Applied, GateEvent, SessionGate, View};
use common::types::MeetingId;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Which load failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadFailure {
    Identity,
    CallLookup,
}

/// Published state of a running gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateSnapshot {
    pub view: View,
    pub call: Option<CallObject>,
    pub principal: Option<Principal>,
    /// Set when a load failed; the gate then stays in its current view.
    pub failure: Option<LoadFailure>,
}

impl GateSnapshot {
    fn of(gate: &SessionGate) -> Self {
        Self {
            view: gate.view(),
            call: gate.call().cloned(),
            principal: gate.principal().cloned(),
            failure: None,
        }
    }

    /// The view can no longer change on its own.
    pub fn is_settled(&self) -> bool {
        self.view != View::Loading || self.failure.is_some()
    }
}

/// Runs one mount of a session gate on a background task.
pub struct SessionRunner {
    state: watch::Receiver<GateSnapshot>,
    setup_tx: mpsc::Sender<()>,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl SessionRunner {
    /// Mount a gate for `meeting_id` and start both loads.
    pub fn spawn(
        meeting_id: MeetingId,
        credentials: SessionCredentials,
        identity: Arc<dyn IdentityProvider>,
        calls: Arc<dyn CallDirectory>,
    ) -> Self {
        Self::spawn_with_cancel(
            meeting_id,
            credentials,
            identity,
            calls,
            CancellationToken::new(),
        )
    }

    /// Like [`SessionRunner::spawn`], stopping when `cancel` fires.
    pub fn spawn_with_cancel(
        meeting_id: MeetingId,
        credentials: SessionCredentials,
        identity: Arc<dyn IdentityProvider>,
        calls: Arc<dyn CallDirectory>,
        cancel: CancellationToken,
    ) -> Self {
        let gate = SessionGate::new();
        let (state_tx, state) = watch::channel(GateSnapshot::of(&gate));
        let (setup_tx, setup_rx) = mpsc::channel(1);

        let span = tracing::debug_span!("mg.session_gate.runner", meeting_id = %meeting_id);
        let handle = tokio::spawn(
            run(
                gate,
                meeting_id,
                credentials,
                identity,
                calls,
                state_tx,
                setup_rx,
                cancel.clone(),
            )
            .instrument(span),
        );

        Self {
            state,
            setup_tx,
            cancel,
            handle: Some(handle),
        }
    }

    /// Current view.
    pub fn view(&self) -> View {
        self.state.borrow().view
    }

    pub fn snapshot(&self) -> GateSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<GateSnapshot> {
        self.state.clone()
    }

    /// Signal that the user finished the pre-join setup step.
    ///
    /// Returns false if the runner has already stopped. The signal only has
    /// an effect while the view is `Setup`.
    pub async fn complete_setup(&self) -> bool {
        self.setup_tx.send(()).await.is_ok()
    }

    /// Wait until the view leaves `Loading` or a load fails.
    ///
    /// # Errors
    ///
    /// - `GatewayError::ServiceUnavailable` if a load failed
    /// - `GatewayError::Internal` if the runner stopped before settling
    pub async fn settled(&mut self) -> Result<GateSnapshot, GatewayError> {
        let snapshot = self
            .state
            .wait_for(GateSnapshot::is_settled)
            .await
            .map_err(|_| {
                tracing::warn!(target: "mg.session_gate", "Session runner stopped before settling");
                GatewayError::Internal
            })?
            .clone();

        match snapshot.failure {
            Some(LoadFailure::Identity) => Err(GatewayError::ServiceUnavailable(
                "Identity load failed".to_string(),
            )),
            Some(LoadFailure::CallLookup) => Err(GatewayError::ServiceUnavailable(
                "Call lookup failed".to_string(),
            )),
            None => Ok(snapshot),
        }
    }

    /// Stop the runner and wait for its task to finish.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::warn!(target: "mg.session_gate", error = %e, "Session runner task failed");
            }
        }
    }
}

impl Drop for SessionRunner {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[allow(clippy::too_many_arguments)]
async fn run(
    mut gate: SessionGate,
    meeting_id: MeetingId,
    credentials: SessionCredentials,
    identity: Arc<dyn IdentityProvider>,
    calls: Arc<dyn CallDirectory>,
    state_tx: watch::Sender<GateSnapshot>,
    mut setup_rx: mpsc::Receiver<()>,
    cancel: CancellationToken,
) {
    let mount = gate.mount_id();

    let user_load = identity.current_principal(&credentials);
    let call_load = calls.get_call_by_id(&meeting_id);
    tokio::pin!(user_load);
    tokio::pin!(call_load);

    let mut user_pending = true;
    let mut call_pending = true;

    loop {
        let (event, failure) = tokio::select! {
            biased;

            () = cancel.cancelled() => {
                tracing::debug!(target: "mg.session_gate", "Session runner cancelled");
                break;
            }

            result = &mut user_load, if user_pending => {
                user_pending = false;
                match result {
                    Ok(principal) => (Some(GateEvent::UserLoaded(principal)), None),
                    Err(e) => {
                        tracing::warn!(target: "mg.session_gate", error = %e, "Principal load failed");
                        (None, Some(LoadFailure::Identity))
                    }
                }
            }

            result = &mut call_load, if call_pending => {
                call_pending = false;
                match result {
                    Ok(call) => (Some(GateEvent::CallResolved(call)), None),
                    Err(e) => {
                        tracing::warn!(target: "mg.session_gate", error = %e, "Call lookup failed");
                        (None, Some(LoadFailure::CallLookup))
                    }
                }
            }

            signal = setup_rx.recv() => match signal {
                Some(()) => (Some(GateEvent::SetupCompleted), None),
                None => break,
            },
        };

        if let Some(failure) = failure {
            state_tx.send_modify(|snapshot| snapshot.failure = Some(failure));
            break;
        }

        if let Some(event) = event {
            if let Applied::Changed(view) = gate.apply(mount, event) {
                tracing::debug!(target: "mg.session_gate", view = view.as_str(), "View changed");
                state_tx.send_replace(GateSnapshot::of(&gate));
            }
        }

        if gate.view().is_terminal() {
            break;
        }
    }

    gate.unmount();
}
