//! Meeting view selection.
//!
//! A [`SessionGate`] owns the inputs of one meeting page mount: the user load,
//! the call lookup and the local setup flag. [`select_view`] maps those inputs
//! to exactly one [`View`]:
//!
//! ```text
//!   Loading ──(both loaded, no call)──▶ NotFound
//!      │
//!      └──(both loaded, call)──▶ Setup ──(setup completed)──▶ Room
//! ```
//!
//! `NotFound` and `Room` are terminal for a mount. Only [`SessionGate::remount`]
//! starts over.

pub mod runner;

pub use runner::{GateSnapshot, LoadFailure, SessionRunner};

use crate::auth::Principal;
use crate::services::CallObject;
use serde::Serialize;

/// Whether the principal load has completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserLoad {
    Loading,
    Loaded,
}

/// Resolution state of the meeting's call object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleState {
    Loading,
    Absent,
    Present(CallObject),
}

impl HandleState {
    pub fn call(&self) -> Option<&CallObject> {
        match self {
            HandleState::Present(call) => Some(call),
            HandleState::Loading | HandleState::Absent => None,
        }
    }
}

/// Local pre-join setup flag. Starts false and is only ever set once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetupComplete(bool);

impl SetupComplete {
    pub const PENDING: Self = Self(false);
    pub const DONE: Self = Self(true);

    pub fn is_complete(self) -> bool {
        self.0
    }
}

/// The view presented for a meeting page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    Loading,
    NotFound,
    Setup,
    Room,
}

impl View {
    pub fn as_str(&self) -> &'static str {
        match self {
            View::Loading => "loading",
            View::NotFound => "not_found",
            View::Setup => "setup",
            View::Room => "room",
        }
    }

    /// No further transition is possible within the current mount.
    pub fn is_terminal(&self) -> bool {
        matches!(self, View::NotFound | View::Room)
    }
}

/// Select the view for the given inputs.
///
/// The setup flag is only consulted once a call is present.
pub fn select_view(user: UserLoad, handle: &HandleState, setup: SetupComplete) -> View {
    match (user, handle) {
        (UserLoad::Loading, _) | (_, HandleState::Loading) => View::Loading,
        (UserLoad::Loaded, HandleState::Absent) => View::NotFound,
        (UserLoad::Loaded, HandleState::Present(_)) if setup.is_complete() => View::Room,
        (UserLoad::Loaded, HandleState::Present(_)) => View::Setup,
    }
}

/// Identifies one mount of a gate. Events carry the mount they were
/// produced for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MountId(u64);

/// Input to a gate.
#[derive(Debug, Clone)]
pub enum GateEvent {
    /// The principal load finished; `None` means nobody is signed in.
    UserLoaded(Option<Principal>),
    /// The call lookup finished; `None` means the call does not exist.
    CallResolved(Option<CallObject>),
    /// The user finished the pre-join setup step.
    SetupCompleted,
}

/// What a gate did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Changed(View),
    /// Valid for this mount but changes nothing (repeat completion, setup
    /// signal outside `Setup`).
    NoEffect,
    StaleMount,
    Unmounted,
}

/// Per-mount owner of the view inputs.
#[derive(Debug)]
pub struct SessionGate {
    mount: MountId,
    mounted: bool,
    user: UserLoad,
    principal: Option<Principal>,
    handle: HandleState,
    setup: SetupComplete,
}

impl Default for SessionGate {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionGate {
    /// A freshly mounted gate with every input loading.
    pub fn new() -> Self {
        Self {
            mount: MountId(1),
            mounted: true,
            user: UserLoad::Loading,
            principal: None,
            handle: HandleState::Loading,
            setup: SetupComplete::PENDING,
        }
    }

    pub fn mount_id(&self) -> MountId {
        self.mount
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn view(&self) -> View {
        select_view(self.user, &self.handle, self.setup)
    }

    pub fn call(&self) -> Option<&CallObject> {
        self.handle.call()
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    pub fn setup(&self) -> SetupComplete {
        self.setup
    }

    /// Apply an event produced for `mount`.
    pub fn apply(&mut self, mount: MountId, event: GateEvent) -> Applied {
        if !self.mounted {
            return Applied::Unmounted;
        }
        if mount != self.mount {
            return Applied::StaleMount;
        }

        let before = self.view();

        match event {
            GateEvent::UserLoaded(principal) => {
                if self.user == UserLoad::Loaded {
                    return Applied::NoEffect;
                }
                self.user = UserLoad::Loaded;
                self.principal = principal;
            }
            GateEvent::CallResolved(call) => {
                if self.handle != HandleState::Loading {
                    return Applied::NoEffect;
                }
                self.handle = match call {
                    Some(call) => HandleState::Present(call),
                    None => HandleState::Absent,
                };
            }
            GateEvent::SetupCompleted => {
                if before != View::Setup {
                    return Applied::NoEffect;
                }
                self.setup = SetupComplete::DONE;
            }
        }

        let after = self.view();
        if after == before {
            Applied::NoEffect
        } else {
            Applied::Changed(after)
        }
    }

    /// Start a new mount. Every input returns to its initial state and
    /// events for earlier mounts are discarded from now on.
    pub fn remount(&mut self) -> MountId {
        self.mount = MountId(self.mount.0.wrapping_add(1));
        self.mounted = true;
        self.user = UserLoad::Loading;
        self.principal = None;
        self.handle = HandleState::Loading;
        self.setup = SetupComplete::PENDING;
        self.mount
    }

    /// Tear down the current mount; later events are discarded.
    pub fn unmount(&mut self) {
        self.mounted = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call() -> CallObject {
        CallObject {
            id: "standup".to_string(),
            cid: "default:standup".to_string(),
            call_type: "default".to_string(),
            created_at: None,
        }
    }

    fn all_handles() -> [HandleState; 3] {
        [
            HandleState::Loading,
            HandleState::Absent,
            HandleState::Present(call()),
        ]
    }

    // -------------------------------------------------------------------------
    // select_view
    // -------------------------------------------------------------------------

    #[test]
    fn test_user_loading_is_loading_regardless_of_handle_and_setup() {
        for handle in all_handles() {
            for setup in [SetupComplete::PENDING, SetupComplete::DONE] {
                assert_eq!(select_view(UserLoad::Loading, &handle, setup), View::Loading);
            }
        }
    }

    #[test]
    fn test_handle_loading_is_loading() {
        for setup in [SetupComplete::PENDING, SetupComplete::DONE] {
            assert_eq!(
                select_view(UserLoad::Loaded, &HandleState::Loading, setup),
                View::Loading
            );
        }
    }

    #[test]
    fn test_absent_handle_is_not_found() {
        for setup in [SetupComplete::PENDING, SetupComplete::DONE] {
            assert_eq!(
                select_view(UserLoad::Loaded, &HandleState::Absent, setup),
                View::NotFound
            );
        }
    }

    #[test]
    fn test_present_handle_selects_setup_then_room() {
        let handle = HandleState::Present(call());
        assert_eq!(
            select_view(UserLoad::Loaded, &handle, SetupComplete::PENDING),
            View::Setup
        );
        assert_eq!(
            select_view(UserLoad::Loaded, &handle, SetupComplete::DONE),
            View::Room
        );
    }

    #[test]
    fn test_session_views_require_present_handle() {
        for handle in [HandleState::Loading, HandleState::Absent] {
            for user in [UserLoad::Loading, UserLoad::Loaded] {
                for setup in [SetupComplete::PENDING, SetupComplete::DONE] {
                    let view = select_view(user, &handle, setup);
                    assert!(!matches!(view, View::Setup | View::Room));
                }
            }
        }
    }

    #[test]
    fn test_view_labels_and_terminality() {
        assert_eq!(View::Loading.as_str(), "loading");
        assert_eq!(View::NotFound.as_str(), "not_found");
        assert_eq!(View::Setup.as_str(), "setup");
        assert_eq!(View::Room.as_str(), "room");

        assert!(View::NotFound.is_terminal());
        assert!(View::Room.is_terminal());
        assert!(!View::Loading.is_terminal());
        assert!(!View::Setup.is_terminal());
    }

    // -------------------------------------------------------------------------
    // SessionGate
    // -------------------------------------------------------------------------

    #[test]
    fn test_gate_starts_loading() {
        let gate = SessionGate::new();
        assert_eq!(gate.view(), View::Loading);
        assert!(gate.is_mounted());
        assert!(!gate.setup().is_complete());
    }

    #[test]
    fn test_gate_reaches_setup_in_either_load_order() {
        let mut user_first = SessionGate::new();
        let mount = user_first.mount_id();
        assert_eq!(
            user_first.apply(mount, GateEvent::UserLoaded(None)),
            Applied::NoEffect
        );
        assert_eq!(
            user_first.apply(mount, GateEvent::CallResolved(Some(call()))),
            Applied::Changed(View::Setup)
        );

        let mut call_first = SessionGate::new();
        let mount = call_first.mount_id();
        call_first.apply(mount, GateEvent::CallResolved(Some(call())));
        assert_eq!(call_first.view(), View::Loading);
        assert_eq!(
            call_first.apply(mount, GateEvent::UserLoaded(Some(Principal::new("user_42")))),
            Applied::Changed(View::Setup)
        );
        assert_eq!(call_first.principal().map(|p| p.id.as_str()), Some("user_42"));
        assert_eq!(call_first.call(), Some(&call()));
    }

    #[test]
    fn test_gate_not_found_is_terminal() {
        let mut gate = SessionGate::new();
        let mount = gate.mount_id();
        gate.apply(mount, GateEvent::UserLoaded(None));
        assert_eq!(
            gate.apply(mount, GateEvent::CallResolved(None)),
            Applied::Changed(View::NotFound)
        );

        assert_eq!(
            gate.apply(mount, GateEvent::CallResolved(Some(call()))),
            Applied::NoEffect
        );
        assert_eq!(gate.apply(mount, GateEvent::SetupCompleted), Applied::NoEffect);
        assert_eq!(gate.view(), View::NotFound);
    }

    #[test]
    fn test_setup_signal_moves_to_room_and_never_reverts() {
        let mut gate = SessionGate::new();
        let mount = gate.mount_id();
        gate.apply(mount, GateEvent::UserLoaded(None));
        gate.apply(mount, GateEvent::CallResolved(Some(call())));
        assert_eq!(gate.view(), View::Setup);

        assert_eq!(
            gate.apply(mount, GateEvent::SetupCompleted),
            Applied::Changed(View::Room)
        );

        // Re-evaluation and repeated inputs keep the room
        for event in [
            GateEvent::SetupCompleted,
            GateEvent::UserLoaded(None),
            GateEvent::CallResolved(None),
        ] {
            assert_eq!(gate.apply(mount, event), Applied::NoEffect);
            assert_eq!(gate.view(), View::Room);
        }
        assert!(gate.setup().is_complete());
    }

    #[test]
    fn test_setup_signal_while_loading_is_ignored() {
        let mut gate = SessionGate::new();
        let mount = gate.mount_id();

        assert_eq!(gate.apply(mount, GateEvent::SetupCompleted), Applied::NoEffect);

        gate.apply(mount, GateEvent::UserLoaded(None));
        gate.apply(mount, GateEvent::CallResolved(Some(call())));
        // An early signal must not skip the setup screen
        assert_eq!(gate.view(), View::Setup);
    }

    #[test]
    fn test_remount_resets_inputs_and_setup_flag() {
        let mut gate = SessionGate::new();
        let first = gate.mount_id();
        gate.apply(first, GateEvent::UserLoaded(None));
        gate.apply(first, GateEvent::CallResolved(Some(call())));
        gate.apply(first, GateEvent::SetupCompleted);
        assert_eq!(gate.view(), View::Room);

        let second = gate.remount();
        assert_ne!(first, second);
        assert_eq!(gate.view(), View::Loading);
        assert!(!gate.setup().is_complete());
        assert!(gate.call().is_none());
        assert!(gate.principal().is_none());
    }

    #[test]
    fn test_events_for_stale_mount_are_discarded() {
        let mut gate = SessionGate::new();
        let first = gate.mount_id();
        let second = gate.remount();

        assert_eq!(
            gate.apply(first, GateEvent::CallResolved(None)),
            Applied::StaleMount
        );
        assert_eq!(gate.apply(first, GateEvent::UserLoaded(None)), Applied::StaleMount);
        assert_eq!(gate.view(), View::Loading);

        gate.apply(second, GateEvent::UserLoaded(None));
        assert_eq!(
            gate.apply(second, GateEvent::CallResolved(Some(call()))),
            Applied::Changed(View::Setup)
        );
    }

    #[test]
    fn test_events_after_unmount_are_discarded() {
        let mut gate = SessionGate::new();
        let mount = gate.mount_id();
        gate.apply(mount, GateEvent::UserLoaded(None));
        gate.unmount();

        assert_eq!(
            gate.apply(mount, GateEvent::CallResolved(Some(call()))),
            Applied::Unmounted
        );
        assert_eq!(gate.view(), View::Loading);
        assert!(!gate.is_mounted());

        let next = gate.remount();
        assert!(gate.is_mounted());
        assert_eq!(
            gate.apply(next, GateEvent::UserLoaded(None)),
            Applied::NoEffect
        );
    }
}
