//! Call lifecycle status
//!
//! A support call moves through a small state machine:
//!
//! ```text
//!  idle ──start──▶ connecting ──call-start──▶ active ◀──▶ transferring
//!    │                 │                        │              │
//!    └────── end / call-end / error ────────────┴──────────────┘
//!                              │
//!                              ▼
//!                       ended | error   (terminal for this call)
//! ```
//!
//! Once `ended` or `error` is reached, only an explicit new start request
//! leaves the terminal state (a fresh call attempt).

use serde::{Deserialize, Serialize};

/// Current status of the support call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    /// No call has been requested yet
    #[default]
    Idle,
    /// Start was requested, waiting for the remote call-start signal
    Connecting,
    /// Call is live
    Active,
    /// Primary agent is being handed off
    Transferring,
    /// Call finished normally
    Ended,
    /// Call failed
    Error,
}

impl CallStatus {
    /// Check if the call is live (media flowing, transcripts committed)
    pub fn is_active(&self) -> bool {
        matches!(self, CallStatus::Active | CallStatus::Transferring)
    }

    /// Check if the call reached a terminal status
    pub fn is_terminal(&self) -> bool {
        matches!(self, CallStatus::Ended | CallStatus::Error)
    }

    /// Check if a call attempt is currently in progress
    pub fn is_in_progress(&self) -> bool {
        matches!(
            self,
            CallStatus::Connecting | CallStatus::Active | CallStatus::Transferring
        )
    }

    /// Whether a transition from `self` to `next` is legal within one call
    ///
    /// Starting a fresh call from a terminal status is handled separately by
    /// the controller and is not considered a transition of the old call.
    pub fn can_transition_to(&self, next: CallStatus) -> bool {
        use CallStatus::*;
        match (self, next) {
            (Idle, Connecting) => true,
            (Connecting, Active) => true,
            (Active, Transferring) | (Transferring, Active) => true,
            (from, Ended | Error) => !from.is_terminal(),
            _ => false,
        }
    }

    /// Whether a new start request may move `self` to `next`
    ///
    /// A start leaves any status that is not in progress, for `connecting`
    /// when accepted or `error` when the request is rejected.
    pub fn can_restart_to(&self, next: CallStatus) -> bool {
        self.can_start_call() && matches!(next, CallStatus::Connecting | CallStatus::Error)
    }

    /// Human-readable label for status indicators
    pub fn label(&self) -> &'static str {
        match self {
            CallStatus::Idle => "Ready",
            CallStatus::Connecting => "Connecting...",
            CallStatus::Active => "Active",
            CallStatus::Transferring => "Transferring...",
            CallStatus::Ended => "Ended",
            CallStatus::Error => "Error",
        }
    }

    /// Whether a "start call" control should be enabled
    pub fn can_start_call(&self) -> bool {
        !self.is_in_progress()
    }

    /// Whether an "end call" control should be enabled
    pub fn can_end_call(&self) -> bool {
        matches!(self, CallStatus::Active | CallStatus::Connecting)
    }
}

impl std::fmt::Display for CallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CallStatus::Idle => "idle",
            CallStatus::Connecting => "connecting",
            CallStatus::Active => "active",
            CallStatus::Transferring => "transferring",
            CallStatus::Ended => "ended",
            CallStatus::Error => "error",
        };
        f.write_str(name)
    }
}
