//! Outbound call notifications
//!
//! The call controller publishes a [`CallEvent`] on a
//! [`tokio::sync::broadcast`] channel for every observable change: status
//! transitions, committed log entries, agent switches and the speaking
//! indicator. Presentation layers subscribe through
//! [`CallSessionController::subscribe_events`](crate::CallSessionController::subscribe_events)
//! and may lag; a lagging receiver skips events but the controller's
//! accessors always return current state.
//!
//! # Usage
//!
//! ```rust
//! use helpdesk_client_core::events::CallEvent;
//! use helpdesk_client_core::CallStatus;
//!
//! let event = CallEvent::StatusChanged {
//!     previous: CallStatus::Connecting,
//!     current: CallStatus::Active,
//! };
//! assert_eq!(event.kind(), "status-changed");
//! ```

use serde::Serialize;

use crate::agent::AgentName;
use crate::call::CallStatus;
use crate::conversation::ChatEntry;

/// Notification published by the call controller
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum CallEvent {
    /// Call status moved from `previous` to `current`
    StatusChanged {
        previous: CallStatus,
        current: CallStatus,
    },
    /// An entry was committed to the conversation log
    EntryAppended { entry: ChatEntry },
    /// The primary agent changed
    AgentChanged { from: AgentName, to: AgentName },
    /// The remote speaking indicator flipped
    SpeakingChanged { speaking: bool },
    /// Remote output volume reported by the session
    VolumeLevel { level: f32 },
    /// The log was emptied for a new call
    LogCleared,
}

impl CallEvent {
    /// Short name used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            CallEvent::StatusChanged { .. } => "status-changed",
            CallEvent::EntryAppended { .. } => "entry-appended",
            CallEvent::AgentChanged { .. } => "agent-changed",
            CallEvent::SpeakingChanged { .. } => "speaking-changed",
            CallEvent::VolumeLevel { .. } => "volume-level",
            CallEvent::LogCleared => "log-cleared",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_event_tag() {
        let json = serde_json::to_value(CallEvent::SpeakingChanged { speaking: true }).unwrap();
        assert_eq!(json["event"], "speaking-changed");
        assert_eq!(json["speaking"], true);
        assert_eq!(CallEvent::LogCleared.kind(), "log-cleared");
    }
}
