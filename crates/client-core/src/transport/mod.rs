//! Remote voice session boundary
//!
//! The voice-AI session (connection, audio codec, speech-to-text) is an
//! external collaborator. This module defines the narrow surface the call
//! controller consumes:
//!
//! - [`VoiceSessionClient`] - `start(target)`, `stop()` and a typed event
//!   subscription
//! - [`SessionEvent`] - the named events pushed by the remote session
//! - [`SessionMessage`] - payload of the `message` event
//!
//! Each call attempt takes a fresh subscription backed by its own unbounded
//! [`tokio::sync::mpsc`] channel. Events sent before the attempt are never
//! observed by it, a burst is never dropped however far the consumer falls
//! behind, and dropping the receiver is the unsubscribe.
//!
//! # Parsing named events
//!
//! Transports that receive raw `(name, json)` pairs can use
//! [`SessionEvent::from_named`]:
//!
//! ```rust
//! use helpdesk_client_core::transport::{SessionEvent, TranscriptType};
//! use serde_json::json;
//!
//! let event = SessionEvent::from_named(
//!     "message",
//!     json!({"type": "transcript", "role": "user", "transcript": "hi", "transcriptType": "final"}),
//! ).unwrap();
//!
//! match event {
//!     SessionEvent::Message(msg) => assert_eq!(msg.transcript_type, Some(TranscriptType::Final)),
//!     _ => unreachable!(),
//! }
//! ```

pub mod scripted;

pub use scripted::ScriptedSessionClient;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::agent::AgentName;
use crate::conversation::Role;
use crate::error::{ClientError, ClientResult};

/// Whether a transcript fragment may still be revised
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptType {
    /// Incremental recognition result, transient
    Partial,
    /// Settled result, safe to persist
    Final,
}

/// Payload of a `message` event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub transcript_type: Option<TranscriptType>,
    /// Upstream instant of the fragment; redeliveries carry the same value
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl SessionMessage {
    /// Build a transcript message stamped with the current instant
    pub fn transcript(
        role: Role,
        text: impl Into<String>,
        transcript_type: TranscriptType,
    ) -> Self {
        Self {
            kind: "transcript".to_string(),
            role: Some(role),
            transcript: Some(text.into()),
            transcript_type: Some(transcript_type),
            timestamp: Some(Utc::now()),
        }
    }

    /// Final, non-empty transcript text, if this message carries one
    pub fn final_transcript(&self) -> Option<&str> {
        if self.kind != "transcript" || self.transcript_type != Some(TranscriptType::Final) {
            return None;
        }
        self.transcript
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// Event pushed by the remote voice session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The call is connected
    CallStart,
    /// The call finished
    CallEnd,
    /// Transcript or other conversation message
    Message(SessionMessage),
    /// Remote agent started speaking
    SpeechStart,
    /// Remote agent stopped speaking
    SpeechEnd,
    /// The session failed; detail is opaque
    Error(String),
    /// Remote output volume, currently informational only
    VolumeLevel(f32),
    /// Primary agent handoff
    Handoff {
        to: AgentName,
        context: Option<String>,
    },
}

impl SessionEvent {
    /// Event name as used on the wire
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::CallStart => "call-start",
            SessionEvent::CallEnd => "call-end",
            SessionEvent::Message(_) => "message",
            SessionEvent::SpeechStart => "speech-start",
            SessionEvent::SpeechEnd => "speech-end",
            SessionEvent::Error(_) => "error",
            SessionEvent::VolumeLevel(_) => "volume-level",
            SessionEvent::Handoff { .. } => "handoff",
        }
    }

    /// Parse a named event and its JSON payload
    ///
    /// A `message` payload without a `timestamp` parses with
    /// `timestamp: None`, so a redelivered payload parses to an equal value.
    /// The call controller stamps it when the transcript is committed.
    pub fn from_named(name: &str, payload: Value) -> ClientResult<Self> {
        match name {
            "call-start" => Ok(SessionEvent::CallStart),
            "call-end" => Ok(SessionEvent::CallEnd),
            "speech-start" => Ok(SessionEvent::SpeechStart),
            "speech-end" => Ok(SessionEvent::SpeechEnd),
            "error" => Ok(SessionEvent::Error(error_detail(&payload))),
            "volume-level" => payload
                .as_f64()
                .map(|level| SessionEvent::VolumeLevel(level as f32))
                .ok_or_else(|| ClientError::invalid_request("volume-level payload must be a number")),
            "message" => parse_message(payload).map(SessionEvent::Message),
            "handoff" => parse_handoff(&payload),
            other => Err(ClientError::invalid_request(format!(
                "unknown session event '{}'",
                other
            ))),
        }
    }
}

fn error_detail(payload: &Value) -> String {
    match payload {
        Value::Null => "unknown error".to_string(),
        Value::String(s) => s.clone(),
        other => other
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| other.to_string()),
    }
}

fn parse_message(mut payload: Value) -> ClientResult<SessionMessage> {
    // Upstream sends either epoch millis or RFC 3339 here.
    let timestamp = match payload.get("timestamp") {
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        _ => None,
    };
    if let Some(obj) = payload.as_object_mut() {
        obj.remove("timestamp");
    }
    let mut message: SessionMessage = serde_json::from_value(payload)
        .map_err(|e| ClientError::invalid_request(format!("malformed message payload: {}", e)))?;
    message.timestamp = timestamp;
    Ok(message)
}

fn parse_handoff(payload: &Value) -> ClientResult<SessionEvent> {
    let to = payload
        .get("to")
        .and_then(Value::as_str)
        .ok_or_else(|| ClientError::invalid_request("handoff payload requires 'to'"))?
        .parse::<AgentName>()?;
    let context = payload
        .get("context")
        .and_then(Value::as_str)
        .map(str::to_string);
    Ok(SessionEvent::Handoff { to, context })
}

/// Why a session client could not start a call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Client of the remote voice-AI session
///
/// Implementations are injected into the call controller; there is no
/// process-wide instance.
#[async_trait]
pub trait VoiceSessionClient: Send + Sync {
    /// Whether the client finished initializing (credentials present, ...)
    fn is_ready(&self) -> bool {
        true
    }

    /// Start a call against `target` (assistant or squad identifier)
    async fn start(&self, target: &str) -> Result<(), TransportError>;

    /// Stop the current call; must be safe when nothing was started
    fn stop(&self);

    /// Fresh subscription to session events
    ///
    /// The receiver must see every event sent after this call, in order.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<SessionEvent>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_payloadless_events() {
        assert_eq!(SessionEvent::from_named("call-start", Value::Null).unwrap(), SessionEvent::CallStart);
        assert_eq!(SessionEvent::from_named("speech-end", Value::Null).unwrap(), SessionEvent::SpeechEnd);
        assert!(SessionEvent::from_named("hang", Value::Null).is_err());
    }

    #[test]
    fn message_timestamp_accepts_millis_and_rfc3339() {
        let from_millis = SessionEvent::from_named(
            "message",
            json!({"type": "transcript", "transcript": "a", "transcriptType": "final", "timestamp": 1_700_000_000_000i64}),
        )
        .unwrap();
        let from_text = SessionEvent::from_named(
            "message",
            json!({"type": "transcript", "transcript": "a", "transcriptType": "final", "timestamp": "2023-11-14T22:13:20Z"}),
        )
        .unwrap();
        let (SessionEvent::Message(a), SessionEvent::Message(b)) = (from_millis, from_text) else {
            panic!("expected message events");
        };
        assert_eq!(a.timestamp, b.timestamp);
        assert!(a.role.is_none());
    }

    #[test]
    fn only_final_transcripts_are_committable() {
        let partial = SessionMessage::transcript(Role::User, "res", TranscriptType::Partial);
        assert_eq!(partial.final_transcript(), None);

        let blank = SessionMessage::transcript(Role::User, "   ", TranscriptType::Final);
        assert_eq!(blank.final_transcript(), None);

        let mut status = SessionMessage::transcript(Role::User, "x", TranscriptType::Final);
        status.kind = "status-update".into();
        assert_eq!(status.final_transcript(), None);

        let done = SessionMessage::transcript(Role::User, " reset my password ", TranscriptType::Final);
        assert_eq!(done.final_transcript(), Some("reset my password"));
    }

    #[test]
    fn error_and_handoff_payloads() {
        let err = SessionEvent::from_named("error", json!({"message": "ice failed"})).unwrap();
        assert_eq!(err, SessionEvent::Error("ice failed".into()));

        let handoff = SessionEvent::from_named("handoff", json!({"to": "Sam", "context": "vpn issue"})).unwrap();
        assert_eq!(
            handoff,
            SessionEvent::Handoff { to: AgentName::Sam, context: Some("vpn issue".into()) }
        );
        assert!(SessionEvent::from_named("handoff", json!({})).is_err());
        assert_eq!(SessionEvent::from_named("volume-level", json!(0.4)).unwrap().name(), "volume-level");
    }

    #[test]
    fn timestampless_payload_parses_identically_on_redelivery() {
        let payload = json!({"type": "transcript", "role": "user", "transcript": "reset my password", "transcriptType": "final"});
        let first = SessionEvent::from_named("message", payload.clone()).unwrap();
        let again = SessionEvent::from_named("message", payload).unwrap();
        assert_eq!(first, again);

        let SessionEvent::Message(message) = first else {
            panic!("expected a message event");
        };
        assert_eq!(message.timestamp, None);
        assert_eq!(message.final_transcript(), Some("reset my password"));
    }
}
