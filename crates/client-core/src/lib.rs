//! Client-core: voice support call coordination
//!
//! This crate drives a live voice/video support call against a remote
//! voice-AI session and meters the local microphone while it runs.
//!
//! ## Components
//! ```text
//!  VoiceSessionClient ──events──▶ CallSessionController ──▶ ConversationLog
//!                                          │
//!                                  SupportCoordinator
//!                                          │
//!  MediaDevices ──tracks──▶ MediaCaptureEngine ──▶ audio level (watch)
//! ```
//!
//! - [`CallSessionController`] - call lifecycle state machine, transcript
//!   ingestion, speaking indicator, agent handoffs
//! - [`MediaCaptureEngine`] - device acquisition with audio-only fallback,
//!   RMS level sampling, mute/camera toggles, ordered teardown
//! - [`ConversationLog`] - ordered, deduplicated chat entries
//! - [`SupportCoordinator`] - composes the two engines for one session
//!
//! The remote session and the capture hardware are injected through the
//! [`VoiceSessionClient`] and [`MediaDevices`] traits; scripted
//! implementations of both ship with the crate.

pub mod agent;
pub mod call;
pub mod config;
pub mod controller;
pub mod conversation;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod media;
pub mod squad;
pub mod transport;

pub use agent::{AgentName, AgentProfile, roster};
pub use call::CallStatus;
pub use config::{ClientConfig, MediaConfig};
pub use controller::CallSessionController;
pub use conversation::{ChatEntry, ConversationLog, Message, Role, TransferMessage};
pub use coordinator::{SupportCoordinator, SupportSnapshot};
pub use error::{ClientError, ClientResult, DeviceErrorCause};
pub use events::CallEvent;
pub use media::{MediaCaptureEngine, MediaDevices, MediaNotice, MediaSnapshot};
pub use squad::SquadConfig;
pub use transport::{SessionEvent, SessionMessage, TranscriptType, VoiceSessionClient};
