//! Call session controller
//!
//! Owns the call lifecycle state machine and the conversation log. Each call
//! attempt binds to the injected [`VoiceSessionClient`] through a fresh event
//! subscription that is consumed by a background pump task. The pump tags
//! events with the call generation it was created for, so events belonging
//! to a superseded attempt never touch state, and it exits once the call
//! reaches a terminal status.
//!
//! All state lives behind one [`parking_lot::Mutex`]; every handler runs to
//! completion under it, so mutations are never interleaved mid-update.
//! Status changes are checked against [`CallStatus::can_transition_to`] (or
//! [`CallStatus::can_restart_to`] for a new start request) and illegal ones
//! are refused.
//! Notifications are published as [`CallEvent`]s while the lock is held,
//! which keeps their order identical to the order of state changes.
//!
//! ```rust
//! use std::sync::Arc;
//! use helpdesk_client_core::{CallSessionController, CallStatus, ClientConfig};
//! use helpdesk_client_core::transport::{ScriptedSessionClient, SessionEvent};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let client = Arc::new(ScriptedSessionClient::new());
//! let controller = CallSessionController::new(client.clone(), &ClientConfig::new());
//!
//! controller.start_call("asst_ram").await.unwrap();
//! assert_eq!(controller.status(), CallStatus::Connecting);
//!
//! controller.apply_event(SessionEvent::CallStart);
//! assert_eq!(controller.status(), CallStatus::Active);
//!
//! controller.end_call();
//! assert_eq!(controller.status(), CallStatus::Ended);
//! # }
//! ```

use chrono::Utc;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::agent::AgentName;
use crate::call::CallStatus;
use crate::config::ClientConfig;
use crate::conversation::{ChatEntry, ConversationLog, Message, TransferMessage};
use crate::error::{ClientError, ClientResult};
use crate::events::CallEvent;
use crate::transport::{SessionEvent, SessionMessage, VoiceSessionClient};

struct CallState {
    status: CallStatus,
    current_agent: AgentName,
    speaking: bool,
    log: ConversationLog,
    /// Incremented on every start request
    generation: u64,
}

struct ControllerInner {
    client: Arc<dyn VoiceSessionClient>,
    state: Mutex<CallState>,
    events_tx: broadcast::Sender<CallEvent>,
    /// Session events the pump has finished handling
    processed_tx: watch::Sender<u64>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

/// Drives one support call at a time against an injected session client
pub struct CallSessionController {
    inner: Arc<ControllerInner>,
}

impl CallSessionController {
    pub fn new(client: Arc<dyn VoiceSessionClient>, config: &ClientConfig) -> Self {
        let (events_tx, _) = broadcast::channel(config.event_buffer.max(1));
        let (processed_tx, _) = watch::channel(0);
        Self {
            inner: Arc::new(ControllerInner {
                client,
                state: Mutex::new(CallState {
                    status: CallStatus::Idle,
                    current_agent: AgentName::default_agent(),
                    speaking: false,
                    log: ConversationLog::new(),
                    generation: 0,
                }),
                events_tx,
                processed_tx,
                pump: Mutex::new(None),
            }),
        }
    }

    /// Start a new call against `target`
    ///
    /// Clears the previous conversation, resets the current agent and moves
    /// to `connecting`. The event subscription is taken before the session
    /// is asked to start, so an early `call-start` is never missed.
    ///
    /// # Errors
    ///
    /// - `InvalidState` if a call is already connecting or live (state is
    ///   left untouched)
    /// - `InvalidRequest` if `target` is blank or the session client is not
    ///   initialized (status becomes `error`)
    /// - `SessionError` if the session refuses to start (status becomes
    ///   `error`)
    pub async fn start_call(&self, target: &str) -> ClientResult<()> {
        let generation = {
            let mut state = self.inner.state.lock();
            if state.status.is_in_progress() {
                return Err(ClientError::invalid_state("start call", state.status));
            }

            let reason = if target.trim().is_empty() {
                Some("no assistant id provided")
            } else if !self.inner.client.is_ready() {
                Some("voice session client not initialized")
            } else {
                None
            };
            if let Some(reason) = reason {
                error!("Cannot start call: {}", reason);
                self.inner.restart_status(&mut state, CallStatus::Error);
                return Err(ClientError::invalid_request(reason));
            }

            state.generation += 1;
            self.inner.reset_for_new_call(&mut state);
            self.inner.restart_status(&mut state, CallStatus::Connecting);
            state.generation
        };

        self.attach(generation);
        info!("Starting call with target {}", target);

        if let Err(e) = self.inner.client.start(target).await {
            error!("Error starting call: {}", e);
            let mut state = self.inner.state.lock();
            if state.generation == generation && state.status.is_in_progress() {
                self.inner.set_speaking(&mut state, false);
                self.inner.set_status(&mut state, CallStatus::Error);
                drop(state);
                self.inner.detach();
            }
            return Err(ClientError::session_error(e.message));
        }
        Ok(())
    }

    /// End the current call
    ///
    /// Stops the session, clears the speaking indicator and keeps the log
    /// for display. A no-op once the call is already `ended` or `error`.
    pub fn end_call(&self) {
        {
            let mut state = self.inner.state.lock();
            if state.status.is_terminal() {
                debug!("end_call ignored, call already {}", state.status);
                return;
            }
            self.inner.set_speaking(&mut state, false);
            self.inner.set_status(&mut state, CallStatus::Ended);
        }
        self.inner.detach();
        self.inner.client.stop();
        info!("Call ended by user");
    }

    /// Apply a session event to the current call
    ///
    /// Events normally arrive through the per-call subscription; this entry
    /// point lets callers feed events they received some other way.
    pub fn apply_event(&self, event: SessionEvent) {
        let mut state = self.inner.state.lock();
        self.inner.handle_locked(&mut state, event);
    }

    /// Stop the call (if any) and release the event subscription
    pub fn shutdown(&self) {
        let in_progress = self.inner.state.lock().status.is_in_progress();
        if in_progress {
            self.end_call();
        } else {
            self.inner.detach();
        }
    }

    pub fn status(&self) -> CallStatus {
        self.inner.state.lock().status
    }

    pub fn current_agent(&self) -> AgentName {
        self.inner.state.lock().current_agent
    }

    pub fn is_speaking(&self) -> bool {
        self.inner.state.lock().speaking
    }

    /// Snapshot of the conversation log
    pub fn entries(&self) -> Vec<ChatEntry> {
        self.inner.state.lock().log.entries().to_vec()
    }

    pub fn message_count(&self) -> usize {
        self.inner.state.lock().log.len()
    }

    /// Receiver that changes whenever the log length changes
    pub fn scroll_cue(&self) -> watch::Receiver<u64> {
        self.inner.state.lock().log.scroll_cue()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<CallEvent> {
        self.inner.events_tx.subscribe()
    }

    /// Running count of session events the subscription pump has handled
    ///
    /// Counts every event delivered to the current call attempt, including
    /// those the state machine ignores. Events from a superseded attempt are
    /// not counted. The value is bumped after the event's state changes are
    /// visible through the accessors.
    pub fn processed_events(&self) -> watch::Receiver<u64> {
        self.inner.processed_tx.subscribe()
    }

    /// Number of call attempts made so far
    pub fn generation(&self) -> u64 {
        self.inner.state.lock().generation
    }

    fn attach(&self, generation: u64) {
        let mut events = self.inner.client.subscribe();
        let weak: Weak<ControllerInner> = Arc::downgrade(&self.inner);

        let handle = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let Some(inner) = weak.upgrade() else { break };
                if !inner.handle_tagged(generation, event) {
                    break;
                }
            }
            debug!("Session event pump for call {} exited", generation);
        });

        if let Some(previous) = self.inner.pump.lock().replace(handle) {
            previous.abort();
        }
    }
}

impl Drop for CallSessionController {
    fn drop(&mut self) {
        let in_progress = self.inner.state.lock().status.is_in_progress();
        self.inner.detach();
        if in_progress {
            self.inner.client.stop();
        }
    }
}

impl ControllerInner {
    /// Returns `false` once this generation's subscription should be dropped
    fn handle_tagged(&self, generation: u64, event: SessionEvent) -> bool {
        let mut state = self.state.lock();
        if state.generation != generation {
            debug!(
                "Ignoring {} from superseded call {} (current {})",
                event.name(),
                generation,
                state.generation
            );
            return false;
        }
        self.handle_locked(&mut state, event);
        let keep_going = !state.status.is_terminal();
        drop(state);

        self.processed_tx.send_modify(|count| *count += 1);
        keep_going
    }

    fn handle_locked(&self, state: &mut CallState, event: SessionEvent) {
        if state.status.is_terminal() {
            debug!("Ignoring late {} after call {}", event.name(), state.status);
            return;
        }

        match event {
            SessionEvent::CallStart => {
                if state.status != CallStatus::Connecting {
                    debug!("Ignoring call-start while {}", state.status);
                    return;
                }
                info!("Call started");
                self.set_agent(state, AgentName::default_agent());
                if !state.log.is_empty() {
                    state.log.clear();
                    self.publish(CallEvent::LogCleared);
                }
                self.set_status(state, CallStatus::Active);
            }
            SessionEvent::CallEnd => {
                info!("Call ended");
                self.set_speaking(state, false);
                self.set_status(state, CallStatus::Ended);
            }
            SessionEvent::Message(message) => self.ingest_message(state, message),
            SessionEvent::SpeechStart => self.set_speaking(state, true),
            SessionEvent::SpeechEnd => self.set_speaking(state, false),
            SessionEvent::Error(detail) => {
                error!("Voice session error: {}", detail);
                self.set_speaking(state, false);
                self.set_status(state, CallStatus::Error);
            }
            SessionEvent::VolumeLevel(level) => {
                self.publish(CallEvent::VolumeLevel { level });
            }
            SessionEvent::Handoff { to, context } => self.handoff(state, to, context),
        }
    }

    fn ingest_message(&self, state: &mut CallState, message: SessionMessage) {
        if !state.status.is_active() {
            debug!("Ignoring message while {}", state.status);
            return;
        }
        let Some(text) = message.final_transcript() else {
            return;
        };
        let role = message.role.unwrap_or_default();
        let timestamp = match message.timestamp {
            Some(at) => at,
            // An unstamped repeat of the latest turn is a redelivery of it.
            None => match state.log.latest().and_then(ChatEntry::as_message) {
                Some(last) if last.role == role && last.content == text => last.timestamp,
                _ => Utc::now(),
            },
        };
        let entry: ChatEntry =
            Message::new(role, text, timestamp, Some(state.current_agent)).into();

        if state.log.append(entry.clone()) {
            self.publish(CallEvent::EntryAppended { entry });
        }
    }

    fn handoff(&self, state: &mut CallState, to: AgentName, context: Option<String>) {
        if state.status != CallStatus::Active {
            debug!("Ignoring handoff to {} while {}", to, state.status);
            return;
        }
        let from = state.current_agent;
        if from == to {
            debug!("Ignoring handoff to current agent {}", to);
            return;
        }

        if !self.set_status(state, CallStatus::Transferring) {
            return;
        }
        info!("Transferring call from {} to {}", from, to);
        let marker: ChatEntry = TransferMessage::new(from, to, Utc::now(), context).into();
        if state.log.append(marker.clone()) {
            self.publish(CallEvent::EntryAppended { entry: marker });
        }
        self.set_agent(state, to);
        self.set_status(state, CallStatus::Active);
    }

    /// Clear everything a previous call left behind
    fn reset_for_new_call(&self, state: &mut CallState) {
        if !state.log.is_empty() {
            state.log.clear();
            self.publish(CallEvent::LogCleared);
        }
        self.set_agent(state, AgentName::default_agent());
        self.set_speaking(state, false);
    }

    /// Status change within the current call
    fn set_status(&self, state: &mut CallState, next: CallStatus) -> bool {
        let previous = state.status;
        if previous == next {
            return true;
        }
        if !previous.can_transition_to(next) {
            warn!("Refusing call status change {} -> {}", previous, next);
            return false;
        }
        self.apply_status(state, next);
        true
    }

    /// Status change made by a new start request
    fn restart_status(&self, state: &mut CallState, next: CallStatus) {
        let previous = state.status;
        if previous == next {
            return;
        }
        if !previous.can_restart_to(next) {
            warn!("Refusing call restart {} -> {}", previous, next);
            return;
        }
        self.apply_status(state, next);
    }

    fn apply_status(&self, state: &mut CallState, next: CallStatus) {
        let previous = state.status;
        state.status = next;
        debug!("Call status {} -> {}", previous, next);
        self.publish(CallEvent::StatusChanged { previous, current: next });
    }

    fn set_agent(&self, state: &mut CallState, to: AgentName) {
        let from = state.current_agent;
        if from != to {
            state.current_agent = to;
            self.publish(CallEvent::AgentChanged { from, to });
        }
    }

    fn set_speaking(&self, state: &mut CallState, speaking: bool) {
        if state.speaking != speaking {
            state.speaking = speaking;
            self.publish(CallEvent::SpeakingChanged { speaking });
        }
    }

    fn publish(&self, event: CallEvent) {
        trace!("Publishing {}", event.kind());
        // No receivers is fine.
        let _ = self.events_tx.send(event);
    }

    fn detach(&self) {
        if let Some(handle) = self.pump.lock().take() {
            handle.abort();
        }
    }
}
