//! In-process session client driven by the caller
//!
//! [`ScriptedSessionClient`] stands in for the remote voice-AI session in
//! tests and in transcript replay: the caller pushes [`SessionEvent`]s with
//! [`emit`](ScriptedSessionClient::emit) and can make `start` fail.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::mpsc;

use super::{SessionEvent, TransportError, VoiceSessionClient};

#[derive(Debug)]
pub struct ScriptedSessionClient {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<SessionEvent>>>,
    ready: AtomicBool,
    start_failure: Mutex<Option<String>>,
    started: Mutex<Vec<String>>,
    stops: AtomicUsize,
}

impl ScriptedSessionClient {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            ready: AtomicBool::new(true),
            start_failure: Mutex::new(None),
            started: Mutex::new(Vec::new()),
            stops: AtomicUsize::new(0),
        }
    }

    /// Client that reports it failed to initialize
    pub fn not_ready() -> Self {
        let client = Self::new();
        client.ready.store(false, Ordering::SeqCst);
        client
    }

    /// Make every following `start` fail with `message`
    pub fn fail_start(&self, message: impl Into<String>) {
        *self.start_failure.lock() = Some(message.into());
    }

    /// Push an event to current subscribers
    ///
    /// Returns the number of subscribers that received it. Subscribers whose
    /// receiver was dropped are forgotten.
    pub fn emit(&self, event: SessionEvent) -> usize {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        subscribers.len()
    }

    /// Targets passed to successful `start` calls, oldest first
    pub fn started_targets(&self) -> Vec<String> {
        self.started.lock().clone()
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| !tx.is_closed());
        subscribers.len()
    }
}

impl Default for ScriptedSessionClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VoiceSessionClient for ScriptedSessionClient {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn start(&self, target: &str) -> Result<(), TransportError> {
        if let Some(message) = self.start_failure.lock().clone() {
            return Err(TransportError::new(message));
        }
        self.started.lock().push(target.to_string());
        Ok(())
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<SessionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn start_records_target_until_failure_is_scripted() {
        let client = ScriptedSessionClient::new();
        client.start("asst_1").await.unwrap();
        client.fail_start("network down");
        let err = client.start("asst_2").await.unwrap_err();
        assert_eq!(err.message, "network down");
        assert_eq!(client.started_targets(), vec!["asst_1".to_string()]);
    }

    #[tokio::test]
    async fn emit_reaches_subscribers_only() {
        let client = ScriptedSessionClient::new();
        assert_eq!(client.emit(SessionEvent::CallStart), 0);

        let mut rx = client.subscribe();
        assert_eq!(client.emit(SessionEvent::SpeechStart), 1);
        assert_eq!(rx.recv().await.unwrap(), SessionEvent::SpeechStart);

        drop(rx);
        assert_eq!(client.emit(SessionEvent::SpeechEnd), 0);
        assert_eq!(client.subscriber_count(), 0);

        client.stop();
        client.stop();
        assert_eq!(client.stop_count(), 2);
    }

    #[tokio::test]
    async fn slow_subscriber_keeps_every_event() {
        let client = ScriptedSessionClient::new();
        let mut rx = client.subscribe();
        for level in 0..2_000 {
            client.emit(SessionEvent::VolumeLevel(level as f32));
        }
        client.emit(SessionEvent::CallEnd);

        let mut received = 0;
        while let Some(event) = rx.recv().await {
            if event == SessionEvent::CallEnd {
                break;
            }
            assert_eq!(event, SessionEvent::VolumeLevel(received as f32));
            received += 1;
        }
        assert_eq!(received, 2_000);
    }
}
