//! Transcript replay
//!
//! Reads a recorded session as JSON lines, one named event per line:
//!
//! ```text
//! {"event": "call-start"}
//! {"event": "message", "payload": {"type": "transcript", "role": "user", "transcript": "hi", "transcriptType": "final"}}
//! {"event": "call-end"}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped. A `message` payload
//! without a `timestamp` is stamped when it is committed; a repeat of the
//! previous line counts as a redelivery.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

use helpdesk_client_core::{
    CallSessionController, ChatEntry, ClientConfig, SessionEvent,
    transport::ScriptedSessionClient,
};

/// Target used when neither the command line nor the environment names one
const DEFAULT_TARGET: &str = "replay";

/// Upper bound on waiting for the controller to catch up with the recording
const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct RecordedEvent {
    event: String,
    #[serde(default)]
    payload: Value,
}

/// Parse a recording into session events, skipping lines that do not parse
pub fn parse_recording(text: &str) -> Vec<SessionEvent> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .filter_map(|(index, line)| {
            let parsed = serde_json::from_str::<RecordedEvent>(line)
                .map_err(|e| e.to_string())
                .and_then(|recorded| {
                    SessionEvent::from_named(&recorded.event, recorded.payload)
                        .map_err(|e| e.to_string())
                });
            match parsed {
                Ok(event) => Some(event),
                Err(e) => {
                    warn!("Skipping line {}: {}", index + 1, e);
                    None
                }
            }
        })
        .collect()
}

/// Render one conversation entry as a transcript line
pub fn render_entry(entry: &ChatEntry) -> String {
    match entry {
        ChatEntry::Message(message) => {
            let speaker = match (message.role, message.agent) {
                (helpdesk_client_core::Role::User, _) => "You".to_string(),
                (_, Some(agent)) => agent.to_string(),
                (_, None) => "Assistant".to_string(),
            };
            format!(
                "[{}] {}: {}",
                message.timestamp.format("%H:%M:%S"),
                speaker,
                message.content
            )
        }
        ChatEntry::Transfer(transfer) => format!(
            "[{}] -- transferred from {} to {} --",
            transfer.timestamp.format("%H:%M:%S"),
            transfer.from,
            transfer.to
        ),
    }
}

/// Explicit target, else the configured call target, else a placeholder
fn resolve_target<'a>(explicit: Option<&'a str>, config: &'a ClientConfig) -> &'a str {
    explicit
        .filter(|t| !t.trim().is_empty())
        .or_else(|| config.call_target())
        .unwrap_or(DEFAULT_TARGET)
}

/// Play a recording through a controller and return the resulting log
pub async fn replay(
    path: &std::path::Path,
    target: Option<&str>,
    pace: Duration,
) -> Result<Vec<ChatEntry>> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let events = parse_recording(&text);
    info!("Replaying {} events from {}", events.len(), path.display());

    let config = ClientConfig::from_env();
    let target = resolve_target(target, &config);
    replay_events(events, &config, target, pace).await
}

/// Feed `events` to a fresh controller and return the log once it caught up
///
/// The log is read after the controller handled every delivered event or
/// the call reached a terminal status, whichever comes first.
pub async fn replay_events(
    events: Vec<SessionEvent>,
    config: &ClientConfig,
    target: &str,
    pace: Duration,
) -> Result<Vec<ChatEntry>> {
    let client = Arc::new(ScriptedSessionClient::new());
    let controller = CallSessionController::new(client.clone(), config);
    let mut processed = controller.processed_events();
    controller.start_call(target).await?;

    let mut delivered = 0u64;
    for event in events {
        delivered += client.emit(event) as u64;
        if !pace.is_zero() {
            tokio::time::sleep(pace).await;
        }
    }

    let settled = timeout(
        SETTLE_TIMEOUT,
        processed.wait_for(|count| *count >= delivered || controller.status().is_terminal()),
    )
    .await
    .is_ok_and(|waited| waited.is_ok());
    if !settled {
        warn!("Replay did not settle within {:?}", SETTLE_TIMEOUT);
    }

    info!("Replay finished with status {}", controller.status());
    let entries = controller.entries();
    controller.shutdown();
    Ok(entries)
}
