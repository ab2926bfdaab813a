//! Conversation log
//!
//! Ordered, append-only record of a call: spoken turns ([`Message`]) and
//! agent handoff markers ([`TransferMessage`]). Entries are immutable once
//! created; the log only grows during a call and is cleared in full when a
//! new call starts.
//!
//! Two entries are duplicates when they share an id, or when both carry
//! spoken content and content *and* timestamp are identical. Upstream
//! delivery may hand the same final transcript over more than once; the
//! second copy is dropped.
//!
//! Every change of length bumps a revision on a [`tokio::sync::watch`]
//! channel. Presentation layers use it as the scroll-to-latest cue.
//!
//! ```rust
//! use helpdesk_client_core::conversation::{ChatEntry, ConversationLog, Message, Role};
//! use chrono::Utc;
//!
//! let mut log = ConversationLog::new();
//! let at = Utc::now();
//! let first = Message::new(Role::User, "reset my password", at, None);
//! let again = Message::new(Role::User, "reset my password", at, None);
//!
//! assert!(log.append(ChatEntry::Message(first)));
//! assert!(!log.append(ChatEntry::Message(again)));
//! assert_eq!(log.len(), 1);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tokio::sync::watch;

use crate::agent::AgentName;

/// Speaker of a spoken turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    #[default]
    Assistant,
}

/// A committed spoken turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Agent that was primary when the turn was committed
    pub agent: Option<AgentName>,
}

impl Message {
    pub fn new(
        role: Role,
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
        agent: Option<AgentName>,
    ) -> Self {
        Self {
            id: new_entry_id(),
            role,
            content: content.into(),
            timestamp,
            agent,
        }
    }
}

/// A handoff marker between two agents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferMessage {
    pub id: String,
    pub from: AgentName,
    pub to: AgentName,
    pub timestamp: DateTime<Utc>,
    pub context: Option<String>,
}

impl TransferMessage {
    pub fn new(
        from: AgentName,
        to: AgentName,
        timestamp: DateTime<Utc>,
        context: Option<String>,
    ) -> Self {
        Self {
            id: new_entry_id(),
            from,
            to,
            timestamp,
            context,
        }
    }
}

/// One entry of the conversation log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ChatEntry {
    Message(Message),
    Transfer(TransferMessage),
}

impl ChatEntry {
    pub fn id(&self) -> &str {
        match self {
            ChatEntry::Message(m) => &m.id,
            ChatEntry::Transfer(t) => &t.id,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            ChatEntry::Message(m) => m.timestamp,
            ChatEntry::Transfer(t) => t.timestamp,
        }
    }

    /// Spoken content, `None` for handoff markers
    pub fn content(&self) -> Option<&str> {
        match self {
            ChatEntry::Message(m) => Some(&m.content),
            ChatEntry::Transfer(_) => None,
        }
    }

    pub fn as_message(&self) -> Option<&Message> {
        match self {
            ChatEntry::Message(m) => Some(m),
            ChatEntry::Transfer(_) => None,
        }
    }
}

impl From<Message> for ChatEntry {
    fn from(message: Message) -> Self {
        ChatEntry::Message(message)
    }
}

impl From<TransferMessage> for ChatEntry {
    fn from(transfer: TransferMessage) -> Self {
        ChatEntry::Transfer(transfer)
    }
}

fn new_entry_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Ordered, deduplicated sequence of chat entries
#[derive(Debug)]
pub struct ConversationLog {
    entries: Vec<ChatEntry>,
    ids: HashSet<String>,
    spoken: HashSet<(String, DateTime<Utc>)>,
    scroll_tx: watch::Sender<u64>,
}

impl ConversationLog {
    pub fn new() -> Self {
        let (scroll_tx, _) = watch::channel(0);
        Self {
            entries: Vec::new(),
            ids: HashSet::new(),
            spoken: HashSet::new(),
            scroll_tx,
        }
    }

    /// Check whether `entry` duplicates something already in the log
    pub fn is_duplicate(&self, entry: &ChatEntry) -> bool {
        if self.ids.contains(entry.id()) {
            return true;
        }
        match entry.content() {
            Some(content) => self
                .spoken
                .contains(&(content.to_string(), entry.timestamp())),
            None => false,
        }
    }

    /// Append an entry at the end
    ///
    /// Returns `false` (and leaves the log untouched) when the entry is a
    /// duplicate.
    pub fn append(&mut self, entry: ChatEntry) -> bool {
        if self.is_duplicate(&entry) {
            tracing::debug!("Dropping duplicate conversation entry {}", entry.id());
            return false;
        }
        self.ids.insert(entry.id().to_string());
        if let Some(content) = entry.content() {
            self.spoken.insert((content.to_string(), entry.timestamp()));
        }
        self.entries.push(entry);
        self.bump_scroll();
        true
    }

    /// Remove every entry
    pub fn clear(&mut self) {
        let had_entries = !self.entries.is_empty();
        self.entries.clear();
        self.ids.clear();
        self.spoken.clear();
        if had_entries {
            self.bump_scroll();
        }
    }

    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub fn latest(&self) -> Option<&ChatEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Receiver that changes every time the log length changes
    pub fn scroll_cue(&self) -> watch::Receiver<u64> {
        self.scroll_tx.subscribe()
    }

    fn bump_scroll(&self) {
        self.scroll_tx.send_modify(|revision| *revision += 1);
    }
}

impl Default for ConversationLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn spoken(content: &str, at: DateTime<Utc>) -> ChatEntry {
        Message::new(Role::User, content, at, Some(AgentName::Ram)).into()
    }

    #[test]
    fn length_counts_distinct_content_timestamp_pairs() {
        let base = Utc::now();
        let pairs = [
            ("hello", 0),
            ("hello", 0),
            ("hello", 1),
            ("my laptop is slow", 1),
            ("my laptop is slow", 1),
            ("hello", 0),
        ];
        let mut log = ConversationLog::new();
        for (content, offset) in pairs {
            log.append(spoken(content, base + Duration::seconds(offset)));
        }
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn preserves_arrival_order() {
        let base = Utc::now();
        let mut log = ConversationLog::new();
        log.append(spoken("second", base + Duration::seconds(5)));
        log.append(spoken("first", base));
        let contents: Vec<_> = log.entries().iter().filter_map(|e| e.content()).collect();
        assert_eq!(contents, vec!["second", "first"]);
    }

    #[test]
    fn rejects_reused_id() {
        let mut log = ConversationLog::new();
        let entry = spoken("hi", Utc::now());
        let mut copy = entry.clone();
        if let ChatEntry::Message(m) = &mut copy {
            m.content = "different".into();
        }
        assert!(log.append(entry));
        assert!(!log.append(copy));
    }

    #[test]
    fn transfers_with_equal_timestamps_are_kept() {
        let at = Utc::now();
        let mut log = ConversationLog::new();
        assert!(log.append(TransferMessage::new(AgentName::Ram, AgentName::Sam, at, None).into()));
        assert!(log.append(TransferMessage::new(AgentName::Sam, AgentName::Ram, at, None).into()));
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn scroll_cue_follows_length_changes() {
        let mut log = ConversationLog::new();
        let mut cue = log.scroll_cue();
        assert!(!cue.has_changed().unwrap());

        let at = Utc::now();
        log.append(spoken("one", at));
        assert!(cue.has_changed().unwrap());
        cue.borrow_and_update();

        log.append(spoken("one", at));
        assert!(!cue.has_changed().unwrap());

        log.clear();
        assert!(cue.has_changed().unwrap());
        assert!(log.is_empty());
        cue.borrow_and_update();

        log.clear();
        assert!(!cue.has_changed().unwrap());
    }

    #[test]
    #[tracing_test::traced_test]
    fn duplicate_is_logged_not_appended() {
        let at = Utc::now();
        let mut log = ConversationLog::new();
        log.append(spoken("hello", at));
        assert!(!log.append(spoken("hello", at)));
        assert!(logs_contain("Dropping duplicate conversation entry"));
    }

    #[test]
    fn clear_allows_same_pair_again() {
        let at = Utc::now();
        let mut log = ConversationLog::new();
        log.append(spoken("again", at));
        log.clear();
        assert!(log.append(spoken("again", at)));
    }

    #[test]
    fn entry_serializes_with_kind_tag() {
        let entry: ChatEntry =
            TransferMessage::new(AgentName::Ram, AgentName::Sam, Utc::now(), Some("vpn".into())).into();
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["kind"], "transfer");
        assert_eq!(json["to"], "Sam");
    }
}
