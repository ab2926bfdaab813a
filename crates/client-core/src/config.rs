//! Client configuration
//!
//! Builder-style settings for the support-call client:
//!
//! - **ClientConfig** - voice-AI credentials, call targets and channel sizing
//! - **MediaConfig** - capture and level-metering parameters
//!
//! ```text
//! ┌──────────────────────────┐
//! │      ClientConfig        │
//! │ ┌──────────────────────┐ │
//! │ │ public key           │ │  • VAPI_PUBLIC_KEY
//! │ │ assistant / squad id │ │  • RAM_ASSISTANT_ID / VAPI_SQUAD_ID
//! │ │ MediaConfig         ─┼─┼─ • tick, gain, window, video
//! │ └──────────────────────┘ │
//! └──────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust
//! use helpdesk_client_core::config::{ClientConfig, MediaConfig};
//!
//! let config = ClientConfig::new()
//!     .with_public_key("pk_test")
//!     .with_assistant_id("asst_ram")
//!     .with_media(MediaConfig::default().with_request_video(false));
//!
//! assert_eq!(config.call_target(), Some("asst_ram"));
//! assert!(config.validate().is_ok());
//! assert!(!config.media.request_video);
//! ```
//!
//! Environment loading goes through a lookup function so callers (and
//! tests) decide where values come from:
//!
//! ```rust
//! use helpdesk_client_core::config::ClientConfig;
//!
//! let config = ClientConfig::from_lookup(|key| match key {
//!     "VAPI_PUBLIC_KEY" => Some("pk_live".to_string()),
//!     "VAPI_SQUAD_ID" => Some("squad_1".to_string()),
//!     _ => None,
//! });
//! assert_eq!(config.call_target(), Some("squad_1"));
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{ClientError, ClientResult};

pub const ENV_PUBLIC_KEY: &str = "VAPI_PUBLIC_KEY";
pub const ENV_SQUAD_ID: &str = "VAPI_SQUAD_ID";
pub const ENV_RAM_ASSISTANT_ID: &str = "RAM_ASSISTANT_ID";

/// Default capacity of the outbound call event channel
pub const DEFAULT_EVENT_BUFFER: usize = 256;

/// Capture and level-metering parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Period of the level sampling loop in milliseconds (one display frame)
    pub sample_interval_ms: u64,
    /// Multiplier applied to the RMS before clamping
    pub level_gain: f32,
    /// Number of most recent samples analysed per tick
    pub window_size: usize,
    /// Ask for a camera track on start (falls back to audio-only)
    pub request_video: bool,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: 16,
            level_gain: 3.0,
            window_size: 256,
            request_video: true,
        }
    }
}

impl MediaConfig {
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    pub fn with_sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_level_gain(mut self, gain: f32) -> Self {
        self.level_gain = gain;
        self
    }

    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }

    pub fn with_request_video(mut self, request_video: bool) -> Self {
        self.request_video = request_video;
        self
    }

    /// Check the values are usable by the sampler
    pub fn validate(&self) -> ClientResult<()> {
        if self.sample_interval_ms == 0 {
            return Err(ClientError::invalid_request("sample interval must be positive"));
        }
        if self.window_size == 0 {
            return Err(ClientError::invalid_request("analysis window must be non-empty"));
        }
        if !self.level_gain.is_finite() || self.level_gain <= 0.0 {
            return Err(ClientError::invalid_request("level gain must be a positive number"));
        }
        Ok(())
    }
}

/// Support-call client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Public key of the voice-AI account
    pub public_key: Option<String>,
    /// Assistant the call starts with (Ram)
    pub assistant_id: Option<String>,
    /// Multi-agent squad identifier
    pub squad_id: Option<String>,
    /// Media capture settings
    pub media: MediaConfig,
    /// Capacity of the outbound call event channel
    pub event_buffer: usize,
}

impl ClientConfig {
    /// Create a configuration with no credentials and default media settings
    pub fn new() -> Self {
        Self {
            public_key: None,
            assistant_id: None,
            squad_id: None,
            media: MediaConfig::default(),
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }

    /// Load settings from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through `lookup`; blank values count as absent
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Self {
            public_key: read(ENV_PUBLIC_KEY),
            assistant_id: read(ENV_RAM_ASSISTANT_ID),
            squad_id: read(ENV_SQUAD_ID),
            ..Self::new()
        }
    }

    pub fn with_public_key(mut self, key: impl Into<String>) -> Self {
        self.public_key = Some(key.into());
        self
    }

    pub fn with_assistant_id(mut self, id: impl Into<String>) -> Self {
        self.assistant_id = Some(id.into());
        self
    }

    pub fn with_squad_id(mut self, id: impl Into<String>) -> Self {
        self.squad_id = Some(id.into());
        self
    }

    pub fn with_media(mut self, media: MediaConfig) -> Self {
        self.media = media;
        self
    }

    /// Identifier a new call is started against
    ///
    /// The first assistant takes precedence; the squad id is the fallback.
    /// A blank value counts as absent on either side.
    pub fn call_target(&self) -> Option<&str> {
        let present = |id: &&str| !id.trim().is_empty();
        self.assistant_id
            .as_deref()
            .filter(present)
            .or_else(|| self.squad_id.as_deref().filter(present))
    }

    /// Check that the configuration can start calls
    pub fn validate(&self) -> ClientResult<()> {
        if self.public_key.as_deref().is_none_or(|k| k.trim().is_empty()) {
            return Err(ClientError::missing_configuration(ENV_PUBLIC_KEY));
        }
        if self.call_target().is_none() {
            return Err(ClientError::missing_configuration(format!(
                "{} or {}",
                ENV_RAM_ASSISTANT_ID, ENV_SQUAD_ID
            )));
        }
        if self.event_buffer == 0 {
            return Err(ClientError::invalid_request("event buffer must be non-zero"));
        }
        self.media.validate()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_defaults() {
        let media = MediaConfig::default();
        assert_eq!(media.sample_interval(), Duration::from_millis(16));
        assert_eq!(media.level_gain, 3.0);
        assert_eq!(media.window_size, 256);
        assert!(media.request_video);
        assert!(media.validate().is_ok());
        assert!(media.clone().with_window_size(0).validate().is_err());
        assert!(media.with_level_gain(f32::NAN).validate().is_err());
    }

    #[test]
    fn validate_reports_missing_fields() {
        let err = ClientConfig::new().validate().unwrap_err();
        assert_eq!(err, ClientError::missing_configuration(ENV_PUBLIC_KEY));

        let err = ClientConfig::new().with_public_key("pk").validate().unwrap_err();
        assert!(matches!(err, ClientError::MissingConfiguration { .. }));

        assert!(ClientConfig::new()
            .with_public_key("pk")
            .with_squad_id("squad")
            .validate()
            .is_ok());
    }

    #[test]
    fn assistant_takes_precedence_over_squad() {
        let config = ClientConfig::new().with_squad_id("squad").with_assistant_id("ram");
        assert_eq!(config.call_target(), Some("ram"));
    }

    #[test]
    fn blank_assistant_falls_back_to_squad() {
        let config = ClientConfig::new().with_assistant_id("  ").with_squad_id("squad");
        assert_eq!(config.call_target(), Some("squad"));

        let config = ClientConfig::new().with_assistant_id("").with_squad_id(" ");
        assert_eq!(config.call_target(), None);
    }

    #[test]
    fn lookup_ignores_blank_values() {
        let config = ClientConfig::from_lookup(|key| match key {
            ENV_PUBLIC_KEY => Some("  ".to_string()),
            ENV_RAM_ASSISTANT_ID => Some(" asst ".to_string()),
            _ => None,
        });
        assert_eq!(config.public_key, None);
        assert_eq!(config.assistant_id.as_deref(), Some("asst"));
    }
}
