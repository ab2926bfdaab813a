//! Top-level support session
//!
//! [`SupportCoordinator`] composes the call controller and the media capture
//! engine. The two share no state; the coordinator only sequences them:
//! capture starts once when the session is mounted, calls are started and
//! ended on user request, and unmounting (or dropping the coordinator) tears
//! both down.

use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

use crate::agent::{AgentName, AgentProfile};
use crate::call::CallStatus;
use crate::config::ClientConfig;
use crate::controller::CallSessionController;
use crate::conversation::ChatEntry;
use crate::error::ClientResult;
use crate::media::{MediaCaptureEngine, MediaDevices, StreamView};
use crate::transport::VoiceSessionClient;

/// Everything a presentation layer renders
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportSnapshot {
    pub status: CallStatus,
    pub status_label: &'static str,
    pub can_start_call: bool,
    pub can_end_call: bool,
    pub current_agent: AgentName,
    pub agent: &'static AgentProfile,
    pub speaking: bool,
    pub entries: Vec<ChatEntry>,
    pub has_stream: bool,
    pub audio_enabled: bool,
    pub video_enabled: bool,
    pub audio_level: f32,
    pub media_advisory: Option<&'static str>,
}

pub struct SupportCoordinator {
    config: ClientConfig,
    controller: CallSessionController,
    media: MediaCaptureEngine,
    mounted: AtomicBool,
}

impl SupportCoordinator {
    /// Compose a session from a complete configuration
    ///
    /// # Errors
    ///
    /// `MissingConfiguration` when the public key or call target is absent,
    /// `InvalidRequest` when media settings are unusable.
    pub fn new(
        client: Arc<dyn VoiceSessionClient>,
        devices: Arc<dyn MediaDevices>,
        config: ClientConfig,
    ) -> ClientResult<Self> {
        config.validate()?;
        let controller = CallSessionController::new(client, &config);
        let media = MediaCaptureEngine::new(devices, config.media.clone());
        Ok(Self {
            config,
            controller,
            media,
            mounted: AtomicBool::new(false),
        })
    }

    /// Start local capture; only the first call has an effect
    ///
    /// A device failure is returned and also kept as the media advisory;
    /// the session stays usable for calls either way.
    pub async fn mount(&self) -> ClientResult<()> {
        if self.mounted.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        info!("Support session mounted");
        if let Err(e) = self.media.start_stream().await {
            warn!("Continuing without local capture: {}", e);
            return Err(e);
        }
        Ok(())
    }

    /// Start a call against the configured target
    pub async fn start_call(&self) -> ClientResult<()> {
        let target = self.config.call_target().unwrap_or_default();
        self.controller.start_call(target).await
    }

    /// Start a call against an explicit assistant or squad id
    pub async fn start_call_with(&self, target: &str) -> ClientResult<()> {
        self.controller.start_call(target).await
    }

    pub fn end_call(&self) {
        self.controller.end_call();
    }

    pub fn toggle_audio(&self) -> Option<bool> {
        self.media.toggle_audio()
    }

    pub fn toggle_video(&self) -> Option<bool> {
        self.media.toggle_video()
    }

    pub fn controller(&self) -> &CallSessionController {
        &self.controller
    }

    pub fn media(&self) -> &MediaCaptureEngine {
        &self.media
    }

    /// Read-only stream handle for a video surface
    pub fn stream_view(&self) -> Option<StreamView> {
        self.media.stream_view()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> SupportSnapshot {
        let status = self.controller.status();
        let current_agent = self.controller.current_agent();
        let media = self.media.snapshot();
        SupportSnapshot {
            status,
            status_label: status.label(),
            can_start_call: status.can_start_call(),
            can_end_call: status.can_end_call(),
            current_agent,
            agent: current_agent.profile(),
            speaking: self.controller.is_speaking(),
            entries: self.controller.entries(),
            has_stream: media.has_stream,
            audio_enabled: media.audio_enabled,
            video_enabled: media.video_enabled,
            audio_level: media.audio_level,
            media_advisory: media.notice.map(|n| n.advisory()),
        }
    }

    /// End any call and release capture; idempotent
    pub fn unmount(&self) {
        self.controller.shutdown();
        self.media.stop_stream();
        if self.mounted.swap(false, Ordering::SeqCst) {
            info!("Support session unmounted");
        }
    }
}

impl Drop for SupportCoordinator {
    fn drop(&mut self) {
        self.unmount();
    }
}
