//! Media capture engine
//!
//! Owns the local capture stream for the lifetime of a support session:
//!
//! 1. **Acquisition** - audio+video first, audio-only on failure (with a
//!    reduced-capability notice), a classified fatal error if audio fails
//!    too. One attempt per start request, never retried.
//! 2. **Metering** - a [`LevelSampler`] publishes the normalized loudness of
//!    the microphone on a watch channel while an audio track is present.
//! 3. **Toggles** - mute/camera flips over the live tracks.
//! 4. **Teardown** - stop tracks, cancel sampling, close the analyser,
//!    drop the stream. Idempotent, and also run on drop.
//!
//! ```rust
//! use std::sync::Arc;
//! use helpdesk_client_core::config::MediaConfig;
//! use helpdesk_client_core::media::{MediaCaptureEngine, MockMediaDevices};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let engine = MediaCaptureEngine::new(Arc::new(MockMediaDevices::new()), MediaConfig::default());
//! engine.start_stream().await.unwrap();
//! assert!(engine.snapshot().audio_enabled);
//!
//! engine.toggle_audio();
//! assert!(!engine.snapshot().audio_enabled);
//!
//! engine.stop_stream();
//! assert!(!engine.snapshot().has_stream);
//! # }
//! ```

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::MediaConfig;
use crate::error::{ClientError, ClientResult, DeviceErrorCause};
use crate::media::device::{
    CaptureConstraints, DeviceError, MediaDevices, MediaStream, StreamView, TrackKind,
};
use crate::media::level::AudioAnalyser;
use crate::media::sampler::LevelSampler;

/// Advisory text shown when the camera could not be acquired
pub const REDUCED_CAPABILITY_ADVISORY: &str = "Camera not available. Audio-only mode enabled.";

/// User-facing media condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "cause", rename_all = "kebab-case")]
pub enum MediaNotice {
    /// Running audio-only because video could not be acquired
    ReducedCapability,
    /// Capture failed entirely
    Failed(DeviceErrorCause),
}

impl MediaNotice {
    /// One-line advisory for this condition
    pub fn advisory(&self) -> &'static str {
        match self {
            MediaNotice::ReducedCapability => REDUCED_CAPABILITY_ADVISORY,
            MediaNotice::Failed(cause) => cause.advisory(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, MediaNotice::Failed(_))
    }
}

/// Point-in-time view of the engine state
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaSnapshot {
    pub has_stream: bool,
    pub audio_enabled: bool,
    pub video_enabled: bool,
    pub audio_level: f32,
    pub notice: Option<MediaNotice>,
}

#[derive(Default)]
struct EngineState {
    stream: Option<MediaStream>,
    audio_enabled: bool,
    video_enabled: bool,
    analyser: Option<Arc<Mutex<AudioAnalyser>>>,
    sampler: Option<LevelSampler>,
    notice: Option<MediaNotice>,
    /// Bumped by every teardown so an in-flight acquisition can tell it was
    /// overtaken
    epoch: u64,
}

pub struct MediaCaptureEngine {
    devices: Arc<dyn MediaDevices>,
    config: MediaConfig,
    state: Mutex<EngineState>,
    level_tx: Arc<watch::Sender<f32>>,
    start_lock: tokio::sync::Mutex<()>,
}

impl MediaCaptureEngine {
    pub fn new(devices: Arc<dyn MediaDevices>, config: MediaConfig) -> Self {
        let (level_tx, _) = watch::channel(0.0);
        Self {
            devices,
            config,
            state: Mutex::new(EngineState::default()),
            level_tx: Arc::new(level_tx),
            start_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Acquire capture devices and start metering
    ///
    /// A no-op when a stream is already held. Device failures are also
    /// recorded as a [`MediaNotice`] so callers that drop the error still
    /// see the advisory.
    ///
    /// # Errors
    ///
    /// `DeviceUnavailable` classified by cause when audio cannot be
    /// acquired. No stream is held afterwards.
    pub async fn start_stream(&self) -> ClientResult<()> {
        let _starting = self.start_lock.lock().await;

        let epoch = {
            let state = self.state.lock();
            if state.stream.is_some() {
                debug!("Capture stream already held");
                return Ok(());
            }
            state.epoch
        };

        let (stream, notice) = match self.acquire().await {
            Ok(acquired) => acquired,
            Err(e) => {
                error!("Error accessing media devices: {}", e);
                let mut state = self.state.lock();
                if state.epoch == epoch {
                    state.notice = Some(MediaNotice::Failed(e.cause));
                }
                return Err(ClientError::from(e));
            }
        };

        let mut state = self.state.lock();
        if state.epoch != epoch {
            debug!("Capture stopped during acquisition, releasing new stream");
            stream.stop_all();
            return Ok(());
        }

        state.audio_enabled = stream.has_audio();
        state.video_enabled = stream.has_video();
        if !state.video_enabled {
            info!("Running in audio-only mode");
        }

        if let Some(tap) = stream.audio_tap().cloned() {
            let analyser = Arc::new(Mutex::new(AudioAnalyser::new(tap, self.config.window_size)));
            state.sampler = Some(LevelSampler::spawn(
                analyser.clone(),
                self.config.sample_interval(),
                self.config.level_gain,
                self.level_tx.clone(),
            ));
            state.analyser = Some(analyser);
        }

        state.notice = notice;
        state.stream = Some(stream);
        Ok(())
    }

    async fn acquire(
        &self,
    ) -> Result<(MediaStream, Option<MediaNotice>), DeviceError> {
        if !self.config.request_video {
            let stream = self.devices.get_user_media(CaptureConstraints::audio_only()).await?;
            return Ok((stream, None));
        }

        match self.devices.get_user_media(CaptureConstraints::audio_video()).await {
            Ok(stream) => Ok((stream, None)),
            Err(e) => {
                warn!("Failed to get video, trying audio only: {}", e);
                let stream = self.devices.get_user_media(CaptureConstraints::audio_only()).await?;
                Ok((stream, Some(MediaNotice::ReducedCapability)))
            }
        }
    }

    /// Release every capture resource
    ///
    /// Tracks are stopped first, then the sampler is canceled (nothing is
    /// published after this returns), then the analyser is closed and the
    /// stream dropped. Safe to call any number of times.
    pub fn stop_stream(&self) {
        let mut state = self.state.lock();
        state.epoch += 1;
        let had_stream = state.stream.is_some();

        if let Some(stream) = state.stream.as_ref() {
            stream.stop_all();
        }
        if let Some(mut sampler) = state.sampler.take() {
            sampler.cancel();
        }
        if let Some(analyser) = state.analyser.take() {
            analyser.lock().close();
        }
        state.stream = None;
        state.audio_enabled = false;
        state.video_enabled = false;
        if state.notice == Some(MediaNotice::ReducedCapability) {
            state.notice = None;
        }
        self.level_tx.send_replace(0.0);

        if had_stream {
            info!("Capture stream stopped");
        }
    }

    /// Flip mute; `None` (and no effect) when no stream is held
    pub fn toggle_audio(&self) -> Option<bool> {
        self.toggle(TrackKind::Audio)
    }

    /// Flip the camera; `None` (and no effect) when no stream is held
    pub fn toggle_video(&self) -> Option<bool> {
        self.toggle(TrackKind::Video)
    }

    fn toggle(&self, kind: TrackKind) -> Option<bool> {
        let mut state = self.state.lock();
        let stream = state.stream.as_ref()?;
        stream.toggle_tracks(kind);
        let flag = match kind {
            TrackKind::Audio => &mut state.audio_enabled,
            TrackKind::Video => &mut state.video_enabled,
        };
        *flag = !*flag;
        debug!("{:?} enabled: {}", kind, *flag);
        Some(*flag)
    }

    pub fn snapshot(&self) -> MediaSnapshot {
        let state = self.state.lock();
        MediaSnapshot {
            has_stream: state.stream.is_some(),
            audio_enabled: state.audio_enabled,
            video_enabled: state.video_enabled,
            audio_level: *self.level_tx.borrow(),
            notice: state.notice,
        }
    }

    /// Latest published loudness in [0, 1]
    pub fn audio_level(&self) -> f32 {
        *self.level_tx.borrow()
    }

    pub fn subscribe_level(&self) -> watch::Receiver<f32> {
        self.level_tx.subscribe()
    }

    /// Read-only handle on the held stream, for rendering
    pub fn stream_view(&self) -> Option<StreamView> {
        self.state.lock().stream.as_ref().map(MediaStream::view)
    }

    pub fn notice(&self) -> Option<MediaNotice> {
        self.state.lock().notice
    }

    pub fn is_sampling(&self) -> bool {
        self.state
            .lock()
            .sampler
            .as_ref()
            .is_some_and(LevelSampler::is_running)
    }
}

impl Drop for MediaCaptureEngine {
    fn drop(&mut self) {
        self.stop_stream();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::platform::mock::MockMediaDevices;

    fn engine(devices: MockMediaDevices) -> (Arc<MockMediaDevices>, MediaCaptureEngine) {
        let devices = Arc::new(devices);
        let engine = MediaCaptureEngine::new(devices.clone(), MediaConfig::default());
        (devices, engine)
    }

    #[tokio::test]
    async fn full_capture_has_no_notice() {
        let (devices, engine) = engine(MockMediaDevices::new());
        engine.start_stream().await.unwrap();
        let snapshot = engine.snapshot();
        assert!(snapshot.has_stream && snapshot.audio_enabled && snapshot.video_enabled);
        assert_eq!(snapshot.notice, None);
        assert_eq!(devices.requests(), vec![CaptureConstraints::audio_video()]);
        assert!(engine.is_sampling());
    }

    #[tokio::test]
    async fn second_start_is_a_noop() {
        let (devices, engine) = engine(MockMediaDevices::new());
        engine.start_stream().await.unwrap();
        let first = engine.stream_view().unwrap();
        engine.start_stream().await.unwrap();
        assert_eq!(engine.stream_view().unwrap().id(), first.id());
        assert_eq!(devices.requests().len(), 1);
    }

    #[tokio::test]
    async fn audio_only_config_skips_video_request() {
        let devices = Arc::new(MockMediaDevices::new());
        let engine = MediaCaptureEngine::new(
            devices.clone(),
            MediaConfig::default().with_request_video(false),
        );
        engine.start_stream().await.unwrap();
        assert_eq!(devices.requests(), vec![CaptureConstraints::audio_only()]);
        assert!(!engine.snapshot().video_enabled);
        assert_eq!(engine.notice(), None);
    }

    #[tokio::test]
    async fn unknown_failure_records_advisory() {
        let (_devices, engine) = engine(
            MockMediaDevices::new()
                .fail_video(DeviceError::not_found("no camera"))
                .fail_audio(DeviceError::unknown("device busy")),
        );
        let err = engine.start_stream().await.unwrap_err();
        assert_eq!(err.device_cause(), Some(DeviceErrorCause::Unknown));
        let notice = engine.notice().unwrap();
        assert!(notice.is_fatal());
        assert_eq!(
            notice.advisory(),
            "Failed to access microphone. Please check permissions and try again."
        );
    }

    #[tokio::test]
    async fn toggles_without_stream_do_nothing() {
        let (_devices, engine) = engine(MockMediaDevices::new());
        assert_eq!(engine.toggle_audio(), None);
        assert_eq!(engine.toggle_video(), None);
        let snapshot = engine.snapshot();
        assert!(!snapshot.audio_enabled && !snapshot.video_enabled);
    }

    #[tokio::test]
    async fn video_toggle_flips_tracks_and_flag() {
        let (_devices, engine) = engine(MockMediaDevices::new());
        engine.start_stream().await.unwrap();
        let view = engine.stream_view().unwrap();

        assert_eq!(engine.toggle_video(), Some(false));
        assert!(!view.has_live_video());
        assert_eq!(engine.toggle_video(), Some(true));
        assert!(view.has_live_video());
    }

    #[tokio::test]
    async fn drop_releases_tracks() {
        let (devices, engine) = engine(MockMediaDevices::new());
        engine.start_stream().await.unwrap();
        let view = engine.stream_view().unwrap();
        drop(engine);
        assert!(view.tracks().iter().all(|t| !t.is_live()));
        assert_eq!(devices.released_tracks(), 2);
    }
}
