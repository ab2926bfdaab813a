//! Capture device abstraction
//!
//! A [`MediaDevices`] implementation turns a [`CaptureConstraints`] request
//! into a live [`MediaStream`]: a set of [`MediaTrack`]s plus, when audio is
//! present, an [`AudioTap`] the hardware callback writes raw samples into.
//!
//! Track mutation (`enabled` flips, `stop`) is crate-private: only the media
//! capture engine that owns the stream changes it. Everyone else gets a
//! [`StreamView`], which can be read and rendered but never stopped.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

use crate::error::{ClientError, DeviceErrorCause};

/// Samples retained by an [`AudioTap`]
pub const DEFAULT_TAP_CAPACITY: usize = 2048;

/// Kind of a capture track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Audio,
    Video,
}

type Stopper = Box<dyn FnOnce() + Send>;

/// One live capture track
pub struct MediaTrack {
    id: String,
    kind: TrackKind,
    label: String,
    enabled: Arc<AtomicBool>,
    live: AtomicBool,
    stopper: Mutex<Option<Stopper>>,
}

impl MediaTrack {
    pub fn new(kind: TrackKind, label: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            label: label.into(),
            enabled: Arc::new(AtomicBool::new(true)),
            live: AtomicBool::new(true),
            stopper: Mutex::new(None),
        }
    }

    /// Run `stop` exactly once when the track is stopped
    ///
    /// Platform implementations use this to release the hardware handle.
    pub fn with_stopper<F>(self, stop: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        *self.stopper.lock() = Some(Box::new(stop));
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Whether the track still holds its device
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    pub(crate) fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub(crate) fn stop(&self) {
        if self.live.swap(false, Ordering::SeqCst) {
            if let Some(stop) = self.stopper.lock().take() {
                stop();
            }
        }
    }
}

impl fmt::Debug for MediaTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaTrack")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("label", &self.label)
            .field("enabled", &self.is_enabled())
            .field("live", &self.is_live())
            .finish()
    }
}

/// Ring buffer of the most recent raw audio samples
///
/// The device callback pushes into it; the level analyser reads the latest
/// window. While the owning track is disabled, pushes record silence.
#[derive(Clone)]
pub struct AudioTap {
    samples: Arc<Mutex<VecDeque<f32>>>,
    capacity: usize,
    enabled: Arc<AtomicBool>,
}

impl AudioTap {
    /// Create a tap bound to `track`'s enabled flag
    pub fn for_track(track: &MediaTrack, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
            enabled: track.enabled.clone(),
        }
    }

    /// Append samples, dropping the oldest beyond capacity
    pub fn push_samples(&self, samples: &[f32]) {
        let muted = !self.enabled.load(Ordering::Relaxed);
        let mut buffer = self.samples.lock();
        let skip = samples.len().saturating_sub(self.capacity);
        for &sample in &samples[skip..] {
            if buffer.len() == self.capacity {
                buffer.pop_front();
            }
            buffer.push_back(if muted { 0.0 } else { sample });
        }
    }

    /// Copy the latest `window` samples into `out`
    ///
    /// Fewer samples are copied while the buffer is still filling.
    pub fn read_latest(&self, window: usize, out: &mut Vec<f32>) {
        out.clear();
        let buffer = self.samples.lock();
        let start = buffer.len().saturating_sub(window);
        out.extend(buffer.range(start..));
    }

    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl fmt::Debug for AudioTap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioTap")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

/// Live tracks acquired by one capture request
#[derive(Debug)]
pub struct MediaStream {
    id: String,
    tracks: Vec<Arc<MediaTrack>>,
    audio_tap: Option<AudioTap>,
}

impl MediaStream {
    pub fn new(tracks: Vec<MediaTrack>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tracks: tracks.into_iter().map(Arc::new).collect(),
            audio_tap: None,
        }
    }

    pub fn with_audio_tap(mut self, tap: AudioTap) -> Self {
        self.audio_tap = Some(tap);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tracks(&self) -> &[Arc<MediaTrack>] {
        &self.tracks
    }

    pub fn tracks_of(&self, kind: TrackKind) -> impl Iterator<Item = &Arc<MediaTrack>> {
        self.tracks.iter().filter(move |t| t.kind() == kind)
    }

    pub fn has_audio(&self) -> bool {
        self.tracks_of(TrackKind::Audio).next().is_some()
    }

    pub fn has_video(&self) -> bool {
        self.tracks_of(TrackKind::Video).next().is_some()
    }

    pub fn audio_tap(&self) -> Option<&AudioTap> {
        self.audio_tap.as_ref()
    }

    /// Non-owning, read-only handle for rendering
    pub fn view(&self) -> StreamView {
        StreamView {
            id: self.id.clone(),
            tracks: self.tracks.clone(),
        }
    }

    /// Flip `enabled` on every track of `kind`
    pub(crate) fn toggle_tracks(&self, kind: TrackKind) {
        for track in self.tracks_of(kind) {
            track.set_enabled(!track.is_enabled());
        }
    }

    pub(crate) fn stop_all(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }
}

/// Read-only view of a stream held by the capture engine
#[derive(Debug, Clone)]
pub struct StreamView {
    id: String,
    tracks: Vec<Arc<MediaTrack>>,
}

impl StreamView {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tracks(&self) -> &[Arc<MediaTrack>] {
        &self.tracks
    }

    pub fn has_live_video(&self) -> bool {
        self.tracks
            .iter()
            .any(|t| t.kind() == TrackKind::Video && t.is_live() && t.is_enabled())
    }
}

/// Which devices to request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConstraints {
    pub audio: bool,
    pub video: bool,
}

impl CaptureConstraints {
    pub fn audio_video() -> Self {
        Self { audio: true, video: true }
    }

    pub fn audio_only() -> Self {
        Self { audio: true, video: false }
    }
}

/// Classified capture failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{cause}: {message}")]
pub struct DeviceError {
    pub cause: DeviceErrorCause,
    pub message: String,
}

impl DeviceError {
    pub fn new(cause: DeviceErrorCause, message: impl Into<String>) -> Self {
        Self {
            cause,
            message: message.into(),
        }
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(DeviceErrorCause::PermissionDenied, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(DeviceErrorCause::NotFound, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(DeviceErrorCause::Unknown, message)
    }
}

impl From<DeviceError> for ClientError {
    fn from(err: DeviceError) -> Self {
        ClientError::device_unavailable(err.cause, err.message)
    }
}

/// Source of capture streams
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// Acquire live tracks matching `constraints`
    async fn get_user_media(
        &self,
        constraints: CaptureConstraints,
    ) -> Result<MediaStream, DeviceError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn stopper_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let track = MediaTrack::new(TrackKind::Audio, "mic").with_stopper(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        track.stop();
        track.stop();
        assert!(!track.is_live());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn tap_keeps_latest_samples() {
        let track = MediaTrack::new(TrackKind::Audio, "mic");
        let tap = AudioTap::for_track(&track, 4);
        tap.push_samples(&[0.1, 0.2, 0.3]);
        tap.push_samples(&[0.4, 0.5, 0.6]);

        let mut out = Vec::new();
        tap.read_latest(2, &mut out);
        assert_eq!(out, vec![0.5, 0.6]);
        tap.read_latest(10, &mut out);
        assert_eq!(out, vec![0.3, 0.4, 0.5, 0.6]);
    }

    #[test]
    fn disabled_track_feeds_silence() {
        let track = MediaTrack::new(TrackKind::Audio, "mic");
        let tap = AudioTap::for_track(&track, 8);
        track.set_enabled(false);
        tap.push_samples(&[0.9, -0.9]);

        let mut out = Vec::new();
        tap.read_latest(8, &mut out);
        assert_eq!(out, vec![0.0, 0.0]);
    }

    #[test]
    fn view_shares_track_state() {
        let stream = MediaStream::new(vec![
            MediaTrack::new(TrackKind::Audio, "mic"),
            MediaTrack::new(TrackKind::Video, "cam"),
        ]);
        let view = stream.view();
        assert!(view.has_live_video());

        stream.toggle_tracks(TrackKind::Video);
        assert!(!view.has_live_video());
        assert_eq!(view.id(), stream.id());
    }

    #[test]
    fn device_error_converts_to_client_error() {
        let err: ClientError = DeviceError::permission_denied("NotAllowedError").into();
        assert_eq!(err.device_cause(), Some(DeviceErrorCause::PermissionDenied));
    }
}
