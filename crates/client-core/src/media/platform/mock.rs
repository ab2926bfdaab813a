//! Scripted capture devices for tests and headless runs
//!
//! By default every request succeeds with the requested tracks. Failures
//! are scripted per device kind, and the audio tap of the latest stream is
//! exposed so callers can feed synthetic waveforms.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

use crate::media::device::{
    AudioTap, CaptureConstraints, DEFAULT_TAP_CAPACITY, DeviceError, MediaDevices, MediaStream,
    MediaTrack, TrackKind,
};

#[derive(Debug, Default)]
pub struct MockMediaDevices {
    audio_failure: Option<DeviceError>,
    video_failure: Option<DeviceError>,
    requests: Mutex<Vec<CaptureConstraints>>,
    last_tap: Mutex<Option<AudioTap>>,
    released: Arc<AtomicUsize>,
}

impl MockMediaDevices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every request that includes audio
    pub fn fail_audio(mut self, err: DeviceError) -> Self {
        self.audio_failure = Some(err);
        self
    }

    /// Fail every request that includes video
    pub fn fail_video(mut self, err: DeviceError) -> Self {
        self.video_failure = Some(err);
        self
    }

    /// Device set without a camera
    pub fn without_camera() -> Self {
        Self::new().fail_video(DeviceError::not_found("Requested device not found"))
    }

    /// Constraints of every request so far
    pub fn requests(&self) -> Vec<CaptureConstraints> {
        self.requests.lock().clone()
    }

    /// Number of tracks whose hardware handle has been released
    pub fn released_tracks(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// Feed samples into the audio tap of the latest stream
    ///
    /// Returns `false` when no audio stream was handed out yet.
    pub fn push_samples(&self, samples: &[f32]) -> bool {
        match self.last_tap.lock().as_ref() {
            Some(tap) => {
                tap.push_samples(samples);
                true
            }
            None => false,
        }
    }

    fn track(&self, kind: TrackKind, label: &str) -> MediaTrack {
        let released = self.released.clone();
        MediaTrack::new(kind, label).with_stopper(move || {
            released.fetch_add(1, Ordering::SeqCst);
        })
    }
}

#[async_trait]
impl MediaDevices for MockMediaDevices {
    async fn get_user_media(
        &self,
        constraints: CaptureConstraints,
    ) -> Result<MediaStream, DeviceError> {
        self.requests.lock().push(constraints);

        if constraints.video {
            if let Some(err) = &self.video_failure {
                return Err(err.clone());
            }
        }
        if constraints.audio {
            if let Some(err) = &self.audio_failure {
                return Err(err.clone());
            }
        }

        let mut tracks = Vec::new();
        let mut tap = None;
        if constraints.audio {
            let track = self.track(TrackKind::Audio, "Mock Microphone");
            tap = Some(AudioTap::for_track(&track, DEFAULT_TAP_CAPACITY));
            tracks.push(track);
        }
        if constraints.video {
            tracks.push(self.track(TrackKind::Video, "Mock Camera"));
        }
        debug!("Mock capture granted {} track(s)", tracks.len());

        let mut stream = MediaStream::new(tracks);
        if let Some(tap) = tap {
            *self.last_tap.lock() = Some(tap.clone());
            stream = stream.with_audio_tap(tap);
        }
        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeviceErrorCause;

    #[tokio::test]
    async fn grants_requested_tracks() {
        let devices = MockMediaDevices::new();
        let stream = devices.get_user_media(CaptureConstraints::audio_video()).await.unwrap();
        assert!(stream.has_audio() && stream.has_video());
        assert!(devices.push_samples(&[0.1, 0.2]));
        assert_eq!(stream.audio_tap().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn camera_less_set_fails_video_only() {
        let devices = MockMediaDevices::without_camera();
        let err = devices.get_user_media(CaptureConstraints::audio_video()).await.unwrap_err();
        assert_eq!(err.cause, DeviceErrorCause::NotFound);
        let stream = devices.get_user_media(CaptureConstraints::audio_only()).await.unwrap();
        assert!(!stream.has_video());
    }
}
