//! CPAL-backed microphone capture
//!
//! cpal streams are not `Send`, so each capture runs on its own thread that
//! builds the input stream, reports readiness over a oneshot channel and
//! then parks until the track is stopped. cpal has no camera support; video
//! requests fail with `not-found`, which makes the engine fall back to
//! audio-only.

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SampleFormat, SizedSample, StreamConfig};
use tokio::sync::oneshot;
use tracing::{error, info};

use crate::media::device::{
    AudioTap, CaptureConstraints, DEFAULT_TAP_CAPACITY, DeviceError, MediaDevices, MediaStream,
    MediaTrack, TrackKind,
};

/// Default-host capture devices
#[derive(Debug, Clone)]
pub struct CpalMediaDevices {
    tap_capacity: usize,
}

impl CpalMediaDevices {
    pub fn new() -> Self {
        Self {
            tap_capacity: DEFAULT_TAP_CAPACITY,
        }
    }

}

impl Default for CpalMediaDevices {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a cpal error message onto a device error cause
fn classify(message: String) -> DeviceError {
    let lower = message.to_ascii_lowercase();
    if lower.contains("permission") || lower.contains("denied") || lower.contains("not allowed") {
        DeviceError::permission_denied(message)
    } else if lower.contains("not available") || lower.contains("not found") {
        DeviceError::not_found(message)
    } else {
        DeviceError::unknown(message)
    }
}

fn build_input<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    tap: AudioTap,
) -> Result<cpal::Stream, DeviceError>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let channels = usize::from(config.channels.max(1));
    let mut mono: Vec<f32> = Vec::new();

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                // Downmix interleaved frames before metering.
                mono.clear();
                mono.extend(data.chunks(channels).map(|frame| {
                    frame.iter().map(|&s| s.to_sample::<f32>()).sum::<f32>() / frame.len() as f32
                }));
                tap.push_samples(&mono);
            },
            |err| {
                error!("Audio capture error: {}", err);
            },
            None,
        )
        .map_err(|e| classify(e.to_string()))
}

#[async_trait]
impl MediaDevices for CpalMediaDevices {
    async fn get_user_media(
        &self,
        constraints: CaptureConstraints,
    ) -> Result<MediaStream, DeviceError> {
        if constraints.video {
            return Err(DeviceError::not_found("no camera capture backend available"));
        }
        if !constraints.audio {
            return Err(DeviceError::unknown("no capture kind requested"));
        }

        let device = cpal::default_host()
            .default_input_device()
            .ok_or_else(|| DeviceError::not_found("no default input device"))?;
        let name = device
            .name()
            .unwrap_or_else(|_| "Default Microphone".to_string());

        let (ready_tx, ready_rx) = oneshot::channel::<Result<(), DeviceError>>();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let track = MediaTrack::new(TrackKind::Audio, name.clone()).with_stopper(move || {
            let _ = shutdown_tx.send(());
        });
        let tap = AudioTap::for_track(&track, self.tap_capacity);
        let thread_tap = tap.clone();

        std::thread::spawn(move || {
            let supported = match device.default_input_config() {
                Ok(config) => config,
                Err(e) => {
                    let _ = ready_tx.send(Err(classify(e.to_string())));
                    return;
                }
            };
            let config: StreamConfig = supported.config();
            let stream = match supported.sample_format() {
                SampleFormat::F32 => build_input::<f32>(&device, &config, thread_tap),
                SampleFormat::I16 => build_input::<i16>(&device, &config, thread_tap),
                SampleFormat::U16 => build_input::<u16>(&device, &config, thread_tap),
                other => Err(DeviceError::unknown(format!(
                    "unsupported sample format {:?}",
                    other
                ))),
            };
            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            if let Err(e) = stream.play() {
                let _ = ready_tx.send(Err(classify(e.to_string())));
                return;
            }

            info!("Started audio capture on device: {}", name);
            let _ = ready_tx.send(Ok(()));

            // Either an explicit stop or the track being dropped ends capture.
            let _ = shutdown_rx.blocking_recv();
            drop(stream);
            info!("Stopped audio capture on device: {}", name);
        });

        match ready_rx.await {
            Ok(Ok(())) => Ok(MediaStream::new(vec![track]).with_audio_tap(tap)),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(DeviceError::unknown("capture thread exited before starting")),
        }
    }
}
