//! Local media capture
//!
//! - [`device`] - tracks, streams and the [`MediaDevices`] seam
//! - [`level`] - RMS loudness metering
//! - [`sampler`] - the cancelable periodic sampling task
//! - [`engine`] - [`MediaCaptureEngine`], which ties them together
//! - [`platform`] - cpal and mock backends

pub mod device;
pub mod engine;
pub mod level;
pub mod platform;
pub mod sampler;

pub use device::{
    AudioTap, CaptureConstraints, DeviceError, MediaDevices, MediaStream, MediaTrack, StreamView,
    TrackKind,
};
pub use engine::{MediaCaptureEngine, MediaNotice, MediaSnapshot, REDUCED_CAPABILITY_ADVISORY};
pub use level::{AudioAnalyser, audio_level};
pub use platform::default_devices;
pub use platform::mock::MockMediaDevices;
pub use sampler::LevelSampler;

#[cfg(feature = "device-cpal")]
pub use platform::cpal_impl::CpalMediaDevices;
