//! Loudness metering

use crate::media::device::AudioTap;

/// Normalized loudness of a waveform
///
/// Samples are clamped to [-1, 1], the RMS is scaled by `gain` and the
/// result clamped to [0, 1]. An empty window reads as silence.
#[inline]
pub fn audio_level(samples: &[f32], gain: f32) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let energy: f32 = samples
        .iter()
        .map(|&s| {
            let s = if s.is_finite() { s.clamp(-1.0, 1.0) } else { 0.0 };
            s * s
        })
        .sum::<f32>()
        / samples.len() as f32;
    let level = energy.sqrt() * gain;
    if level.is_finite() {
        level.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Reads the latest analysis window from an [`AudioTap`]
///
/// Closing releases the tap; a closed analyser produces no readings.
#[derive(Debug)]
pub struct AudioAnalyser {
    tap: Option<AudioTap>,
    window: usize,
    scratch: Vec<f32>,
}

impl AudioAnalyser {
    pub fn new(tap: AudioTap, window: usize) -> Self {
        let window = window.max(1);
        Self {
            tap: Some(tap),
            window,
            scratch: Vec::with_capacity(window),
        }
    }

    /// Current level, `None` once closed
    pub fn level(&mut self, gain: f32) -> Option<f32> {
        let tap = self.tap.as_ref()?;
        tap.read_latest(self.window, &mut self.scratch);
        Some(audio_level(&self.scratch, gain))
    }

    pub fn close(&mut self) {
        self.tap = None;
        self.scratch = Vec::new();
    }

    pub fn is_closed(&self) -> bool {
        self.tap.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::device::{MediaTrack, TrackKind};

    const GAIN: f32 = 3.0;

    #[test]
    fn silence_reads_zero() {
        assert_eq!(audio_level(&[0.0; 256], GAIN), 0.0);
        assert_eq!(audio_level(&[], GAIN), 0.0);
    }

    #[test]
    fn full_scale_clamps_to_one() {
        let square: Vec<f32> = (0..256).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        assert_eq!(audio_level(&square, GAIN), 1.0);
    }

    #[test]
    fn quiet_signal_is_amplified() {
        let level = audio_level(&[0.1_f32; 64], GAIN);
        assert!((level - 0.3).abs() < 1e-5, "level={level}");
    }

    #[test]
    fn always_within_unit_range() {
        let inputs: [&[f32]; 5] = [
            &[5.0, -7.0, 12.0],
            &[f32::NAN, 0.2],
            &[f32::INFINITY, f32::NEG_INFINITY],
            &[0.01, -0.02, 0.03],
            &[-1.0; 16],
        ];
        for samples in inputs {
            let level = audio_level(samples, GAIN);
            assert!((0.0..=1.0).contains(&level), "{samples:?} -> {level}");
        }
        assert_eq!(audio_level(&[0.5], f32::INFINITY), 0.0);
    }

    #[test]
    fn analyser_reads_window_until_closed() {
        let track = MediaTrack::new(TrackKind::Audio, "mic");
        let tap = AudioTap::for_track(&track, 1024);
        tap.push_samples(&[0.5; 512]);
        tap.push_samples(&[0.0; 256]);

        let mut analyser = AudioAnalyser::new(tap, 256);
        assert_eq!(analyser.level(GAIN), Some(0.0));

        analyser.close();
        assert!(analyser.is_closed());
        assert_eq!(analyser.level(GAIN), None);
    }
}
