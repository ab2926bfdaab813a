//! Cancelable periodic level sampler
//!
//! One tokio task ticks at the display cadence, reads the analyser and
//! publishes the level on a watch channel. Every publish happens while the
//! run gate is held, and [`LevelSampler::cancel`] closes the gate under the
//! same lock, so once `cancel` returns no further level is published.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, trace};

use crate::media::level::AudioAnalyser;

#[derive(Debug)]
pub struct LevelSampler {
    gate: Arc<Mutex<bool>>,
    handle: Option<JoinHandle<()>>,
}

impl LevelSampler {
    /// Start sampling `analyser` every `interval`
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        analyser: Arc<Mutex<AudioAnalyser>>,
        interval: Duration,
        gain: f32,
        level_tx: Arc<watch::Sender<f32>>,
    ) -> Self {
        let gate = Arc::new(Mutex::new(true));
        let task_gate = gate.clone();
        let period = interval.max(Duration::from_millis(1));

        let handle = tokio::spawn(async move {
            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let running = task_gate.lock();
                if !*running {
                    break;
                }
                let Some(level) = analyser.lock().level(gain) else {
                    debug!("Analyser closed, level sampler exiting");
                    break;
                };
                trace!("audio level {:.3}", level);
                level_tx.send_replace(level);
            }
        });

        Self {
            gate,
            handle: Some(handle),
        }
    }

    /// Stop sampling; idempotent
    pub fn cancel(&mut self) {
        *self.gate.lock() = false;
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!("Level sampler canceled");
        }
    }

    pub fn is_running(&self) -> bool {
        *self.gate.lock()
            && self
                .handle
                .as_ref()
                .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for LevelSampler {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::device::{AudioTap, MediaTrack, TrackKind};

    fn tap_with(samples: &[f32]) -> (MediaTrack, AudioTap) {
        let track = MediaTrack::new(TrackKind::Audio, "mic");
        let tap = AudioTap::for_track(&track, 512);
        tap.push_samples(samples);
        (track, tap)
    }

    #[tokio::test(start_paused = true)]
    async fn publishes_until_canceled() {
        let (_track, tap) = tap_with(&[0.1; 256]);
        let analyser = Arc::new(Mutex::new(AudioAnalyser::new(tap.clone(), 256)));
        let (tx, mut rx) = watch::channel(0.0_f32);
        let tx = Arc::new(tx);

        let mut sampler = LevelSampler::spawn(analyser, Duration::from_millis(16), 3.0, tx.clone());
        rx.changed().await.unwrap();
        assert!((*rx.borrow_and_update() - 0.3).abs() < 1e-4);
        assert!(sampler.is_running());

        sampler.cancel();
        sampler.cancel();
        assert!(!sampler.is_running());

        tx.send_replace(0.0);
        rx.borrow_and_update();
        tap.push_samples(&[0.9; 256]);
        time::sleep(Duration::from_millis(200)).await;
        assert!(!rx.has_changed().unwrap());
        assert_eq!(*rx.borrow(), 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn exits_when_analyser_closes() {
        let (_track, tap) = tap_with(&[0.2; 64]);
        let analyser = Arc::new(Mutex::new(AudioAnalyser::new(tap, 64)));
        let (tx, _rx) = watch::channel(0.0_f32);

        let sampler = LevelSampler::spawn(analyser.clone(), Duration::from_millis(16), 3.0, Arc::new(tx));
        analyser.lock().close();
        time::sleep(Duration::from_millis(100)).await;
        assert!(!sampler.is_running());
    }
}
