use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::backend::AudioFrame;

/// Convert a gain slider percentage into a linear factor (never negative)
pub fn percent_to_linear(percent: f64) -> f32 {
    if !percent.is_finite() {
        return 1.0;
    }
    (percent / 100.0).max(0.0) as f32
}

/// Linear amplitude multiplier applied to captured audio
///
/// The factor is shared with the processing task, so `set_linear` takes
/// effect on the next frame without rebuilding the chain.
#[derive(Debug, Clone)]
pub struct GainStage {
    factor: Arc<AtomicU32>,
}

impl GainStage {
    pub fn new(linear: f32) -> Self {
        let stage = Self {
            factor: Arc::new(AtomicU32::new(1.0f32.to_bits())),
        };
        stage.set_linear(linear);
        stage
    }

    /// Set the factor, clamped to >= 0
    pub fn set_linear(&self, linear: f32) {
        let linear = if linear.is_finite() { linear.max(0.0) } else { 1.0 };
        self.factor.store(linear.to_bits(), Ordering::Relaxed);
    }

    pub fn linear(&self) -> f32 {
        f32::from_bits(self.factor.load(Ordering::Relaxed))
    }

    /// Scale a frame in place, saturating at the i16 range
    pub fn apply(&self, mut frame: AudioFrame) -> AudioFrame {
        let factor = self.linear();
        if factor == 1.0 {
            return frame;
        }
        for sample in frame.samples.iter_mut() {
            let scaled = (*sample as f32 * factor).round();
            *sample = scaled.clamp(i16::MIN as f32, i16::MAX as f32) as i16;
        }
        frame
    }

    /// Route `input` through this stage
    ///
    /// The task ends when the capture side closes or the output receiver is
    /// dropped.
    pub fn spawn(
        &self,
        mut input: mpsc::Receiver<AudioFrame>,
        buffer: usize,
    ) -> (JoinHandle<()>, mpsc::Receiver<AudioFrame>) {
        let (tx, rx) = mpsc::channel(buffer);
        let stage = self.clone();

        let task = tokio::spawn(async move {
            debug!("Gain stage started");
            while let Some(frame) = input.recv().await {
                if tx.send(stage.apply(frame)).await.is_err() {
                    break;
                }
            }
            debug!("Gain stage stopped");
        });

        (task, rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(samples: Vec<i16>) -> AudioFrame {
        AudioFrame {
            samples,
            sample_rate: 48000,
            channels: 1,
            timestamp_ms: 0,
        }
    }

    #[test]
    fn test_percent_to_linear() {
        assert_eq!(percent_to_linear(100.0), 1.0);
        assert_eq!(percent_to_linear(250.0), 2.5);
        assert_eq!(percent_to_linear(-40.0), 0.0);
        assert_eq!(percent_to_linear(f64::NAN), 1.0);
    }

    #[test]
    fn test_gain_scales_and_saturates() {
        let stage = GainStage::new(2.0);
        let out = stage.apply(frame(vec![100, -200, 30000, -30000]));
        assert_eq!(out.samples, vec![200, -400, i16::MAX, i16::MIN]);
    }

    #[test]
    fn test_negative_gain_is_clamped_to_silence() {
        let stage = GainStage::new(-1.0);
        assert_eq!(stage.linear(), 0.0);
        let out = stage.apply(frame(vec![1000, -1000]));
        assert_eq!(out.samples, vec![0, 0]);
    }

    #[tokio::test]
    async fn test_live_gain_change_applies_to_next_frame() {
        let stage = GainStage::new(1.0);
        let (tx, rx) = mpsc::channel(4);
        let (task, mut out) = stage.spawn(rx, 4);

        tx.send(frame(vec![10])).await.unwrap();
        assert_eq!(out.recv().await.unwrap().samples, vec![10]);

        stage.set_linear(0.5);
        tx.send(frame(vec![10])).await.unwrap();
        assert_eq!(out.recv().await.unwrap().samples, vec![5]);

        drop(tx);
        task.await.unwrap();
    }
}
