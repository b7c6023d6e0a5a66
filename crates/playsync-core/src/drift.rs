//! Audio drift accumulation.
//!
//! The audio output plays at the device's rate, which never exactly matches
//! the master clock. Each presentation tick contributes one sample of
//! `audio clock - master clock`; once a full window has been collected the
//! mean is reported to the decode source, which biases its audio resampling
//! to pull the two clocks back together.

use crate::time::MediaDuration;

/// Windowed mean of audio-vs-master clock offsets.
#[derive(Debug, Clone)]
pub struct DriftTracker {
    cumulative: MediaDuration,
    samples: u32,
    window: u32,
}

impl DriftTracker {
    /// Creates an empty tracker reporting every `window` samples.
    pub fn new(window: u32) -> Self {
        Self {
            cumulative: MediaDuration::ZERO,
            samples: 0,
            window: window.max(1),
        }
    }

    /// Adds one offset sample.
    ///
    /// Returns the mean offset when this sample completes a window, after
    /// which the tracker starts a fresh window.
    pub fn record(&mut self, offset: MediaDuration) -> Option<MediaDuration> {
        self.cumulative += offset;
        self.samples += 1;

        if self.samples < self.window {
            return None;
        }

        let mean = self.cumulative / self.samples;
        self.reset();
        Some(mean)
    }

    /// Discards all collected samples.
    pub fn reset(&mut self) {
        self.cumulative = MediaDuration::ZERO;
        self.samples = 0;
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }

    pub fn cumulative(&self) -> MediaDuration {
        self.cumulative
    }

    pub fn window(&self) -> u32 {
        self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reports_mean_once_per_window() {
        let mut tracker = DriftTracker::new(20);
        let offset = MediaDuration::from_secs(0.05);

        for _ in 0..19 {
            assert_eq!(tracker.record(offset), None);
        }
        let Some(mean) = tracker.record(offset) else {
            panic!("20th sample should complete the window");
        };
        assert!((mean.as_secs() - 0.05).abs() < 1e-9);

        assert_eq!(tracker.samples(), 0);
        assert_eq!(tracker.cumulative(), MediaDuration::ZERO);
    }

    #[test]
    fn test_mean_of_mixed_offsets() {
        let mut tracker = DriftTracker::new(4);
        for secs in [0.1, -0.1, 0.2, 0.0] {
            if let Some(mean) = tracker.record(MediaDuration::from_secs(secs)) {
                assert!((mean.as_secs() - 0.05).abs() < 1e-9);
                return;
            }
        }
        panic!("window of 4 should have reported");
    }

    #[test]
    fn test_reset_discards_partial_window() {
        let mut tracker = DriftTracker::new(3);
        tracker.record(MediaDuration::from_secs(1.0));
        tracker.record(MediaDuration::from_secs(1.0));
        tracker.reset();

        assert_eq!(tracker.samples(), 0);
        assert_eq!(tracker.record(MediaDuration::from_secs(1.0)), None);
    }

    #[test]
    fn test_zero_window_reports_every_sample() {
        let mut tracker = DriftTracker::new(0);
        assert_eq!(tracker.window(), 1);
        assert_eq!(
            tracker.record(MediaDuration::from_secs(0.3)),
            Some(MediaDuration::from_secs(0.3))
        );
    }
}
