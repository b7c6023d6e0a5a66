//! Per-session tuning.

use std::time::Duration;

use crate::clock::MasterClockType;
use crate::time::MediaDuration;

/// Configuration for a media session.
///
/// Fixed for the lifetime of the session; the master clock in particular is
/// never switched once playback has started.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Which clock is authoritative for presentation timing
    pub master_clock: MasterClockType,
    /// Loop sleep used when no presentation deadline is known
    pub idle_sleep: Duration,
    /// Upper bound on any loop sleep; commands wait at most this long
    pub max_sleep: Duration,
    /// Number of audio drift samples averaged per report to the source
    pub drift_window: u32,
    /// How far ahead of the master clock audio is handed to the output
    pub audio_lookahead: MediaDuration,
    /// Minimum movement of the output's reported play time before the audio
    /// clock is re-anchored. The output only refreshes its position every
    /// few milliseconds.
    pub audio_clock_resync_threshold: MediaDuration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            master_clock: MasterClockType::External,
            idle_sleep: Duration::from_millis(10),
            max_sleep: Duration::from_millis(100),
            drift_window: 20,
            audio_lookahead: MediaDuration::from_secs(0.5),
            audio_clock_resync_threshold: MediaDuration::from_secs(0.001),
        }
    }
}

impl SessionConfig {
    pub fn with_master_clock(mut self, master_clock: MasterClockType) -> Self {
        self.master_clock = master_clock;
        self
    }

    pub fn with_idle_sleep(mut self, idle_sleep: Duration) -> Self {
        self.idle_sleep = idle_sleep;
        self
    }

    pub fn with_max_sleep(mut self, max_sleep: Duration) -> Self {
        self.max_sleep = max_sleep;
        self
    }

    /// Sets the drift window. A window of zero is treated as one sample.
    pub fn with_drift_window(mut self, drift_window: u32) -> Self {
        self.drift_window = drift_window.max(1);
        self
    }

    pub fn with_audio_lookahead(mut self, audio_lookahead: MediaDuration) -> Self {
        self.audio_lookahead = audio_lookahead;
        self
    }

    pub fn with_audio_clock_resync_threshold(mut self, threshold: MediaDuration) -> Self {
        self.audio_clock_resync_threshold = threshold;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.master_clock, MasterClockType::External);
        assert_eq!(config.idle_sleep, Duration::from_millis(10));
        assert_eq!(config.max_sleep, Duration::from_millis(100));
        assert_eq!(config.drift_window, 20);
        assert_eq!(config.audio_lookahead, MediaDuration::from_secs(0.5));
    }

    #[test]
    fn test_builders() {
        let config = SessionConfig::default()
            .with_master_clock(MasterClockType::Audio)
            .with_idle_sleep(Duration::from_millis(2))
            .with_max_sleep(Duration::from_millis(40))
            .with_drift_window(0)
            .with_audio_lookahead(MediaDuration::from_secs(0.25));

        assert_eq!(config.master_clock, MasterClockType::Audio);
        assert_eq!(config.idle_sleep, Duration::from_millis(2));
        assert_eq!(config.max_sleep, Duration::from_millis(40));
        assert_eq!(config.drift_window, 1);
        assert_eq!(config.audio_lookahead, MediaDuration::from_secs(0.25));
    }
}
