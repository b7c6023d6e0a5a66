//! Observable session counters.
//!
//! Written by the session thread, read from any thread. All fields are
//! independent atomics; a snapshot is not a consistent cut across fields but
//! each value is individually up to date.

use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use crate::state::MediaState;
use crate::time::MediaDuration;

/// Cloneable handle to a session's counters.
#[derive(Debug, Clone)]
pub struct SessionMetrics {
    inner: Arc<SessionMetricsInner>,
}

impl Default for SessionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default)]
struct SessionMetricsInner {
    /// `MediaState` encoded via `MediaState::as_u8`
    state: AtomicU8,
    presented_video_frames: AtomicU64,
    dropped_video_frames: AtomicU64,
    enqueued_audio_frames: AtomicU64,
    dropped_audio_frames: AtomicU64,
    drift_reports: AtomicU32,
    /// Last reported sync diff, as `f64::to_bits`
    last_sync_diff_bits: AtomicU64,
}

/// Point-in-time copy of [`SessionMetrics`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionMetricsSnapshot {
    pub state: MediaState,
    pub presented_video_frames: u64,
    pub dropped_video_frames: u64,
    pub enqueued_audio_frames: u64,
    pub dropped_audio_frames: u64,
    pub drift_reports: u32,
    pub last_sync_diff: MediaDuration,
}

impl SessionMetrics {
    /// Creates a handle reporting a stopped session with zeroed counters.
    pub fn new() -> Self {
        let metrics = Self {
            inner: Arc::default(),
        };
        metrics.set_state(MediaState::Stopped);
        metrics
    }

    pub fn state(&self) -> MediaState {
        MediaState::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: MediaState) {
        self.inner.state.store(state.as_u8(), Ordering::Release);
    }

    pub(crate) fn record_presented_video(&self) {
        self.inner
            .presented_video_frames
            .fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped_video(&self, count: u64) {
        self.inner
            .dropped_video_frames
            .fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_enqueued_audio(&self, count: u64) {
        self.inner
            .enqueued_audio_frames
            .fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped_audio(&self, count: u64) {
        self.inner
            .dropped_audio_frames
            .fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_sync_diff(&self, diff: MediaDuration) {
        self.inner
            .last_sync_diff_bits
            .store(diff.as_secs().to_bits(), Ordering::Relaxed);
        self.inner.drift_reports.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the last averaged audio drift reported to the source.
    pub fn last_sync_diff(&self) -> MediaDuration {
        MediaDuration::from_secs(f64::from_bits(
            self.inner.last_sync_diff_bits.load(Ordering::Relaxed),
        ))
    }

    /// Copies all counters.
    pub fn snapshot(&self) -> SessionMetricsSnapshot {
        SessionMetricsSnapshot {
            state: self.state(),
            presented_video_frames: self.inner.presented_video_frames.load(Ordering::Relaxed),
            dropped_video_frames: self.inner.dropped_video_frames.load(Ordering::Relaxed),
            enqueued_audio_frames: self.inner.enqueued_audio_frames.load(Ordering::Relaxed),
            dropped_audio_frames: self.inner.dropped_audio_frames.load(Ordering::Relaxed),
            drift_reports: self.inner.drift_reports.load(Ordering::Relaxed),
            last_sync_diff: self.last_sync_diff(),
        }
    }
}
