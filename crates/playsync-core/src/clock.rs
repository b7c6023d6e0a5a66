//! Playback clocks and master clock selection.
//!
//! A [`Clock`] anchors a media-timeline position to the wall-clock instant at
//! which that position was observed. While playback advances, the clock's
//! current time is extrapolated from that anchor; while playback is held it
//! reports the anchor itself.
//!
//! A session owns three clocks ([`SessionClocks`]): the video clock (anchored
//! whenever a video frame is displayed), the audio clock (anchored from the
//! audio output's reported play position) and the external clock (seeded from
//! whichever of the other two starts first, then free-running). Exactly one of
//! them is the master for the lifetime of a session.

use std::time::Instant;

use crate::state::MediaState;
use crate::time::{MediaDuration, MediaPoint};

/// Which clock is authoritative for "what time is it" during playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MasterClockType {
    /// Wall-clock driven, seeded from the first presented frame.
    #[default]
    External,
    /// Driven by displayed video frames.
    Video,
    /// Driven by the audio output's play position.
    Audio,
}

impl std::fmt::Display for MasterClockType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MasterClockType::External => write!(f, "external"),
            MasterClockType::Video => write!(f, "video"),
            MasterClockType::Audio => write!(f, "audio"),
        }
    }
}

/// A media-time reference anchored to a wall-clock sample point.
///
/// The sync point and sync time are stored together so a clock is either
/// fully anchored (valid) or not anchored at all (invalid).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Clock {
    anchor: Option<(MediaPoint, Instant)>,
}

impl Clock {
    /// Creates an invalid clock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Anchors the clock: `point` is the media position at wall time `now`.
    pub fn set_explicit(&mut self, point: MediaPoint, now: Instant) {
        self.anchor = Some((point, now));
    }

    /// Clears the anchor; the clock reports no time until re-anchored.
    pub fn invalidate(&mut self) {
        self.anchor = None;
    }

    /// Returns true if the clock has an anchor.
    pub fn is_valid(&self) -> bool {
        self.anchor.is_some()
    }

    /// Media position at the last sync.
    pub fn sync_point(&self) -> Option<MediaPoint> {
        self.anchor.map(|(point, _)| point)
    }

    /// Wall-clock instant of the last sync.
    pub fn sync_time(&self) -> Option<Instant> {
        self.anchor.map(|(_, time)| time)
    }

    /// Extrapolated media position at `now`: `sync_point + (now - sync_time)`.
    pub fn interpolated_time(&self, now: Instant) -> Option<MediaPoint> {
        self.anchor
            .map(|(point, time)| point + MediaDuration::between(time, now))
    }

    /// Moves the sync time to `now` while keeping the sync point.
    ///
    /// Used on resume so the time spent paused is not counted as playback.
    /// Has no effect on an invalid clock.
    pub fn rebase(&mut self, now: Instant) {
        if let Some((_, time)) = self.anchor.as_mut() {
            *time = now;
        }
    }

    /// Re-anchors the clock at its own extrapolated position at `now`.
    ///
    /// Freezes the clock's progress at `now`; a later [`Clock::rebase`] lets
    /// it continue from exactly this point.
    pub fn freeze(&mut self, now: Instant) {
        if let Some(point) = self.interpolated_time(now) {
            self.anchor = Some((point, now));
        }
    }
}

/// The video, audio and external clocks of one session.
#[derive(Debug, Clone)]
pub struct SessionClocks {
    master: MasterClockType,
    pub video: Clock,
    pub audio: Clock,
    pub external: Clock,
}

impl SessionClocks {
    /// Creates three invalid clocks with the given master.
    pub fn new(master: MasterClockType) -> Self {
        Self {
            master,
            video: Clock::new(),
            audio: Clock::new(),
            external: Clock::new(),
        }
    }

    /// The session's master clock type.
    pub fn master_type(&self) -> MasterClockType {
        self.master
    }

    /// The clock currently acting as master.
    pub fn master(&self) -> &Clock {
        match self.master {
            MasterClockType::External => &self.external,
            MasterClockType::Video => &self.video,
            MasterClockType::Audio => &self.audio,
        }
    }

    /// The master clock's media position as seen in `state`.
    ///
    /// Only a playing session's clock advances with wall time; in every other
    /// state the position is held at the last sync point.
    pub fn master_point(&self, state: MediaState, now: Instant) -> Option<MediaPoint> {
        let master = self.master();
        match state {
            MediaState::Playing => master.interpolated_time(now),
            MediaState::Paused | MediaState::Seeking | MediaState::Stopped => master.sync_point(),
        }
    }

    /// Invalidates all three clocks.
    pub fn invalidate_all(&mut self) {
        self.video.invalidate();
        self.audio.invalidate();
        self.external.invalidate();
    }

    /// Rebases all three clocks to `now` (see [`Clock::rebase`]).
    pub fn rebase_all(&mut self, now: Instant) {
        self.video.rebase(now);
        self.audio.rebase(now);
        self.external.rebase(now);
    }

    /// Returns true if all three clocks are invalid.
    pub fn all_invalid(&self) -> bool {
        !self.video.is_valid() && !self.audio.is_valid() && !self.external.is_valid()
    }
}
