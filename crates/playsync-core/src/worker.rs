//! Session-thread state and the presentation loop body.
//!
//! [`SessionWorker`] owns everything the presentation loop mutates: the
//! clocks, the playback state, the pending seek, the next presentation points
//! and the drift tracker. It lives on the session thread and nothing else
//! holds a reference to it, so none of this state needs locking.
//!
//! One call to [`SessionWorker::run_iteration`] is one loop iteration:
//! drain commands, present due video then audio, track drift, and say what to
//! wait for before the next iteration. [`SessionWorker::sleep_for`] turns that
//! into a sleep, measured from when the iteration finished.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::audio::{AudioData, AudioFrame};
use crate::clock::{MasterClockType, SessionClocks};
use crate::command::{Command, CommandKind, CommandReceiver};
use crate::config::SessionConfig;
use crate::drift::DriftTracker;
use crate::metrics::SessionMetrics;
use crate::session::{MediaSessionId, SessionResources};
use crate::source::StreamIndex;
use crate::state::MediaState;
use crate::time::{MediaDuration, MediaPoint};

/// What the session thread waits for after an iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Wake {
    /// No deadline is known; poll again after the idle sleep
    Idle,
    /// Run the next iteration straight away
    Immediately,
    /// Sleep until the earliest next presentation point
    NextPresentation,
}

pub(crate) struct SessionWorker {
    id: MediaSessionId,
    config: SessionConfig,
    resources: SessionResources,
    clocks: SessionClocks,
    state: MediaState,
    /// State to return to once an in-flight seek presents its first frame
    seek_source_state: Option<MediaState>,
    next_video_point: Option<MediaPoint>,
    next_audio_point: Option<MediaPoint>,
    drift: DriftTracker,
    metrics: SessionMetrics,
}

impl SessionWorker {
    pub(crate) fn new(
        id: MediaSessionId,
        config: SessionConfig,
        resources: SessionResources,
        metrics: SessionMetrics,
    ) -> Self {
        metrics.set_state(MediaState::Stopped);
        Self {
            id,
            clocks: SessionClocks::new(config.master_clock),
            drift: DriftTracker::new(config.drift_window),
            config,
            resources,
            state: MediaState::Stopped,
            seek_source_state: None,
            next_video_point: None,
            next_audio_point: None,
            metrics,
        }
    }

    /// Runs one loop iteration and returns what to wait for afterwards.
    pub(crate) fn run_iteration(&mut self, commands: &CommandReceiver, now: Instant) -> Wake {
        self.process_commands(commands, now);

        if self.resources.source.has_hit_end() && self.state != MediaState::Stopped {
            tracing::info!("Media session {} reached the end of its media", self.id);
            self.stop();
        }

        if !self.state.is_presenting() {
            return Wake::Idle;
        }

        let presented_video_frame = self.present_video(now);

        // The first frame presented after a seek ends it
        if self.state == MediaState::Seeking && presented_video_frame {
            match self.seek_source_state.take() {
                Some(MediaState::Paused) => {
                    self.set_state(MediaState::Paused);
                    return Wake::Immediately;
                }
                _ => self.set_state(MediaState::Playing),
            }
        }

        self.present_audio(now);
        self.record_drift(now);
        Wake::NextPresentation
    }

    /// How long to sleep for `wake`, as seen at `now`.
    ///
    /// Never longer than the configured maximum, so new commands and destroy
    /// are picked up even when the next presentation point is far away.
    pub(crate) fn sleep_for(&self, wake: Wake, now: Instant) -> Duration {
        let sleep = match wake {
            Wake::Idle => self.config.idle_sleep,
            Wake::Immediately => Duration::ZERO,
            Wake::NextPresentation => self.next_sleep(now),
        };
        sleep.min(self.config.max_sleep)
    }

    /// Applies every queued command, in order.
    pub(crate) fn process_commands(&mut self, commands: &CommandReceiver, now: Instant) {
        while let Some(Command { kind, result }) = commands.try_pop() {
            let name = kind.name();
            let ok = self.apply(kind, now);
            tracing::debug!(
                "Media session {}: {} command -> {} (state {})",
                self.id,
                name,
                ok,
                self.state
            );
            result.fulfill(ok);
        }
    }

    fn apply(&mut self, kind: CommandKind, now: Instant) -> bool {
        match kind {
            CommandKind::Play(point) => self.play(point, now),
            CommandKind::Pause => self.pause(now),
            CommandKind::Stop => self.stop(),
            CommandKind::SeekByOffset(offset) => self.seek_by_offset(offset, now),
            CommandKind::SeekToPoint(point) => self.seek_to_point(point, now),
            CommandKind::LoadStreams(indices) => self.load_streams(&indices, now),
        }
    }

    fn play(&mut self, point: Option<MediaPoint>, now: Instant) -> bool {
        match self.state {
            MediaState::Playing | MediaState::Seeking => true,
            MediaState::Paused => {
                // Resume from where the clocks were held, not from where wall
                // time would have carried them
                self.clocks.rebase_all(now);

                let mut ok = true;
                if let Some(point) = point {
                    ok = self.seek_to_point(point, now);
                    self.seek_source_state = None;
                }

                if let Err(e) = self
                    .resources
                    .audio_output
                    .play_source(self.resources.audio_source_id)
                {
                    tracing::error!("Failed to resume audio source: {}", e);
                }

                self.set_state(MediaState::Playing);
                ok
            }
            MediaState::Stopped => {
                let point = point.unwrap_or(MediaPoint::ZERO);
                let ok = match self.resources.source.load_from_point(point, None) {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::error!("Failed to load media from {}: {}", point, e);
                        false
                    }
                };
                self.set_state(MediaState::Playing);
                ok
            }
        }
    }

    fn pause(&mut self, now: Instant) -> bool {
        if self.state != MediaState::Playing {
            return true;
        }

        self.set_state(MediaState::Paused);

        // Only the external clock keeps running without new frames; hold it
        // at the pause point so resuming continues from there
        self.clocks.external.freeze(now);
        self.reset_drift();

        match self
            .resources
            .audio_output
            .pause_source(self.resources.audio_source_id)
        {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Failed to pause audio source: {}", e);
                false
            }
        }
    }

    fn stop(&mut self) -> bool {
        if self.state == MediaState::Stopped {
            return true;
        }

        self.set_state(MediaState::Stopped);
        self.seek_source_state = None;

        self.resources.source.stop();
        self.resources
            .audio_output
            .flush_enqueued_data(self.resources.audio_source_id);
        self.clocks.invalidate_all();
        self.reset_drift();
        self.next_video_point = None;
        self.next_audio_point = None;

        if let Err(e) = self.resources.texture_sink.update_texture(
            self.resources.texture_id,
            Arc::clone(&self.resources.initial_image),
        ) {
            tracing::error!("Failed to restore initial image: {}", e);
        }

        true
    }

    fn seek_by_offset(&mut self, offset: MediaDuration, now: Instant) -> bool {
        if !self.state.can_seek() {
            tracing::debug!("Seek by {} rejected in {} state", offset, self.state);
            return false;
        }

        let Some(current) = self.clocks.master_point(self.state, now) else {
            tracing::debug!("Seek by {} rejected: master clock has no time", offset);
            return false;
        };

        self.seek_to_point(current + offset, now)
    }

    fn seek_to_point(&mut self, point: MediaPoint, now: Instant) -> bool {
        if !self.state.can_seek() {
            tracing::debug!("Seek to {} rejected in {} state", point, self.state);
            return false;
        }

        let seek_start = self
            .clocks
            .master_point(self.state, now)
            .unwrap_or(MediaPoint::ZERO);
        let seek_offset = point - seek_start;

        self.resources
            .audio_output
            .flush_enqueued_data(self.resources.audio_source_id);

        // The source may snap to a keyframe, so the clocks restart from
        // whatever it presents next
        self.clocks.invalidate_all();
        self.reset_drift();
        self.next_video_point = None;
        self.next_audio_point = None;

        self.seek_source_state = Some(self.state);
        self.set_state(MediaState::Seeking);

        match self.resources.source.load_from_point(point, Some(seek_offset)) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Failed to seek to {}: {}", point, e);
                false
            }
        }
    }

    fn load_streams(&mut self, stream_indices: &HashSet<StreamIndex>, now: Instant) -> bool {
        // Stopped has no clock time; loading at zero makes the source
        // re-synchronize the new streams from the start
        let point = match self.state {
            MediaState::Stopped => Some(MediaPoint::ZERO),
            state => self.clocks.master_point(state, now),
        };

        let Some(point) = point else {
            tracing::debug!("Load streams rejected: master clock has no time");
            return false;
        };

        self.clocks.invalidate_all();
        self.resources
            .audio_output
            .flush_enqueued_data(self.resources.audio_source_id);
        self.reset_drift();
        self.next_video_point = None;
        self.next_audio_point = None;

        match self.resources.source.load_streams(point, stream_indices) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Failed to load streams {:?}: {}", stream_indices, e);
                false
            }
        }
    }

    /// Presents at most one video frame and drops frames that are already
    /// late. Returns whether a frame was presented.
    fn present_video(&mut self, now: Instant) -> bool {
        let master_type = self.clocks.master_type();
        let mut master_point = self.clocks.master_point(self.state, now);

        // An invalid video or external master clock can only be seeded by
        // presenting a frame, so present one regardless of timing
        let initializing_video_clock = master_type == MasterClockType::Video && master_point.is_none();
        let initializing_external_clock =
            master_type == MasterClockType::External && master_point.is_none();
        let initializing = initializing_video_clock || initializing_external_clock;

        if !initializing && master_point.is_none() {
            self.next_video_point = None;
            return false;
        }

        // Only frames queued now are considered; the decoder keeps filling the
        // queue while we drain it
        let mut queued = self.resources.source.video_frame_queue_size();
        if queued == 0 {
            tracing::debug!("Media session {}: video queue ran dry", self.id);
            self.next_video_point = None;
            return false;
        }

        let mut presented = false;

        if initializing || self.next_video_point.is_some() {
            if let Some(frame) = self.resources.source.pop_front_video_frame() {
                queued -= 1;

                if let Err(e) = self
                    .resources
                    .texture_sink
                    .update_texture(self.resources.texture_id, frame.image)
                {
                    tracing::error!("Failed to present video frame: {}", e);
                }
                tracing::trace!("Presented video frame at {}", frame.present_point);

                presented = true;
                self.metrics.record_presented_video();
                self.update_video_clock(frame.present_point, now);

                master_point = self.clocks.master_point(self.state, now);
            }
        }

        let mut dropped = 0u64;
        if let Some(master_point) = master_point {
            for _ in 0..queued {
                let Some(frame) = self.resources.source.peek_front_video_frame() else {
                    break;
                };
                if frame.present_point > master_point {
                    break;
                }
                self.resources.source.pop_front_video_frame();
                dropped += 1;
            }
        }

        if dropped > 0 {
            tracing::warn!("Media session {}: dropped {} video frames", self.id, dropped);
            self.metrics.record_dropped_video(dropped);
        }

        self.next_video_point = self
            .resources
            .source
            .peek_front_video_frame()
            .map(|frame| frame.present_point);

        presented
    }

    /// Hands due audio frames to the audio output.
    fn present_audio(&mut self, now: Instant) {
        let master_type = self.clocks.master_type();
        let mut master_point = self.clocks.master_point(self.state, now);

        let initializing_audio_clock = master_type == MasterClockType::Audio && master_point.is_none();
        let initializing_external_clock =
            master_type == MasterClockType::External && master_point.is_none();
        let initializing = initializing_audio_clock || initializing_external_clock;

        if !initializing && master_point.is_none() {
            self.next_audio_point = None;
            return;
        }

        let mut queued = self.resources.source.audio_frame_queue_size();
        if queued == 0 {
            tracing::debug!("Media session {}: audio queue ran dry", self.id);
            self.next_audio_point = None;
            return;
        }

        if initializing {
            if let Some(frame) = self.resources.source.pop_front_audio_frame() {
                queued -= 1;
                self.enqueue_audio(std::slice::from_ref(&frame), now);
                master_point = self.clocks.master_point(self.state, now);
            }
        }

        // Right after a start or seek the audio queue can begin well before
        // the master clock; skip what has already been missed instead of
        // playing a long catch-up tail
        let mut dropped = 0u64;
        if master_type != MasterClockType::Audio && self.next_audio_point.is_none() {
            if let Some(master_point) = master_point {
                while queued > 0 {
                    let Some(frame) = self.resources.source.peek_front_audio_frame() else {
                        break;
                    };
                    if frame.end_point() >= master_point {
                        break;
                    }
                    self.resources.source.pop_front_audio_frame();
                    queued -= 1;
                    dropped += 1;
                }
            }
        }

        if dropped > 0 {
            tracing::warn!(
                "Media session {}: dropped {} audio frames to fast-sync stream",
                self.id,
                dropped
            );
            self.metrics.record_dropped_audio(dropped);
        }

        let lookahead_limit = master_point.map(|point| point + self.config.audio_lookahead);
        let mut due = Vec::new();
        let mut next_point = None;

        for _ in 0..queued {
            let Some(frame) = self.resources.source.peek_front_audio_frame() else {
                break;
            };
            if lookahead_limit.is_some_and(|limit| frame.present_point > limit) {
                next_point = Some(frame.present_point);
                break;
            }
            if let Some(frame) = self.resources.source.pop_front_audio_frame() {
                due.push(frame);
            }
        }

        if !due.is_empty() {
            self.enqueue_audio(&due, now);
        }

        self.next_audio_point = next_point;
    }

    /// Enqueues `frames` as one contiguous run and re-reads the audio clock.
    fn enqueue_audio(&mut self, frames: &[AudioFrame], now: Instant) {
        let Some(first) = frames.first() else {
            return;
        };
        let buffers: Vec<Arc<AudioData>> = frames.iter().map(|f| Arc::clone(&f.data)).collect();

        match self.resources.audio_output.enqueue_streamed_data(
            self.resources.audio_source_id,
            &buffers,
            first.present_point.as_secs(),
            true,
        ) {
            Ok(()) => {
                tracing::trace!(
                    "Enqueued {} audio frames from {}",
                    frames.len(),
                    first.present_point
                );
                self.metrics.record_enqueued_audio(frames.len() as u64);
            }
            Err(e) => tracing::error!("Failed to enqueue audio data for playback: {}", e),
        }

        self.update_audio_clock(now);
    }

    fn update_video_clock(&mut self, point: MediaPoint, now: Instant) {
        self.clocks.video.set_explicit(point, now);
        if !self.clocks.external.is_valid() {
            self.clocks.external.set_explicit(point, now);
        }
    }

    fn update_audio_clock(&mut self, now: Instant) {
        let play_time = self
            .resources
            .audio_output
            .source_state(self.resources.audio_source_id)
            .and_then(|state| state.play_time);

        let Some(play_time) = play_time else {
            self.clocks.audio.invalidate();
            return;
        };

        // The output's position only advances in coarse steps
        if let Some(sync_point) = self.clocks.audio.sync_point() {
            if (sync_point.as_secs() - play_time).abs()
                < self.config.audio_clock_resync_threshold.as_secs()
            {
                return;
            }
        }

        let point = MediaPoint::from_secs(play_time);
        self.clocks.audio.set_explicit(point, now);
        if !self.clocks.external.is_valid() {
            self.clocks.external.set_explicit(point, now);
        }
    }

    fn record_drift(&mut self, now: Instant) {
        if self.clocks.master_type() == MasterClockType::Audio {
            return;
        }

        let master_point = self.clocks.master_point(self.state, now);
        let audio_point = self.clocks.audio.interpolated_time(now);
        let (Some(master_point), Some(audio_point)) = (master_point, audio_point) else {
            return;
        };

        if let Some(mean) = self.drift.record(audio_point - master_point) {
            tracing::debug!(
                "Media session {}: audio sync diff {} over {} samples",
                self.id,
                mean,
                self.drift.window()
            );
            self.resources.source.set_audio_sync_diff(mean);
            self.metrics.record_sync_diff(mean);
        }
    }

    /// Drops collected drift samples and clears the source's compensation.
    fn reset_drift(&mut self) {
        self.drift.reset();
        self.resources.source.set_audio_sync_diff(MediaDuration::ZERO);
    }

    fn next_sleep(&self, now: Instant) -> Duration {
        let (Some(next_video), Some(next_audio)) = (self.next_video_point, self.next_audio_point)
        else {
            return self.config.idle_sleep;
        };
        let Some(master_point) = self.clocks.master_point(self.state, now) else {
            return self.config.idle_sleep;
        };

        (next_video.min(next_audio) - master_point).to_std()
    }

    fn set_state(&mut self, state: MediaState) {
        if self.state != state {
            tracing::info!("Media session {}: {} -> {}", self.id, self.state, state);
        }
        self.state = state;
        self.metrics.set_state(state);
    }
}
