//! In-memory collaborators for tests and the headless demo.
//!
//! - [`SimulatedSource`]: frame queues filled by hand, or generated on demand
//!   from a [`SyntheticMedia`] description.
//! - [`SimulatedAudioOutput`]: tracks play state per source and reports a play
//!   position that advances with wall time while playing.
//! - [`RecordingTextureSink`]: records every texture update and rejects
//!   images whose pixel data does not match their dimensions.
//!
//! Every collaborator records the calls the session makes so tests can assert
//! on them.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::audio::{AudioData, AudioFormat, AudioFrame, AudioOutput, AudioSourceId, AudioSourceState};
use crate::error::MediaError;
use crate::source::{MediaSource, StreamIndex};
use crate::time::{MediaDuration, MediaPoint};
use crate::video::{ImageData, TextureId, TextureSink, VideoFrame};

/// A call made on a [`SimulatedSource`].
#[derive(Debug, Clone, PartialEq)]
pub enum SourceCall {
    LoadFromPoint {
        point: MediaPoint,
        seek_offset_hint: Option<MediaDuration>,
    },
    LoadStreams {
        point: MediaPoint,
        stream_indices: HashSet<StreamIndex>,
    },
    Stop,
    SetAudioSyncDiff(MediaDuration),
}

/// Description of generated media.
#[derive(Debug, Clone)]
pub struct SyntheticMedia {
    /// Total media length
    pub duration: MediaDuration,
    /// Video frames per second
    pub frame_rate: f64,
    /// Length of each generated audio frame
    pub audio_block: MediaDuration,
    pub audio_format: AudioFormat,
    pub width: u32,
    pub height: u32,
    /// How far ahead of the last popped frame the queues are kept filled
    pub decode_ahead: MediaDuration,
}

impl Default for SyntheticMedia {
    fn default() -> Self {
        Self {
            duration: MediaDuration::from_secs(10.0),
            frame_rate: 25.0,
            audio_block: MediaDuration::from_secs(0.02),
            audio_format: AudioFormat::default(),
            width: 64,
            height: 36,
            decode_ahead: MediaDuration::from_secs(1.0),
        }
    }
}

impl SyntheticMedia {
    fn frame_interval(&self) -> MediaDuration {
        MediaDuration::from_secs(1.0 / self.frame_rate.max(1.0))
    }
}

#[derive(Debug, Default)]
struct SourceInner {
    video: VecDeque<VideoFrame>,
    audio: VecDeque<AudioFrame>,
    calls: Vec<SourceCall>,
    /// Next point to generate for each queue, when generating
    video_cursor: MediaPoint,
    audio_cursor: MediaPoint,
    /// Whether generation has been started by a load
    loaded: bool,
}

/// A decode source backed by in-memory queues.
#[derive(Debug)]
pub struct SimulatedSource {
    inner: Mutex<SourceInner>,
    synthetic: Option<SyntheticMedia>,
    end_of_stream: AtomicBool,
    fail_loads: AtomicBool,
}

impl Default for SimulatedSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedSource {
    /// Creates a source whose queues are filled only through the `push_*`
    /// methods.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(SourceInner::default()),
            synthetic: None,
            end_of_stream: AtomicBool::new(false),
            fail_loads: AtomicBool::new(false),
        }
    }

    /// Creates a source that generates frames for `media` after each load.
    pub fn synthetic(media: SyntheticMedia) -> Self {
        Self {
            synthetic: Some(media),
            ..Self::new()
        }
    }

    pub fn push_video_frame(&self, frame: VideoFrame) {
        self.inner.lock().video.push_back(frame);
    }

    pub fn push_audio_frame(&self, frame: AudioFrame) {
        self.inner.lock().audio.push_back(frame);
    }

    /// Marks the media as fully decoded. Cleared by the next load.
    pub fn set_end_of_stream(&self, eos: bool) {
        self.end_of_stream.store(eos, Ordering::Release);
    }

    /// Makes subsequent `load_from_point` / `load_streams` calls fail.
    pub fn set_fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::Release);
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<SourceCall> {
        self.inner.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.inner.lock().calls.clear();
    }

    /// Arguments of every `load_from_point` call.
    pub fn load_calls(&self) -> Vec<(MediaPoint, Option<MediaDuration>)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SourceCall::LoadFromPoint {
                    point,
                    seek_offset_hint,
                } => Some((point, seek_offset_hint)),
                _ => None,
            })
            .collect()
    }

    /// Every sync diff reported, in order.
    pub fn sync_diffs(&self) -> Vec<MediaDuration> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SourceCall::SetAudioSyncDiff(diff) => Some(diff),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: SourceCall) {
        self.inner.lock().calls.push(call);
    }

    fn restart_at(&self, point: MediaPoint) {
        let mut inner = self.inner.lock();
        inner.video.clear();
        inner.audio.clear();
        inner.video_cursor = point;
        inner.audio_cursor = point;
        inner.loaded = true;
        drop(inner);
        self.end_of_stream.store(false, Ordering::Release);
    }

    /// Tops up the queues from the synthetic media description.
    fn generate(&self) {
        let Some(media) = &self.synthetic else {
            return;
        };
        let end = MediaPoint::ZERO + media.duration;

        let mut inner = self.inner.lock();
        if !inner.loaded {
            return;
        }

        let horizon = |queue_front: Option<MediaPoint>, cursor: MediaPoint| {
            queue_front.unwrap_or(cursor) + media.decode_ahead
        };

        let video_limit = horizon(inner.video.front().map(|f| f.present_point), inner.video_cursor);
        while inner.video_cursor < end && inner.video_cursor < video_limit {
            let point = inner.video_cursor;
            let shade = ((point.as_secs() * 50.0) as u64 % 256) as u8;
            let image = Arc::new(ImageData::solid(media.width, media.height, [shade, 0, 255 - shade]));
            inner.video.push_back(VideoFrame::new(point, image));
            inner.video_cursor = point + media.frame_interval();
        }

        let audio_limit = horizon(inner.audio.front().map(|f| f.present_point), inner.audio_cursor);
        while inner.audio_cursor < end && inner.audio_cursor < audio_limit {
            let point = inner.audio_cursor;
            let data = Arc::new(AudioData::silence(media.audio_format, media.audio_block));
            inner.audio.push_back(AudioFrame::new(point, data));
            inner.audio_cursor = point + media.audio_block;
        }

        if inner.video_cursor >= end && inner.audio_cursor >= end {
            self.end_of_stream.store(true, Ordering::Release);
        }
    }
}

impl MediaSource for SimulatedSource {
    fn has_hit_end(&self) -> bool {
        if !self.end_of_stream.load(Ordering::Acquire) {
            return false;
        }
        let inner = self.inner.lock();
        inner.video.is_empty() && inner.audio.is_empty()
    }

    fn load_from_point(
        &self,
        point: MediaPoint,
        seek_offset_hint: Option<MediaDuration>,
    ) -> Result<(), MediaError> {
        self.record(SourceCall::LoadFromPoint {
            point,
            seek_offset_hint,
        });
        if self.fail_loads.load(Ordering::Acquire) {
            return Err(MediaError::LoadFailed(format!("cannot load from {point}")));
        }
        self.restart_at(point);
        Ok(())
    }

    fn stop(&self) {
        self.record(SourceCall::Stop);
        let mut inner = self.inner.lock();
        inner.video.clear();
        inner.audio.clear();
        inner.loaded = false;
    }

    fn load_streams(
        &self,
        point: MediaPoint,
        stream_indices: &HashSet<StreamIndex>,
    ) -> Result<(), MediaError> {
        self.record(SourceCall::LoadStreams {
            point,
            stream_indices: stream_indices.clone(),
        });
        if self.fail_loads.load(Ordering::Acquire) {
            return Err(MediaError::StreamsUnavailable(format!("{stream_indices:?}")));
        }
        self.restart_at(point);
        Ok(())
    }

    fn video_frame_queue_size(&self) -> usize {
        self.generate();
        self.inner.lock().video.len()
    }

    fn peek_front_video_frame(&self) -> Option<VideoFrame> {
        self.inner.lock().video.front().cloned()
    }

    fn pop_front_video_frame(&self) -> Option<VideoFrame> {
        self.inner.lock().video.pop_front()
    }

    fn audio_frame_queue_size(&self) -> usize {
        self.generate();
        self.inner.lock().audio.len()
    }

    fn peek_front_audio_frame(&self) -> Option<AudioFrame> {
        self.inner.lock().audio.front().cloned()
    }

    fn pop_front_audio_frame(&self) -> Option<AudioFrame> {
        self.inner.lock().audio.pop_front()
    }

    fn set_audio_sync_diff(&self, diff: MediaDuration) {
        self.record(SourceCall::SetAudioSyncDiff(diff));
    }

    fn source_duration(&self) -> Option<MediaDuration> {
        self.synthetic.as_ref().map(|media| media.duration)
    }
}

/// Play state of one simulated audio source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimulatedPlayState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

#[derive(Debug, Default)]
struct SimulatedAudioSource {
    play_state: SimulatedPlayState,
    /// Media time of the first sample since the last flush
    stream_start: Option<f64>,
    /// Media time just past the last enqueued sample
    stream_end: f64,
    /// Seconds played before the current play run
    played: f64,
    resumed_at: Option<Instant>,
    pinned_play_time: Option<f64>,
    enqueued_buffers: usize,
    enqueue_start_times: Vec<f64>,
    flush_count: usize,
    play_count: usize,
    pause_count: usize,
}

impl SimulatedAudioSource {
    fn play_time(&self, now: Instant) -> Option<f64> {
        if let Some(pinned) = self.pinned_play_time {
            return Some(pinned);
        }
        let start = self.stream_start?;
        let running = match (self.play_state, self.resumed_at) {
            (SimulatedPlayState::Playing, Some(resumed_at)) => {
                now.saturating_duration_since(resumed_at).as_secs_f64()
            }
            _ => 0.0,
        };
        Some((start + self.played + running).min(self.stream_end))
    }

    fn start_playing(&mut self, now: Instant) {
        if self.play_state != SimulatedPlayState::Playing {
            self.play_state = SimulatedPlayState::Playing;
            self.resumed_at = Some(now);
        }
    }

    fn stop_running(&mut self, now: Instant) {
        if let (SimulatedPlayState::Playing, Some(resumed_at)) = (self.play_state, self.resumed_at) {
            self.played += now.saturating_duration_since(resumed_at).as_secs_f64();
        }
        self.resumed_at = None;
    }
}

/// An audio output that plays into the void.
#[derive(Debug, Default)]
pub struct SimulatedAudioOutput {
    sources: Mutex<HashMap<AudioSourceId, SimulatedAudioSource>>,
    destroyed: Mutex<Vec<AudioSourceId>>,
    fail_enqueue: AtomicBool,
}

impl SimulatedAudioOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent enqueues fail.
    pub fn set_fail_enqueue(&self, fail: bool) {
        self.fail_enqueue.store(fail, Ordering::Release);
    }

    /// Forces the reported play time of `source`; `None` returns to wall-clock
    /// driven reporting.
    pub fn pin_play_time(&self, source: AudioSourceId, play_time: Option<f64>) {
        self.sources.lock().entry(source).or_default().pinned_play_time = play_time;
    }

    pub fn play_state(&self, source: AudioSourceId) -> SimulatedPlayState {
        self.read(source, |s| s.play_state)
    }

    pub fn enqueued_buffers(&self, source: AudioSourceId) -> usize {
        self.read(source, |s| s.enqueued_buffers)
    }

    /// `stream_start_time` of every enqueue call, in order.
    pub fn enqueue_start_times(&self, source: AudioSourceId) -> Vec<f64> {
        self.read(source, |s| s.enqueue_start_times.clone())
    }

    pub fn flush_count(&self, source: AudioSourceId) -> usize {
        self.read(source, |s| s.flush_count)
    }

    pub fn play_count(&self, source: AudioSourceId) -> usize {
        self.read(source, |s| s.play_count)
    }

    pub fn pause_count(&self, source: AudioSourceId) -> usize {
        self.read(source, |s| s.pause_count)
    }

    pub fn destroyed_sources(&self) -> Vec<AudioSourceId> {
        self.destroyed.lock().clone()
    }

    fn read<T: Default>(&self, source: AudioSourceId, f: impl FnOnce(&SimulatedAudioSource) -> T) -> T {
        self.sources.lock().get(&source).map(f).unwrap_or_default()
    }
}

impl AudioOutput for SimulatedAudioOutput {
    fn play_source(&self, source: AudioSourceId) -> Result<(), MediaError> {
        let mut sources = self.sources.lock();
        let state = sources.entry(source).or_default();
        state.play_count += 1;
        state.start_playing(Instant::now());
        Ok(())
    }

    fn pause_source(&self, source: AudioSourceId) -> Result<(), MediaError> {
        let mut sources = self.sources.lock();
        let state = sources.entry(source).or_default();
        state.pause_count += 1;
        if state.play_state == SimulatedPlayState::Playing {
            state.stop_running(Instant::now());
            state.play_state = SimulatedPlayState::Paused;
        }
        Ok(())
    }

    fn flush_enqueued_data(&self, source: AudioSourceId) {
        let mut sources = self.sources.lock();
        let state = sources.entry(source).or_default();
        state.flush_count += 1;
        state.play_state = SimulatedPlayState::Stopped;
        state.stream_start = None;
        state.stream_end = 0.0;
        state.played = 0.0;
        state.resumed_at = None;
    }

    fn enqueue_streamed_data(
        &self,
        source: AudioSourceId,
        buffers: &[Arc<AudioData>],
        stream_start_time: f64,
        auto_play_if_stopped: bool,
    ) -> Result<(), MediaError> {
        if self.fail_enqueue.load(Ordering::Acquire) {
            return Err(MediaError::AudioDevice("enqueue rejected".into()));
        }

        let mut sources = self.sources.lock();
        let state = sources.entry(source).or_default();
        let length: f64 = buffers.iter().map(|b| b.duration().as_secs()).sum();

        if state.stream_start.is_none() {
            state.stream_start = Some(stream_start_time);
            state.played = 0.0;
        }
        state.stream_end = state.stream_end.max(stream_start_time + length);
        state.enqueued_buffers += buffers.len();
        state.enqueue_start_times.push(stream_start_time);

        if auto_play_if_stopped && state.play_state == SimulatedPlayState::Stopped {
            state.start_playing(Instant::now());
        }
        Ok(())
    }

    fn source_state(&self, source: AudioSourceId) -> Option<AudioSourceState> {
        let sources = self.sources.lock();
        let state = sources.get(&source)?;
        Some(AudioSourceState {
            play_time: state.play_time(Instant::now()),
        })
    }

    fn destroy_source(&self, source: AudioSourceId) {
        self.sources.lock().remove(&source);
        self.destroyed.lock().push(source);
    }
}

/// A texture sink that keeps every image it is given.
#[derive(Debug, Default)]
pub struct RecordingTextureSink {
    updates: Mutex<Vec<(TextureId, Arc<ImageData>)>>,
    destroyed: Mutex<Vec<TextureId>>,
}

impl RecordingTextureSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_count(&self) -> usize {
        self.updates.lock().len()
    }

    /// The most recent image shown on `texture`.
    pub fn last_image(&self, texture: TextureId) -> Option<Arc<ImageData>> {
        self.updates
            .lock()
            .iter()
            .rev()
            .find(|(id, _)| *id == texture)
            .map(|(_, image)| Arc::clone(image))
    }

    pub fn destroyed_textures(&self) -> Vec<TextureId> {
        self.destroyed.lock().clone()
    }
}

impl TextureSink for RecordingTextureSink {
    fn update_texture(&self, texture: TextureId, image: Arc<ImageData>) -> Result<(), MediaError> {
        if image.pixels.len() != image.expected_len() {
            return Err(MediaError::Render(format!(
                "{texture}: expected {} bytes of pixel data, got {}",
                image.expected_len(),
                image.pixels.len()
            )));
        }
        self.updates.lock().push((texture, image));
        Ok(())
    }

    fn destroy_texture(&self, texture: TextureId) {
        self.destroyed.lock().push(texture);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_manual_source_queues_and_calls() {
        let source = SimulatedSource::new();
        let image = Arc::new(ImageData::solid(1, 1, [0, 0, 0]));
        source.push_video_frame(VideoFrame::new(MediaPoint::from_secs(1.0), Arc::clone(&image)));
        source.push_video_frame(VideoFrame::new(MediaPoint::from_secs(2.0), image));

        assert_eq!(source.video_frame_queue_size(), 2);
        let Some(front) = source.pop_front_video_frame() else {
            panic!("queue should not be empty");
        };
        assert_eq!(front.present_point, MediaPoint::from_secs(1.0));

        assert!(source.load_from_point(MediaPoint::from_secs(5.0), None).is_ok());
        assert_eq!(source.video_frame_queue_size(), 0);
        assert_eq!(source.load_calls(), vec![(MediaPoint::from_secs(5.0), None)]);
    }

    #[test]
    fn test_failed_load_is_recorded() {
        let source = SimulatedSource::new();
        source.set_fail_loads(true);
        let result = source.load_from_point(MediaPoint::ZERO, None);
        assert!(matches!(result, Err(MediaError::LoadFailed(_))));
        assert_eq!(source.load_calls().len(), 1);
    }

    #[test]
    fn test_end_of_stream_waits_for_empty_queues() {
        let source = SimulatedSource::new();
        source.push_audio_frame(AudioFrame::new(
            MediaPoint::ZERO,
            Arc::new(AudioData::silence(AudioFormat::default(), MediaDuration::from_secs(0.02))),
        ));
        source.set_end_of_stream(true);
        assert!(!source.has_hit_end());

        source.pop_front_audio_frame();
        assert!(source.has_hit_end());
    }

    #[test]
    fn test_synthetic_source_generates_after_load() {
        let source = SimulatedSource::synthetic(SyntheticMedia {
            duration: MediaDuration::from_secs(0.21),
            decode_ahead: MediaDuration::from_secs(1.0),
            ..SyntheticMedia::default()
        });
        assert_eq!(source.video_frame_queue_size(), 0);

        assert!(source.load_from_point(MediaPoint::ZERO, None).is_ok());
        assert_eq!(source.video_frame_queue_size(), 6);
        assert_eq!(source.audio_frame_queue_size(), 11);
        assert_eq!(source.source_duration(), Some(MediaDuration::from_secs(0.21)));

        while source.pop_front_video_frame().is_some() {}
        while source.pop_front_audio_frame().is_some() {}
        assert!(source.has_hit_end());
    }

    #[test]
    fn test_audio_output_play_time_follows_enqueued_data() {
        let output = SimulatedAudioOutput::new();
        let id = AudioSourceId(1);
        assert_eq!(output.source_state(id), None);

        let block = Arc::new(AudioData::silence(AudioFormat::default(), MediaDuration::from_secs(1.0)));
        assert!(output.enqueue_streamed_data(id, &[block], 4.0, true).is_ok());
        assert_eq!(output.play_state(id), SimulatedPlayState::Playing);

        let Some(AudioSourceState {
            play_time: Some(play_time),
        }) = output.source_state(id)
        else {
            panic!("enqueued source should report a play time");
        };
        assert!((4.0..=5.0).contains(&play_time));

        output.flush_enqueued_data(id);
        assert_eq!(output.play_state(id), SimulatedPlayState::Stopped);
        assert_eq!(output.source_state(id), Some(AudioSourceState { play_time: None }));
        assert_eq!(output.flush_count(id), 1);
    }

    #[test]
    fn test_audio_output_pause_holds_position() {
        let output = SimulatedAudioOutput::new();
        let id = AudioSourceId(2);
        let block = Arc::new(AudioData::silence(AudioFormat::default(), MediaDuration::from_secs(10.0)));
        assert!(output.enqueue_streamed_data(id, &[block], 0.0, true).is_ok());
        assert!(output.pause_source(id).is_ok());

        let first = output.source_state(id).and_then(|s| s.play_time);
        std::thread::sleep(Duration::from_millis(5));
        let second = output.source_state(id).and_then(|s| s.play_time);
        assert_eq!(first, second);
        assert_eq!(output.pause_count(id), 1);
    }

    #[test]
    fn test_pinned_play_time() {
        let output = SimulatedAudioOutput::new();
        let id = AudioSourceId(3);
        output.pin_play_time(id, Some(7.5));
        assert_eq!(output.source_state(id), Some(AudioSourceState { play_time: Some(7.5) }));
    }

    #[test]
    fn test_recording_sink() {
        let sink = RecordingTextureSink::new();
        let red = Arc::new(ImageData::solid(1, 1, [255, 0, 0]));
        let blue = Arc::new(ImageData::solid(1, 1, [0, 0, 255]));
        assert!(sink.update_texture(TextureId(1), red).is_ok());
        assert!(sink.update_texture(TextureId(1), Arc::clone(&blue)).is_ok());

        assert_eq!(sink.update_count(), 2);
        assert_eq!(sink.last_image(TextureId(1)), Some(blue));
        assert_eq!(sink.last_image(TextureId(2)), None);

        sink.destroy_texture(TextureId(1));
        assert_eq!(sink.destroyed_textures(), vec![TextureId(1)]);
    }

    #[test]
    fn test_recording_sink_rejects_truncated_image() {
        let sink = RecordingTextureSink::new();
        let truncated = Arc::new(ImageData::new(
            crate::video::PixelFormat::Rgba32,
            2,
            2,
            vec![0; 15],
        ));

        let Err(MediaError::Render(msg)) = sink.update_texture(TextureId(4), truncated) else {
            panic!("truncated image should be rejected");
        };
        assert!(msg.contains("expected 16 bytes"));
        assert_eq!(sink.update_count(), 0);
    }
}
