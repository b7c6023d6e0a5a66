//! The decode source collaborator.
//!
//! A source demuxes and decodes media on its own threads and exposes the
//! results as two frame queues. The session only drains those queues and asks
//! the source to (re)load from a point; it never decodes anything itself.

use std::collections::HashSet;

use crate::audio::AudioFrame;
use crate::error::MediaError;
use crate::time::{MediaDuration, MediaPoint};
use crate::video::VideoFrame;

/// Index of a stream within the media container.
pub type StreamIndex = u32;

/// Producer of decoded video and audio frames.
///
/// The queues are filled concurrently by the source's decode threads, so a
/// queue may grow between two calls. Every method must return without
/// blocking on decode work.
pub trait MediaSource: Send + Sync {
    /// True once decoding has reached the end of the media and the queues
    /// hold nothing more worth presenting.
    fn has_hit_end(&self) -> bool;

    /// Flushes the queues and starts producing frames from (near) `point`.
    ///
    /// `seek_offset_hint` is the signed distance from the current playback
    /// position to `point`, when known; sources may use it to bound their
    /// keyframe search.
    fn load_from_point(
        &self,
        point: MediaPoint,
        seek_offset_hint: Option<MediaDuration>,
    ) -> Result<(), MediaError>;

    /// Stops decoding and discards queued frames.
    fn stop(&self);

    /// Switches to `stream_indices`, re-synchronizing the new streams at
    /// `point`.
    fn load_streams(
        &self,
        point: MediaPoint,
        stream_indices: &HashSet<StreamIndex>,
    ) -> Result<(), MediaError>;

    fn video_frame_queue_size(&self) -> usize;
    fn peek_front_video_frame(&self) -> Option<VideoFrame>;
    fn pop_front_video_frame(&self) -> Option<VideoFrame>;

    fn audio_frame_queue_size(&self) -> usize;
    fn peek_front_audio_frame(&self) -> Option<AudioFrame>;
    fn pop_front_audio_frame(&self) -> Option<AudioFrame>;

    /// Reports how far the audio clock runs ahead of the master clock
    /// (negative when behind), averaged over the drift window. Zero clears any
    /// compensation the source applied earlier.
    fn set_audio_sync_diff(&self, diff: MediaDuration);

    /// Total length of the media, if known.
    fn source_duration(&self) -> Option<MediaDuration> {
        None
    }
}
