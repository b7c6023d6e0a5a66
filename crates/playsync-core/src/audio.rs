//! Audio frame types and the audio output collaborator.
//!
//! The session never owns device buffers. It hands decoded audio to an
//! [`AudioOutput`] as streamed buffers tagged with the media point of the
//! first sample, and reads the output's reported play position back to drive
//! the audio clock.

use std::sync::Arc;

use crate::error::MediaError;
use crate::time::{MediaDuration, MediaPoint};

/// Identifier of the streamed audio source a session plays through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AudioSourceId(pub u64);

impl std::fmt::Display for AudioSourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "audio-source#{}", self.0)
    }
}

/// Sample layout of decoded audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels (1 = mono, 2 = stereo)
    pub channels: u16,
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            channels: 2,
        }
    }
}

/// A block of decoded, interleaved audio samples.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioData {
    pub format: AudioFormat,
    /// Interleaved samples (frames * channels)
    pub samples: Vec<f32>,
}

impl AudioData {
    pub fn new(format: AudioFormat, samples: Vec<f32>) -> Self {
        Self { format, samples }
    }

    /// Silence of the given length.
    pub fn silence(format: AudioFormat, duration: MediaDuration) -> Self {
        let frames = (duration.as_secs().max(0.0) * f64::from(format.sample_rate)).round() as usize;
        Self::new(format, vec![0.0; frames * usize::from(format.channels)])
    }

    /// Number of sample frames (samples per channel).
    pub fn frame_count(&self) -> usize {
        match self.format.channels {
            0 => 0,
            channels => self.samples.len() / usize::from(channels),
        }
    }

    /// Playback length of this block.
    pub fn duration(&self) -> MediaDuration {
        if self.format.sample_rate == 0 {
            return MediaDuration::ZERO;
        }
        MediaDuration::from_secs(self.frame_count() as f64 / f64::from(self.format.sample_rate))
    }
}

/// A decoded audio frame with its presentation point.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Media point of the first sample
    pub present_point: MediaPoint,
    pub data: Arc<AudioData>,
}

impl AudioFrame {
    pub fn new(present_point: MediaPoint, data: Arc<AudioData>) -> Self {
        Self {
            present_point,
            data,
        }
    }

    /// Media point just past the last sample.
    pub fn end_point(&self) -> MediaPoint {
        self.present_point + self.data.duration()
    }
}

/// Playback status reported by an audio output for one source.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AudioSourceState {
    /// Media time (seconds) of the sample currently being played, if known
    pub play_time: Option<f64>,
}

/// Audio output collaborator that plays streamed buffers.
pub trait AudioOutput: Send + Sync {
    /// Starts or resumes playback of previously enqueued data.
    fn play_source(&self, source: AudioSourceId) -> Result<(), MediaError>;

    /// Pauses playback, keeping enqueued data.
    fn pause_source(&self, source: AudioSourceId) -> Result<(), MediaError>;

    /// Stops playback and discards all enqueued data.
    fn flush_enqueued_data(&self, source: AudioSourceId);

    /// Appends buffers to the source's play queue.
    ///
    /// `stream_start_time` is the media time (seconds) of the first sample of
    /// `buffers`. With `auto_play_if_stopped`, a source that was stopped (for
    /// example by a flush) starts playing again.
    fn enqueue_streamed_data(
        &self,
        source: AudioSourceId,
        buffers: &[Arc<AudioData>],
        stream_start_time: f64,
        auto_play_if_stopped: bool,
    ) -> Result<(), MediaError>;

    /// Current playback status, or `None` if the source is unknown.
    fn source_state(&self, source: AudioSourceId) -> Option<AudioSourceState>;

    /// Releases `source`. Called by the session manager once a session is gone.
    fn destroy_source(&self, _source: AudioSourceId) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_data_duration() {
        let format = AudioFormat {
            sample_rate: 48000,
            channels: 2,
        };
        let data = AudioData::new(format, vec![0.0; 48000]);
        assert_eq!(data.frame_count(), 24000);
        assert_eq!(data.duration(), MediaDuration::from_secs(0.5));
    }

    #[test]
    fn test_silence_and_end_point() {
        let format = AudioFormat {
            sample_rate: 1000,
            channels: 1,
        };
        let data = Arc::new(AudioData::silence(format, MediaDuration::from_secs(0.25)));
        assert_eq!(data.frame_count(), 250);

        let frame = AudioFrame::new(MediaPoint::from_secs(2.0), data);
        assert_eq!(frame.end_point(), MediaPoint::from_secs(2.25));
    }

    #[test]
    fn test_degenerate_formats_have_zero_duration() {
        let no_rate = AudioData::new(
            AudioFormat {
                sample_rate: 0,
                channels: 2,
            },
            vec![0.0; 10],
        );
        assert_eq!(no_rate.duration(), MediaDuration::ZERO);

        let no_channels = AudioData::new(
            AudioFormat {
                sample_rate: 48000,
                channels: 0,
            },
            vec![0.0; 10],
        );
        assert_eq!(no_channels.frame_count(), 0);
    }
}
