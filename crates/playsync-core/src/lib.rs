//! playsync-core: Audio/video presentation synchronization engine.
//!
//! This crate keeps decoded audio and video frames presented at the right
//! wall-clock moments. It does not decode, play or display anything itself;
//! it drives three collaborators:
//!
//! - a decode source ([`source::MediaSource`]) that fills frame queues
//! - an audio output ([`audio::AudioOutput`]) that plays streamed buffers
//! - a texture sink ([`video::TextureSink`]) that displays images
//!
//! Each [`session::MediaSession`] runs its own presentation thread, driven by
//! play / pause / stop / seek / stream-selection commands. Timing is
//! arbitrated between a video, an audio and an external clock
//! ([`clock`]), and audio drift against the master clock is reported back to
//! the source ([`drift`]).
//!
//! - Core types: [`time`], [`clock`], [`state`], [`video`], [`audio`]
//! - Session plumbing: [`command`], [`session`], [`manager`], [`metrics`]
//! - In-memory collaborators for tests and demos: [`sim`]

pub mod audio;
pub mod clock;
pub mod command;
pub mod config;
pub mod drift;
pub mod error;
pub mod manager;
pub mod metrics;
pub mod session;
pub mod sim;
pub mod source;
pub mod state;
pub mod time;
pub mod video;

mod worker;

pub use audio::{AudioData, AudioFormat, AudioFrame, AudioOutput, AudioSourceId, AudioSourceState};
pub use clock::{Clock, MasterClockType, SessionClocks};
pub use command::{CommandKind, CommandQueue};
pub use config::SessionConfig;
pub use drift::DriftTracker;
pub use error::MediaError;
pub use manager::{SessionManager, SessionRequest};
pub use metrics::{SessionMetrics, SessionMetricsSnapshot};
pub use session::{MediaSession, MediaSessionId, SessionResources};
pub use source::{MediaSource, StreamIndex};
pub use state::MediaState;
pub use time::{MediaDuration, MediaPoint};
pub use video::{ImageData, PixelFormat, TextureId, TextureSink, VideoFrame};

pub use poll_promise::Promise;
