//! The media session handle.
//!
//! A [`MediaSession`] owns one dedicated thread running the presentation
//! loop. Callers talk to it only through the command queue; each command
//! returns a [`Promise`] that resolves once the session thread has applied
//! it.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use poll_promise::Promise;

use crate::audio::{AudioOutput, AudioSourceId};
use crate::command::{command_queue, CommandKind, CommandQueue, CommandReceiver};
use crate::config::SessionConfig;
use crate::metrics::{SessionMetrics, SessionMetricsSnapshot};
use crate::source::{MediaSource, StreamIndex};
use crate::state::MediaState;
use crate::time::{MediaDuration, MediaPoint};
use crate::video::{ImageData, TextureId, TextureSink};
use crate::worker::SessionWorker;

/// Identifier of a media session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MediaSessionId(pub u64);

impl std::fmt::Display for MediaSessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Collaborators and display resources a session is bound to.
#[derive(Clone)]
pub struct SessionResources {
    /// Decoded frame producer
    pub source: Arc<dyn MediaSource>,
    /// Where audio is played
    pub audio_output: Arc<dyn AudioOutput>,
    /// Where video is displayed
    pub texture_sink: Arc<dyn TextureSink>,
    /// Shown while stopped
    pub initial_image: Arc<ImageData>,
    pub texture_id: TextureId,
    pub audio_source_id: AudioSourceId,
}

/// Handle to a running media session.
///
/// Dropping the handle destroys the session.
pub struct MediaSession {
    id: MediaSessionId,
    texture_id: TextureId,
    audio_source_id: AudioSourceId,
    /// Channel to send commands to the session thread
    commands: CommandQueue,
    /// Flag to signal the thread should stop
    stop_flag: Arc<AtomicBool>,
    /// Handle to the session thread
    handle: Option<JoinHandle<()>>,
    metrics: SessionMetrics,
}

impl MediaSession {
    /// Creates a stopped session and starts its thread.
    pub fn new(id: MediaSessionId, resources: SessionResources, config: SessionConfig) -> Self {
        let (commands, receiver) = command_queue();
        let stop_flag = Arc::new(AtomicBool::new(false));
        let metrics = SessionMetrics::new();

        let texture_id = resources.texture_id;
        let audio_source_id = resources.audio_source_id;

        tracing::info!(
            "Creating media session {} ({}, {}, {} master clock)",
            id,
            texture_id,
            audio_source_id,
            config.master_clock
        );

        let worker = SessionWorker::new(id, config, resources, metrics.clone());
        let stop = Arc::clone(&stop_flag);

        let handle = thread::spawn(move || {
            session_loop(id, worker, receiver, stop);
        });

        Self {
            id,
            texture_id,
            audio_source_id,
            commands,
            stop_flag,
            handle: Some(handle),
            metrics,
        }
    }

    pub fn id(&self) -> MediaSessionId {
        self.id
    }

    pub fn texture_id(&self) -> TextureId {
        self.texture_id
    }

    pub fn audio_source_id(&self) -> AudioSourceId {
        self.audio_source_id
    }

    /// Starts playback, or resumes it if paused.
    ///
    /// With a `point`, playback starts (or resumes) from that point instead.
    pub fn play(&self, point: Option<MediaPoint>) -> Promise<bool> {
        self.send(CommandKind::Play(point))
    }

    pub fn pause(&self) -> Promise<bool> {
        self.send(CommandKind::Pause)
    }

    /// Stops playback and shows the initial image again.
    pub fn stop(&self) -> Promise<bool> {
        self.send(CommandKind::Stop)
    }

    /// Seeks relative to the current playback position. Only valid while
    /// playing or paused.
    pub fn seek_by_offset(&self, offset: MediaDuration) -> Promise<bool> {
        self.send(CommandKind::SeekByOffset(offset))
    }

    /// Seeks to an absolute point. Only valid while playing or paused.
    pub fn seek_to_point(&self, point: MediaPoint) -> Promise<bool> {
        self.send(CommandKind::SeekToPoint(point))
    }

    /// Switches the source to `stream_indices`.
    pub fn load_streams(&self, stream_indices: HashSet<StreamIndex>) -> Promise<bool> {
        self.send(CommandKind::LoadStreams(stream_indices))
    }

    /// Current playback state as last published by the session thread.
    pub fn state(&self) -> MediaState {
        self.metrics.state()
    }

    pub fn metrics(&self) -> SessionMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Returns true once [`MediaSession::destroy`] has been called.
    pub fn is_destroyed(&self) -> bool {
        self.stop_flag.load(Ordering::Acquire)
    }

    /// Stops the session thread and waits for it to exit.
    ///
    /// Commands still queued, or sent afterwards, resolve to `false`.
    /// Calling this more than once is harmless.
    pub fn destroy(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };

        tracing::info!("Destroying media session {}", self.id);
        self.stop_flag.store(true, Ordering::Release);
        if handle.join().is_err() {
            tracing::error!("Media session {} thread panicked", self.id);
        }
    }

    fn send(&self, kind: CommandKind) -> Promise<bool> {
        if self.is_destroyed() {
            tracing::debug!("{} command rejected: session {} is destroyed", kind.name(), self.id);
            return Promise::from_ready(false);
        }
        self.commands.push(kind)
    }
}

impl Drop for MediaSession {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl std::fmt::Debug for MediaSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaSession")
            .field("id", &self.id)
            .field("texture_id", &self.texture_id)
            .field("audio_source_id", &self.audio_source_id)
            .field("state", &self.state())
            .finish()
    }
}

fn session_loop(
    id: MediaSessionId,
    mut worker: SessionWorker,
    receiver: CommandReceiver,
    stop_flag: Arc<AtomicBool>,
) {
    tracing::info!("Media session {} thread running", id);

    while !stop_flag.load(Ordering::Acquire) {
        let wake = worker.run_iteration(&receiver, Instant::now());
        // Deadlines count from the end of the iteration's own work
        let sleep = worker.sleep_for(wake, Instant::now());
        if !sleep.is_zero() {
            thread::sleep(sleep);
        }
    }

    let failed = receiver.fail_pending();
    if failed > 0 {
        tracing::debug!("Media session {} exited with {} unapplied commands", id, failed);
    }
    tracing::info!("Media session {} thread exited", id);
}
