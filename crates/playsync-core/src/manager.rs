//! Owner of all media sessions, addressed by id.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use poll_promise::Promise;

use crate::audio::{AudioOutput, AudioSourceId};
use crate::config::SessionConfig;
use crate::metrics::SessionMetricsSnapshot;
use crate::session::{MediaSession, MediaSessionId, SessionResources};
use crate::source::{MediaSource, StreamIndex};
use crate::state::MediaState;
use crate::time::{MediaDuration, MediaPoint};
use crate::video::{ImageData, TextureId, TextureSink};

/// What a caller supplies to create a session; the manager adds the
/// collaborators it shares between sessions.
pub struct SessionRequest {
    pub source: Arc<dyn MediaSource>,
    pub initial_image: Arc<ImageData>,
    pub texture_id: TextureId,
    pub audio_source_id: AudioSourceId,
    pub config: SessionConfig,
}

/// Creates, addresses and destroys media sessions.
///
/// All sessions share one audio output and one texture sink. When a session
/// is destroyed, its audio source and texture are released there as well.
pub struct SessionManager {
    audio_output: Arc<dyn AudioOutput>,
    texture_sink: Arc<dyn TextureSink>,
    sessions: HashMap<MediaSessionId, MediaSession>,
    next_id: u64,
}

impl SessionManager {
    pub fn new(audio_output: Arc<dyn AudioOutput>, texture_sink: Arc<dyn TextureSink>) -> Self {
        Self {
            audio_output,
            texture_sink,
            sessions: HashMap::new(),
            next_id: 1,
        }
    }

    /// Starts a new, stopped session and returns its id.
    pub fn create_session(&mut self, request: SessionRequest) -> MediaSessionId {
        let id = MediaSessionId(self.next_id);
        self.next_id += 1;

        let resources = SessionResources {
            source: request.source,
            audio_output: Arc::clone(&self.audio_output),
            texture_sink: Arc::clone(&self.texture_sink),
            initial_image: request.initial_image,
            texture_id: request.texture_id,
            audio_source_id: request.audio_source_id,
        };

        self.sessions
            .insert(id, MediaSession::new(id, resources, request.config));
        id
    }

    pub fn does_session_exist(&self, id: MediaSessionId) -> bool {
        self.sessions.contains_key(&id)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn texture_id(&self, id: MediaSessionId) -> Option<TextureId> {
        self.sessions.get(&id).map(MediaSession::texture_id)
    }

    pub fn audio_source_id(&self, id: MediaSessionId) -> Option<AudioSourceId> {
        self.sessions.get(&id).map(MediaSession::audio_source_id)
    }

    pub fn state(&self, id: MediaSessionId) -> Option<MediaState> {
        self.sessions.get(&id).map(MediaSession::state)
    }

    pub fn metrics(&self, id: MediaSessionId) -> Option<SessionMetricsSnapshot> {
        self.sessions.get(&id).map(MediaSession::metrics)
    }

    pub fn play(&self, id: MediaSessionId, point: Option<MediaPoint>) -> Promise<bool> {
        self.with_session(id, "play", |session| session.play(point))
    }

    pub fn pause(&self, id: MediaSessionId) -> Promise<bool> {
        self.with_session(id, "pause", MediaSession::pause)
    }

    pub fn stop(&self, id: MediaSessionId) -> Promise<bool> {
        self.with_session(id, "stop", MediaSession::stop)
    }

    pub fn seek_by_offset(&self, id: MediaSessionId, offset: MediaDuration) -> Promise<bool> {
        self.with_session(id, "seek_by_offset", |session| session.seek_by_offset(offset))
    }

    pub fn seek_to_point(&self, id: MediaSessionId, point: MediaPoint) -> Promise<bool> {
        self.with_session(id, "seek_to_point", |session| session.seek_to_point(point))
    }

    pub fn load_streams(
        &self,
        id: MediaSessionId,
        stream_indices: HashSet<StreamIndex>,
    ) -> Promise<bool> {
        self.with_session(id, "load_streams", |session| {
            session.load_streams(stream_indices)
        })
    }

    /// Destroys a session and releases its texture and audio source.
    pub fn destroy_session(&mut self, id: MediaSessionId) {
        let Some(mut session) = self.sessions.remove(&id) else {
            tracing::warn!("destroy_session: no such media session: {}", id);
            return;
        };

        session.destroy();
        self.texture_sink.destroy_texture(session.texture_id());
        self.audio_output.destroy_source(session.audio_source_id());
    }

    /// Destroys every session and restarts id allocation.
    pub fn destroy_all(&mut self) {
        let mut ids: Vec<_> = self.sessions.keys().copied().collect();
        ids.sort();
        for id in ids {
            self.destroy_session(id);
        }
        self.next_id = 1;
    }

    fn with_session(
        &self,
        id: MediaSessionId,
        operation: &str,
        f: impl FnOnce(&MediaSession) -> Promise<bool>,
    ) -> Promise<bool> {
        match self.sessions.get(&id) {
            Some(session) => f(session),
            None => {
                tracing::error!("{}: no such media session: {}", operation, id);
                Promise::from_ready(false)
            }
        }
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.destroy_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{RecordingTextureSink, SimulatedAudioOutput, SimulatedSource};

    fn manager() -> (SessionManager, Arc<SimulatedAudioOutput>, Arc<RecordingTextureSink>) {
        let audio = Arc::new(SimulatedAudioOutput::new());
        let sink = Arc::new(RecordingTextureSink::new());
        let manager = SessionManager::new(audio.clone(), sink.clone());
        (manager, audio, sink)
    }

    fn request(texture: u64, audio_source: u64) -> SessionRequest {
        SessionRequest {
            source: Arc::new(SimulatedSource::new()),
            initial_image: Arc::new(ImageData::solid(2, 2, [0, 0, 0])),
            texture_id: TextureId(texture),
            audio_source_id: AudioSourceId(audio_source),
            config: SessionConfig::default(),
        }
    }

    #[test]
    fn test_create_and_query_sessions() {
        let (mut manager, _, _) = manager();
        let first = manager.create_session(request(10, 20));
        let second = manager.create_session(request(11, 21));

        assert_eq!(first, MediaSessionId(1));
        assert_eq!(second, MediaSessionId(2));
        assert!(manager.does_session_exist(first));
        assert_eq!(manager.texture_id(second), Some(TextureId(11)));
        assert_eq!(manager.audio_source_id(first), Some(AudioSourceId(20)));
        assert_eq!(manager.state(first), Some(MediaState::Stopped));
        assert_eq!(manager.session_count(), 2);
    }

    #[test]
    fn test_unknown_session_commands_fail() {
        let (manager, _, _) = manager();
        let missing = MediaSessionId(42);

        assert!(!manager.does_session_exist(missing));
        assert_eq!(manager.texture_id(missing), None);
        assert_eq!(manager.play(missing, None).ready(), Some(&false));
        assert_eq!(manager.pause(missing).ready(), Some(&false));
        assert_eq!(manager.stop(missing).ready(), Some(&false));
        assert_eq!(
            manager
                .seek_to_point(missing, MediaPoint::from_secs(1.0))
                .ready(),
            Some(&false)
        );
        assert_eq!(
            manager
                .seek_by_offset(missing, MediaDuration::from_secs(1.0))
                .ready(),
            Some(&false)
        );
        assert_eq!(
            manager.load_streams(missing, HashSet::from([0])).ready(),
            Some(&false)
        );
    }

    #[test]
    fn test_destroy_session_releases_resources() {
        let (mut manager, audio, sink) = manager();
        let id = manager.create_session(request(5, 6));

        manager.destroy_session(id);
        assert!(!manager.does_session_exist(id));
        assert_eq!(sink.destroyed_textures(), vec![TextureId(5)]);
        assert_eq!(audio.destroyed_sources(), vec![AudioSourceId(6)]);

        // Unknown ids are ignored
        manager.destroy_session(id);
        assert_eq!(sink.destroyed_textures().len(), 1);
    }

    #[test]
    fn test_destroy_all_resets_ids() {
        let (mut manager, audio, _) = manager();
        manager.create_session(request(1, 1));
        manager.create_session(request(2, 2));

        manager.destroy_all();
        assert_eq!(manager.session_count(), 0);
        assert_eq!(audio.destroyed_sources().len(), 2);
        assert_eq!(manager.create_session(request(3, 3)), MediaSessionId(1));
    }

    #[test]
    fn test_play_through_manager() {
        let (mut manager, _, _) = manager();
        let id = manager.create_session(request(1, 1));

        let result = manager.play(id, None);
        assert!(*result.block_until_ready());
        assert_eq!(manager.state(id), Some(MediaState::Playing));
    }
}
