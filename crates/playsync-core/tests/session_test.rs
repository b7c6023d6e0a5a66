//! Media Session Integration Tests
//!
//! These tests run real session threads against the simulated collaborators
//! and generated media, and check what the session shows and plays as it is
//! driven through commands.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test --package playsync-core --test session_test
//! ```
//!
//! For session logs:
//! ```bash
//! RUST_LOG=playsync_core=debug cargo test --test session_test -- --nocapture
//! ```

mod session_tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    use playsync_core::sim::{
        RecordingTextureSink, SimulatedAudioOutput, SimulatedSource, SyntheticMedia,
    };
    use playsync_core::{
        AudioSourceId, ImageData, MasterClockType, MediaDuration, MediaPoint, MediaSession,
        MediaSessionId, MediaState, SessionConfig, SessionResources, TextureId,
    };

    const TEXTURE: TextureId = TextureId(1);
    const AUDIO_SOURCE: AudioSourceId = AudioSourceId(1);
    const INITIAL_COLOUR: [u8; 3] = [1, 2, 3];

    struct Fixture {
        session: MediaSession,
        audio: Arc<SimulatedAudioOutput>,
        sink: Arc<RecordingTextureSink>,
    }

    fn init_logging() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn start(media: SyntheticMedia, master_clock: MasterClockType) -> Fixture {
        init_logging();
        let audio = Arc::new(SimulatedAudioOutput::new());
        let sink = Arc::new(RecordingTextureSink::new());
        let resources = SessionResources {
            source: Arc::new(SimulatedSource::synthetic(media)),
            audio_output: audio.clone(),
            texture_sink: sink.clone(),
            initial_image: Arc::new(ImageData::solid(4, 4, INITIAL_COLOUR)),
            texture_id: TEXTURE,
            audio_source_id: AUDIO_SOURCE,
        };
        let session = MediaSession::new(
            MediaSessionId(1),
            resources,
            SessionConfig::default().with_master_clock(master_clock),
        );
        Fixture {
            session,
            audio,
            sink,
        }
    }

    fn wait_for_state(session: &MediaSession, state: MediaState, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if session.state() == state {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        session.state() == state
    }

    fn shows_initial_image(sink: &RecordingTextureSink) -> bool {
        sink.last_image(TEXTURE)
            .is_some_and(|image| image.pixels[..3] == INITIAL_COLOUR)
    }

    /// Play, pause, seek while paused, resume and stop.
    #[test]
    fn test_playback_commands() {
        let fixture = start(SyntheticMedia::default(), MasterClockType::External);
        let session = &fixture.session;
        assert_eq!(session.state(), MediaState::Stopped);

        assert!(*session.play(None).block_until_ready());
        assert_eq!(session.state(), MediaState::Playing);
        thread::sleep(Duration::from_millis(200));

        let playing = session.metrics();
        assert!(playing.presented_video_frames > 0);
        assert!(playing.enqueued_audio_frames > 0);

        assert!(*session.pause().block_until_ready());
        assert_eq!(session.state(), MediaState::Paused);

        // A paused session presents nothing
        let paused = session.metrics();
        thread::sleep(Duration::from_millis(100));
        assert_eq!(
            session.metrics().presented_video_frames,
            paused.presented_video_frames
        );

        // Seeking while paused shows the new position, then stays paused
        assert!(*session
            .seek_to_point(MediaPoint::from_secs(4.0))
            .block_until_ready());
        assert!(wait_for_state(
            session,
            MediaState::Paused,
            Duration::from_secs(2)
        ));
        assert!(session.metrics().presented_video_frames > paused.presented_video_frames);

        assert!(*session.play(None).block_until_ready());
        assert_eq!(session.state(), MediaState::Playing);

        assert!(*session
            .seek_by_offset(MediaDuration::from_secs(-1.0))
            .block_until_ready());
        assert!(wait_for_state(
            session,
            MediaState::Playing,
            Duration::from_secs(2)
        ));

        assert!(*session.stop().block_until_ready());
        assert_eq!(session.state(), MediaState::Stopped);
        assert!(shows_initial_image(&fixture.sink));

        // Seeking needs a playing or paused session
        assert!(!*session
            .seek_to_point(MediaPoint::from_secs(1.0))
            .block_until_ready());
    }

    #[test]
    fn test_plays_to_end_and_stops() {
        let media = SyntheticMedia {
            duration: MediaDuration::from_secs(0.3),
            ..SyntheticMedia::default()
        };
        let fixture = start(media, MasterClockType::External);

        assert!(*fixture.session.play(None).block_until_ready());
        assert!(wait_for_state(
            &fixture.session,
            MediaState::Stopped,
            Duration::from_secs(3)
        ));
        assert!(shows_initial_image(&fixture.sink));
        assert!(fixture.audio.flush_count(AUDIO_SOURCE) > 0);
    }

    #[test]
    fn test_audio_master_session_presents_video() {
        let fixture = start(SyntheticMedia::default(), MasterClockType::Audio);

        assert!(*fixture.session.play(None).block_until_ready());
        thread::sleep(Duration::from_millis(300));

        let metrics = fixture.session.metrics();
        assert!(metrics.enqueued_audio_frames > 0);
        assert!(metrics.presented_video_frames > 0);
        assert_eq!(metrics.drift_reports, 0);
    }

    #[test]
    fn test_commands_after_destroy_resolve_false() {
        let mut fixture = start(SyntheticMedia::default(), MasterClockType::External);

        fixture.session.destroy();
        assert!(fixture.session.is_destroyed());
        assert_eq!(fixture.session.play(None).ready(), Some(&false));
        assert_eq!(fixture.session.stop().ready(), Some(&false));

        // Destroying twice is harmless
        fixture.session.destroy();
    }

    #[test]
    fn test_destroy_resolves_in_flight_commands() {
        let mut fixture = start(SyntheticMedia::default(), MasterClockType::External);

        let play = fixture.session.play(None);
        let pause = fixture.session.pause();
        fixture.session.destroy();

        // Applied or failed, but never left pending
        assert!(play.ready().is_some());
        assert!(pause.ready().is_some());
    }
}
