//! playsync Demo Application
//!
//! Runs a media session against generated media and walks it through a
//! scripted sequence of commands, logging what the session reports.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use playsync_core::sim::{RecordingTextureSink, SimulatedAudioOutput, SimulatedSource, SyntheticMedia};
use playsync_core::{
    AudioSourceId, ImageData, MasterClockType, MediaDuration, MediaPoint, MediaSessionId, Promise,
    SessionConfig, SessionManager, SessionRequest, TextureId,
};

/// One step of the scripted run: a label, the command, and how long to let
/// the session run afterwards.
struct Step {
    label: &'static str,
    run: fn(&SessionManager, MediaSessionId) -> Promise<bool>,
    hold: Duration,
}

const SCRIPT: &[Step] = &[
    Step {
        label: "play from start",
        run: |m, id| m.play(id, None),
        hold: Duration::from_millis(600),
    },
    Step {
        label: "pause",
        run: |m, id| m.pause(id),
        hold: Duration::from_millis(300),
    },
    Step {
        label: "seek to 4.0s while paused",
        run: |m, id| m.seek_to_point(id, MediaPoint::from_secs(4.0)),
        hold: Duration::from_millis(100),
    },
    Step {
        label: "resume",
        run: |m, id| m.play(id, None),
        hold: Duration::from_millis(500),
    },
    Step {
        label: "skip back 1.5s",
        run: |m, id| m.seek_by_offset(id, MediaDuration::from_secs(-1.5)),
        hold: Duration::from_millis(500),
    },
    Step {
        label: "switch streams",
        run: |m, id| m.load_streams(id, HashSet::from([0, 2])),
        hold: Duration::from_millis(400),
    },
    Step {
        label: "stop",
        run: |m, id| m.stop(id),
        hold: Duration::from_millis(50),
    },
    Step {
        label: "seek while stopped",
        run: |m, id| m.seek_to_point(id, MediaPoint::from_secs(1.0)),
        hold: Duration::ZERO,
    },
    Step {
        label: "play from 9.5s until the end",
        run: |m, id| m.play(id, Some(MediaPoint::from_secs(9.5))),
        hold: Duration::from_millis(900),
    },
];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("playsync_core=debug".parse()?)
                .add_directive("playsync_demo=debug".parse()?),
        )
        .init();

    let master_clock = match std::env::args().nth(1).as_deref() {
        Some("video") => MasterClockType::Video,
        Some("audio") => MasterClockType::Audio,
        _ => MasterClockType::External,
    };

    let audio_output = Arc::new(SimulatedAudioOutput::new());
    let texture_sink = Arc::new(RecordingTextureSink::new());
    let mut manager = SessionManager::new(audio_output.clone(), texture_sink.clone());

    let audio_source_id = AudioSourceId(1);
    let id = manager.create_session(SessionRequest {
        source: Arc::new(SimulatedSource::synthetic(SyntheticMedia::default())),
        initial_image: Arc::new(ImageData::solid(64, 36, [0, 0, 0])),
        texture_id: TextureId(1),
        audio_source_id,
        config: SessionConfig::default().with_master_clock(master_clock),
    });

    tracing::info!("Running session {} with {} master clock", id, master_clock);

    for step in SCRIPT {
        let result = (step.run)(&manager, id);
        let ok = *result.block_until_ready();
        tracing::info!("{}: {}", step.label, if ok { "ok" } else { "rejected" });
        thread::sleep(step.hold);

        if let Some(metrics) = manager.metrics(id) {
            tracing::info!(
                "  state={} presented={} dropped_video={} enqueued_audio={} dropped_audio={} sync_diff={}",
                metrics.state,
                metrics.presented_video_frames,
                metrics.dropped_video_frames,
                metrics.enqueued_audio_frames,
                metrics.dropped_audio_frames,
                metrics.last_sync_diff
            );
        }
    }

    tracing::info!(
        "Texture updated {} times, audio flushed {} times",
        texture_sink.update_count(),
        audio_output.flush_count(audio_source_id)
    );

    manager.destroy_all();
    Ok(())
}
