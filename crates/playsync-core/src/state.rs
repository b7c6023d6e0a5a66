//! Playback state.

/// Playback state of a media session.
///
/// ```text
/// Stopped --Play--> Playing <--Play/Pause--> Paused
///                      |                       |
///                      +--Seek--> Seeking <--Seek
///                                   |
///        first presented frame -> back to the state the seek started from
///
/// Stop (from any state but Stopped) -> Stopped
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MediaState {
    Playing,
    Paused,
    /// Waiting for the first frame after a seek.
    Seeking,
    #[default]
    Stopped,
}

impl MediaState {
    /// Whether the presentation loop should pull frames in this state.
    pub fn is_presenting(self) -> bool {
        matches!(self, MediaState::Playing | MediaState::Seeking)
    }

    /// Whether a seek may be started from this state.
    pub fn can_seek(self) -> bool {
        matches!(self, MediaState::Playing | MediaState::Paused)
    }

    pub(crate) fn as_u8(self) -> u8 {
        match self {
            MediaState::Playing => 0,
            MediaState::Paused => 1,
            MediaState::Seeking => 2,
            MediaState::Stopped => 3,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => MediaState::Playing,
            1 => MediaState::Paused,
            2 => MediaState::Seeking,
            _ => MediaState::Stopped,
        }
    }
}

impl std::fmt::Display for MediaState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaState::Playing => write!(f, "Playing"),
            MediaState::Paused => write!(f, "Paused"),
            MediaState::Seeking => write!(f, "Seeking"),
            MediaState::Stopped => write!(f, "Stopped"),
        }
    }
}
