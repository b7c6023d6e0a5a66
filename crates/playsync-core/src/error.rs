//! Errors reported by session collaborators.

/// Errors that decode sources, audio outputs and texture sinks report back to
/// the session.
///
/// The session never propagates these to its callers; it logs them and turns
/// them into a `false` command result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaError {
    /// The source could not (re)load from the requested point
    LoadFailed(String),
    /// The requested streams could not be selected
    StreamsUnavailable(String),
    /// The audio output rejected an operation
    AudioDevice(String),
    /// The texture sink rejected an update
    Render(String),
}

impl std::fmt::Display for MediaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaError::LoadFailed(msg) => write!(f, "Failed to load media: {msg}"),
            MediaError::StreamsUnavailable(msg) => write!(f, "Streams unavailable: {msg}"),
            MediaError::AudioDevice(msg) => write!(f, "Audio device error: {msg}"),
            MediaError::Render(msg) => write!(f, "Render error: {msg}"),
        }
    }
}

impl std::error::Error for MediaError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            MediaError::LoadFailed("eof".into()).to_string(),
            "Failed to load media: eof"
        );
        assert_eq!(
            MediaError::Render("texture#2 is gone".into()).to_string(),
            "Render error: texture#2 is gone"
        );
    }
}
