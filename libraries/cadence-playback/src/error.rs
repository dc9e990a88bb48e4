//! Error types for playback management

use thiserror::Error;

/// Playback errors
///
/// `LoadFailure` and `PlayerFailure` never escape the controller; they are
/// absorbed by the transport and surfaced through the snapshot `error` field.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The player could not prepare a track
    #[error("Failed to load track: {0}")]
    LoadFailure(String),

    /// The player reported an error while in use
    #[error("Player error (code {code}): {message}")]
    PlayerFailure { code: i32, message: String },

    /// Audio focus was not granted
    #[error("Audio focus denied")]
    FocusDenied,

    /// Queue is empty
    #[error("Queue is empty")]
    EmptyQueue,

    /// The controller thread is gone
    #[error("Playback controller has stopped")]
    ControllerStopped,

    /// Session persistence failed
    #[error("Session store error: {0}")]
    Session(String),

    /// Collaborator (library/playlist) failure
    #[error(transparent)]
    Core(#[from] cadence_core::CadenceError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PlaybackError {
    /// Create a load failure
    pub fn load(msg: impl Into<String>) -> Self {
        Self::LoadFailure(msg.into())
    }

    /// Create a player failure
    pub fn player(code: i32, msg: impl Into<String>) -> Self {
        Self::PlayerFailure {
            code,
            message: msg.into(),
        }
    }
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
