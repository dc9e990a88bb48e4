//! Core types for playback management

use cadence_core::{Track, TrackId};
use serde::{Deserialize, Serialize};

use crate::snapshot::PlaybackSnapshot;

/// Transport state
///
/// Exactly one state is live at a time. Only the transport mutates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportState {
    /// Nothing loaded yet
    Idle,

    /// Player is preparing this track
    Preparing(Track),

    /// Playing, with the player position at which playback (re)started
    Playing {
        track: Track,
        started_at_position_ms: u64,
    },

    /// Loaded and paused at a position
    Paused { track: Track, position_ms: u64 },

    /// Player released; current index retained
    Stopped,

    /// Transient failure state; settles to `Stopped`
    Error(String),
}

impl TransportState {
    /// Discriminant without payload
    pub fn kind(&self) -> TransportKind {
        match self {
            Self::Idle => TransportKind::Idle,
            Self::Preparing(_) => TransportKind::Preparing,
            Self::Playing { .. } => TransportKind::Playing,
            Self::Paused { .. } => TransportKind::Paused,
            Self::Stopped => TransportKind::Stopped,
            Self::Error(_) => TransportKind::Error,
        }
    }

    /// Track the player currently holds, if any
    pub fn track(&self) -> Option<&Track> {
        match self {
            Self::Preparing(track) | Self::Playing { track, .. } | Self::Paused { track, .. } => {
                Some(track)
            }
            _ => None,
        }
    }

    /// True when the player holds a prepared track
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Playing { .. } | Self::Paused { .. })
    }
}

/// Payload-free transport state, for status queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Idle,
    Preparing,
    Playing,
    Paused,
    Stopped,
    Error,
}

/// Repeat mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    /// Stop when queue ends
    Off,

    /// Loop current track only
    One,

    /// Loop entire queue
    #[default]
    All,
}

impl RepeatMode {
    /// Next mode in the cycle Off → One → All → Off
    pub fn cycle(self) -> Self {
        match self {
            Self::Off => Self::One,
            Self::One => Self::All,
            Self::All => Self::Off,
        }
    }
}

/// Queue navigation direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Prev,
}

/// Point-in-time view of controller internals, answered in command order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerStatus {
    pub state: TransportKind,
    pub current_index: Option<usize>,
    pub queue: Vec<TrackId>,
    pub shuffled: bool,
    pub repeat: RepeatMode,
    pub volume: u8,
    pub ducked: bool,

    /// Snapshot as it would be published now
    pub snapshot: Option<PlaybackSnapshot>,
}

/// Configuration for the playback controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Initial volume (0-100, default: 100)
    pub volume: u8,

    /// Initial repeat mode (default: All)
    pub repeat: RepeatMode,

    /// Position reporter tick interval (default: 1000 ms)
    pub position_interval_ms: u64,

    /// `previous()` restarts the current track above this position (default: 3000 ms)
    pub restart_threshold_ms: u64,

    /// Gain multiplier while ducked (default: 0.3)
    pub duck_gain: f32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            volume: 100,
            repeat: RepeatMode::All,
            position_interval_ms: 1000,
            restart_threshold_ms: 3000,
            duck_gain: 0.3,
        }
    }
}
