/// Track type
use serde::{Deserialize, Serialize};

use super::TrackId;

/// A playable track
///
/// Immutable value handed to the queue. `duration_ms` is the library's
/// reported length; the player may report a corrected value once prepared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Stable unique key
    #[serde(default = "TrackId::generate")]
    pub id: TrackId,

    /// Track title
    pub title: String,

    /// Artist name
    #[serde(default)]
    pub artist: String,

    /// Opaque URI or path handed to the player
    pub source_locator: String,

    /// Total length in milliseconds
    #[serde(default)]
    pub duration_ms: u64,
}

impl Track {
    /// Create a new track
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        artist: impl Into<String>,
        source_locator: impl Into<String>,
        duration_ms: u64,
    ) -> Self {
        Self {
            id: TrackId::new(id),
            title: title.into(),
            artist: artist.into(),
            source_locator: source_locator.into(),
            duration_ms,
        }
    }
}
