/// Collaborator traits for Cadence
///
/// The playback controller consumes a library snapshot and playlist
/// membership lists; both live behind these traits so hosts can back them
/// with whatever store they have.
use std::collections::HashMap;

use crate::error::Result;
use crate::types::{PlaylistId, Track, TrackId};

/// Source of the full track library
pub trait LibraryProvider: Send + Sync {
    /// Load a one-shot snapshot of every playable track
    ///
    /// # Errors
    /// Returns an error if the underlying media store cannot be enumerated
    fn load_tracks(&self) -> Result<Vec<Track>>;
}

/// Source of playlist membership
pub trait PlaylistStore: Send + Sync {
    /// Ordered track ids belonging to a playlist
    ///
    /// # Errors
    /// Returns `PlaylistNotFound` for unknown playlists, or a store error
    fn membership_ids(&self, playlist: &PlaylistId) -> Result<Vec<TrackId>>;
}

/// Resolve ids against a library snapshot, preserving id order
///
/// Ids that do not match any library track are skipped.
pub fn resolve_tracks(library: &[Track], ids: &[TrackId]) -> Vec<Track> {
    let by_id: HashMap<&TrackId, &Track> = library.iter().map(|t| (&t.id, t)).collect();

    ids.iter()
        .filter_map(|id| by_id.get(id).map(|t| (*t).clone()))
        .collect()
}
