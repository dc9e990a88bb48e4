//! JSON manifest library
//!
//! A manifest lists the tracks the player may use and, optionally, named
//! playlists referencing them by id:
//!
//! ```json
//! {
//!   "tracks": [
//!     { "id": "t1", "title": "Intro", "artist": "Band", "source_locator": "/music/intro.mp3", "duration_ms": 30000 }
//!   ],
//!   "playlists": { "morning": ["t1"] }
//! }
//! ```

use cadence_core::{CadenceError, LibraryProvider, PlaylistId, PlaylistStore, Track, TrackId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{CliError, Result};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
struct Manifest {
    #[serde(default)]
    tracks: Vec<Track>,

    #[serde(default)]
    playlists: HashMap<String, Vec<TrackId>>,
}

/// Library and playlist store backed by a manifest file
#[derive(Debug, Clone)]
pub struct JsonLibrary {
    path: Option<PathBuf>,
    manifest: Manifest,
}

impl JsonLibrary {
    /// Read and parse the manifest at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            CliError::Manifest(format!("failed to read {}: {}", path.display(), e))
        })?;
        let manifest: Manifest = serde_json::from_str(&contents).map_err(|e| {
            CliError::Manifest(format!("failed to parse {}: {}", path.display(), e))
        })?;

        info!(
            "Loaded manifest {} ({} tracks, {} playlists)",
            path.display(),
            manifest.tracks.len(),
            manifest.playlists.len()
        );

        Ok(Self {
            path: Some(path.to_path_buf()),
            manifest,
        })
    }

    /// Library with no tracks, used when no manifest is configured
    pub fn empty() -> Self {
        Self {
            path: None,
            manifest: Manifest::default(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.manifest.tracks
    }

    /// Playlist names, sorted
    pub fn playlist_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.manifest.playlists.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl LibraryProvider for JsonLibrary {
    fn load_tracks(&self) -> cadence_core::Result<Vec<Track>> {
        Ok(self.manifest.tracks.clone())
    }
}

impl PlaylistStore for JsonLibrary {
    fn membership_ids(&self, playlist: &PlaylistId) -> cadence_core::Result<Vec<TrackId>> {
        let ids = self
            .manifest
            .playlists
            .get(playlist.as_str())
            .cloned()
            .ok_or_else(|| CadenceError::PlaylistNotFound(playlist.clone()))?;

        debug!("Playlist {} has {} entries", playlist, ids.len());
        Ok(ids)
    }
}
