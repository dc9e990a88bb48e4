//! Playback queue
//!
//! Ordered track list with a current index, circular navigation, and a
//! reversible shuffle that keeps the current track current.

use cadence_core::Track;
use rand::Rng;

use crate::shuffle::shuffle_keeping_current;
use crate::types::Direction;

/// Queue for playback
///
/// Invariants:
/// - `current` is `Some(i)` with `i < tracks.len()` iff the queue is non-empty
/// - `pre_shuffle_order` is `Some` iff shuffle is active
#[derive(Debug, Clone, Default)]
pub struct Queue {
    /// Tracks in play order
    tracks: Vec<Track>,

    /// Index of the current track
    current: Option<usize>,

    /// Order before shuffle (for restoring)
    pre_shuffle_order: Option<Vec<Track>>,
}

impl Queue {
    /// Create new empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the queue wholesale
    ///
    /// Clears shuffle state; the current index resets to the first track.
    pub fn set_queue(&mut self, tracks: Vec<Track>) {
        self.current = if tracks.is_empty() { None } else { Some(0) };
        self.tracks = tracks;
        self.pre_shuffle_order = None;
    }

    /// Currently selected track
    pub fn current(&self) -> Option<&Track> {
        self.current.and_then(|i| self.tracks.get(i))
    }

    /// Index of the currently selected track
    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    /// Track at `index`
    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    /// Make `index` current
    ///
    /// Returns the selected track, or `None` (unchanged) when out of range.
    pub fn select(&mut self, index: usize) -> Option<&Track> {
        if index >= self.tracks.len() {
            return None;
        }
        self.current = Some(index);
        self.tracks.get(index)
    }

    /// Move one step in `direction`, wrapping at both ends
    pub fn advance(&mut self, direction: Direction) -> Option<&Track> {
        let len = self.tracks.len();
        let current = self.current?;

        let next = match direction {
            Direction::Next => (current + 1) % len,
            Direction::Prev => (current + len - 1) % len,
        };

        self.current = Some(next);
        self.tracks.get(next)
    }

    /// True when the current track is the last one
    pub fn is_last(&self) -> bool {
        match self.current {
            Some(i) => i + 1 == self.tracks.len(),
            None => false,
        }
    }

    /// Toggle shuffle using the thread-local RNG
    pub fn toggle_shuffle(&mut self) -> bool {
        self.toggle_shuffle_with(&mut rand::thread_rng())
    }

    /// Toggle shuffle with a caller-supplied RNG
    ///
    /// Returns whether shuffle is active afterwards. An empty queue stays
    /// unshuffled.
    pub fn toggle_shuffle_with<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        match self.pre_shuffle_order.take() {
            Some(original) => {
                let current_id = self.current().map(|t| t.id.clone());
                self.tracks = original;
                self.current = if self.tracks.is_empty() {
                    None
                } else {
                    let restored = current_id
                        .and_then(|id| self.tracks.iter().position(|t| t.id == id))
                        .unwrap_or(0);
                    Some(restored)
                };
                false
            }
            None => {
                let Some(current) = self.current else {
                    return false;
                };
                self.pre_shuffle_order = Some(self.tracks.clone());
                self.tracks = shuffle_keeping_current(&self.tracks, current, rng);
                self.current = Some(0);
                true
            }
        }
    }

    /// Whether shuffle is active
    pub fn is_shuffled(&self) -> bool {
        self.pre_shuffle_order.is_some()
    }

    /// Tracks in current play order
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Number of tracks
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}
