//! Shuffle algorithm for queue randomization
//!
//! The current track is pulled out, the remainder is permuted with
//! Fisher-Yates, and the current track is put back at the front.

use cadence_core::Track;
use rand::seq::SliceRandom;
use rand::Rng;

/// Shuffle `tracks`, moving `tracks[current]` to index 0
///
/// An out-of-range `current` shuffles everything.
pub fn shuffle_keeping_current<R: Rng + ?Sized>(
    tracks: &[Track],
    current: usize,
    rng: &mut R,
) -> Vec<Track> {
    let mut rest: Vec<Track> = tracks.to_vec();

    if current >= rest.len() {
        rest.shuffle(rng);
        return rest;
    }

    let head = rest.remove(current);
    rest.shuffle(rng);

    let mut shuffled = Vec::with_capacity(tracks.len());
    shuffled.push(head);
    shuffled.extend(rest);
    shuffled
}
