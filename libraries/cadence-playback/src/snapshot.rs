//! Playback snapshots and their fan-out
//!
//! Snapshots are immutable values created fresh on every publish. Every
//! subscriber receives the same sequence.

use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};

/// Published view of playback state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackSnapshot {
    pub is_playing: bool,
    pub position_ms: u64,
    pub duration_ms: u64,
    pub title: String,
    pub artist: String,

    /// Reason of the failure that produced this snapshot, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Push-based snapshot broadcaster
///
/// Cheap to clone; all clones share the subscriber list. Subscribers whose
/// receiver has been dropped are pruned on the next publish.
#[derive(Debug, Clone, Default)]
pub struct SnapshotBus {
    subscribers: Arc<Mutex<Vec<Sender<PlaybackSnapshot>>>>,
}

impl SnapshotBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber
    pub fn subscribe(&self) -> Receiver<PlaybackSnapshot> {
        let (tx, rx) = unbounded();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    /// Send `snapshot` to every live subscriber
    pub fn publish(&self, snapshot: &PlaybackSnapshot) {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|tx| tx.send(snapshot.clone()).is_ok());
    }

    /// Number of live subscribers as of the last publish
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
