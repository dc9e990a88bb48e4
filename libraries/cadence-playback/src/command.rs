//! Commands processed by the controller thread

use cadence_core::{Track, TrackId};
use crossbeam_channel::Sender;

use crate::focus::FocusChange;
use crate::player::PlayerEvent;
use crate::types::{ControllerStatus, RepeatMode};

/// Everything that can mutate playback, in one serialized stream
#[derive(Debug)]
pub(crate) enum Command {
    Play(usize),
    Pause,
    Resume,
    Stop,
    Next,
    Previous,
    Seek(u64),
    ToggleShuffle,
    CycleRepeat(Option<Sender<RepeatMode>>),
    SetVolume(u8),
    Focus(FocusChange),
    SetLibrary(Vec<Track>),
    PlayQueue {
        tracks: Vec<Track>,
        start_index: usize,
    },
    PlayTracks {
        ids: Vec<TrackId>,
        start_index: usize,
    },
    PlayPlaylist(Vec<TrackId>),
    RestoreSession,
    Sync,
    Status(Sender<ControllerStatus>),

    /// Callback from the player
    Player(PlayerEvent),

    /// Position reporter tick for the given reporter generation
    Tick(u64),

    /// Persist the session and exit the controller thread
    Shutdown,
}
