//! Transport state machine
//!
//! Owns the queue, the player, and the focus claim. Every mutation arrives
//! as a [`Command`] on the controller thread, so nothing here needs locking.
//!
//! ```text
//! play(i) ──> Preparing ──prepared + focus──> Playing ──pause──> Paused
//!                 │      └─prepared, no focus──────────────────>  │
//!                 └──error──> Error ──> Stopped <──stop── any      │
//!                                                  <──resume──────┘
//! ```

use cadence_core::{resolve_tracks, Track, TrackId};
use crossbeam_channel::Sender;
use std::ops::ControlFlow;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::command::Command;
use crate::error::PlaybackError;
use crate::focus::{AudioFocus, FocusChange, InterruptionPolicy, TransportAction, VolumeAction};
use crate::player::{LoadId, Player, PlayerEvent, PlayerEventKind, PlayerEvents};
use crate::queue::Queue;
use crate::reporter::PositionReporter;
use crate::session::{PersistedSession, SessionStore};
use crate::snapshot::{PlaybackSnapshot, SnapshotBus};
use crate::types::{
    ControllerStatus, Direction, PlaybackConfig, RepeatMode, TransportKind, TransportState,
};
use crate::volume::Volume;

/// What to do once the in-flight prepare finishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingStart {
    autoplay: bool,
    seek_to: Option<u64>,
}

impl PendingStart {
    fn autoplay() -> Self {
        Self {
            autoplay: true,
            seek_to: None,
        }
    }

    fn restore(position_ms: u64) -> Self {
        Self {
            autoplay: false,
            seek_to: Some(position_ms),
        }
    }
}

/// Collaborators injected into the transport
pub(crate) struct TransportParts {
    pub player: Box<dyn Player>,
    pub focus: Box<dyn AudioFocus>,
    pub session: Box<dyn SessionStore>,
    pub bus: SnapshotBus,
}

pub(crate) struct Transport {
    state: TransportState,
    queue: Queue,
    library: Vec<Track>,
    repeat: RepeatMode,
    restart_threshold_ms: u64,
    volume: Volume,
    policy: InterruptionPolicy,
    player: Box<dyn Player>,
    focus: Box<dyn AudioFocus>,
    session: Box<dyn SessionStore>,
    reporter: PositionReporter,
    bus: SnapshotBus,
    commands: Sender<Command>,
    load_id: LoadId,
    pending: PendingStart,
}

impl Transport {
    pub fn new(config: &PlaybackConfig, parts: TransportParts, commands: Sender<Command>) -> Self {
        Self {
            state: TransportState::Idle,
            queue: Queue::new(),
            library: Vec::new(),
            repeat: config.repeat,
            restart_threshold_ms: config.restart_threshold_ms,
            volume: Volume::new(config.volume, config.duck_gain),
            policy: InterruptionPolicy::new(),
            player: parts.player,
            focus: parts.focus,
            session: parts.session,
            reporter: PositionReporter::new(Duration::from_millis(config.position_interval_ms)),
            bus: parts.bus,
            commands,
            load_id: 0,
            pending: PendingStart::autoplay(),
        }
    }

    /// Apply one command; `Break` means the controller should exit
    pub fn handle(&mut self, command: Command) -> ControlFlow<()> {
        match command {
            Command::Play(index) => self.play(index),
            Command::Pause => self.pause(),
            Command::Resume => self.resume(),
            Command::Stop => self.stop(),
            Command::Next => self.skip(Direction::Next),
            Command::Previous => self.previous(),
            Command::Seek(position_ms) => self.seek(position_ms),
            Command::ToggleShuffle => self.toggle_shuffle(),
            Command::CycleRepeat(reply) => {
                let mode = self.cycle_repeat_mode();
                if let Some(reply) = reply {
                    reply.send(mode).ok();
                }
            }
            Command::SetVolume(level) => self.set_volume(level),
            Command::Focus(change) => self.on_focus_change(change),
            Command::SetLibrary(tracks) => self.set_library(tracks),
            Command::PlayQueue {
                tracks,
                start_index,
            } => self.play_queue(tracks, start_index),
            Command::PlayTracks { ids, start_index } => self.play_tracks(&ids, start_index),
            Command::PlayPlaylist(ids) => self.play_tracks(&ids, 0),
            Command::RestoreSession => self.restore_session(),
            Command::Sync => self.sync(),
            Command::Status(reply) => {
                reply.send(self.status()).ok();
            }
            Command::Player(event) => self.on_player_event(event),
            Command::Tick(generation) => self.on_tick(generation),
            Command::Shutdown => {
                self.teardown();
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    // ===== Transport commands =====

    fn play(&mut self, index: usize) {
        let Some(track) = self.queue.select(index).cloned() else {
            debug!("play({}) ignored: queue has {} tracks", index, self.queue.len());
            return;
        };
        self.start_track(track, PendingStart::autoplay());
    }

    fn pause(&mut self) {
        match &self.state {
            TransportState::Playing { track, .. } => {
                let track = track.clone();
                if let Err(e) = self.player.pause() {
                    self.fail(e);
                    return;
                }
                self.reporter.stop();
                let position_ms = self.player.position_ms();
                self.state = TransportState::Paused { track, position_ms };
                self.publish();
            }
            TransportState::Preparing(_) => {
                debug!("Pause while preparing: track will load paused");
                self.pending.autoplay = false;
            }
            other => debug!("Pause ignored in {:?}", other.kind()),
        }
    }

    fn resume(&mut self) {
        match &self.state {
            TransportState::Paused { track, .. } => {
                let track = track.clone();
                if self.focus.request() {
                    self.begin_playing(track);
                } else {
                    debug!("{}; staying paused", PlaybackError::FocusDenied);
                }
            }
            TransportState::Preparing(_) => self.pending.autoplay = true,
            TransportState::Playing { .. } => {}
            TransportState::Idle | TransportState::Stopped | TransportState::Error(_) => {
                // Player was released; prepare the current track again
                match self.queue.current_index() {
                    Some(index) => self.play(index),
                    None => debug!("Resume ignored: {}", PlaybackError::EmptyQueue),
                }
            }
        }
    }

    fn stop(&mut self) {
        self.halt();
        self.focus.abandon();
        self.policy.reset();
        self.state = TransportState::Stopped;
        self.publish();
    }

    fn skip(&mut self, direction: Direction) {
        let Some(track) = self.queue.advance(direction).cloned() else {
            debug!("Skip {:?} ignored: {}", direction, PlaybackError::EmptyQueue);
            return;
        };
        self.start_track(track, PendingStart::autoplay());
    }

    fn previous(&mut self) {
        if self.state.is_loaded() && self.player.position_ms() > self.restart_threshold_ms {
            self.seek(0);
        } else {
            self.skip(Direction::Prev);
        }
    }

    fn seek(&mut self, position_ms: u64) {
        if !self.state.is_loaded() {
            debug!("Seek to {}ms ignored in {:?}", position_ms, self.state.kind());
            return;
        }

        if let Err(e) = self.player.seek(position_ms) {
            self.fail(e);
            return;
        }
        if let TransportState::Paused {
            position_ms: paused_at,
            ..
        } = &mut self.state
        {
            *paused_at = position_ms;
        }
        self.publish();
    }

    fn toggle_shuffle(&mut self) {
        let on = self.queue.toggle_shuffle();
        info!("Shuffle {}", if on { "on" } else { "off" });
    }

    fn cycle_repeat_mode(&mut self) -> RepeatMode {
        self.repeat = self.repeat.cycle();
        info!("Repeat mode: {:?}", self.repeat);
        self.repeat
    }

    fn set_volume(&mut self, level: u8) {
        self.volume.set_level(level);
        self.player.set_volume(self.volume.gain());
    }

    // ===== Queue and library =====

    fn set_library(&mut self, tracks: Vec<Track>) {
        info!("Library snapshot: {} tracks", tracks.len());
        if self.queue.is_empty() {
            self.queue.set_queue(tracks.clone());
        }
        self.library = tracks;
    }

    fn play_queue(&mut self, tracks: Vec<Track>, start_index: usize) {
        if tracks.is_empty() {
            warn!("Ignoring request to play an empty queue");
            return;
        }

        self.queue.set_queue(tracks);
        let start = if start_index < self.queue.len() {
            start_index
        } else {
            debug!(
                "Start index {} out of range for {} tracks, starting at 0",
                start_index,
                self.queue.len()
            );
            0
        };
        self.play(start);
    }

    fn play_tracks(&mut self, ids: &[TrackId], start_index: usize) {
        let tracks = resolve_tracks(&self.library, ids);
        if tracks.len() < ids.len() {
            debug!(
                "{} of {} requested tracks are not in the library",
                ids.len() - tracks.len(),
                ids.len()
            );
        }
        self.play_queue(tracks, start_index);
    }

    // ===== Session =====

    fn restore_session(&mut self) {
        if !matches!(self.state, TransportState::Idle | TransportState::Stopped) {
            debug!("Session restore skipped: already {:?}", self.state.kind());
            return;
        }

        let session = match self.session.load() {
            Ok(Some(session)) => session,
            Ok(None) => {
                debug!("No saved session");
                return;
            }
            Err(e) => {
                warn!("Failed to load saved session: {}", e);
                return;
            }
        };

        let Some(track) = self.queue.select(session.last_index).cloned() else {
            info!(
                "Saved index {} out of range for {} tracks, not restoring",
                session.last_index,
                self.queue.len()
            );
            return;
        };

        info!(
            "Restoring session: '{}' at {}ms",
            track.title, session.last_position_ms
        );
        self.start_track(track, PendingStart::restore(session.last_position_ms));
    }

    fn teardown(&mut self) {
        let position_ms = match &self.state {
            TransportState::Playing { .. } => self.player.position_ms(),
            TransportState::Paused { position_ms, .. } => *position_ms,
            TransportState::Preparing(_) => self.pending.seek_to.unwrap_or(0),
            _ => 0,
        };

        if let Some(index) = self.queue.current_index() {
            if let Err(e) = self.session.save(&PersistedSession::new(index, position_ms)) {
                warn!("Failed to save session: {}", e);
            }
        }

        self.halt();
        self.focus.abandon();
        self.state = TransportState::Idle;
        info!("Playback controller shut down");
    }

    // ===== Focus =====

    fn on_focus_change(&mut self, change: FocusChange) {
        let is_playing = matches!(self.state, TransportState::Playing { .. });
        let decision = self.policy.on_focus_change(change, is_playing);
        debug!("Focus {:?} -> {:?}", change, decision);

        if let Some(action) = decision.volume {
            match action {
                VolumeAction::Duck => self.volume.duck(),
                VolumeAction::Restore => self.volume.restore(),
            }
            self.player.set_volume(self.volume.gain());
        }

        match decision.transport {
            Some(TransportAction::Pause) => self.pause(),
            Some(TransportAction::Resume) => self.resume(),
            None => {}
        }
    }

    // ===== Player callbacks =====

    fn on_player_event(&mut self, event: PlayerEvent) {
        if event.load_id != self.load_id {
            debug!(
                "Ignoring stale player event {:?} (load {}, current {})",
                event.kind, event.load_id, self.load_id
            );
            return;
        }

        match event.kind {
            PlayerEventKind::Prepared => self.on_prepared(),
            PlayerEventKind::Completed => self.on_completion(),
            PlayerEventKind::Failed { code, message } => {
                let err = if matches!(self.state, TransportState::Preparing(_)) {
                    PlaybackError::load(format!("{} (code {})", message, code))
                } else {
                    PlaybackError::player(code, message)
                };
                self.fail(err);
            }
        }
    }

    fn on_prepared(&mut self) {
        let TransportState::Preparing(track) = &self.state else {
            debug!("Prepared callback in {:?}, ignoring", self.state.kind());
            return;
        };
        let track = track.clone();

        self.player.set_volume(self.volume.gain());
        if let Some(position_ms) = self.pending.seek_to.take() {
            if let Err(e) = self.player.seek(position_ms) {
                self.fail(e);
                return;
            }
        }

        if self.pending.autoplay {
            if self.focus.request() {
                self.begin_playing(track);
                return;
            }
            debug!("{}; '{}' loaded paused", PlaybackError::FocusDenied, track.title);
        }

        let position_ms = self.player.position_ms();
        self.state = TransportState::Paused { track, position_ms };
        self.publish();
    }

    fn on_completion(&mut self) {
        if !matches!(self.state, TransportState::Playing { .. }) {
            debug!("Completion in {:?}, ignoring", self.state.kind());
            return;
        }
        if self.player.position_ms() == 0 {
            debug!("Ignoring completion reported at position 0");
            return;
        }

        self.reporter.stop();

        if self.repeat == RepeatMode::One {
            if let Some(track) = self.queue.current().cloned() {
                self.start_track(track, PendingStart::autoplay());
            }
        } else if !self.queue.is_last() || self.repeat == RepeatMode::All {
            self.skip(Direction::Next);
        } else {
            info!("Reached end of queue");
            self.halt();
            self.focus.abandon();
            self.state = TransportState::Stopped;
            self.publish();
        }
    }

    fn on_tick(&mut self, generation: u64) {
        if !self.reporter.is_current(generation) {
            debug!("Dropping stale position tick (generation {})", generation);
            return;
        }
        if matches!(self.state, TransportState::Playing { .. }) {
            self.publish();
        }
    }

    // ===== Internals =====

    fn start_track(&mut self, track: Track, pending: PendingStart) {
        self.reporter.stop();
        self.load_id += 1;
        self.pending = pending;
        self.state = TransportState::Preparing(track.clone());
        debug!("Preparing '{}' (load {})", track.title, self.load_id);

        let events = PlayerEvents::new(self.load_id, self.commands.clone());
        if let Err(e) = self.player.load(&track, events) {
            let err = match e {
                PlaybackError::LoadFailure(_) => e,
                other => PlaybackError::load(other.to_string()),
            };
            self.fail(err);
        }
    }

    fn begin_playing(&mut self, track: Track) {
        if let Err(e) = self.player.play() {
            self.fail(e);
            return;
        }
        let started_at_position_ms = self.player.position_ms();
        debug!("Playing '{}' from {}ms", track.title, started_at_position_ms);
        self.state = TransportState::Playing {
            track,
            started_at_position_ms,
        };
        self.reporter.start(&self.commands);
        self.publish();
    }

    /// Surface `err` in a snapshot and settle to `Stopped`
    ///
    /// Focus is given up and a pending auto-resume is forgotten, so nothing
    /// restarts playback after a failure without a user command.
    fn fail(&mut self, err: PlaybackError) {
        warn!("Playback failed: {}", err);
        self.halt();
        self.focus.abandon();
        self.policy.reset();
        self.state = TransportState::Error(err.to_string());
        self.publish();
        self.state = TransportState::Stopped;
    }

    /// Stop the reporter, invalidate in-flight callbacks, release the player
    fn halt(&mut self) {
        self.reporter.stop();
        self.load_id += 1;
        self.player.stop();
    }

    fn sync(&mut self) {
        self.publish();
        if matches!(self.state, TransportState::Playing { .. }) {
            self.reporter.start(&self.commands);
        }
    }

    fn snapshot(&self) -> Option<PlaybackSnapshot> {
        let error = match &self.state {
            TransportState::Error(reason) => Some(reason.clone()),
            _ => None,
        };
        let track = self.state.track().or_else(|| self.queue.current())?;

        let (is_playing, position_ms) = match &self.state {
            TransportState::Playing { .. } => (true, self.player.position_ms()),
            TransportState::Paused { position_ms, .. } => (false, *position_ms),
            _ => (false, 0),
        };
        let duration_ms = if self.state.is_loaded() {
            self.player.duration_ms().unwrap_or(track.duration_ms)
        } else {
            track.duration_ms
        };

        Some(PlaybackSnapshot {
            is_playing,
            position_ms,
            duration_ms,
            title: track.title.clone(),
            artist: track.artist.clone(),
            error,
        })
    }

    fn publish(&self) {
        match self.snapshot() {
            Some(snapshot) => self.bus.publish(&snapshot),
            None => debug!("Nothing to publish: no current track"),
        }
    }

    fn status(&self) -> ControllerStatus {
        ControllerStatus {
            state: self.state.kind(),
            current_index: self.queue.current_index(),
            queue: self.queue.tracks().iter().map(|t| t.id.clone()).collect(),
            shuffled: self.queue.is_shuffled(),
            repeat: self.repeat,
            volume: self.volume.level(),
            ducked: self.volume.is_ducked(),
            snapshot: self.snapshot(),
        }
    }

    pub fn state_kind(&self) -> TransportKind {
        self.state.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::session::MemorySessionStore;
    use crossbeam_channel::{unbounded, Receiver};
    use std::sync::{Arc, Mutex};

    // ===== Test Helpers =====

    #[derive(Default)]
    struct PlayerLog {
        loaded: Option<Track>,
        events: Option<PlayerEvents>,
        playing: bool,
        position_ms: u64,
        gain: f32,
        loads: usize,
        stops: usize,
        manual_prepare: bool,
        reject_loads: bool,
        fail_pause: bool,
        fail_seek: bool,
    }

    #[derive(Clone, Default)]
    struct FakePlayer(Arc<Mutex<PlayerLog>>);

    impl FakePlayer {
        fn log(&self) -> std::sync::MutexGuard<'_, PlayerLog> {
            self.0.lock().unwrap()
        }

        fn events(&self) -> PlayerEvents {
            self.log().events.clone().unwrap()
        }
    }

    impl Player for FakePlayer {
        fn load(&mut self, track: &Track, events: PlayerEvents) -> Result<()> {
            let mut log = self.log();
            if log.reject_loads {
                return Err(PlaybackError::load("unsupported format"));
            }
            log.loaded = Some(track.clone());
            log.events = Some(events.clone());
            log.playing = false;
            log.position_ms = 0;
            log.loads += 1;
            let auto = !log.manual_prepare;
            drop(log);

            if auto {
                events.prepared();
            }
            Ok(())
        }

        fn play(&mut self) -> Result<()> {
            self.log().playing = true;
            Ok(())
        }

        fn pause(&mut self) -> Result<()> {
            let mut log = self.log();
            if log.fail_pause {
                return Err(PlaybackError::player(-1, "engine wedged"));
            }
            log.playing = false;
            Ok(())
        }

        fn seek(&mut self, position_ms: u64) -> Result<()> {
            let mut log = self.log();
            if log.fail_seek {
                return Err(PlaybackError::player(-2, "seek unsupported"));
            }
            log.position_ms = position_ms;
            Ok(())
        }

        fn stop(&mut self) {
            let mut log = self.log();
            log.loaded = None;
            log.playing = false;
            log.position_ms = 0;
            log.stops += 1;
        }

        fn position_ms(&self) -> u64 {
            self.log().position_ms
        }

        fn duration_ms(&self) -> Option<u64> {
            self.log().loaded.as_ref().map(|t| t.duration_ms)
        }

        fn set_volume(&mut self, gain: f32) {
            self.log().gain = gain;
        }
    }

    #[derive(Default)]
    struct FocusLog {
        deny: bool,
        requests: usize,
        abandons: usize,
    }

    #[derive(Clone, Default)]
    struct FakeFocus(Arc<Mutex<FocusLog>>);

    impl AudioFocus for FakeFocus {
        fn request(&mut self) -> bool {
            let mut log = self.0.lock().unwrap();
            log.requests += 1;
            !log.deny
        }

        fn abandon(&mut self) {
            self.0.lock().unwrap().abandons += 1;
        }
    }

    struct Harness {
        transport: Transport,
        rx: Receiver<Command>,
        player: FakePlayer,
        focus: FakeFocus,
        session: MemorySessionStore,
        snapshots: Receiver<PlaybackSnapshot>,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_session(MemorySessionStore::new())
        }

        fn with_session(session: MemorySessionStore) -> Self {
            let config = PlaybackConfig {
                // Long enough that no real tick lands during a test
                position_interval_ms: 60_000,
                ..PlaybackConfig::default()
            };
            let (tx, rx) = unbounded();
            let player = FakePlayer::default();
            let focus = FakeFocus::default();
            let bus = SnapshotBus::new();
            let snapshots = bus.subscribe();

            let parts = TransportParts {
                player: Box::new(player.clone()),
                focus: Box::new(focus.clone()),
                session: Box::new(session.clone()),
                bus,
            };

            Self {
                transport: Transport::new(&config, parts, tx),
                rx,
                player,
                focus,
                session,
                snapshots,
            }
        }

        fn send(&mut self, command: Command) {
            let _ = self.transport.handle(command);
            self.drain();
        }

        fn drain(&mut self) {
            while let Ok(command) = self.rx.try_recv() {
                let _ = self.transport.handle(command);
            }
        }

        fn load_queue(&mut self, ids: &[&str]) {
            let tracks = ids.iter().map(|id| create_test_track(id)).collect();
            self.send(Command::PlayQueue {
                tracks,
                start_index: 0,
            });
        }

        /// Play to the end of the current track
        fn complete(&mut self) {
            self.player.log().position_ms = 180_000;
            self.player.events().completed();
            self.drain();
        }

        fn state(&self) -> TransportKind {
            self.transport.state_kind()
        }

        fn index(&self) -> Option<usize> {
            self.transport.queue.current_index()
        }

        fn current_id(&self) -> Option<String> {
            self.transport.queue.current().map(|t| t.id.to_string())
        }

        fn last_snapshot(&self) -> Option<PlaybackSnapshot> {
            self.snapshots.try_iter().last()
        }
    }

    fn create_test_track(id: &str) -> Track {
        Track::new(id, format!("Title {}", id), "Artist", format!("/music/{}.ogg", id), 180_000)
    }

    // ===== Transport =====

    #[test]
    fn play_prepares_then_plays() {
        let mut h = Harness::new();
        h.load_queue(&["a", "b", "c"]);

        assert_eq!(h.state(), TransportKind::Playing);
        assert_eq!(h.index(), Some(0));
        assert!(h.player.log().playing);
        assert_eq!(h.focus.0.lock().unwrap().requests, 1);

        let snapshot = h.last_snapshot().unwrap();
        assert!(snapshot.is_playing);
        assert_eq!(snapshot.title, "Title a");
        assert_eq!(snapshot.duration_ms, 180_000);
    }

    #[test]
    fn focus_denied_loads_paused() {
        let mut h = Harness::new();
        h.focus.0.lock().unwrap().deny = true;

        h.load_queue(&["a"]);

        assert_eq!(h.state(), TransportKind::Paused);
        assert!(!h.player.log().playing);
        assert!(!h.last_snapshot().unwrap().is_playing);
    }

    #[test]
    fn pause_and_resume() {
        let mut h = Harness::new();
        h.load_queue(&["a"]);
        h.player.log().position_ms = 12_000;

        h.send(Command::Pause);
        assert_eq!(h.state(), TransportKind::Paused);
        assert!(!h.transport.reporter.is_running());
        assert_eq!(h.last_snapshot().unwrap().position_ms, 12_000);

        h.send(Command::Resume);
        assert_eq!(h.state(), TransportKind::Playing);
        assert!(h.transport.reporter.is_running());
    }

    #[test]
    fn pause_when_not_playing_is_noop() {
        let mut h = Harness::new();
        h.send(Command::Pause);
        assert_eq!(h.state(), TransportKind::Idle);
        assert!(h.last_snapshot().is_none());
    }

    #[test]
    fn play_out_of_range_is_ignored() {
        let mut h = Harness::new();
        h.load_queue(&["a", "b"]);

        h.send(Command::Play(7));

        assert_eq!(h.index(), Some(0));
        assert_eq!(h.player.log().loads, 1);
    }

    #[test]
    fn stop_releases_player_and_abandons_focus() {
        let mut h = Harness::new();
        h.load_queue(&["a", "b"]);
        h.send(Command::Next);

        h.send(Command::Stop);

        assert_eq!(h.state(), TransportKind::Stopped);
        assert!(h.player.log().loaded.is_none());
        assert_eq!(h.focus.0.lock().unwrap().abandons, 1);
        assert_eq!(h.index(), Some(1));
        assert!(!h.last_snapshot().unwrap().is_playing);
    }

    #[test]
    fn resume_after_stop_reloads_current_track() {
        let mut h = Harness::new();
        h.load_queue(&["a", "b"]);
        h.send(Command::Next);
        h.send(Command::Stop);

        h.send(Command::Resume);

        assert_eq!(h.state(), TransportKind::Playing);
        assert_eq!(h.current_id().as_deref(), Some("b"));
        assert_eq!(h.player.log().loads, 3);
    }

    // ===== Completion policy =====

    #[test]
    fn completion_with_repeat_all_cycles_through_queue() {
        let mut h = Harness::new();
        h.load_queue(&["a", "b", "c"]);

        let mut indices = vec![h.index().unwrap()];
        for _ in 0..3 {
            h.complete();
            indices.push(h.index().unwrap());
        }

        assert_eq!(indices, vec![0, 1, 2, 0]);
        assert_eq!(h.state(), TransportKind::Playing);
    }

    #[test]
    fn completion_with_repeat_one_keeps_index() {
        let mut h = Harness::new();
        h.load_queue(&["a", "b", "c"]);
        h.send(Command::Next);
        // All -> Off -> One
        h.send(Command::CycleRepeat(None));
        h.send(Command::CycleRepeat(None));
        assert_eq!(h.transport.repeat, RepeatMode::One);

        h.complete();
        h.complete();

        assert_eq!(h.index(), Some(1));
        assert_eq!(h.state(), TransportKind::Playing);
        assert_eq!(h.player.log().position_ms, 0);
    }

    #[test]
    fn completion_at_last_with_repeat_off_stops() {
        let mut h = Harness::new();
        h.load_queue(&["a", "b"]);
        h.send(Command::CycleRepeat(None));
        assert_eq!(h.transport.repeat, RepeatMode::Off);
        h.send(Command::Next);
        let generation = h.transport.reporter.generation();

        h.complete();

        assert_eq!(h.state(), TransportKind::Stopped);
        assert_eq!(h.index(), Some(1));
        assert_eq!(h.focus.0.lock().unwrap().abandons, 1);
        let last = h.last_snapshot().unwrap();
        assert!(!last.is_playing);

        // A tick queued before the stop publishes nothing
        h.send(Command::Tick(generation));
        assert!(h.last_snapshot().is_none());
    }

    #[test]
    fn completion_not_at_last_with_repeat_off_advances() {
        let mut h = Harness::new();
        h.send(Command::CycleRepeat(None));
        h.load_queue(&["a", "b"]);

        h.complete();

        assert_eq!(h.index(), Some(1));
        assert_eq!(h.state(), TransportKind::Playing);
    }

    #[test]
    fn completion_at_position_zero_is_ignored() {
        let mut h = Harness::new();
        h.load_queue(&["a", "b"]);

        h.player.events().completed();
        h.drain();

        assert_eq!(h.index(), Some(0));
        assert_eq!(h.player.log().loads, 1);
    }

    #[test]
    fn cycle_repeat_replies_with_new_mode() {
        let mut h = Harness::new();
        let (tx, rx) = unbounded();

        h.send(Command::CycleRepeat(Some(tx.clone())));
        h.send(Command::CycleRepeat(Some(tx.clone())));
        h.send(Command::CycleRepeat(Some(tx)));

        let modes: Vec<RepeatMode> = rx.try_iter().collect();
        assert_eq!(modes, vec![RepeatMode::Off, RepeatMode::One, RepeatMode::All]);
    }

    // ===== Navigation =====

    #[test]
    fn next_and_previous_wrap_regardless_of_repeat() {
        let mut h = Harness::new();
        h.send(Command::CycleRepeat(None));
        h.load_queue(&["a", "b", "c"]);

        h.send(Command::Previous);
        assert_eq!(h.index(), Some(2));

        h.send(Command::Next);
        assert_eq!(h.index(), Some(0));
    }

    #[test]
    fn previous_above_threshold_restarts_track() {
        let mut h = Harness::new();
        h.load_queue(&["a", "b", "c"]);
        h.send(Command::Next);
        h.player.log().position_ms = 5_000;

        h.send(Command::Previous);

        assert_eq!(h.index(), Some(1));
        assert_eq!(h.player.log().position_ms, 0);
        assert_eq!(h.player.log().loads, 2);
    }

    #[test]
    fn previous_below_threshold_moves_back() {
        let mut h = Harness::new();
        h.load_queue(&["a", "b", "c"]);
        h.send(Command::Next);
        h.player.log().position_ms = 1_000;

        h.send(Command::Previous);

        assert_eq!(h.index(), Some(0));
        assert_eq!(h.state(), TransportKind::Playing);
    }

    #[test]
    fn skip_on_empty_queue_is_noop() {
        let mut h = Harness::new();
        h.send(Command::Next);
        h.send(Command::Previous);
        assert_eq!(h.state(), TransportKind::Idle);
        assert_eq!(h.player.log().loads, 0);
    }

    #[test]
    fn seek_while_paused_updates_snapshot() {
        let mut h = Harness::new();
        h.load_queue(&["a"]);
        h.send(Command::Pause);

        h.send(Command::Seek(42_000));

        let snapshot = h.last_snapshot().unwrap();
        assert_eq!(snapshot.position_ms, 42_000);
        assert!(!snapshot.is_playing);
    }

    #[test]
    fn shuffle_keeps_current_track_playing() {
        let mut h = Harness::new();
        h.load_queue(&["a", "b", "c", "d", "e"]);
        h.send(Command::Play(3));

        h.send(Command::ToggleShuffle);

        assert_eq!(h.index(), Some(0));
        assert_eq!(h.current_id().as_deref(), Some("d"));
        assert_eq!(h.state(), TransportKind::Playing);
        assert_eq!(h.player.log().loads, 2);

        h.send(Command::ToggleShuffle);
        assert_eq!(h.index(), Some(3));
        assert_eq!(h.current_id().as_deref(), Some("d"));
    }

    // ===== Async prepare =====

    #[test]
    fn seek_while_preparing_is_ignored() {
        let mut h = Harness::new();
        h.player.log().manual_prepare = true;
        h.load_queue(&["a"]);
        assert_eq!(h.state(), TransportKind::Preparing);

        h.send(Command::Seek(30_000));
        h.player.events().prepared();
        h.drain();

        assert_eq!(h.state(), TransportKind::Playing);
        assert_eq!(h.player.log().position_ms, 0);
    }

    #[test]
    fn stale_prepared_callback_is_ignored() {
        let mut h = Harness::new();
        h.player.log().manual_prepare = true;
        h.load_queue(&["a", "b"]);
        let first = h.player.events();

        h.send(Command::Next);
        let second = h.player.events();
        assert_ne!(first.load_id(), second.load_id());

        first.prepared();
        h.drain();
        assert_eq!(h.state(), TransportKind::Preparing);

        second.prepared();
        h.drain();
        assert_eq!(h.state(), TransportKind::Playing);
        assert_eq!(h.last_snapshot().unwrap().title, "Title b");
    }

    #[test]
    fn pause_while_preparing_loads_paused() {
        let mut h = Harness::new();
        h.player.log().manual_prepare = true;
        h.load_queue(&["a"]);

        h.send(Command::Pause);
        h.player.events().prepared();
        h.drain();

        assert_eq!(h.state(), TransportKind::Paused);
        assert!(!h.player.log().playing);
    }

    // ===== Failures =====

    #[test]
    fn load_rejection_settles_to_stopped_with_error() {
        let mut h = Harness::new();
        h.player.log().reject_loads = true;

        h.load_queue(&["a"]);

        assert_eq!(h.state(), TransportKind::Stopped);
        let snapshot = h.last_snapshot().unwrap();
        assert!(!snapshot.is_playing);
        assert!(snapshot.error.unwrap().contains("unsupported format"));

        // Still usable afterwards
        h.player.log().reject_loads = false;
        h.send(Command::Play(0));
        assert_eq!(h.state(), TransportKind::Playing);
        assert!(h.last_snapshot().unwrap().error.is_none());
    }

    #[test]
    fn prepare_error_callback_reports_load_failure() {
        let mut h = Harness::new();
        h.player.log().manual_prepare = true;
        h.load_queue(&["a"]);

        h.player.events().failed(-38, "decoder crashed");
        h.drain();

        assert_eq!(h.state(), TransportKind::Stopped);
        let error = h.last_snapshot().unwrap().error.unwrap();
        assert!(error.starts_with("Failed to load track"));
    }

    #[test]
    fn player_error_during_playback_stops() {
        let mut h = Harness::new();
        h.load_queue(&["a", "b"]);
        let events = h.player.events();

        events.failed(100, "server died");
        h.drain();

        assert_eq!(h.state(), TransportKind::Stopped);
        assert!(!h.transport.reporter.is_running());
        assert_eq!(h.index(), Some(0));
        let error = h.last_snapshot().unwrap().error.unwrap();
        assert!(error.contains("server died"));

        // Later callbacks from the failed load are stale
        events.completed();
        h.drain();
        assert_eq!(h.state(), TransportKind::Stopped);
    }

    #[test]
    fn pause_error_stops_instead_of_pausing() {
        let mut h = Harness::new();
        h.load_queue(&["a"]);
        h.player.log().fail_pause = true;

        h.send(Command::Pause);

        assert_eq!(h.state(), TransportKind::Stopped);
        assert!(!h.player.log().playing);
        assert!(h.player.log().loaded.is_none());
        assert!(!h.transport.reporter.is_running());
        let snapshot = h.last_snapshot().unwrap();
        assert!(!snapshot.is_playing);
        assert!(snapshot.error.unwrap().contains("engine wedged"));
    }

    #[test]
    fn seek_error_stops_with_error_snapshot() {
        let mut h = Harness::new();
        h.load_queue(&["a"]);
        h.player.log().fail_seek = true;

        h.send(Command::Seek(30_000));

        assert_eq!(h.state(), TransportKind::Stopped);
        assert!(!h.transport.reporter.is_running());
        assert_eq!(h.index(), Some(0));
        let error = h.last_snapshot().unwrap().error.unwrap();
        assert!(error.contains("seek unsupported"));
    }

    #[test]
    fn restore_seek_error_stops_with_error_snapshot() {
        let session = MemorySessionStore::with_session(PersistedSession::new(1, 42_000));
        let mut h = Harness::with_session(session);
        h.send(Command::SetLibrary(
            ["a", "b"].iter().map(|id| create_test_track(id)).collect(),
        ));
        h.player.log().fail_seek = true;

        h.send(Command::RestoreSession);

        assert_eq!(h.state(), TransportKind::Stopped);
        assert!(h.player.log().loaded.is_none());
        let snapshot = h.last_snapshot().unwrap();
        assert_eq!(snapshot.title, "Title b");
        assert!(snapshot.error.unwrap().contains("seek unsupported"));
    }

    #[test]
    fn failure_forgets_pending_focus_resume() {
        let mut h = Harness::new();
        h.load_queue(&["a"]);
        h.send(Command::Focus(FocusChange::LostTransient));
        assert!(h.transport.policy.was_playing_when_lost());
        let abandons = h.focus.0.lock().unwrap().abandons;

        h.player.events().failed(7, "device lost");
        h.drain();

        assert_eq!(h.state(), TransportKind::Stopped);
        assert!(!h.transport.policy.was_playing_when_lost());
        assert_eq!(h.focus.0.lock().unwrap().abandons, abandons + 1);

        h.send(Command::Focus(FocusChange::Gained));
        assert_eq!(h.state(), TransportKind::Stopped);
        assert!(!h.player.log().playing);
    }

    // ===== Focus =====

    #[test]
    fn transient_focus_loss_pauses_and_gain_resumes() {
        let mut h = Harness::new();
        h.load_queue(&["a"]);

        h.send(Command::Focus(FocusChange::LostTransient));
        assert_eq!(h.state(), TransportKind::Paused);
        assert!(h.transport.policy.was_playing_when_lost());

        h.send(Command::Focus(FocusChange::Gained));
        assert_eq!(h.state(), TransportKind::Playing);
        assert!(!h.transport.policy.was_playing_when_lost());
    }

    #[test]
    fn permanent_focus_loss_does_not_resume() {
        let mut h = Harness::new();
        h.load_queue(&["a"]);

        h.send(Command::Focus(FocusChange::Lost));
        h.send(Command::Focus(FocusChange::Gained));

        assert_eq!(h.state(), TransportKind::Paused);
    }

    #[test]
    fn duck_lowers_gain_without_pausing() {
        let mut h = Harness::new();
        h.load_queue(&["a"]);

        h.send(Command::Focus(FocusChange::LostTransientCanDuck));
        assert_eq!(h.state(), TransportKind::Playing);
        assert!((h.player.log().gain - 0.3).abs() < 0.001);

        h.send(Command::Focus(FocusChange::Gained));
        assert!((h.player.log().gain - 1.0).abs() < 0.001);
    }

    // ===== Reporter =====

    #[test]
    fn tick_publishes_while_playing() {
        let mut h = Harness::new();
        h.load_queue(&["a"]);
        h.snapshots.try_iter().count();
        h.player.log().position_ms = 3_000;

        let generation = h.transport.reporter.generation();
        h.send(Command::Tick(generation));

        let snapshot = h.last_snapshot().unwrap();
        assert_eq!(snapshot.position_ms, 3_000);
        assert!(snapshot.is_playing);
    }

    #[test]
    fn tick_after_pause_is_dropped() {
        let mut h = Harness::new();
        h.load_queue(&["a"]);
        let generation = h.transport.reporter.generation();
        h.send(Command::Pause);
        h.snapshots.try_iter().count();

        h.send(Command::Tick(generation));

        assert!(h.last_snapshot().is_none());
    }

    // ===== Library and session =====

    #[test]
    fn library_seeds_empty_queue_only() {
        let mut h = Harness::new();
        h.send(Command::SetLibrary(vec![create_test_track("x"), create_test_track("y")]));
        assert_eq!(h.transport.queue.len(), 2);
        assert_eq!(h.state(), TransportKind::Idle);

        h.load_queue(&["a"]);
        h.send(Command::SetLibrary(vec![create_test_track("z")]));
        assert_eq!(h.transport.queue.len(), 1);
        assert_eq!(h.current_id().as_deref(), Some("a"));
    }

    #[test]
    fn play_tracks_resolves_ids_and_falls_back_to_first() {
        let mut h = Harness::new();
        h.send(Command::SetLibrary(
            ["a", "b", "c"].iter().map(|id| create_test_track(id)).collect(),
        ));

        h.send(Command::PlayTracks {
            ids: vec![TrackId::new("c"), TrackId::new("ghost"), TrackId::new("a")],
            start_index: 9,
        });

        let queue: Vec<String> = h.transport.queue.tracks().iter().map(|t| t.id.to_string()).collect();
        assert_eq!(queue, vec!["c", "a"]);
        assert_eq!(h.current_id().as_deref(), Some("c"));
        assert_eq!(h.state(), TransportKind::Playing);
    }

    #[test]
    fn play_playlist_with_no_known_tracks_is_noop() {
        let mut h = Harness::new();
        h.send(Command::SetLibrary(vec![create_test_track("a")]));

        h.send(Command::PlayPlaylist(vec![TrackId::new("nope")]));

        assert_eq!(h.state(), TransportKind::Idle);
        assert_eq!(h.player.log().loads, 0);
    }

    #[test]
    fn restore_session_loads_paused_at_saved_position() {
        let session = MemorySessionStore::with_session(PersistedSession::new(1, 42_000));
        let mut h = Harness::with_session(session);
        h.send(Command::SetLibrary(
            ["a", "b", "c"].iter().map(|id| create_test_track(id)).collect(),
        ));

        h.send(Command::RestoreSession);

        assert_eq!(h.state(), TransportKind::Paused);
        assert_eq!(h.index(), Some(1));
        assert!(!h.player.log().playing);
        let snapshot = h.last_snapshot().unwrap();
        assert_eq!(snapshot.position_ms, 42_000);
        assert_eq!(snapshot.title, "Title b");
        assert!(!snapshot.is_playing);
    }

    #[test]
    fn resume_records_start_position() {
        let session = MemorySessionStore::with_session(PersistedSession::new(1, 42_000));
        let mut h = Harness::with_session(session);
        h.send(Command::SetLibrary(
            ["a", "b", "c"].iter().map(|id| create_test_track(id)).collect(),
        ));
        h.send(Command::RestoreSession);

        h.send(Command::Resume);

        match &h.transport.state {
            TransportState::Playing {
                track,
                started_at_position_ms,
            } => {
                assert_eq!(track.title, "Title b");
                assert_eq!(*started_at_position_ms, 42_000);
            }
            other => panic!("expected Playing, got {:?}", other),
        }
    }

    #[test]
    fn restore_session_out_of_range_is_ignored() {
        let session = MemorySessionStore::with_session(PersistedSession::new(8, 1_000));
        let mut h = Harness::with_session(session);
        h.send(Command::SetLibrary(vec![create_test_track("a")]));

        h.send(Command::RestoreSession);

        assert_eq!(h.state(), TransportKind::Idle);
        assert_eq!(h.player.log().loads, 0);
    }

    #[test]
    fn shutdown_saves_index_and_position() {
        let mut h = Harness::new();
        h.load_queue(&["a", "b", "c"]);
        h.send(Command::Next);
        h.player.log().position_ms = 61_000;

        let flow = h.transport.handle(Command::Shutdown);

        assert!(flow.is_break());
        let saved = h.session.get().unwrap();
        assert_eq!(saved.last_index, 1);
        assert_eq!(saved.last_position_ms, 61_000);
        assert!(h.player.log().loaded.is_none());
    }

    #[test]
    fn shutdown_with_empty_queue_saves_nothing() {
        let mut h = Harness::new();
        let _ = h.transport.handle(Command::Shutdown);
        assert!(h.session.get().is_none());
    }

    #[test]
    fn status_reflects_state() {
        let mut h = Harness::new();
        h.load_queue(&["a", "b"]);
        h.send(Command::SetVolume(60));
        let (tx, rx) = unbounded();

        h.send(Command::Status(tx));

        let status = rx.try_recv().unwrap();
        assert_eq!(status.state, TransportKind::Playing);
        assert_eq!(status.current_index, Some(0));
        assert_eq!(status.queue, vec![TrackId::new("a"), TrackId::new("b")]);
        assert_eq!(status.repeat, RepeatMode::All);
        assert_eq!(status.volume, 60);
        assert!(!status.shuffled);
        assert!(status.snapshot.unwrap().is_playing);
    }
}
