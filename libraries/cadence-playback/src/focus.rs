//! Audio focus and interruption policy
//!
//! Maps focus changes from the host into transport and volume actions.

/// Focus change signalled by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusChange {
    /// Focus (re)gained
    Gained,

    /// Lost for an unbounded time
    Lost,

    /// Lost briefly; expect it back
    LostTransient,

    /// Lost briefly; may keep playing quietly
    LostTransientCanDuck,
}

/// Exclusive claim over the audio output
pub trait AudioFocus: Send {
    /// Ask for focus; `false` means denied
    fn request(&mut self) -> bool;

    /// Give focus back
    fn abandon(&mut self);
}

/// Focus provider for hosts without a focus arbiter
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysGranted;

impl AudioFocus for AlwaysGranted {
    fn request(&mut self) -> bool {
        true
    }

    fn abandon(&mut self) {}
}

/// Transport action requested by the policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportAction {
    Pause,
    Resume,
}

/// Volume action requested by the policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeAction {
    Duck,
    Restore,
}

/// What to do about a focus change
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FocusDecision {
    pub transport: Option<TransportAction>,
    pub volume: Option<VolumeAction>,
}

/// Interruption policy
///
/// Remembers whether playback was interrupted by a transient loss so that
/// it can be resumed when focus comes back.
#[derive(Debug, Default, Clone)]
pub struct InterruptionPolicy {
    was_playing_when_lost: bool,
}

impl InterruptionPolicy {
    /// Create a policy with the resume flag cleared
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a transient loss interrupted playback
    pub fn was_playing_when_lost(&self) -> bool {
        self.was_playing_when_lost
    }

    /// Forget any pending resume
    pub fn reset(&mut self) {
        self.was_playing_when_lost = false;
    }

    /// Decide how to react to `change` given the current transport state
    pub fn on_focus_change(&mut self, change: FocusChange, is_playing: bool) -> FocusDecision {
        match change {
            FocusChange::Gained => {
                let resume = std::mem::take(&mut self.was_playing_when_lost);
                FocusDecision {
                    transport: resume.then_some(TransportAction::Resume),
                    volume: Some(VolumeAction::Restore),
                }
            }
            FocusChange::Lost => {
                self.was_playing_when_lost = false;
                FocusDecision {
                    transport: is_playing.then_some(TransportAction::Pause),
                    volume: None,
                }
            }
            FocusChange::LostTransient => {
                self.was_playing_when_lost = is_playing;
                FocusDecision {
                    transport: is_playing.then_some(TransportAction::Pause),
                    volume: None,
                }
            }
            FocusChange::LostTransientCanDuck => FocusDecision {
                transport: None,
                volume: Some(VolumeAction::Duck),
            },
        }
    }
}
