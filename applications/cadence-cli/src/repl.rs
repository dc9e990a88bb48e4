//! Line-oriented command interface
//!
//! Each stdin line parses into one [`ReplCommand`], which is then applied to
//! the controller.

use cadence_core::PlaylistId;
use cadence_playback::{FocusChange, PlaybackController};
use std::ops::ControlFlow;
use thiserror::Error;
use tracing::info;

use crate::error::Result;
use crate::library::JsonLibrary;

/// Parsed stdin command
#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    Play(usize),
    Pause,
    Resume,
    Stop,
    Next,
    Previous,
    Seek(u64),
    Shuffle,
    Repeat,
    Volume(u8),
    Focus(FocusChange),
    Playlist(PlaylistId),
    Status,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty input")]
    Empty,

    #[error("unknown command '{0}'")]
    Unknown(String),

    #[error("'{command}' expects {expected}")]
    MissingArgument {
        command: &'static str,
        expected: &'static str,
    },

    #[error("invalid {what} '{value}'")]
    InvalidArgument { what: &'static str, value: String },
}

pub const HELP: &str = "\
commands:
  play N          play queue entry N
  pause | resume | stop
  next | prev
  seek MS         seek to MS milliseconds
  shuffle         toggle shuffle
  repeat          cycle repeat mode (off -> one -> all)
  volume N        set volume 0-100
  focus gain|loss|transient|duck
  playlist ID     play a playlist from the manifest
  status          print controller status
  quit";

/// Parse one input line
pub fn parse(line: &str) -> std::result::Result<ReplCommand, ParseError> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Err(ParseError::Empty);
    };
    let argument = words.next();

    let parsed = match command.to_ascii_lowercase().as_str() {
        "play" => ReplCommand::Play(number(argument, "play", "a queue index", "index")?),
        "pause" => ReplCommand::Pause,
        "resume" => ReplCommand::Resume,
        "stop" => ReplCommand::Stop,
        "next" => ReplCommand::Next,
        "prev" | "previous" => ReplCommand::Previous,
        "seek" => ReplCommand::Seek(number(argument, "seek", "a position in ms", "position")?),
        "shuffle" => ReplCommand::Shuffle,
        "repeat" => ReplCommand::Repeat,
        "volume" => {
            let level: u8 = number(argument, "volume", "a level 0-100", "volume")?;
            if level > 100 {
                return Err(ParseError::InvalidArgument {
                    what: "volume",
                    value: level.to_string(),
                });
            }
            ReplCommand::Volume(level)
        }
        "focus" => ReplCommand::Focus(focus_change(argument)?),
        "playlist" => {
            let id = argument.ok_or(ParseError::MissingArgument {
                command: "playlist",
                expected: "a playlist id",
            })?;
            ReplCommand::Playlist(PlaylistId::new(id))
        }
        "status" => ReplCommand::Status,
        "help" | "?" => ReplCommand::Help,
        "quit" | "exit" => ReplCommand::Quit,
        other => return Err(ParseError::Unknown(other.to_string())),
    };

    Ok(parsed)
}

fn number<T: std::str::FromStr>(
    argument: Option<&str>,
    command: &'static str,
    expected: &'static str,
    what: &'static str,
) -> std::result::Result<T, ParseError> {
    let value = argument.ok_or(ParseError::MissingArgument { command, expected })?;
    value.parse().map_err(|_| ParseError::InvalidArgument {
        what,
        value: value.to_string(),
    })
}

fn focus_change(argument: Option<&str>) -> std::result::Result<FocusChange, ParseError> {
    let value = argument.ok_or(ParseError::MissingArgument {
        command: "focus",
        expected: "gain, loss, transient or duck",
    })?;

    match value.to_ascii_lowercase().as_str() {
        "gain" => Ok(FocusChange::Gained),
        "loss" => Ok(FocusChange::Lost),
        "transient" => Ok(FocusChange::LostTransient),
        "duck" => Ok(FocusChange::LostTransientCanDuck),
        _ => Err(ParseError::InvalidArgument {
            what: "focus change",
            value: value.to_string(),
        }),
    }
}

/// Apply `command` to the controller
///
/// Returns `Break` when the user asked to quit.
pub fn execute(
    controller: &PlaybackController,
    library: &JsonLibrary,
    command: ReplCommand,
) -> Result<ControlFlow<()>> {
    match command {
        ReplCommand::Play(index) => controller.play(index)?,
        ReplCommand::Pause => controller.pause()?,
        ReplCommand::Resume => controller.resume()?,
        ReplCommand::Stop => controller.stop()?,
        ReplCommand::Next => controller.next()?,
        ReplCommand::Previous => controller.previous()?,
        ReplCommand::Seek(position_ms) => controller.seek(position_ms)?,
        ReplCommand::Shuffle => controller.toggle_shuffle()?,
        ReplCommand::Repeat => {
            let mode = controller.cycle_repeat_mode()?;
            println!("repeat: {:?}", mode);
        }
        ReplCommand::Volume(level) => controller.set_volume(level)?,
        ReplCommand::Focus(change) => controller.focus_changed(change)?,
        ReplCommand::Playlist(id) => {
            info!("Playing playlist {}", id);
            controller.play_playlist_from(library, &id)?;
        }
        ReplCommand::Status => {
            let status = controller.status()?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        ReplCommand::Help => println!("{}", HELP),
        ReplCommand::Quit => return Ok(ControlFlow::Break(())),
    }

    Ok(ControlFlow::Continue(()))
}
