//! Cadence CLI Library
//!
//! Headless host for the playback controller: configuration loading, a JSON
//! library manifest, a clock-driven stand-in player, and the stdin command
//! language.
//!
//! This library exposes the components for testing purposes.

pub mod config;
pub mod error;
pub mod library;
pub mod player;
pub mod repl;

pub use config::CliConfig;
pub use error::{CliError, Result};
pub use library::JsonLibrary;
pub use player::SimulatedPlayer;
