/// CLI configuration
use cadence_playback::PlaybackConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CliError, Result};

const DEFAULT_CONFIG_FILE: &str = "cadence.toml";
const ENV_PREFIX: &str = "CADENCE";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CliConfig {
    #[serde(default)]
    pub playback: PlaybackConfig,

    #[serde(default = "default_player")]
    pub player: PlayerSettings,

    #[serde(default = "default_session")]
    pub session: SessionSettings,

    #[serde(default = "default_library")]
    pub library: LibrarySettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlayerSettings {
    /// Simulated prepare latency
    #[serde(default = "default_prepare_delay_ms")]
    pub prepare_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionSettings {
    #[serde(default = "default_session_path")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LibrarySettings {
    /// JSON manifest with tracks and playlists
    #[serde(default)]
    pub manifest: Option<PathBuf>,
}

impl CliConfig {
    /// Load configuration from file and environment
    ///
    /// `path` must exist when given; otherwise `cadence.toml` in the working
    /// directory is used if present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_prefix(path, ENV_PREFIX)
    }

    fn load_with_prefix(path: Option<&Path>, prefix: &str) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                settings = settings.add_source(config::File::from(path).required(true));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        // Override with environment variables, e.g. CADENCE_PLAYBACK__VOLUME=60
        settings = settings.add_source(
            config::Environment::with_prefix(prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = settings
            .build()
            .map_err(|e| CliError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| CliError::Config(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.playback.position_interval_ms == 0 {
            return Err(CliError::Config(
                "playback.position_interval_ms must be greater than 0".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.playback.duck_gain) {
            return Err(CliError::Config(format!(
                "playback.duck_gain must be within [0, 1], got {}",
                self.playback.duck_gain
            )));
        }

        if self.playback.volume > 100 {
            return Err(CliError::Config(format!(
                "playback.volume must be at most 100, got {}",
                self.playback.volume
            )));
        }

        Ok(())
    }
}

// Default values
fn default_player() -> PlayerSettings {
    PlayerSettings {
        prepare_delay_ms: default_prepare_delay_ms(),
    }
}

fn default_prepare_delay_ms() -> u64 {
    50
}

fn default_session() -> SessionSettings {
    SessionSettings {
        path: default_session_path(),
    }
}

fn default_session_path() -> PathBuf {
    PathBuf::from("./data/session.json")
}

fn default_library() -> LibrarySettings {
    LibrarySettings::default()
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            playback: PlaybackConfig::default(),
            player: default_player(),
            session: default_session(),
            library: default_library(),
        }
    }
}
