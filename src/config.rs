//! Application-level configuration loading, including room-policy knobs.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "TETRIS_COOP_BACK_CONFIG_PATH";

/// Default maximum number of players admitted into a single room.
const DEFAULT_MAX_PLAYERS: usize = 8;
/// Default length of generated room codes.
const DEFAULT_ROOM_CODE_LENGTH: usize = 6;
/// Default age after which an empty room is reclaimed by the sweeper.
const DEFAULT_IDLE_ROOM_TIMEOUT_SECS: u64 = 5 * 60;
/// Default interval between two idle-room sweeps.
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 5 * 60;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    max_players_per_room: usize,
    room_code_length: usize,
    idle_room_timeout: Duration,
    sweep_interval: Duration,
    host_only_controls: bool,
    recreate_missing_rooms: bool,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to baked-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(path = %path.display(), "loaded configuration from file");
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Maximum number of players admitted into a single room.
    pub fn max_players_per_room(&self) -> usize {
        self.max_players_per_room
    }

    /// Number of characters in generated room codes.
    pub fn room_code_length(&self) -> usize {
        self.room_code_length
    }

    /// Age after which a room that stayed empty is reclaimed by the sweeper.
    pub fn idle_room_timeout(&self) -> Duration {
        self.idle_room_timeout
    }

    /// Interval between two idle-room sweeps.
    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }

    /// Whether only the room host may start or restart a game.
    pub fn host_only_controls(&self) -> bool {
        self.host_only_controls
    }

    /// Whether a join referencing an unknown room code recreates the room on
    /// demand instead of failing.
    ///
    /// Room codes are therefore not a strong existence guarantee: a stale link
    /// silently spawns a fresh empty room under the old code. Clients rely on
    /// this to recover after the server lost its in-memory rooms.
    pub fn recreate_missing_rooms(&self) -> bool {
        self.recreate_missing_rooms
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_players_per_room: DEFAULT_MAX_PLAYERS,
            room_code_length: DEFAULT_ROOM_CODE_LENGTH,
            idle_room_timeout: Duration::from_secs(DEFAULT_IDLE_ROOM_TIMEOUT_SECS),
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            host_only_controls: false,
            recreate_missing_rooms: true,
        }
    }
}

#[cfg(test)]
impl AppConfig {
    /// Copy of this configuration with the host-only policy flipped.
    pub(crate) fn with_host_only_controls(mut self, value: bool) -> Self {
        self.host_only_controls = value;
        self
    }

    /// Copy of this configuration with missing-room recreation flipped.
    pub(crate) fn with_recreate_missing_rooms(mut self, value: bool) -> Self {
        self.recreate_missing_rooms = value;
        self
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    max_players_per_room: Option<usize>,
    room_code_length: Option<usize>,
    idle_room_timeout_secs: Option<u64>,
    sweep_interval_secs: Option<u64>,
    host_only_controls: Option<bool>,
    recreate_missing_rooms: Option<bool>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = AppConfig::default();
        Self {
            max_players_per_room: value
                .max_players_per_room
                .unwrap_or(defaults.max_players_per_room),
            room_code_length: value.room_code_length.unwrap_or(defaults.room_code_length),
            idle_room_timeout: value
                .idle_room_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.idle_room_timeout),
            sweep_interval: value
                .sweep_interval_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.sweep_interval),
            host_only_controls: value
                .host_only_controls
                .unwrap_or(defaults.host_only_controls),
            recreate_missing_rooms: value
                .recreate_missing_rooms
                .unwrap_or(defaults.recreate_missing_rooms),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_baseline_policy() {
        let config = AppConfig::default();
        assert_eq!(config.max_players_per_room(), 8);
        assert_eq!(config.room_code_length(), 6);
        assert_eq!(config.idle_room_timeout(), Duration::from_secs(300));
        assert!(!config.host_only_controls());
        assert!(config.recreate_missing_rooms());
    }

    #[test]
    fn raw_config_fills_missing_fields_from_defaults() {
        let raw: RawConfig =
            serde_json::from_str(r#"{"max_players_per_room": 4, "host_only_controls": true}"#)
                .unwrap();
        let config: AppConfig = raw.into();
        assert_eq!(config.max_players_per_room(), 4);
        assert!(config.host_only_controls());
        assert_eq!(config.room_code_length(), 6);
    }
}
