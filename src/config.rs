//! File locations and configuration loading.
//!
//! Everything lives under `~/.tubesleep/`:
//! - `tubesleep.sock`: daemon socket
//! - `playlist.json`: persisted playlist
//! - `config.json`: optional [`SessionConfig`] overrides

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::types::SessionConfig;

/// Directory name under the home directory
pub const APP_DIR: &str = ".tubesleep";

/// Socket file name
pub const SOCKET_FILE: &str = "tubesleep.sock";

/// Playlist file name
pub const PLAYLIST_FILE: &str = "playlist.json";

/// Config file name
pub const CONFIG_FILE: &str = "config.json";

/// Resolved file locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    pub socket: PathBuf,
    pub playlist: PathBuf,
    pub config: PathBuf,
}

impl AppPaths {
    /// Paths under `~/.tubesleep`.
    pub fn from_home() -> Result<Self> {
        let home = dirs::home_dir().context("Could not determine the home directory")?;
        Ok(Self::under(home.join(APP_DIR)))
    }

    /// Paths under an arbitrary base directory.
    pub fn under(base: impl AsRef<Path>) -> Self {
        let base = base.as_ref();
        Self {
            socket: base.join(SOCKET_FILE),
            playlist: base.join(PLAYLIST_FILE),
            config: base.join(CONFIG_FILE),
        }
    }

    /// Applies command-line or environment overrides.
    pub fn with_overrides(mut self, socket: Option<PathBuf>, config: Option<PathBuf>) -> Self {
        if let Some(socket) = socket {
            self.socket = socket;
        }
        if let Some(config) = config {
            self.config = config;
        }
        self
    }
}

/// Loads and validates the session configuration.
///
/// A missing file yields the defaults. A malformed or invalid file is an error.
pub fn load_config(path: &Path) -> Result<SessionConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "No config file, using defaults");
        return Ok(SessionConfig::default());
    }

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: SessionConfig = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid config in {}: {}", path.display(), e))?;

    info!(path = %path.display(), "Loaded config");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_under_base() {
        let paths = AppPaths::under("/tmp/ts");
        assert_eq!(paths.socket, PathBuf::from("/tmp/ts/tubesleep.sock"));
        assert_eq!(paths.playlist, PathBuf::from("/tmp/ts/playlist.json"));
        assert_eq!(paths.config, PathBuf::from("/tmp/ts/config.json"));
    }

    #[test]
    fn test_overrides() {
        let paths = AppPaths::under("/tmp/ts")
            .with_overrides(Some(PathBuf::from("/run/x.sock")), None);
        assert_eq!(paths.socket, PathBuf::from("/run/x.sock"));
        assert_eq!(paths.config, PathBuf::from("/tmp/ts/config.json"));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, SessionConfig::default());
    }

    #[test]
    fn test_partial_file_merges_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"fault_budget_floor": 3, "default_minutes": 45}"#).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.fault_budget_floor, 3);
        assert_eq!(config.default_minutes, 45);
        assert_eq!(config.auto_skip_delay_ms, 1500);
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ nope").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    fn test_invalid_values_are_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"max_minutes": 0}"#).unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("Invalid config"));
    }
}
