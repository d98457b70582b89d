//! Daemon configuration: `config.yml` at the installation root plus a
//! `.env` file for provider credentials.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Installation root; everything else is relative to it.
    #[serde(skip)]
    pub root: PathBuf,
    /// With no human attached, unapproved commands fail instead of pausing.
    pub unattended: bool,
    /// Session targeted by commands that name none. 0 means host.
    pub current_session: u64,
    /// Agent loop tick interval, milliseconds.
    pub tick_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: PathBuf::new(),
            unattended: false,
            current_session: 0,
            tick_ms: 2_000,
        }
    }
}

impl Config {
    /// Load `config.yml` under `root` (defaults when missing) and apply
    /// `.env`. Unreadable config is an error; silence would mask typos.
    pub fn load(root: impl Into<PathBuf>) -> Result<Self, crate::DaemonError> {
        let root = root.into();
        let path = root.join("config.yml");
        let mut config = match std::fs::read_to_string(&path) {
            Ok(text) => serde_yaml::from_str::<Config>(&text).map_err(|e| {
                crate::DaemonError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("bad config {}: {e}", path.display()),
                ))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Config::default(),
            Err(e) => return Err(crate::DaemonError::Io(e)),
        };
        config.root = root;
        load_dotenv(&config.root.join(".env"));
        Ok(config)
    }

    /// The default installation root: `$BERTH_ROOT`, else the user data dir.
    pub fn default_root() -> PathBuf {
        if let Ok(root) = std::env::var("BERTH_ROOT") {
            return PathBuf::from(root);
        }
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("berth")
    }
}

/// Apply `KEY=VALUE` lines from a `.env` file. Lines starting with `#`
/// are ignored; existing process environment wins.
pub fn load_dotenv(path: &Path) {
    let Ok(text) = std::fs::read_to_string(path) else { return };
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            warn!(line, "ignoring malformed .env line");
            continue;
        };
        let key = key.trim();
        if key.is_empty() || std::env::var_os(key).is_some() {
            continue;
        }
        std::env::set_var(key, value.trim());
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
