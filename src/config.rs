//! Server configuration
//!
//! Stores user preferences in `~/.config/keyrelay/config.yaml`

use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Settings read from `config.yaml`. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Interface to listen on
    #[serde(default = "default_bind")]
    pub bind: IpAddr,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Rules file; when unset the default locations are searched
    #[serde(default)]
    pub rules_file: Option<PathBuf>,

    /// Key chord that pastes in the focused application, e.g. `ctrl+shift+v`
    #[serde(default = "default_paste_shortcut")]
    pub paste_shortcut: String,

    /// Pause after the paste chord before the clipboard is restored
    #[serde(default = "default_paste_settle_ms")]
    pub paste_settle_ms: u64,
}

fn default_bind() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    5000
}

fn default_paste_shortcut() -> String {
    if cfg!(target_os = "macos") {
        "cmd+v".to_string()
    } else {
        "ctrl+v".to_string()
    }
}

fn default_paste_settle_ms() -> u64 {
    40
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            rules_file: None,
            paste_shortcut: default_paste_shortcut(),
            paste_settle_ms: default_paste_settle_ms(),
        }
    }
}

impl RelayConfig {
    /// Load config from the default location, or return defaults if not found
    pub fn load() -> Self {
        let Some(path) = crate::config_paths::config_file() else {
            tracing::debug!("No config directory available, using defaults");
            return Self::default();
        };
        Self::load_from(&path)
    }

    /// Load config from `path`. Missing or unreadable files yield defaults.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            tracing::debug!(
                "Config file not found at {}, using defaults",
                path.display()
            );
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match Self::parse(&content) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse config at {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read config at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn parse(content: &str) -> Result<Self, serde_yaml::Error> {
        // An empty document deserializes as unit, not as an empty map
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }
}
