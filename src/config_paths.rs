//! Centralized configuration paths for keyrelay
//!
//! All config files live under:
//! - Unix/macOS: `~/.config/keyrelay/`
//! - Windows: `%APPDATA%\keyrelay\`
//!
//! This module is the single source of truth for config paths.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::rules::RULES_FILE_NAME;

const APP_DIR: &str = "keyrelay";

/// Base config directory for keyrelay
///
/// Unix/macOS:
///   - If XDG_CONFIG_HOME is set: `$XDG_CONFIG_HOME/keyrelay`
///   - Else: `~/.config/keyrelay`
///
/// Windows:
///   - `%APPDATA%\keyrelay`
pub fn config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        env::var("APPDATA")
            .ok()
            .map(|appdata| PathBuf::from(appdata).join(APP_DIR))
    }

    #[cfg(not(target_os = "windows"))]
    {
        env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
            .map(|config| config.join(APP_DIR))
    }
}

/// `~/.config/keyrelay/config.yaml`
pub fn config_file() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.yaml"))
}

/// `~/.config/keyrelay/hot-rule.txt`
pub fn rules_file() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(RULES_FILE_NAME))
}

/// `hot-rule.txt` in the directory holding the running executable
pub fn exe_rules_file() -> Option<PathBuf> {
    let exe = env::current_exe().ok()?;
    exe.parent().map(|dir| dir.join(RULES_FILE_NAME))
}

/// `~/.config/keyrelay/logs/`
pub fn logs_dir() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("logs"))
}

fn ensure_dir(path: &Path) -> Result<(), String> {
    fs::create_dir_all(path)
        .map_err(|e| format!("Failed to create directory {}: {}", path.display(), e))
}

/// Ensure logs dir exists, returning it
pub fn ensure_logs_dir() -> Result<PathBuf, String> {
    let logs = logs_dir().ok_or_else(|| "No config directory available".to_string())?;
    ensure_dir(&logs)?;
    Ok(logs)
}

/// Pick the rules file to load
///
/// An explicit path (command line, then config file) wins even if it does
/// not exist, so the user gets a warning naming it. Otherwise the first
/// existing default location is used: next to the executable, then the
/// config dir. With neither present, the executable location is reported.
pub fn resolve_rules_file(cli: Option<&Path>, configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli.or(configured) {
        return Some(path.to_path_buf());
    }

    let candidates: Vec<PathBuf> = [exe_rules_file(), rules_file()]
        .into_iter()
        .flatten()
        .collect();

    candidates
        .iter()
        .find(|path| path.is_file())
        .or_else(|| candidates.first())
        .cloned()
}
