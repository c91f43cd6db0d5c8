//! Settings path discovery.
//!
//! Resolution order: explicit path → environment variables → XDG paths → defaults.

use std::path::{Path, PathBuf};

/// Where the settings file was found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SettingsSource {
    /// Explicitly provided by the caller.
    Explicit,

    /// Set via environment variable.
    Environment,

    /// Found in XDG config directory.
    XdgConfig,

    /// Using built-in defaults.
    #[default]
    BuiltinDefault,
}

impl std::fmt::Display for SettingsSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsSource::Explicit => write!(f, "explicit path"),
            SettingsSource::Environment => write!(f, "environment variable"),
            SettingsSource::XdgConfig => write!(f, "XDG config"),
            SettingsSource::BuiltinDefault => write!(f, "builtin default"),
        }
    }
}

/// Discovered settings file path.
#[derive(Debug, Clone, Default)]
pub struct SettingsPath {
    /// Path to settings.toml (None when defaults are used).
    pub path: Option<PathBuf>,

    /// Source of the path (for diagnostics).
    pub source: SettingsSource,
}

/// Environment variable names.
pub const ENV_SETTINGS_PATH: &str = "MONSTER_RANK_CONFIG";
pub const ENV_CONFIG_DIR: &str = "MONSTER_RANK_CONFIG_DIR";

/// Standard settings file name.
pub const SETTINGS_FILENAME: &str = "settings.toml";

/// Application name for XDG directories.
const APP_NAME: &str = "monster-rank";

/// Resolve the settings path.
///
/// Resolution order:
/// 1. Explicit path (if provided and it exists)
/// 2. MONSTER_RANK_CONFIG (direct path)
/// 3. MONSTER_RANK_CONFIG_DIR + settings.toml
/// 4. XDG config directory (~/.config/monster-rank/settings.toml)
/// 5. Built-in defaults (None)
pub fn resolve_settings_path(explicit: Option<&Path>) -> SettingsPath {
    // 1. Explicit path
    if let Some(path) = explicit {
        if path.exists() {
            return SettingsPath {
                path: Some(path.to_path_buf()),
                source: SettingsSource::Explicit,
            };
        }
    }

    // 2. Environment variable (direct path)
    if let Ok(env_path) = std::env::var(ENV_SETTINGS_PATH) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return SettingsPath {
                path: Some(path),
                source: SettingsSource::Environment,
            };
        }
    }

    // 3. Environment variable (config dir)
    if let Ok(config_dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = PathBuf::from(config_dir).join(SETTINGS_FILENAME);
        if path.exists() {
            return SettingsPath {
                path: Some(path),
                source: SettingsSource::Environment,
            };
        }
    }

    // 4. XDG config directory
    if let Some(xdg_config) = dirs::config_dir() {
        let path = xdg_config.join(APP_NAME).join(SETTINGS_FILENAME);
        if path.exists() {
            return SettingsPath {
                path: Some(path),
                source: SettingsSource::XdgConfig,
            };
        }
    }

    SettingsPath::default()
}
