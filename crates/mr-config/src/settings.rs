//! Engine settings (`settings.toml`).
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working engine that uses the built-in tag catalog and pattern-only tag
//! suggestion.
//!
//! ```toml
//! schema_version = "1.0.0"
//!
//! [catalog]
//! path = "/etc/monster-rank/tags.toml"
//! reload_interval_secs = 30
//!
//! [classifier]
//! enabled = true
//! endpoint = "https://classifier.internal/v1/tags"
//! timeout_ms = 2500
//! api_key_env = "MR_CLASSIFIER_KEY"
//!
//! [batch]
//! progress_every = 25
//! only_stale = false
//!
//! [logging]
//! level = "info"
//! format = "human"
//! ```

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use crate::resolve::{resolve_settings_path, SettingsPath};
use crate::snapshot::SettingsSnapshot;
use crate::validate::{validate_settings, ValidationError, ValidationResult};

/// Top-level engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub schema_version: String,
    pub catalog: CatalogSettings,
    pub classifier: ClassifierSettings,
    pub batch: BatchSettings,
    pub logging: LoggingSettings,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            schema_version: crate::SETTINGS_SCHEMA_VERSION.to_string(),
            catalog: CatalogSettings::default(),
            classifier: ClassifierSettings::default(),
            batch: BatchSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

/// Tag catalog source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    /// Catalog file (TOML or JSON). `None` uses the built-in catalog.
    pub path: Option<PathBuf>,
    /// Minimum seconds between modification-time checks for non-forced reloads.
    pub reload_interval_secs: u64,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            path: None,
            reload_interval_secs: 30,
        }
    }
}

/// Optional external text classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierSettings {
    pub enabled: bool,
    pub endpoint: Option<String>,
    /// Hard deadline for one classification call.
    pub timeout_ms: u64,
    /// Name of the environment variable holding the API key, if any.
    pub api_key_env: Option<String>,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
            timeout_ms: 2500,
            api_key_env: None,
        }
    }
}

/// Whole-corpus recompute behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    /// Emit a progress event every N entities.
    pub progress_every: usize,
    /// Skip entities whose stored record is still fresh.
    pub only_stale: bool,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            progress_every: 25,
            only_stale: false,
        }
    }
}

/// Logging defaults; environment variables still take precedence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "human".to_string(),
        }
    }
}

impl EngineSettings {
    /// Parse and validate settings from a TOML string.
    pub fn from_toml(content: &str) -> ValidationResult<Self> {
        let settings: EngineSettings =
            toml::from_str(content).map_err(|e| ValidationError::ParseError(e.to_string()))?;
        validate_settings(&settings)?;
        Ok(settings)
    }

    /// Classifier deadline as a `Duration`.
    pub fn classifier_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.classifier.timeout_ms)
    }
}

/// Settings together with where they came from.
#[derive(Debug, Clone)]
pub struct LoadedSettings {
    pub settings: EngineSettings,
    pub path: SettingsPath,
    /// SHA-256 of the file content (None when defaults are used).
    pub content_hash: Option<String>,
}

impl LoadedSettings {
    /// Create a snapshot for batch reports.
    pub fn snapshot(&self) -> SettingsSnapshot {
        SettingsSnapshot::new(self)
    }
}

/// Load settings with the standard resolution order.
pub fn load_settings(explicit: Option<&Path>) -> ValidationResult<LoadedSettings> {
    let path = resolve_settings_path(explicit);

    let Some(file) = path.path.clone() else {
        let settings = EngineSettings::default();
        validate_settings(&settings)?;
        return Ok(LoadedSettings {
            settings,
            path,
            content_hash: None,
        });
    };

    let content = std::fs::read_to_string(&file)
        .map_err(|e| ValidationError::IoError(format!("{}: {}", file.display(), e)))?;
    let settings = EngineSettings::from_toml(&content)?;

    Ok(LoadedSettings {
        settings,
        path,
        content_hash: Some(hash_content(&content)),
    })
}

/// Compute SHA-256 hash of content.
pub(crate) fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}
