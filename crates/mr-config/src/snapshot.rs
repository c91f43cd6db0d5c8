//! Settings snapshots for batch reports.
//!
//! A snapshot captures the settings a batch ran under, so a stored corpus of
//! derived records can be traced back to the configuration that produced it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::settings::{hash_content, LoadedSettings};

/// A frozen snapshot of settings state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsSnapshot {
    /// When this snapshot was taken.
    pub timestamp: DateTime<Utc>,

    /// Schema version of the settings.
    pub schema_version: String,

    /// Path the settings were loaded from.
    #[serde(default)]
    pub path: Option<String>,

    /// Source of the settings.
    pub source: String,

    /// SHA-256 of the settings file (or of the serialized defaults).
    pub content_hash: String,

    /// Key values for quick reference.
    pub summary: SettingsSummary,
}

/// Summary of key settings values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsSummary {
    pub catalog_path: Option<String>,
    pub classifier_enabled: bool,
    pub classifier_timeout_ms: u64,
    pub only_stale: bool,
}

impl SettingsSnapshot {
    pub fn new(loaded: &LoadedSettings) -> Self {
        let settings = &loaded.settings;
        let content_hash = loaded.content_hash.clone().unwrap_or_else(|| {
            let serialized = serde_json::to_string(settings).unwrap_or_default();
            hash_content(&serialized)
        });

        SettingsSnapshot {
            timestamp: Utc::now(),
            schema_version: settings.schema_version.clone(),
            path: loaded.path.path.as_ref().map(|p| p.display().to_string()),
            source: loaded.path.source.to_string(),
            content_hash,
            summary: SettingsSummary {
                catalog_path: settings
                    .catalog
                    .path
                    .as_ref()
                    .map(|p| p.display().to_string()),
                classifier_enabled: settings.classifier.enabled,
                classifier_timeout_ms: settings.classifier.timeout_ms,
                only_stale: settings.batch.only_stale,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::SettingsPath;
    use crate::settings::EngineSettings;

    #[test]
    fn test_defaults_snapshot_is_stable() {
        let loaded = LoadedSettings {
            settings: EngineSettings::default(),
            path: SettingsPath::default(),
            content_hash: None,
        };
        let a = loaded.snapshot();
        let b = loaded.snapshot();
        assert_eq!(a.content_hash, b.content_hash);
        assert_eq!(a.source, "builtin default");
        assert!(a.path.is_none());
        assert!(!a.summary.classifier_enabled);
    }
}
