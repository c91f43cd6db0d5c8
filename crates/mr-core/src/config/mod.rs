//! Settings loading for the engine.
//!
//! This module handles:
//! - Settings resolution (explicit path > `MONSTER_RANK_CONFIG` > XDG > defaults)
//! - Logging where the settings came from
//! - Building the optional external classifier from `[classifier]`

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::logging::event_names;
use crate::tags::TextClassifier;

pub use mr_config::{
    BatchSettings, CatalogSettings, ClassifierSettings, EngineSettings, LoadedSettings,
    LoggingSettings, SettingsSnapshot, ValidationError, SETTINGS_SCHEMA_VERSION,
};

/// Errors that can occur while loading settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings file {path}: {source}")]
    File {
        path: String,
        #[source]
        source: ValidationError,
    },

    #[error("settings validation failed: {0}")]
    Invalid(#[from] ValidationError),
}

impl SettingsError {
    /// Stable code of the underlying validation error.
    pub fn code(&self) -> u32 {
        match self {
            SettingsError::File { source, .. } => source.code(),
            SettingsError::Invalid(e) => e.code(),
        }
    }
}

/// Load and validate settings, logging their provenance.
pub fn load_settings(explicit: Option<&Path>) -> Result<LoadedSettings, SettingsError> {
    let resolved = mr_config::resolve_settings_path(explicit);
    match mr_config::load_settings(explicit) {
        Ok(loaded) => {
            match &loaded.path.path {
                Some(path) => info!(
                    target: event_names::CONFIG_LOADED,
                    path = %path.display(),
                    source = %loaded.path.source,
                    content_hash = loaded.content_hash.as_deref().unwrap_or(""),
                    "settings loaded"
                ),
                None => info!(
                    target: event_names::CONFIG_DEFAULT_USED,
                    "no settings file found; using defaults"
                ),
            }
            Ok(loaded)
        }
        Err(e) => {
            warn!(target: event_names::CONFIG_ERROR, error = %e, "settings rejected");
            Err(match resolved.path {
                Some(path) => SettingsError::File {
                    path: path.display().to_string(),
                    source: e,
                },
                None => SettingsError::Invalid(e),
            })
        }
    }
}

/// The external classifier described by `[classifier]`, if enabled.
///
/// Without the `http-classifier` feature an enabled classifier is reported
/// and ignored; tag suggestions then come from catalog patterns only.
pub fn classifier_from_settings(settings: &ClassifierSettings) -> Option<Arc<dyn TextClassifier>> {
    if !settings.enabled {
        return None;
    }

    #[cfg(feature = "http-classifier")]
    {
        let classifier = crate::tags::HttpTextClassifier::from_settings(settings)?;
        info!(
            target: event_names::CONFIG_LOADED,
            endpoint = settings.endpoint.as_deref().unwrap_or(""),
            timeout_ms = settings.timeout_ms,
            "external classifier enabled"
        );
        Some(Arc::new(classifier))
    }

    #[cfg(not(feature = "http-classifier"))]
    {
        warn!(
            target: event_names::CONFIG_ERROR,
            endpoint = settings.endpoint.as_deref().unwrap_or(""),
            "classifier enabled but built without http-classifier; using pattern suggestions only"
        );
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_explicit_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(
            &path,
            "[batch]\nprogress_every = 10\nonly_stale = true\n\n[classifier]\ntimeout_ms = 900\n",
        )
        .unwrap();

        let loaded = load_settings(Some(&path)).unwrap();
        assert_eq!(loaded.settings.batch.progress_every, 10);
        assert!(loaded.settings.batch.only_stale);
        assert_eq!(loaded.settings.classifier.timeout_ms, 900);
        assert!(loaded.content_hash.is_some());
    }

    #[test]
    fn test_invalid_file_reports_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "[batch]\nprogress_every = 0\n").unwrap();

        let err = load_settings(Some(&path)).unwrap_err();
        assert!(matches!(err, SettingsError::File { .. }));
        assert_eq!(err.code(), 72);
        assert!(err.to_string().contains("settings.toml"));
    }

    #[test]
    fn test_disabled_classifier_builds_nothing() {
        let settings = ClassifierSettings::default();
        assert!(!settings.enabled);
        assert!(classifier_from_settings(&settings).is_none());
    }
}
