//! Monster Rank engine settings loading and validation.
//!
//! This crate provides:
//! - Typed Rust structs for `settings.toml`
//! - Settings resolution (explicit path → env → XDG → defaults)
//! - Semantic validation
//! - Hashed settings snapshots for batch reports

pub mod resolve;
pub mod settings;
pub mod snapshot;
pub mod validate;

pub use resolve::{resolve_settings_path, SettingsPath, SettingsSource};
pub use settings::{
    load_settings, BatchSettings, CatalogSettings, ClassifierSettings, EngineSettings,
    LoadedSettings, LoggingSettings,
};
pub use snapshot::SettingsSnapshot;
pub use validate::{validate_settings, ValidationError, ValidationResult};

/// Schema version for settings files.
pub const SETTINGS_SCHEMA_VERSION: &str = "1.0.0";
