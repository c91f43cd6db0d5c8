//! Structured event vocabulary for logging.
//!
//! Event names are used as the tracing `target`, so the JSONL layer emits them
//! in the `event` field and filters can select them directly.

use serde::{Deserialize, Serialize};

/// Log levels for events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<tracing::Level> for Level {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => Level::Trace,
            tracing::Level::DEBUG => Level::Debug,
            tracing::Level::INFO => Level::Info,
            tracing::Level::WARN => Level::Warn,
            tracing::Level::ERROR => Level::Error,
        }
    }
}

/// Engine stages, recorded on spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Settings and collaborator setup.
    Init,
    /// Single-entity recompute.
    Recompute,
    /// Whole-corpus recompute.
    Batch,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Init => "init",
            Stage::Recompute => "recompute",
            Stage::Batch => "batch",
        };
        write!(f, "{}", s)
    }
}

/// Standard event names used in logging.
pub mod event_names {
    // Catalog
    pub const CATALOG_LOADED: &str = "catalog.loaded";
    pub const CATALOG_RELOADED: &str = "catalog.reloaded";
    pub const CATALOG_FAILED: &str = "catalog.failed";

    // External classifier
    pub const CLASSIFIER_FALLBACK: &str = "classifier.fallback";
    pub const CLASSIFIER_SUSPENDED: &str = "classifier.suspended";

    // Single-entity recompute
    pub const RECOMPUTE_DONE: &str = "recompute.done";
    pub const RECOMPUTE_FAILED: &str = "recompute.failed";

    // Whole-corpus recompute
    pub const BATCH_STARTED: &str = "batch.started";
    pub const BATCH_PROGRESS: &str = "batch.progress";
    pub const BATCH_ENTITY_FAILED: &str = "batch.entity_failed";
    pub const BATCH_FINISHED: &str = "batch.finished";
    pub const BATCH_CANCELLED: &str = "batch.cancelled";
    pub const BATCH_REFUSED: &str = "batch.refused";

    // Config
    pub const CONFIG_LOADED: &str = "config.loaded";
    pub const CONFIG_DEFAULT_USED: &str = "config.default_used";
    pub const CONFIG_ERROR: &str = "config.error";
}
