//! Error types for Monster Rank.
//!
//! This module provides structured error handling with:
//! - Stable error codes for machine parsing
//! - Category classification so API layers can map each class to its own
//!   response code instead of one generic failure
//! - Recoverability hints for batch drivers
//! - Remediation suggestions for humans
//!
//! # Agent-Facing Output
//!
//! Errors serialize to structured JSON:
//! ```json
//! {
//!   "code": 50,
//!   "category": "persistence",
//!   "message": "persistence failed for entity 42: write conflict",
//!   "recoverable": true,
//!   "context": { "entity_id": 42 }
//! }
//! ```

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for Monster Rank operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Malformed or missing entity data.
    Input,
    /// Tag catalog unreadable or malformed.
    Catalog,
    /// Score or role computation.
    Scoring,
    /// External text classifier (never fatal).
    Classifier,
    /// Entity store refused a read or write.
    Persistence,
    /// Batch job lifecycle.
    Batch,
    /// File I/O and serialization.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Input => write!(f, "input"),
            ErrorCategory::Catalog => write!(f, "catalog"),
            ErrorCategory::Scoring => write!(f, "scoring"),
            ErrorCategory::Classifier => write!(f, "classifier"),
            ErrorCategory::Persistence => write!(f, "persistence"),
            ErrorCategory::Batch => write!(f, "batch"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for Monster Rank.
#[derive(Error, Debug)]
pub enum Error {
    // Input errors (10-19)
    #[error("invalid entity {id}: {reason}")]
    InvalidEntity { id: u64, reason: String },

    #[error("entity {id} not found")]
    EntityNotFound { id: u64 },

    // Catalog errors (20-29)
    #[error("tag catalog unavailable: {0}")]
    CatalogUnavailable(String),

    #[error("tag catalog invalid: {0}")]
    CatalogInvalid(String),

    // Scoring errors (30-39)
    #[error("scoring failed: {0}")]
    Scoring(String),

    // Classifier errors (40-49)
    #[error("text classifier timed out after {millis}ms")]
    ClassifierTimeout { millis: u64 },

    #[error("text classifier failed: {0}")]
    ClassifierFailed(String),

    // Persistence errors (50-59)
    #[error("persistence failed for entity {id}: {reason}")]
    Persistence { id: u64, reason: String },

    #[error("write conflict on entity {id}")]
    Conflict { id: u64 },

    // Batch errors (60-69)
    #[error("a corpus recompute is already running")]
    BatchInProgress,

    #[error("batch cancelled after {processed} entities")]
    Cancelled { processed: usize },

    // I/O errors (70-79)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: Input errors
    /// - 20-29: Catalog errors
    /// - 30-39: Scoring errors
    /// - 40-49: Classifier errors
    /// - 50-59: Persistence errors
    /// - 60-69: Batch errors
    /// - 70-79: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::InvalidEntity { .. } => 10,
            Error::EntityNotFound { .. } => 11,
            Error::CatalogUnavailable(_) => 20,
            Error::CatalogInvalid(_) => 21,
            Error::Scoring(_) => 30,
            Error::ClassifierTimeout { .. } => 40,
            Error::ClassifierFailed(_) => 41,
            Error::Persistence { .. } => 50,
            Error::Conflict { .. } => 51,
            Error::BatchInProgress => 60,
            Error::Cancelled { .. } => 61,
            Error::Io(_) => 70,
            Error::Json(_) => 71,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidEntity { .. } | Error::EntityNotFound { .. } => ErrorCategory::Input,
            Error::CatalogUnavailable(_) | Error::CatalogInvalid(_) => ErrorCategory::Catalog,
            Error::Scoring(_) => ErrorCategory::Scoring,
            Error::ClassifierTimeout { .. } | Error::ClassifierFailed(_) => {
                ErrorCategory::Classifier
            }
            Error::Persistence { .. } | Error::Conflict { .. } => ErrorCategory::Persistence,
            Error::BatchInProgress | Error::Cancelled { .. } => ErrorCategory::Batch,
            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Returns whether retrying the same operation may succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            // The entity itself must be fixed upstream
            Error::InvalidEntity { .. } => false,
            Error::EntityNotFound { .. } => false,

            // Last good snapshot may come back after the file is fixed
            Error::CatalogUnavailable(_) => true,
            Error::CatalogInvalid(_) => true,

            Error::Scoring(_) => false,

            Error::ClassifierTimeout { .. } => true,
            Error::ClassifierFailed(_) => true,

            Error::Persistence { .. } => true,
            Error::Conflict { .. } => true,

            Error::BatchInProgress => true,
            Error::Cancelled { .. } => true,

            Error::Io(_) => true,
            Error::Json(_) => false,
        }
    }

    /// Returns a human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::InvalidEntity { .. } => {
                "Fix the entity's identity fields (non-zero id, non-empty name) upstream and recompute it."
            }
            Error::EntityNotFound { .. } => {
                "The entity was deleted or never existed. Refresh the entity list."
            }
            Error::CatalogUnavailable(_) => {
                "Check that the tag catalog file exists and is readable, then force a reload."
            }
            Error::CatalogInvalid(_) => {
                "Fix the catalog file (schema version, tag prefixes, regex syntax). The last good catalog stays active."
            }
            Error::Scoring(_) => "Internal scoring issue. Report it with the entity's input snapshot.",
            Error::ClassifierTimeout { .. } => {
                "The external classifier was too slow. Pattern-based suggestions were used instead."
            }
            Error::ClassifierFailed(_) => {
                "The external classifier returned an error. Pattern-based suggestions were used instead."
            }
            Error::Persistence { .. } => {
                "The entity store rejected the write. Nothing was partially written; retry the recompute."
            }
            Error::Conflict { .. } => {
                "Another writer updated the entity concurrently. Retry the recompute."
            }
            Error::BatchInProgress => {
                "Wait for the running corpus recompute to finish or cancel it first."
            }
            Error::Cancelled { .. } => {
                "The batch was cancelled. Entities already processed keep their new records."
            }
            Error::Io(_) => "Check file permissions and disk space, then retry.",
            Error::Json(_) => "Invalid JSON payload. Check the producer of this data.",
        }
    }

    /// Returns a short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::InvalidEntity { .. } => "Invalid Entity",
            Error::EntityNotFound { .. } => "Entity Not Found",
            Error::CatalogUnavailable(_) => "Tag Catalog Unavailable",
            Error::CatalogInvalid(_) => "Invalid Tag Catalog",
            Error::Scoring(_) => "Scoring Error",
            Error::ClassifierTimeout { .. } => "Classifier Timeout",
            Error::ClassifierFailed(_) => "Classifier Failure",
            Error::Persistence { .. } => "Persistence Error",
            Error::Conflict { .. } => "Write Conflict",
            Error::BatchInProgress => "Batch Already Running",
            Error::Cancelled { .. } => "Batch Cancelled",
            Error::Io(_) => "I/O Error",
            Error::Json(_) => "JSON Error",
        }
    }

    /// Entity the error is attributed to, when there is one.
    pub fn entity_id(&self) -> Option<u64> {
        match self {
            Error::InvalidEntity { id, .. }
            | Error::EntityNotFound { id }
            | Error::Persistence { id, .. }
            | Error::Conflict { id } => Some(*id),
            _ => None,
        }
    }
}

/// Structured error response for JSON output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StructuredError {
    /// Stable error code.
    pub code: u32,

    /// Error category for grouping.
    pub category: ErrorCategory,

    /// Human-readable error message.
    pub message: String,

    /// Whether the error is potentially recoverable.
    pub recoverable: bool,

    /// Additional structured context (e.g., entity id, timeout).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        let mut context = HashMap::new();

        if let Some(id) = err.entity_id() {
            context.insert("entity_id".to_string(), serde_json::json!(id));
        }
        match err {
            Error::ClassifierTimeout { millis } => {
                context.insert("timeout_ms".to_string(), serde_json::json!(millis));
            }
            Error::Cancelled { processed } => {
                context.insert("processed".to_string(), serde_json::json!(processed));
            }
            _ => {}
        }

        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            recoverable: err.is_recoverable(),
            context,
        }
    }
}

impl StructuredError {
    /// Add additional context to the error.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"error":"serialization_failed"}}"#, self.code)
        })
    }
}

/// Format an error for human-readable stderr output.
///
/// Output format:
/// ```text
/// ✗ [Headline]
///   Reason: [Error message]
///   Fix: [Remediation hint]
/// ```
pub fn format_error_human(err: &Error) -> String {
    format!(
        "✗ {}\n  Reason: {}\n  Fix: {}",
        err.headline(),
        err,
        err.remediation()
    )
}
