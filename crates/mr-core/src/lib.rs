//! Monster Rank core library.
//!
//! Turns a monster's base attributes and free-text abilities into derived
//! scores, corpus-relative percentiles, a combat role, and a repaired tag set:
//! - Tag catalog loading and hot reload
//! - Signal extraction from ability text
//! - Raw axis scoring and percentile normalization
//! - Role classification with overrides and confidence
//! - Tag-category repair with optional external classifier
//! - Single-entity and whole-corpus recompute, foreground or as a job
//! - Structured logging and progress events

pub mod catalog;
pub mod config;
pub mod driver;
pub mod events;
pub mod logging;
pub mod normalize;
pub mod role;
pub mod schema;
pub mod scoring;
pub mod signals;
pub mod store;
pub mod tags;

// Re-export test utilities for integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use catalog::{CatalogError, CatalogHandle, CatalogSnapshot, CatalogSource};
pub use driver::{
    compute_derived, BatchDriver, BatchOptions, BatchProgressSink, BatchReport,
    CancellationToken, Engine, FailedEntity, JobHandle, JobProgress, JobStatus, NoopSink,
    Recomputed,
};
pub use normalize::{build_context, normalize, NormContext};
pub use role::{classify_role, RoleDecision};
pub use scoring::{compute_scores, explain_scores};
pub use signals::{extract_signals, Signal, SignalMap};
pub use store::{EntityStore, MemoryStore, StoreError};
pub use tags::{ensure_category_tags, RepairOutcome, SuggestionSource, TextClassifier};

pub use mr_common::{
    Ability, Axis, BaseAttributes, DerivedRecord, Entity, EntityId, Error, JobId, Role, TagSet,
};
