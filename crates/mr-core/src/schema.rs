//! JSON Schema generation for persisted and exchanged types.
//!
//! The API layer publishes these so clients can validate derived records,
//! catalog files and batch outcomes without linking this crate.

use schemars::schema_for;
use serde_json::Value;
use std::collections::BTreeMap;

pub use crate::catalog::{CatalogSchema, TagDefinition};
pub use crate::driver::{BatchTimings, FailedEntity, JobProgress, JobStatus};
pub use crate::signals::Signal;
pub use mr_common::{
    Ability, Axis, BaseAttributes, DerivedRecord, Entity, EntityId, ErrorCategory, InputSnapshot,
    JobId, Role, StructuredError, TagCategory,
};

/// Available schema types with their descriptions.
pub fn available_schemas() -> Vec<(&'static str, &'static str)> {
    vec![
        // Identity
        ("EntityId", "Store-assigned monster id"),
        ("JobId", "Batch job identifier"),
        // Entities
        ("Entity", "Monster with attributes, abilities, tags and derived record"),
        ("Ability", "Named ability with free-text description"),
        ("BaseAttributes", "Six base numeric attributes"),
        ("TagCategory", "Tag namespace (buff, debuff, utility)"),
        // Derived data
        ("Axis", "Battle-capability axis"),
        ("Role", "Combat role"),
        ("DerivedRecord", "Scores, percentiles, role and audit inputs"),
        ("InputSnapshot", "Inputs a derived record was computed from"),
        ("Signal", "Capability signal extracted from text or tags"),
        // Catalog
        ("CatalogSchema", "Tag catalog file"),
        ("TagDefinition", "One catalog tag"),
        // Batch
        ("JobStatus", "Lifecycle of a batch job"),
        ("JobProgress", "Batch job counters"),
        ("FailedEntity", "Entity a batch could not recompute"),
        ("BatchTimings", "Wall-clock bounds of a batch"),
        // Errors
        ("ErrorCategory", "Error category"),
        ("StructuredError", "Error with code, category and remediation"),
    ]
}

/// Generate JSON Schema for a type by name.
///
/// Returns None if the type is unknown.
pub fn generate_schema(type_name: &str) -> Option<Value> {
    let schema = match type_name {
        "EntityId" => schema_for!(EntityId),
        "JobId" => schema_for!(JobId),
        "Entity" => schema_for!(Entity),
        "Ability" => schema_for!(Ability),
        "BaseAttributes" => schema_for!(BaseAttributes),
        "TagCategory" => schema_for!(TagCategory),
        "Axis" => schema_for!(Axis),
        "Role" => schema_for!(Role),
        "DerivedRecord" => schema_for!(DerivedRecord),
        "InputSnapshot" => schema_for!(InputSnapshot),
        "Signal" => schema_for!(Signal),
        "CatalogSchema" => schema_for!(CatalogSchema),
        "TagDefinition" => schema_for!(TagDefinition),
        "JobStatus" => schema_for!(JobStatus),
        "JobProgress" => schema_for!(JobProgress),
        "FailedEntity" => schema_for!(FailedEntity),
        "BatchTimings" => schema_for!(BatchTimings),
        "ErrorCategory" => schema_for!(ErrorCategory),
        "StructuredError" => schema_for!(StructuredError),
        _ => return None,
    };

    serde_json::to_value(schema).ok()
}

/// Generate all schemas as a map from type name to schema.
pub fn generate_all_schemas() -> BTreeMap<String, Value> {
    let mut schemas = BTreeMap::new();
    for (name, _desc) in available_schemas() {
        if let Some(schema) = generate_schema(name) {
            schemas.insert(name.to_string(), schema);
        }
    }
    schemas
}
