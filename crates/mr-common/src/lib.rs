//! Monster Rank common types, IDs, and errors.
//!
//! This crate provides the foundational types shared by the engine crates:
//! - Entity identity and job identity
//! - Entities, abilities, base attributes, and category-coded tags
//! - Derived records (raw scores, role, confidence, input snapshot)
//! - The unified error taxonomy with stable codes

pub mod derived;
pub mod entity;
pub mod error;
pub mod id;

pub use derived::{
    Axis, AxisScores, DerivedRecord, InputSnapshot, PercentileScores, RawScores, Role,
    FORMULA_VERSION, MAX_RAW_SCORE,
};
pub use entity::{Ability, BaseAttributes, Entity, TagCategory, TagSet};
pub use error::{Error, ErrorCategory, Result, StructuredError};
pub use id::{EntityId, JobId};
