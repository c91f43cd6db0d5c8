//! Derived records: the five battle-capability scores, the classified role,
//! and the input snapshot that produced them.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::entity::{BaseAttributes, Entity};
use crate::id::EntityId;

/// Version tag of the scoring and classification formulas.
///
/// Bump whenever a weight table, rule, or role formula changes so stored
/// records computed under an older formula read as stale.
pub const FORMULA_VERSION: &str = "scores-v1";

/// Upper bound of every raw score.
pub const MAX_RAW_SCORE: u8 = 120;

/// One of the five derived battle-capability axes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Offense,
    Survivability,
    Control,
    Tempo,
    ResourcePressure,
}

impl Axis {
    pub const ALL: [Axis; 5] = [
        Axis::Offense,
        Axis::Survivability,
        Axis::Control,
        Axis::Tempo,
        Axis::ResourcePressure,
    ];

    /// Position in `Axis::ALL`.
    pub fn index(&self) -> usize {
        match self {
            Axis::Offense => 0,
            Axis::Survivability => 1,
            Axis::Control => 2,
            Axis::Tempo => 3,
            Axis::ResourcePressure => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Axis::Offense => "offense",
            Axis::Survivability => "survivability",
            Axis::Control => "control",
            Axis::Tempo => "tempo",
            Axis::ResourcePressure => "resource_pressure",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One value per axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AxisScores<T> {
    pub offense: T,
    pub survivability: T,
    pub control: T,
    pub tempo: T,
    pub resource_pressure: T,
}

impl<T: Copy> AxisScores<T> {
    /// Same value on every axis.
    pub fn splat(value: T) -> Self {
        Self {
            offense: value,
            survivability: value,
            control: value,
            tempo: value,
            resource_pressure: value,
        }
    }

    pub fn get(&self, axis: Axis) -> T {
        match axis {
            Axis::Offense => self.offense,
            Axis::Survivability => self.survivability,
            Axis::Control => self.control,
            Axis::Tempo => self.tempo,
            Axis::ResourcePressure => self.resource_pressure,
        }
    }

    pub fn set(&mut self, axis: Axis, value: T) {
        match axis {
            Axis::Offense => self.offense = value,
            Axis::Survivability => self.survivability = value,
            Axis::Control => self.control = value,
            Axis::Tempo => self.tempo = value,
            Axis::ResourcePressure => self.resource_pressure = value,
        }
    }

    /// Build from a per-axis function.
    pub fn from_fn(mut f: impl FnMut(Axis) -> T) -> Self {
        Self {
            offense: f(Axis::Offense),
            survivability: f(Axis::Survivability),
            control: f(Axis::Control),
            tempo: f(Axis::Tempo),
            resource_pressure: f(Axis::ResourcePressure),
        }
    }

    pub fn map<U: Copy>(&self, mut f: impl FnMut(Axis, T) -> U) -> AxisScores<U> {
        AxisScores::from_fn(|axis| f(axis, self.get(axis)))
    }

    /// `(axis, value)` pairs in axis order.
    pub fn iter(&self) -> impl Iterator<Item = (Axis, T)> + '_ {
        Axis::ALL.into_iter().map(move |axis| (axis, self.get(axis)))
    }
}

/// Raw scores on the 0..=120 integer scale.
pub type RawScores = AxisScores<u8>;

/// Corpus-relative percentiles on the 0..=100 scale.
pub type PercentileScores = AxisScores<f64>;

/// Functional role of an entity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Attacker,
    Controller,
    Support,
    Tank,
}

impl Role {
    /// Tie-break order: earlier wins when composites are equal.
    pub const PRIORITY: [Role; 4] = [Role::Controller, Role::Support, Role::Attacker, Role::Tank];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Attacker => "attacker",
            Role::Controller => "controller",
            Role::Support => "support",
            Role::Tank => "tank",
        }
    }

    /// Position in the tie-break order (0 is highest priority).
    pub fn priority_rank(&self) -> usize {
        match self {
            Role::Controller => 0,
            Role::Support => 1,
            Role::Attacker => 2,
            Role::Tank => 3,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Snapshot of the inputs a derived record was computed from, kept for audit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct InputSnapshot {
    /// SHA-256 over attributes and abilities at compute time.
    pub fingerprint: String,
    /// Sanitized base attributes used by the score calculator.
    pub attributes: BaseAttributes,
    /// Signal name to strength.
    #[serde(default)]
    pub signals: BTreeMap<String, f64>,
    /// Catalog tag codes whose patterns matched the ability text.
    #[serde(default)]
    pub matched_tags: Vec<String>,
    /// Content hash of the tag catalog snapshot in use.
    pub catalog_version: String,
    /// Number of entities in the percentile sample, self included.
    pub corpus_size: usize,
}

/// Derived scores and role for one entity. Always replaced as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DerivedRecord {
    pub entity_id: EntityId,
    pub scores: RawScores,
    pub percentiles: PercentileScores,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    pub inputs: InputSnapshot,
    pub formula_version: String,
    pub updated_at: DateTime<Utc>,
}

impl DerivedRecord {
    /// True when the entity's scoring inputs, the formulas or the active tag
    /// catalog changed since this record was computed.
    pub fn is_stale_for(&self, entity: &Entity, catalog_version: &str) -> bool {
        self.entity_id != entity.id
            || self.formula_version != FORMULA_VERSION
            || self.inputs.catalog_version != catalog_version
            || self.inputs.fingerprint != entity.input_fingerprint()
    }

    /// Equality on everything except the update timestamp.
    pub fn same_outcome(&self, other: &DerivedRecord) -> bool {
        self.entity_id == other.entity_id
            && self.scores == other.scores
            && self.percentiles == other.percentiles
            && self.role == other.role
            && self.confidence == other.confidence
            && self.rationale == other.rationale
            && self.inputs == other.inputs
            && self.formula_version == other.formula_version
    }
}
