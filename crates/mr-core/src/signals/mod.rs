//! Capability signal extraction.
//!
//! A signal is a named combat capability (healing, armor shred, priority, ...)
//! detected in an entity's ability text or implied by one of its tags. Two
//! sources feed the map:
//!
//! - the fixed internal rule table in [`rules`], independent of any catalog
//! - the patterns of the active tag catalog snapshot
//!
//! Matching runs per ability and per clause. A signal's strength is the number
//! of distinct abilities that trigger it, capped at [`MAX_STRENGTH`]. Tags
//! already on the entity raise each linked signal to at least strength 1 but
//! never add to a text-derived strength.

pub mod rules;

use mr_common::Entity;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::catalog::CatalogSnapshot;

pub use rules::{internal_signals, is_conditional, split_clauses, SignalRule, INTERNAL_RULES};

/// Strength cap for a single signal.
pub const MAX_STRENGTH: u8 = 3;

/// Conceptual grouping of signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalGroup {
    Survivability,
    Suppression,
    Resource,
    Tempo,
}

/// Every capability signal the engine knows about.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    // Survivability
    Heal,
    Shield,
    DamageReduction,
    Reflect,
    Immunity,
    Cleanse,
    Lifesteal,
    StatBuff,
    Evasion,
    Regeneration,
    Endure,

    // Suppression
    ArmorShred,
    ResistShred,
    AttackShred,
    MagicShred,
    SkillLock,
    HardControl,
    SpeedShred,
    AccuracyShred,
    Taunt,

    // Resource / unconventional
    ResourceDrain,
    DamageOverTime,
    HealBlock,
    Fatigue,
    Exposure,
    BuffStrip,
    Curse,
    Execute,
    TurnDelay,

    // Offense / tempo
    Crit,
    MultiHit,
    Priority,
    ExtraTurn,
}

impl Signal {
    pub const ALL: [Signal; 33] = [
        Signal::Heal,
        Signal::Shield,
        Signal::DamageReduction,
        Signal::Reflect,
        Signal::Immunity,
        Signal::Cleanse,
        Signal::Lifesteal,
        Signal::StatBuff,
        Signal::Evasion,
        Signal::Regeneration,
        Signal::Endure,
        Signal::ArmorShred,
        Signal::ResistShred,
        Signal::AttackShred,
        Signal::MagicShred,
        Signal::SkillLock,
        Signal::HardControl,
        Signal::SpeedShred,
        Signal::AccuracyShred,
        Signal::Taunt,
        Signal::ResourceDrain,
        Signal::DamageOverTime,
        Signal::HealBlock,
        Signal::Fatigue,
        Signal::Exposure,
        Signal::BuffStrip,
        Signal::Curse,
        Signal::Execute,
        Signal::TurnDelay,
        Signal::Crit,
        Signal::MultiHit,
        Signal::Priority,
        Signal::ExtraTurn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Heal => "heal",
            Signal::Shield => "shield",
            Signal::DamageReduction => "damage_reduction",
            Signal::Reflect => "reflect",
            Signal::Immunity => "immunity",
            Signal::Cleanse => "cleanse",
            Signal::Lifesteal => "lifesteal",
            Signal::StatBuff => "stat_buff",
            Signal::Evasion => "evasion",
            Signal::Regeneration => "regeneration",
            Signal::Endure => "endure",
            Signal::ArmorShred => "armor_shred",
            Signal::ResistShred => "resist_shred",
            Signal::AttackShred => "attack_shred",
            Signal::MagicShred => "magic_shred",
            Signal::SkillLock => "skill_lock",
            Signal::HardControl => "hard_control",
            Signal::SpeedShred => "speed_shred",
            Signal::AccuracyShred => "accuracy_shred",
            Signal::Taunt => "taunt",
            Signal::ResourceDrain => "resource_drain",
            Signal::DamageOverTime => "damage_over_time",
            Signal::HealBlock => "heal_block",
            Signal::Fatigue => "fatigue",
            Signal::Exposure => "exposure",
            Signal::BuffStrip => "buff_strip",
            Signal::Curse => "curse",
            Signal::Execute => "execute",
            Signal::TurnDelay => "turn_delay",
            Signal::Crit => "crit",
            Signal::MultiHit => "multi_hit",
            Signal::Priority => "priority",
            Signal::ExtraTurn => "extra_turn",
        }
    }

    pub fn group(&self) -> SignalGroup {
        use Signal::*;
        match self {
            Heal | Shield | DamageReduction | Reflect | Immunity | Cleanse | Lifesteal
            | StatBuff | Evasion | Regeneration | Endure => SignalGroup::Survivability,
            ArmorShred | ResistShred | AttackShred | MagicShred | SkillLock | HardControl
            | SpeedShred | AccuracyShred | Taunt => SignalGroup::Suppression,
            ResourceDrain | DamageOverTime | HealBlock | Fatigue | Exposure | BuffStrip
            | Curse | Execute | TurnDelay => SignalGroup::Resource,
            Crit | MultiHit | Priority | ExtraTurn => SignalGroup::Tempo,
        }
    }

    /// Signals that may only be produced by clauses stating the effect
    /// unconditionally. Applies to internal rules, catalog pattern matches,
    /// and catalog-based tag suggestions alike.
    pub fn is_unconditional_only(&self) -> bool {
        matches!(self, Signal::ResourceDrain)
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Signal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Signal::ALL
            .into_iter()
            .find(|sig| sig.as_str() == s)
            .ok_or_else(|| format!("unknown signal: {}", s))
    }
}

/// Signal strengths for one entity. Absent signals have strength 0.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignalMap {
    strengths: BTreeMap<Signal, u8>,
}

impl SignalMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strength(&self, signal: Signal) -> u8 {
        self.strengths.get(&signal).copied().unwrap_or(0)
    }

    pub fn has(&self, signal: Signal) -> bool {
        self.strength(signal) > 0
    }

    /// 1.0 for present signals (0/1 indicator).
    pub fn indicator(&self, signal: Signal) -> f64 {
        if self.has(signal) {
            1.0
        } else {
            0.0
        }
    }

    /// Bonus multiplier: 0 when absent, `1 + 0.5 * (strength - 1)` otherwise.
    pub fn factor(&self, signal: Signal) -> f64 {
        match self.strength(signal) {
            0 => 0.0,
            s => 1.0 + 0.5 * f64::from(s - 1),
        }
    }

    /// Add one hit, saturating at [`MAX_STRENGTH`].
    pub fn add_hit(&mut self, signal: Signal) {
        let entry = self.strengths.entry(signal).or_insert(0);
        *entry = (*entry + 1).min(MAX_STRENGTH);
    }

    /// Raise to at least `strength` (never lowers).
    pub fn raise_to(&mut self, signal: Signal, strength: u8) {
        let strength = strength.min(MAX_STRENGTH);
        if strength == 0 {
            return;
        }
        let entry = self.strengths.entry(signal).or_insert(0);
        *entry = (*entry).max(strength);
    }

    pub fn len(&self) -> usize {
        self.strengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strengths.is_empty()
    }

    /// Present signals with their strengths, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (Signal, u8)> + '_ {
        self.strengths.iter().map(|(s, v)| (*s, *v))
    }

    /// Name → strength map for the persisted input snapshot.
    pub fn to_snapshot(&self) -> BTreeMap<String, f64> {
        self.strengths
            .iter()
            .map(|(s, v)| (s.as_str().to_string(), f64::from(*v)))
            .collect()
    }
}

impl FromIterator<(Signal, u8)> for SignalMap {
    fn from_iter<I: IntoIterator<Item = (Signal, u8)>>(iter: I) -> Self {
        let mut map = SignalMap::new();
        for (signal, strength) in iter {
            map.raise_to(signal, strength);
        }
        map
    }
}

/// Result of one extraction pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub signals: SignalMap,
    /// Catalog codes whose patterns matched at least one ability clause.
    pub matched_tags: BTreeSet<String>,
}

/// Signals detected in a single piece of ability text.
pub fn signals_in_text(text: &str, catalog: &CatalogSnapshot) -> BTreeSet<Signal> {
    let mut hits: BTreeSet<Signal> = internal_signals(text).into_iter().collect();
    for clause in split_clauses(text) {
        for tag in catalog.tags_matching_clause(clause) {
            hits.extend(tag.definition().signals.iter().copied());
        }
    }
    hits
}

/// Extract the signal map for an entity against a catalog snapshot.
///
/// Never fails: an entity with no abilities and no tags yields an empty map.
pub fn extract_signals(entity: &Entity, catalog: &CatalogSnapshot) -> Extraction {
    let mut extraction = Extraction::default();

    for text in entity.ability_texts() {
        for signal in signals_in_text(&text, catalog) {
            extraction.signals.add_hit(signal);
        }
        extraction.matched_tags.extend(catalog.codes_matching(&text));
    }

    for tag in &entity.tags {
        if let Some(entry) = catalog.get(tag) {
            for signal in &entry.definition().signals {
                extraction.signals.raise_to(*signal, 1);
            }
        }
    }

    tracing::trace!(
        entity_id = %entity.id,
        signals = extraction.signals.len(),
        matched_tags = extraction.matched_tags.len(),
        "signals extracted"
    );

    extraction
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{builtin_snapshot, entity_with_abilities};

    #[test]
    fn test_signal_names_roundtrip() {
        for signal in Signal::ALL {
            assert_eq!(signal.as_str().parse::<Signal>().unwrap(), signal);
            let json = serde_json::to_string(&signal).unwrap();
            assert_eq!(json, format!("\"{}\"", signal.as_str()));
        }
        assert!("mind_control".parse::<Signal>().is_err());
    }

    #[test]
    fn test_group_sizes() {
        let count = |g: SignalGroup| Signal::ALL.iter().filter(|s| s.group() == g).count();
        assert_eq!(count(SignalGroup::Survivability), 11);
        assert_eq!(count(SignalGroup::Suppression), 9);
        assert_eq!(count(SignalGroup::Resource), 9);
        assert_eq!(count(SignalGroup::Tempo), 4);
    }

    #[test]
    fn test_strength_saturates() {
        let mut map = SignalMap::new();
        for _ in 0..5 {
            map.add_hit(Signal::Heal);
        }
        assert_eq!(map.strength(Signal::Heal), MAX_STRENGTH);
        assert_eq!(map.factor(Signal::Heal), 2.0);
        assert_eq!(map.factor(Signal::Shield), 0.0);
    }

    #[test]
    fn test_raise_never_lowers() {
        let mut map = SignalMap::new();
        map.add_hit(Signal::Crit);
        map.add_hit(Signal::Crit);
        map.raise_to(Signal::Crit, 1);
        assert_eq!(map.strength(Signal::Crit), 2);
        map.raise_to(Signal::Taunt, 0);
        assert!(!map.has(Signal::Taunt));
    }

    #[test]
    fn test_empty_entity_yields_empty_map() {
        let catalog = builtin_snapshot();
        let entity = mr_common::Entity::new(1, "Blank");
        let extraction = extract_signals(&entity, &catalog);
        assert!(extraction.signals.is_empty());
        assert!(extraction.matched_tags.is_empty());
    }

    #[test]
    fn test_strength_counts_abilities_not_clauses() {
        let catalog = builtin_snapshot();
        let entity = entity_with_abilities(
            2,
            "Mender",
            &[
                "Heals an ally. Then heals itself.",
                "Heals all allies slightly.",
            ],
        );
        let extraction = extract_signals(&entity, &catalog);
        assert_eq!(extraction.signals.strength(Signal::Heal), 2);
    }

    #[test]
    fn test_existing_tag_contributes_at_least_one() {
        let catalog = builtin_snapshot();
        let tagged = mr_common::Entity::new(3, "Bulwark").with_tag("buff_shield");
        let extraction = extract_signals(&tagged, &catalog);
        assert_eq!(extraction.signals.strength(Signal::Shield), 1);

        let both = entity_with_abilities(3, "Bulwark", &["Raises a shield.", "Summons a barrier."])
            .with_tag("buff_shield");
        let extraction = extract_signals(&both, &catalog);
        assert_eq!(extraction.signals.strength(Signal::Shield), 2);
    }

    #[test]
    fn test_unknown_and_invalid_tags_tolerated() {
        let catalog = builtin_snapshot();
        let entity = mr_common::Entity::new(4, "Oddity")
            .with_tag("legacy tag")
            .with_tag("buff_unheard_of");
        let extraction = extract_signals(&entity, &catalog);
        assert!(extraction.signals.is_empty());
    }

    #[test]
    fn test_snapshot_uses_names() {
        let map: SignalMap = [(Signal::HardControl, 2), (Signal::Crit, 1)]
            .into_iter()
            .collect();
        let snapshot = map.to_snapshot();
        assert_eq!(snapshot.get("hard_control"), Some(&2.0));
        assert_eq!(snapshot.get("crit"), Some(&1.0));
    }
}
