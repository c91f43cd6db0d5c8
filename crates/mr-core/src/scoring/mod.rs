//! Score calculator: base attributes plus signal bonuses on five axes.
//!
//! Each axis is a linear blend of two or three base attributes plus a capped
//! signal bonus. The uncapped float is clipped to [0, 120] and rounded half
//! away from zero (`f64::round`); non-finite values become 0.

pub mod weights;

use mr_common::{Axis, AxisScores, BaseAttributes, Entity, RawScores, MAX_RAW_SCORE};
use serde::{Deserialize, Serialize};

use crate::signals::SignalMap;

pub use weights::{
    base_weights, bonus_cap, Attribute, ComboBonus, SignalBonus, COMBO_BONUSES, SIGNAL_BONUSES,
};

/// Clip to [0, 120] and round to the nearest integer, halves away from zero.
pub fn round_score(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.clamp(0.0, f64::from(MAX_RAW_SCORE)).round() as u8
}

/// One additive term of an axis score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub source: String,
    pub amount: f64,
}

/// How one axis score was assembled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisBreakdown {
    pub axis: Axis,
    pub base: f64,
    /// Signal and combination bonus before the cap.
    pub bonus: f64,
    pub bonus_capped: bool,
    pub raw: f64,
    pub score: u8,
    pub contributions: Vec<Contribution>,
}

/// Full breakdown of a score computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub axes: Vec<AxisBreakdown>,
}

impl ScoreBreakdown {
    pub fn scores(&self) -> RawScores {
        let mut scores = RawScores::splat(0);
        for axis in &self.axes {
            scores.set(axis.axis, axis.score);
        }
        scores
    }

    pub fn axis(&self, axis: Axis) -> Option<&AxisBreakdown> {
        self.axes.iter().find(|a| a.axis == axis)
    }
}

fn base_value(axis: Axis, attrs: &BaseAttributes) -> f64 {
    base_weights(axis)
        .iter()
        .map(|(attr, weight)| weight * attr.value(attrs))
        .sum()
}

fn signal_bonus(axis: Axis, signals: &SignalMap) -> f64 {
    let single: f64 = SIGNAL_BONUSES
        .iter()
        .filter(|b| b.axis == axis)
        .map(|b| b.weight * signals.factor(b.signal))
        .sum();
    let combos: f64 = COMBO_BONUSES
        .iter()
        .filter(|c| c.axis == axis && c.signals.iter().all(|s| signals.has(*s)))
        .map(|c| c.bonus)
        .sum();
    single + combos
}

fn axis_value(axis: Axis, attrs: &BaseAttributes, signals: &SignalMap) -> f64 {
    base_value(axis, attrs) + signal_bonus(axis, signals).min(bonus_cap(axis))
}

/// Compute the five raw scores. Pure and deterministic.
///
/// Missing or invalid attributes count as 0, so an empty entity with no
/// signals scores 0 on every axis.
pub fn compute_scores(entity: &Entity, signals: &SignalMap) -> RawScores {
    let attrs = entity.attributes.sanitized();
    AxisScores::from_fn(|axis| round_score(axis_value(axis, &attrs, signals)))
}

/// Same computation as [`compute_scores`], itemized per axis.
pub fn explain_scores(entity: &Entity, signals: &SignalMap) -> ScoreBreakdown {
    let attrs = entity.attributes.sanitized();
    let axes = Axis::ALL
        .into_iter()
        .map(|axis| {
            let mut contributions: Vec<Contribution> = base_weights(axis)
                .iter()
                .map(|(attr, weight)| Contribution {
                    source: attr.to_string(),
                    amount: weight * attr.value(&attrs),
                })
                .collect();
            contributions.extend(
                SIGNAL_BONUSES
                    .iter()
                    .filter(|b| b.axis == axis && signals.has(b.signal))
                    .map(|b| Contribution {
                        source: b.signal.to_string(),
                        amount: b.weight * signals.factor(b.signal),
                    }),
            );
            contributions.extend(
                COMBO_BONUSES
                    .iter()
                    .filter(|c| c.axis == axis && c.signals.iter().all(|s| signals.has(*s)))
                    .map(|c| Contribution {
                        source: c.label.to_string(),
                        amount: c.bonus,
                    }),
            );

            let base = base_value(axis, &attrs);
            let bonus = signal_bonus(axis, signals);
            let raw = axis_value(axis, &attrs, signals);
            AxisBreakdown {
                axis,
                base,
                bonus,
                bonus_capped: bonus > bonus_cap(axis),
                raw,
                score: round_score(raw),
                contributions,
            }
        })
        .collect();
    ScoreBreakdown { axes }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::Signal;
    use crate::test_utils::fixture_entity;
    use proptest::prelude::*;

    #[test]
    fn test_regression_fixture_base_only() {
        let scores = compute_scores(&fixture_entity(), &SignalMap::new());
        assert_eq!(scores.offense, 60);
        assert_eq!(scores.survivability, 76);
        assert_eq!(scores.control, 50);
        assert_eq!(scores.tempo, 59);
        assert_eq!(scores.resource_pressure, 61);
    }

    #[test]
    fn test_round_half_away_from_zero() {
        assert_eq!(round_score(0.5), 1);
        assert_eq!(round_score(2.5), 3);
        assert_eq!(round_score(2.49), 2);
        assert_eq!(round_score(-3.0), 0);
        assert_eq!(round_score(500.0), 120);
        assert_eq!(round_score(f64::NAN), 0);
        assert_eq!(round_score(f64::INFINITY), 120);
    }

    #[test]
    fn test_empty_entity_scores_zero() {
        let entity = Entity::new(1, "Husk");
        assert_eq!(compute_scores(&entity, &SignalMap::new()), RawScores::splat(0));
    }

    #[test]
    fn test_invalid_attributes_count_as_zero() {
        let entity = Entity::new(1, "Glitch").with_attributes(BaseAttributes::new(
            f64::NAN,
            -40.0,
            f64::INFINITY,
            0.0,
            0.0,
            0.0,
        ));
        assert_eq!(compute_scores(&entity, &SignalMap::new()), RawScores::splat(0));
    }

    #[test]
    fn test_combo_bonus_beyond_sum() {
        let entity = Entity::new(1, "Corroder");
        let armor: SignalMap = [(Signal::ArmorShred, 1)].into_iter().collect();
        let resist: SignalMap = [(Signal::ResistShred, 1)].into_iter().collect();
        let both: SignalMap = [(Signal::ArmorShred, 1), (Signal::ResistShred, 1)]
            .into_iter()
            .collect();
        let a = compute_scores(&entity, &armor).offense;
        let r = compute_scores(&entity, &resist).offense;
        let b = compute_scores(&entity, &both).offense;
        assert_eq!((a, r), (5, 5));
        assert_eq!(b, 14);
    }

    #[test]
    fn test_strength_scales_bonus() {
        let entity = Entity::new(1, "Stormcaller");
        let once: SignalMap = [(Signal::HardControl, 1)].into_iter().collect();
        let thrice: SignalMap = [(Signal::HardControl, 3)].into_iter().collect();
        assert_eq!(compute_scores(&entity, &once).control, 18);
        assert_eq!(compute_scores(&entity, &thrice).control, 36);
    }

    #[test]
    fn test_bonus_cap_applies() {
        let entity = Entity::new(1, "Warden");
        let everything: SignalMap = Signal::ALL.into_iter().map(|s| (s, 3)).collect();
        let breakdown = explain_scores(&entity, &everything);
        for axis in &breakdown.axes {
            assert!(axis.bonus_capped, "{} should hit its cap", axis.axis);
            assert_eq!(f64::from(axis.score), bonus_cap(axis.axis));
        }
    }

    #[test]
    fn test_explain_matches_compute() {
        let entity = fixture_entity();
        let signals: SignalMap = [(Signal::Heal, 2), (Signal::Shield, 1), (Signal::Priority, 1)]
            .into_iter()
            .collect();
        let breakdown = explain_scores(&entity, &signals);
        assert_eq!(breakdown.scores(), compute_scores(&entity, &signals));
        let surv = breakdown.axis(Axis::Survivability).unwrap();
        assert!(surv.contributions.iter().any(|c| c.source == "heal+shield"));
        // hp 40 + def 18 + res 18, heal 15 + shield 8 + combo 4
        assert_eq!(surv.score, 103);
    }

    proptest! {
        #[test]
        fn prop_scores_bounded_and_deterministic(
            hp in -50.0f64..400.0,
            speed in -50.0f64..400.0,
            attack in -50.0f64..400.0,
            defense in -50.0f64..400.0,
            magic in -50.0f64..400.0,
            resist in -50.0f64..400.0,
            picks in proptest::collection::vec((0usize..Signal::ALL.len(), 1u8..=3), 0..12),
        ) {
            let entity = Entity::new(7, "Prop")
                .with_attributes(BaseAttributes::new(hp, speed, attack, defense, magic, resist));
            let signals: SignalMap = picks.into_iter().map(|(i, s)| (Signal::ALL[i], s)).collect();
            let first = compute_scores(&entity, &signals);
            let second = compute_scores(&entity, &signals);
            prop_assert_eq!(first, second);
            for (_, v) in first.iter() {
                prop_assert!(v <= MAX_RAW_SCORE);
            }
        }
    }
}
