//! Role classifier.
//!
//! Four composite scores are computed from the percentile axes plus signal
//! indicators. Two override rules run first:
//!
//! 1. hard control present and control percentile >= 75 forces controller
//! 2. two or more of heal/shield/cleanse/immunity and survivability
//!    percentile >= 70 forces support
//!
//! Otherwise the highest composite wins, ties broken by
//! controller > support > attacker > tank.

use mr_common::{Axis, PercentileScores, Role};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::signals::{Signal, SignalMap};

/// Control percentile at or above which hard control forces controller.
pub const HARD_CONTROL_THRESHOLD: f64 = 75.0;

/// Survivability percentile at or above which sustain signals force support.
pub const SUSTAIN_THRESHOLD: f64 = 70.0;

/// Signals counted by the sustain override.
pub const SUSTAIN_SIGNALS: [Signal; 4] = [
    Signal::Heal,
    Signal::Shield,
    Signal::Cleanse,
    Signal::Immunity,
];

/// Weighted formula for one role's composite score.
#[derive(Debug, Clone, Copy)]
pub struct CompositeFormula {
    pub role: Role,
    pub axes: &'static [(Axis, f64)],
    pub signals: &'static [(Signal, f64)],
}

impl CompositeFormula {
    pub fn score(&self, percentiles: &PercentileScores, signals: &SignalMap) -> f64 {
        let axes: f64 = self
            .axes
            .iter()
            .map(|(axis, w)| w * finite(percentiles.get(*axis)))
            .sum();
        let bonus: f64 = self
            .signals
            .iter()
            .map(|(signal, w)| w * signals.indicator(*signal))
            .sum();
        axes + bonus
    }
}

pub static COMPOSITES: [CompositeFormula; 4] = [
    CompositeFormula {
        role: Role::Attacker,
        axes: &[
            (Axis::Offense, 0.55),
            (Axis::Tempo, 0.35),
            (Axis::ResourcePressure, 0.10),
            (Axis::Survivability, -0.20),
        ],
        signals: &[
            (Signal::Execute, 5.0),
            (Signal::Crit, 5.0),
            (Signal::MultiHit, 4.0),
            (Signal::Priority, 4.0),
        ],
    },
    CompositeFormula {
        role: Role::Controller,
        axes: &[
            (Axis::Control, 0.55),
            (Axis::Tempo, 0.10),
            (Axis::ResourcePressure, 0.10),
        ],
        signals: &[
            (Signal::HardControl, 15.0),
            (Signal::SkillLock, 8.0),
            (Signal::SpeedShred, 3.0),
        ],
    },
    CompositeFormula {
        role: Role::Support,
        axes: &[(Axis::Survivability, 0.45), (Axis::Control, 0.10)],
        signals: &[
            (Signal::Heal, 8.0),
            (Signal::Shield, 8.0),
            (Signal::Cleanse, 6.0),
            (Signal::StatBuff, 4.0),
            (Signal::Immunity, 4.0),
        ],
    },
    CompositeFormula {
        role: Role::Tank,
        axes: &[(Axis::Survivability, 0.65), (Axis::Offense, -0.15)],
        signals: &[
            (Signal::DamageReduction, 10.0),
            (Signal::Shield, 6.0),
            (Signal::Taunt, 6.0),
            (Signal::Reflect, 4.0),
        ],
    },
];

pub fn formula_for(role: Role) -> &'static CompositeFormula {
    match role {
        Role::Attacker => &COMPOSITES[0],
        Role::Controller => &COMPOSITES[1],
        Role::Support => &COMPOSITES[2],
        Role::Tank => &COMPOSITES[3],
    }
}

fn finite(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

/// Composite score per role.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoleComposites {
    pub attacker: f64,
    pub controller: f64,
    pub support: f64,
    pub tank: f64,
}

impl RoleComposites {
    pub fn compute(percentiles: &PercentileScores, signals: &SignalMap) -> Self {
        let score = |role| formula_for(role).score(percentiles, signals);
        Self {
            attacker: score(Role::Attacker),
            controller: score(Role::Controller),
            support: score(Role::Support),
            tank: score(Role::Tank),
        }
    }

    pub fn get(&self, role: Role) -> f64 {
        match role {
            Role::Attacker => self.attacker,
            Role::Controller => self.controller,
            Role::Support => self.support,
            Role::Tank => self.tank,
        }
    }

    /// Winner and runner-up, ties resolved by role priority.
    pub fn ranked(&self) -> [(Role, f64); 4] {
        let mut ranked = Role::PRIORITY.map(|role| (role, self.get(role)));
        // Stable sort keeps priority order among equal composites
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked
    }
}

/// Override rule that decided a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideRule {
    HardControl,
    Sustain,
}

impl OverrideRule {
    pub fn role(&self) -> Role {
        match self {
            OverrideRule::HardControl => Role::Controller,
            OverrideRule::Sustain => Role::Support,
        }
    }

    pub fn axis(&self) -> Axis {
        match self {
            OverrideRule::HardControl => Axis::Control,
            OverrideRule::Sustain => Axis::Survivability,
        }
    }

    pub fn threshold(&self) -> f64 {
        match self {
            OverrideRule::HardControl => HARD_CONTROL_THRESHOLD,
            OverrideRule::Sustain => SUSTAIN_THRESHOLD,
        }
    }

    /// Whether the rule fires for these inputs.
    pub fn applies(&self, percentiles: &PercentileScores, signals: &SignalMap) -> bool {
        let p = finite(percentiles.get(self.axis()));
        match self {
            OverrideRule::HardControl => signals.has(Signal::HardControl) && p >= self.threshold(),
            OverrideRule::Sustain => {
                SUSTAIN_SIGNALS.iter().filter(|s| signals.has(**s)).count() >= 2
                    && p >= self.threshold()
            }
        }
    }

    /// `0.5 + 0.5 * how far past the threshold the percentile sits`.
    pub fn confidence(&self, percentiles: &PercentileScores) -> f64 {
        let p = finite(percentiles.get(self.axis()));
        let t = self.threshold();
        0.5 + 0.5 * clamp_unit((p - t) / (100.0 - t))
    }
}

impl fmt::Display for OverrideRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverrideRule::HardControl => write!(f, "hard control"),
            OverrideRule::Sustain => write!(f, "sustain"),
        }
    }
}

/// Outcome of role classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleDecision {
    pub role: Role,
    pub confidence: f64,
    pub rationale: String,
    pub composites: RoleComposites,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_rule: Option<OverrideRule>,
}

/// Classify a role from percentile scores and signals. Pure and deterministic.
pub fn classify_role(percentiles: &PercentileScores, signals: &SignalMap) -> RoleDecision {
    let composites = RoleComposites::compute(percentiles, signals);

    let fired = [OverrideRule::HardControl, OverrideRule::Sustain]
        .into_iter()
        .find(|rule| rule.applies(percentiles, signals));

    if let Some(rule) = fired {
        let role = rule.role();
        let p = finite(percentiles.get(rule.axis()));
        let head = format!(
            "{} by {} override ({} p{:.0} >= {:.0})",
            role,
            rule,
            rule.axis(),
            p,
            rule.threshold()
        );
        return RoleDecision {
            role,
            confidence: rule.confidence(percentiles),
            rationale: rationale(head, role, percentiles, signals),
            composites,
            override_rule: Some(rule),
        };
    }

    let [(role, winner), (runner_up_role, runner_up), ..] = composites.ranked();
    let confidence = if winner > 0.0 {
        clamp_unit((winner - runner_up) / winner)
    } else {
        0.0
    };
    let head = format!(
        "{} over {} ({:.1} vs {:.1})",
        role, runner_up_role, winner, runner_up
    );

    RoleDecision {
        role,
        confidence,
        rationale: rationale(head, role, percentiles, signals),
        composites,
        override_rule: None,
    }
}

/// Head clause, the role's two strongest positive axes, and up to three of
/// its present signals by weight.
fn rationale(
    head: String,
    role: Role,
    percentiles: &PercentileScores,
    signals: &SignalMap,
) -> String {
    let formula = formula_for(role);

    let mut axes: Vec<(Axis, f64)> = formula
        .axes
        .iter()
        .filter(|(_, w)| *w > 0.0)
        .map(|(axis, w)| (*axis, w * finite(percentiles.get(*axis))))
        .collect();
    axes.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    let axes: Vec<String> = axes
        .iter()
        .take(2)
        .map(|(axis, _)| format!("{} p{:.0}", axis, finite(percentiles.get(*axis))))
        .collect();

    let mut cited: Vec<(Signal, f64)> = formula
        .signals
        .iter()
        .filter(|(s, _)| signals.has(*s))
        .copied()
        .collect();
    // Stable: table order breaks weight ties
    cited.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    let cited: Vec<&str> = cited.iter().take(3).map(|(s, _)| s.as_str()).collect();

    format!(
        "{}; axes: {}; signals: {}",
        head,
        axes.join(", "),
        if cited.is_empty() {
            "none".to_string()
        } else {
            cited.join(", ")
        }
    )
}
