//! Weight tables for the score calculator.
//!
//! Plain data: one base-attribute blend per axis, per-signal bonuses, combination
//! bonuses, and per-axis bonus caps. Changing any value here changes stored
//! results, so bump `FORMULA_VERSION` along with it.

use mr_common::{Axis, BaseAttributes};
use serde::{Deserialize, Serialize};

use crate::signals::Signal;

/// One of the six base attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    Hp,
    Speed,
    Attack,
    Defense,
    Magic,
    Resist,
}

impl Attribute {
    pub fn as_str(&self) -> &'static str {
        match self {
            Attribute::Hp => "hp",
            Attribute::Speed => "speed",
            Attribute::Attack => "attack",
            Attribute::Defense => "defense",
            Attribute::Magic => "magic",
            Attribute::Resist => "resist",
        }
    }

    /// Read this attribute. Callers pass sanitized attributes.
    pub fn value(&self, attrs: &BaseAttributes) -> f64 {
        match self {
            Attribute::Hp => attrs.hp,
            Attribute::Speed => attrs.speed,
            Attribute::Attack => attrs.attack,
            Attribute::Defense => attrs.defense,
            Attribute::Magic => attrs.magic,
            Attribute::Resist => attrs.resist,
        }
    }
}

impl std::fmt::Display for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Linear blend of base attributes for one axis.
pub fn base_weights(axis: Axis) -> &'static [(Attribute, f64)] {
    use Attribute::*;
    match axis {
        Axis::Offense => &[(Attack, 0.45), (Magic, 0.35), (Speed, 0.20)],
        Axis::Survivability => &[(Hp, 0.40), (Defense, 0.30), (Resist, 0.30)],
        Axis::Control => &[(Speed, 0.40), (Magic, 0.30), (Resist, 0.30)],
        Axis::Tempo => &[(Speed, 0.70), (Attack, 0.30)],
        Axis::ResourcePressure => &[(Magic, 0.40), (Speed, 0.30), (Hp, 0.30)],
    }
}

/// Upper bound on the summed signal bonus of one axis.
pub fn bonus_cap(axis: Axis) -> f64 {
    match axis {
        Axis::Offense => 40.0,
        Axis::Survivability => 45.0,
        Axis::Control => 50.0,
        Axis::Tempo => 40.0,
        Axis::ResourcePressure => 50.0,
    }
}

/// Fixed bonus a present signal adds to one axis, scaled by signal strength.
#[derive(Debug, Clone, Copy)]
pub struct SignalBonus {
    pub axis: Axis,
    pub signal: Signal,
    pub weight: f64,
}

const fn bonus(axis: Axis, signal: Signal, weight: f64) -> SignalBonus {
    SignalBonus {
        axis,
        signal,
        weight,
    }
}

pub static SIGNAL_BONUSES: &[SignalBonus] = &[
    // Offense
    bonus(Axis::Offense, Signal::Crit, 6.0),
    bonus(Axis::Offense, Signal::MultiHit, 6.0),
    bonus(Axis::Offense, Signal::Execute, 8.0),
    bonus(Axis::Offense, Signal::ArmorShred, 5.0),
    bonus(Axis::Offense, Signal::ResistShred, 5.0),
    bonus(Axis::Offense, Signal::Exposure, 5.0),
    // Survivability
    bonus(Axis::Survivability, Signal::Heal, 10.0),
    bonus(Axis::Survivability, Signal::Shield, 8.0),
    bonus(Axis::Survivability, Signal::DamageReduction, 8.0),
    bonus(Axis::Survivability, Signal::Reflect, 5.0),
    bonus(Axis::Survivability, Signal::Immunity, 7.0),
    bonus(Axis::Survivability, Signal::Cleanse, 5.0),
    bonus(Axis::Survivability, Signal::Lifesteal, 6.0),
    bonus(Axis::Survivability, Signal::StatBuff, 4.0),
    bonus(Axis::Survivability, Signal::Evasion, 5.0),
    bonus(Axis::Survivability, Signal::Regeneration, 6.0),
    bonus(Axis::Survivability, Signal::Endure, 6.0),
    // Control
    bonus(Axis::Control, Signal::HardControl, 18.0),
    bonus(Axis::Control, Signal::SkillLock, 12.0),
    bonus(Axis::Control, Signal::SpeedShred, 6.0),
    bonus(Axis::Control, Signal::AccuracyShred, 5.0),
    bonus(Axis::Control, Signal::Taunt, 6.0),
    bonus(Axis::Control, Signal::Fatigue, 4.0),
    bonus(Axis::Control, Signal::BuffStrip, 5.0),
    bonus(Axis::Control, Signal::AttackShred, 4.0),
    bonus(Axis::Control, Signal::MagicShred, 4.0),
    bonus(Axis::Control, Signal::TurnDelay, 4.0),
    // Tempo
    bonus(Axis::Tempo, Signal::Priority, 12.0),
    bonus(Axis::Tempo, Signal::ExtraTurn, 14.0),
    bonus(Axis::Tempo, Signal::SpeedShred, 5.0),
    bonus(Axis::Tempo, Signal::StatBuff, 3.0),
    bonus(Axis::Tempo, Signal::MultiHit, 3.0),
    bonus(Axis::Tempo, Signal::TurnDelay, 6.0),
    // Resource pressure
    bonus(Axis::ResourcePressure, Signal::ResourceDrain, 20.0),
    bonus(Axis::ResourcePressure, Signal::DamageOverTime, 10.0),
    bonus(Axis::ResourcePressure, Signal::HealBlock, 8.0),
    bonus(Axis::ResourcePressure, Signal::Fatigue, 8.0),
    bonus(Axis::ResourcePressure, Signal::Curse, 8.0),
    bonus(Axis::ResourcePressure, Signal::BuffStrip, 5.0),
    bonus(Axis::ResourcePressure, Signal::Exposure, 5.0),
];

/// Extra bonus when every listed signal is present. Not scaled by strength.
#[derive(Debug, Clone, Copy)]
pub struct ComboBonus {
    pub axis: Axis,
    pub label: &'static str,
    pub signals: &'static [Signal],
    pub bonus: f64,
}

pub static COMBO_BONUSES: &[ComboBonus] = &[
    ComboBonus {
        axis: Axis::Offense,
        label: "armor+resist shred",
        signals: &[Signal::ArmorShred, Signal::ResistShred],
        bonus: 4.0,
    },
    ComboBonus {
        axis: Axis::Survivability,
        label: "heal+shield",
        signals: &[Signal::Heal, Signal::Shield],
        bonus: 4.0,
    },
    ComboBonus {
        axis: Axis::Survivability,
        label: "damage reduction+immunity",
        signals: &[Signal::DamageReduction, Signal::Immunity],
        bonus: 3.0,
    },
    ComboBonus {
        axis: Axis::Control,
        label: "hard control+skill lock",
        signals: &[Signal::HardControl, Signal::SkillLock],
        bonus: 5.0,
    },
    ComboBonus {
        axis: Axis::ResourcePressure,
        label: "damage over time+heal block",
        signals: &[Signal::DamageOverTime, Signal::HealBlock],
        bonus: 5.0,
    },
];
