//! Internal signal rules.
//!
//! Plain declarative data: each rule maps a clause-level regex to one signal.
//! The `regex` crate has no lookaround, so a rule may carry a second pattern
//! that must also match (`also`) and one that must not (`unless`).

use once_cell::sync::Lazy;
use regex::Regex;

use super::Signal;

/// One internal pattern → signal rule.
pub struct SignalRule {
    pub signal: Signal,
    pub pattern: Lazy<Regex>,
    pub also: Option<Lazy<Regex>>,
    pub unless: Option<Lazy<Regex>>,
}

impl SignalRule {
    /// Whether this rule fires on a single clause.
    ///
    /// The conditional guard for unconditional-only signals is applied by the
    /// caller, since catalog matches share it.
    pub fn matches(&self, clause: &str) -> bool {
        if !self.pattern.is_match(clause) {
            return false;
        }
        if let Some(also) = &self.also {
            if !also.is_match(clause) {
                return false;
            }
        }
        if let Some(unless) = &self.unless {
            if unless.is_match(clause) {
                return false;
            }
        }
        true
    }
}

// Verb and object fragments shared by several rules.
const SHRED_VERB: &str = r"\b(?:lower|reduc|decreas|cut|drop|weaken|shred|break|sap|sunder|corrod|pierc)\w*";
const OBJECT_WORDS: &str = r"(?:[\w']+ ){0,3}";
const HEAL_BLOCK: &str = r"(?i)\b(?:heal[- ]?block\w*|anti-?heal\w*|prevent\w* (?:[\w']+ ){0,3}heal\w*|cannot (?:be )?heal\w*|block\w* (?:[\w']+ ){0,2}heal\w*|(?:reduc|halv)\w* (?:[\w']+ ){0,2}heal\w*)";

fn shred(object: &str) -> Regex {
    Regex::new(&format!(r"(?i){}\s+{}{}", SHRED_VERB, OBJECT_WORDS, object)).unwrap()
}

static CONDITIONAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:if|when|whenever|unless|while|should|until|provided|as long as|in case)\b|\bonce (?:the|its?|their|a|an|all|every)\b|\bafter (?:the|its?|their|a|an|being|each)\b|\bagainst an? [\w'-]+ (?:foe|target|enemy|opponent)s?\b|\b(?:is|are|becomes?|reach(?:es)?|falls? to|drops? to) (?:zero|0|empty|depleted|exhausted)\b|\bdepleted\b",
    )
    .unwrap()
});

static NEGATED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:not|never|cannot|can't|doesn't|won't|no longer)\b").unwrap()
});

/// True when a clause states its effect conditionally ("if the target's PP is
/// depleted, ...") or denies it ("does not reduce PP").
///
/// Only unconditional-only signals consult this.
pub fn is_conditional(clause: &str) -> bool {
    CONDITIONAL.is_match(clause) || NEGATED.is_match(clause)
}

/// Split ability text into clauses on sentence punctuation and newlines.
pub fn split_clauses(text: &str) -> impl Iterator<Item = &str> {
    text.split(['.', ';', '!', '\n', '。', '；'])
        .map(str::trim)
        .filter(|c| !c.is_empty())
}

/// The fixed internal rule table.
pub static INTERNAL_RULES: [SignalRule; 34] = [
    // Survivability
    SignalRule {
        signal: Signal::Heal,
        pattern: Lazy::new(|| {
            Regex::new(r"(?i)\bheal(?:s|ing|ed)?\b|\b(?:restor|recover)\w* (?:[\w']+ ){0,2}(?:hp|health)\b").unwrap()
        }),
        also: None,
        unless: Some(Lazy::new(|| Regex::new(HEAL_BLOCK).unwrap())),
    },
    SignalRule {
        signal: Signal::Shield,
        pattern: Lazy::new(|| Regex::new(r"(?i)\b(?:shield(?:s|ed|ing)?|barriers?|wards?)\b").unwrap()),
        also: None,
        unless: None,
    },
    SignalRule {
        signal: Signal::DamageReduction,
        pattern: Lazy::new(|| {
            Regex::new(r"(?i)\bdamage reduction\b|\b(?:reduc|lessen|halv)\w* (?:the )?damage (?:taken|received)\b|\btakes? (?:less|reduced|half) damage\b|\bharden\w*").unwrap()
        }),
        also: None,
        unless: None,
    },
    SignalRule {
        signal: Signal::Reflect,
        pattern: Lazy::new(|| Regex::new(r"(?i)\b(?:reflect\w*|counter(?:s|attacks?|ing)?|thorns?)\b").unwrap()),
        also: None,
        unless: None,
    },
    SignalRule {
        signal: Signal::Immunity,
        pattern: Lazy::new(|| {
            Regex::new(r"(?i)\b(?:immun(?:e|ity)|invulnerab\w*|cannot be (?:debuffed|stunned|controlled))\b").unwrap()
        }),
        also: None,
        unless: None,
    },
    SignalRule {
        signal: Signal::Cleanse,
        pattern: Lazy::new(|| {
            Regex::new(r"(?i)\b(?:cleans\w*|purif\w*)|\b(?:remov|cur)\w* (?:[\w']+ ){0,2}(?:debuffs?|negative effects?|status (?:conditions?|ailments?))\b").unwrap()
        }),
        also: None,
        unless: None,
    },
    SignalRule {
        signal: Signal::Lifesteal,
        pattern: Lazy::new(|| {
            Regex::new(r"(?i)\blife ?steal\w*|\bvampir\w*|\b(?:drain|absorb|sap)\w* (?:[\w']+ ){0,2}(?:hp|health|life)\b").unwrap()
        }),
        also: None,
        unless: None,
    },
    SignalRule {
        signal: Signal::StatBuff,
        pattern: Lazy::new(|| {
            Regex::new(r"(?i)\b(?:rais|boost|increas|empower|sharpen)\w* (?:its |the user's |own |their |an ally's |allies' )?(?:attack|defen[cs]e|speed|magic|resist\w*|stats?)\b").unwrap()
        }),
        also: None,
        unless: None,
    },
    SignalRule {
        signal: Signal::Evasion,
        pattern: Lazy::new(|| Regex::new(r"(?i)\b(?:evasion|evasiveness|evad(?:e|es|ing)|dodg\w*)\b").unwrap()),
        also: None,
        unless: None,
    },
    SignalRule {
        signal: Signal::Regeneration,
        pattern: Lazy::new(|| {
            Regex::new(r"(?i)\bregenerat\w*|\b(?:hp|health)\b.{0,40}\b(?:each|every) turn\b").unwrap()
        }),
        also: None,
        unless: Some(Lazy::new(|| Regex::new(r"(?i)\b(?:los[et]s?|damage|poison\w*|burn\w*)\b").unwrap())),
    },
    SignalRule {
        signal: Signal::Endure,
        pattern: Lazy::new(|| {
            Regex::new(r"(?i)\bendur(?:e|es|ed)\b|\bsurviv\w* (?:with|at) 1 (?:hp|health)\b|\bcannot be knocked out\b|\bundying\b").unwrap()
        }),
        also: None,
        unless: None,
    },
    // Suppression
    SignalRule {
        signal: Signal::ArmorShred,
        pattern: Lazy::new(|| shred(r"(?:physical )?(?:defen[cs]e|armou?r)\b")),
        also: None,
        unless: Some(Lazy::new(|| Regex::new(r"(?i)\bmagic(?:al)? defen[cs]e\b").unwrap())),
    },
    SignalRule {
        signal: Signal::ArmorShred,
        pattern: Lazy::new(|| Regex::new(r"(?i)\bignor\w* (?:[\w']+ ){0,2}(?:defen[cs]e|armou?r)\b").unwrap()),
        also: None,
        unless: None,
    },
    SignalRule {
        signal: Signal::ResistShred,
        pattern: Lazy::new(|| shred(r"(?:resist\w*|magic(?:al)? defen[cs]e|sp\. ?def)\b")),
        also: None,
        unless: None,
    },
    SignalRule {
        signal: Signal::AttackShred,
        pattern: Lazy::new(|| shred(r"(?:physical )?attack\b")),
        also: None,
        unless: Some(Lazy::new(|| Regex::new(r"(?i)\b(?:special|magic) attack\b").unwrap())),
    },
    SignalRule {
        signal: Signal::MagicShred,
        pattern: Lazy::new(|| shred(r"(?:magic|special attack|sp\. ?atk)\b")),
        also: None,
        unless: Some(Lazy::new(|| Regex::new(r"(?i)\bmagic(?:al)? defen[cs]e\b").unwrap())),
    },
    SignalRule {
        signal: Signal::SkillLock,
        pattern: Lazy::new(|| {
            Regex::new(r"(?i)\b(?:silenc\w*|seal(?:s|ed|ing)?|disabl\w*)\b|\block\w* (?:[\w']+ ){0,2}(?:skills?|moves?|abilities)\b").unwrap()
        }),
        also: None,
        unless: None,
    },
    SignalRule {
        signal: Signal::HardControl,
        pattern: Lazy::new(|| {
            Regex::new(r"(?i)\b(?:stun(?:s|ned|ning)?|freez\w*|froze(?:n)?|petrif\w*|paralyz\w*|paralys\w*|sleep|asleep|flinch\w*|knocks? down|roots?|rooted)\b").unwrap()
        }),
        also: None,
        unless: Some(Lazy::new(|| Regex::new(r"(?i)\bimmun\w*|\bcannot be (?:stunned|controlled)\b").unwrap())),
    },
    SignalRule {
        signal: Signal::SpeedShred,
        pattern: Lazy::new(|| {
            Regex::new(&format!(r"(?i)\bslow(?:s|ed|ing)?\b|{}\s+{}speed\b", SHRED_VERB, OBJECT_WORDS)).unwrap()
        }),
        also: None,
        unless: None,
    },
    SignalRule {
        signal: Signal::AccuracyShred,
        pattern: Lazy::new(|| {
            Regex::new(&format!(r"(?i)\bblind(?:s|ed|ing)?\b|{}\s+{}accuracy\b", SHRED_VERB, OBJECT_WORDS)).unwrap()
        }),
        also: None,
        unless: None,
    },
    SignalRule {
        signal: Signal::Taunt,
        pattern: Lazy::new(|| {
            Regex::new(r"(?i)\b(?:taunt\w*|provok\w*)|\bdraws? (?:[\w']+ ){0,2}(?:attacks|fire|aggro)\b").unwrap()
        }),
        also: None,
        unless: None,
    },
    // Resource / unconventional
    SignalRule {
        signal: Signal::ResourceDrain,
        pattern: Lazy::new(|| {
            Regex::new(r"(?i)\b(?:reduc|lower|drain|decreas|cut|sap|deplet|remov)\w* (?:[\w']+ ){0,4}(?:pp|power points?|move uses|usable moves?|move count|energy|mana|resources?)\b").unwrap()
        }),
        also: Some(Lazy::new(|| {
            Regex::new(r"(?i)\b(?:opponent|foe|enemy|enemies|target|opposing)").unwrap()
        })),
        unless: None,
    },
    SignalRule {
        signal: Signal::DamageOverTime,
        pattern: Lazy::new(|| {
            Regex::new(r"(?i)\b(?:poison\w*|burn(?:s|ed|ing)?|bleed\w*|toxic|venom\w*|blight\w*)\b|\bdamage over time\b").unwrap()
        }),
        also: None,
        unless: None,
    },
    SignalRule {
        signal: Signal::HealBlock,
        pattern: Lazy::new(|| Regex::new(HEAL_BLOCK).unwrap()),
        also: None,
        unless: None,
    },
    SignalRule {
        signal: Signal::Fatigue,
        pattern: Lazy::new(|| Regex::new(r"(?i)\b(?:fatigu\w*|exhaust\w*|drows\w*|tire[sd]?)\b").unwrap()),
        also: None,
        unless: None,
    },
    SignalRule {
        signal: Signal::Exposure,
        pattern: Lazy::new(|| {
            Regex::new(r"(?i)\b(?:expos(?:e|es|ed|ure)|vulnerab\w*)\b|\btakes? (?:increased|more|extra|double) damage\b").unwrap()
        }),
        also: None,
        unless: None,
    },
    SignalRule {
        signal: Signal::BuffStrip,
        pattern: Lazy::new(|| {
            Regex::new(r"(?i)\bdispel\w*|\b(?:strip|steal|remov|eras)\w* (?:[\w']+ ){0,3}(?:buffs?|boosts?|stat changes?|positive effects?)\b").unwrap()
        }),
        also: None,
        unless: None,
    },
    SignalRule {
        signal: Signal::Curse,
        pattern: Lazy::new(|| Regex::new(r"(?i)\b(?:curse[sd]?|hex(?:es|ed)?|doom(?:ed)?|perish)\b").unwrap()),
        also: None,
        unless: None,
    },
    SignalRule {
        signal: Signal::Execute,
        pattern: Lazy::new(|| {
            Regex::new(r"(?i)\bexecut\w*|\bfinish(?:es)? off\b|\bbelow \d+% (?:hp|health)\b|\b(?:one-hit ko|ohko)\b|\binstantly (?:defeats?|kos?|knocks? out)\b").unwrap()
        }),
        also: None,
        unless: None,
    },
    SignalRule {
        signal: Signal::TurnDelay,
        pattern: Lazy::new(|| {
            Regex::new(r"(?i)\bdelay(?:s|ed|ing)?\b|\bpush(?:es)? back\b|\bturn meter\b").unwrap()
        }),
        also: Some(Lazy::new(|| {
            Regex::new(r"(?i)\b(?:opponent|foe|enemy|enemies|target|opposing|turn)").unwrap()
        })),
        unless: None,
    },
    // Offense / tempo
    SignalRule {
        signal: Signal::Crit,
        pattern: Lazy::new(|| Regex::new(r"(?i)\bcrit(?:ical|s)?\b").unwrap()),
        also: None,
        unless: None,
    },
    SignalRule {
        signal: Signal::MultiHit,
        pattern: Lazy::new(|| {
            Regex::new(r"(?i)\bhits? (?:\d+|two|three|four|five|multiple) times\b|\bmulti-?hit\b|\b\d+-\d+ times\b|\b(?:twice|thrice)\b").unwrap()
        }),
        also: None,
        unless: None,
    },
    SignalRule {
        signal: Signal::Priority,
        pattern: Lazy::new(|| {
            Regex::new(r"(?i)\bpriority\b|\b(?:moves?|goes|go|strikes?|acts?|attacks?) first\b").unwrap()
        }),
        also: None,
        unless: None,
    },
    SignalRule {
        signal: Signal::ExtraTurn,
        pattern: Lazy::new(|| {
            Regex::new(r"(?i)\b(?:extra|another|additional) turn\b|\b(?:acts?|moves?) again\b").unwrap()
        }),
        also: None,
        unless: None,
    },
];

/// Signals the internal rules detect in `text`, guard applied.
pub fn internal_signals(text: &str) -> Vec<Signal> {
    let mut found = Vec::new();
    for clause in split_clauses(text) {
        let conditional = is_conditional(clause);
        for rule in &INTERNAL_RULES {
            if rule.signal.is_unconditional_only() && conditional {
                continue;
            }
            if rule.matches(clause) && !found.contains(&rule.signal) {
                found.push(rule.signal);
            }
        }
    }
    found
}
