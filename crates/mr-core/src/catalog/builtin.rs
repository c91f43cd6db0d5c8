//! Built-in tag catalog, used when no catalog file is configured.

/// Default catalog in the on-disk TOML format.
pub const BUILTIN_CATALOG_TOML: &str = r#"
schema_version = 1
description = "Built-in Monster Rank tag catalog"

# ---------------------------------------------------------------- buffs

[[tags]]
code = "buff_heal"
category = "buff"
patterns = ['(?i)\bheal(s|ing|ed)?\b', '(?i)\b(restor|recover)\w* (\S+ ){0,2}(hp|health)\b']
exclude = ['(?i)\b(heal[- ]?block\w*|anti-?heal\w*|prevent\w* (\S+ ){0,3}heal\w*|cannot (be )?heal\w*)']
keywords = ["heal", "heals", "healing", "restore", "recover", "mend"]
signals = ["heal"]

[[tags]]
code = "buff_shield"
category = "buff"
patterns = ['(?i)\b(shield(s|ed|ing)?|barriers?|wards?)\b']
keywords = ["shield", "barrier", "ward", "protect"]
signals = ["shield"]

[[tags]]
code = "buff_damage_reduction"
category = "buff"
patterns = ['(?i)\bdamage reduction\b', '(?i)\btakes? (less|reduced|half) damage\b', '(?i)\b(reduc|lessen|halv)\w* (the )?damage (taken|received)\b']
keywords = ["damage reduction", "harden", "guard", "fortify"]
signals = ["damage_reduction"]

[[tags]]
code = "buff_immunity"
category = "buff"
patterns = ['(?i)\b(immun(e|ity)|invulnerab\w*)']
keywords = ["immune", "immunity", "invulnerable"]
signals = ["immunity"]

[[tags]]
code = "buff_cleanse"
category = "buff"
patterns = ['(?i)\b(cleans\w*|purif\w*)', '(?i)\b(remov|cur)\w* (\S+ ){0,2}(debuffs?|negative effects?|status (conditions?|ailments?))\b']
keywords = ["cleanse", "purify", "cure"]
signals = ["cleanse"]

[[tags]]
code = "buff_stat_up"
category = "buff"
patterns = ['(?i)\b(rais|boost|increas|empower|sharpen)\w* (its |own |their )?(attack|defen[cs]e|speed|magic|resist\w*|stats?)\b']
keywords = ["raise", "raises", "boost", "boosts", "empower"]
signals = ["stat_buff"]

[[tags]]
code = "buff_lifesteal"
category = "buff"
patterns = ['(?i)\blife ?steal\w*', '(?i)\b(drain|absorb|sap)\w* (\S+ ){0,2}(hp|health|life)\b']
keywords = ["lifesteal", "vampiric", "absorb"]
signals = ["lifesteal"]

[[tags]]
code = "buff_evasion"
category = "buff"
patterns = ['(?i)\b(evasion|evasiveness|evad(e|es|ing)|dodg\w*)\b']
keywords = ["evasion", "evade", "dodge"]
signals = ["evasion"]

[[tags]]
code = "buff_regeneration"
category = "buff"
patterns = ['(?i)\bregenerat\w*']
keywords = ["regenerate", "regeneration"]
signals = ["regeneration"]

[[tags]]
code = "buff_endure"
category = "buff"
patterns = ['(?i)\bendur(e|es|ed)\b', '(?i)\bcannot be knocked out\b']
keywords = ["endure", "undying"]
signals = ["endure"]

# -------------------------------------------------------------- debuffs

[[tags]]
code = "debuff_armor_shred"
category = "debuff"
patterns = ['(?i)\b(lower|reduc|break|shred|pierc|sunder|corrod)\w* (\S+ ){0,3}(physical )?(defen[cs]e|armou?r)\b']
exclude = ['(?i)\bmagic(al)? defen[cs]e\b']
keywords = ["armor", "armour", "sunder", "shred"]
signals = ["armor_shred"]

[[tags]]
code = "debuff_resist_shred"
category = "debuff"
patterns = ['(?i)\b(lower|reduc|break|shred|pierc|sunder|corrod)\w* (\S+ ){0,3}(resist\w*|magic(al)? defen[cs]e)\b']
keywords = ["resistance", "resist", "magic defense"]
signals = ["resist_shred"]

[[tags]]
code = "debuff_attack_down"
category = "debuff"
patterns = ['(?i)\b(lower|reduc|weaken|cut|drop)\w* (\S+ ){0,3}(physical )?attack\b']
exclude = ['(?i)\b(special|magic) attack\b']
keywords = ["attack down", "weaken", "intimidate"]
signals = ["attack_shred"]

[[tags]]
code = "debuff_magic_down"
category = "debuff"
patterns = ['(?i)\b(lower|reduc|weaken|cut|drop)\w* (\S+ ){0,3}(magic|special attack)\b']
exclude = ['(?i)\bmagic(al)? defen[cs]e\b']
keywords = ["magic down", "special attack"]
signals = ["magic_shred"]

[[tags]]
code = "debuff_stun"
category = "debuff"
patterns = ['(?i)\b(stun(s|ned|ning)?|freez\w*|froze(n)?|petrif\w*|paralyz\w*|paralys\w*|sleep|asleep|flinch\w*)\b']
exclude = ['(?i)\bimmun\w*|\bcannot be (stunned|controlled)\b']
keywords = ["stun", "freeze", "paralyze", "sleep", "flinch"]
signals = ["hard_control"]

[[tags]]
code = "debuff_silence"
category = "debuff"
patterns = ['(?i)\b(silenc\w*|seal(s|ed|ing)?|disabl\w*)\b']
keywords = ["silence", "seal", "disable"]
signals = ["skill_lock"]

[[tags]]
code = "debuff_slow"
category = "debuff"
patterns = ['(?i)\bslow(s|ed|ing)?\b', '(?i)\b(lower|reduc|cut|drop)\w* (\S+ ){0,3}speed\b']
keywords = ["slow", "speed down"]
signals = ["speed_shred"]

[[tags]]
code = "debuff_blind"
category = "debuff"
patterns = ['(?i)\bblind(s|ed|ing)?\b', '(?i)\b(lower|reduc|cut|drop)\w* (\S+ ){0,3}accuracy\b']
keywords = ["blind", "accuracy"]
signals = ["accuracy_shred"]

[[tags]]
code = "debuff_poison"
category = "debuff"
patterns = ['(?i)\b(poison\w*|burn(s|ed|ing)?|bleed\w*|toxic|venom\w*)\b', '(?i)\bdamage over time\b']
keywords = ["poison", "burn", "bleed", "toxic", "venom"]
signals = ["damage_over_time"]

[[tags]]
code = "debuff_heal_block"
category = "debuff"
patterns = ['(?i)\b(heal[- ]?block\w*|anti-?heal\w*|prevent\w* (\S+ ){0,3}heal\w*|cannot (be )?heal\w*)']
keywords = ["heal block", "anti heal"]
signals = ["heal_block"]

[[tags]]
code = "debuff_pp_drain"
category = "debuff"
patterns = ['(?i)\b(reduc|lower|drain|decreas|cut|sap|deplet)\w* (\S+ ){0,4}(pp|power points?|move uses|usable moves?|move count|energy|mana)\b']
require = ['(?i)\b(opponent|foe|enemy|enemies|target|opposing)']
keywords = ["pp", "power points", "energy", "mana"]
signals = ["resource_drain"]
notes = "Unconditional drains only; conditional clauses never match"

[[tags]]
code = "debuff_fatigue"
category = "debuff"
patterns = ['(?i)\b(fatigu\w*|exhaust\w*|drows\w*)']
keywords = ["fatigue", "exhaust", "drowsy"]
signals = ["fatigue"]

[[tags]]
code = "debuff_exposure"
category = "debuff"
patterns = ['(?i)\b(expos(e|es|ed|ure)|vulnerab\w*)\b', '(?i)\btakes? (increased|more|extra|double) damage\b']
keywords = ["expose", "exposed", "vulnerable"]
signals = ["exposure"]

[[tags]]
code = "debuff_curse"
category = "debuff"
patterns = ['(?i)\b(curse[sd]?|hex(es|ed)?|doom(ed)?|perish)\b']
keywords = ["curse", "hex", "doom"]
signals = ["curse"]

# ------------------------------------------------------------- utility

[[tags]]
code = "utility_priority"
category = "utility"
patterns = ['(?i)\bpriority\b', '(?i)\b(moves?|goes|go|strikes?|acts?|attacks?) first\b']
keywords = ["priority", "first"]
signals = ["priority"]

[[tags]]
code = "utility_multi_hit"
category = "utility"
patterns = ['(?i)\bhits? (\d+|two|three|four|five|multiple) times\b', '(?i)\bmulti-?hit\b', '(?i)\b\d+-\d+ times\b', '(?i)\b(twice|thrice)\b']
keywords = ["multi hit", "twice", "times"]
signals = ["multi_hit"]

[[tags]]
code = "utility_extra_turn"
category = "utility"
patterns = ['(?i)\b(extra|another|additional) turn\b', '(?i)\b(acts?|moves?) again\b']
keywords = ["extra turn", "another turn"]
signals = ["extra_turn"]

[[tags]]
code = "utility_buff_strip"
category = "utility"
patterns = ['(?i)\bdispel\w*', '(?i)\b(strip|steal|remov|eras)\w* (\S+ ){0,3}(buffs?|boosts?|stat changes?|positive effects?)\b']
keywords = ["dispel", "strip", "steal"]
signals = ["buff_strip"]

[[tags]]
code = "utility_taunt"
category = "utility"
patterns = ['(?i)\b(taunt\w*|provok\w*)']
keywords = ["taunt", "provoke"]
signals = ["taunt"]

[[tags]]
code = "utility_reflect"
category = "utility"
patterns = ['(?i)\b(reflect\w*|counter(s|attacks?|ing)?|thorns?)\b']
keywords = ["reflect", "counter", "thorns"]
signals = ["reflect"]

[[tags]]
code = "utility_crit"
category = "utility"
patterns = ['(?i)\bcrit(ical|s)?\b']
keywords = ["critical", "crit"]
signals = ["crit"]

[[tags]]
code = "utility_execute"
category = "utility"
patterns = ['(?i)\bexecut\w*', '(?i)\bfinish(es)? off\b', '(?i)\b(one-hit ko|ohko)\b']
keywords = ["execute", "finish off"]
signals = ["execute"]

[[tags]]
code = "utility_turn_delay"
category = "utility"
patterns = ['(?i)\bturn meter\b', '(?i)\bpush(es)? back (\S+ ){0,2}turn\b']
keywords = ["delay", "turn meter"]
signals = ["turn_delay"]
"#;
