//! Monster entities, their abilities, and category-coded tags.
//!
//! Entities are produced by upstream data-entry flows. The engine reads them,
//! never creates them, and only ever writes back a derived record plus a
//! merged tag set.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fmt;

use crate::derived::DerivedRecord;
use crate::error::{Error, Result};
use crate::id::EntityId;

/// Ordered tag set. Ordering keeps merges and snapshots deterministic.
pub type TagSet = BTreeSet<String>;

/// Tag category namespace. Every recognized tag is `<prefix>_<code>`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum TagCategory {
    Buff,
    Debuff,
    Utility,
}

impl TagCategory {
    /// All categories, in display order.
    pub const ALL: [TagCategory; 3] = [TagCategory::Buff, TagCategory::Debuff, TagCategory::Utility];

    /// Tag prefix for this category (without the separator).
    pub fn prefix(&self) -> &'static str {
        match self {
            TagCategory::Buff => "buff",
            TagCategory::Debuff => "debuff",
            TagCategory::Utility => "utility",
        }
    }

    /// Classify a tag string by its prefix.
    ///
    /// Returns `None` for untagged strings, unknown prefixes, and tags whose
    /// code part is empty (`"buff_"`).
    pub fn of_tag(tag: &str) -> Option<TagCategory> {
        let (prefix, code) = tag.split_once('_')?;
        if code.is_empty() {
            return None;
        }
        TagCategory::ALL.into_iter().find(|c| c.prefix() == prefix)
    }

    /// Categories covered by at least one recognized tag in `tags`.
    pub fn present_in<'a>(tags: impl IntoIterator<Item = &'a String>) -> BTreeSet<TagCategory> {
        tags.into_iter()
            .filter_map(|t| TagCategory::of_tag(t))
            .collect()
    }
}

impl fmt::Display for TagCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.prefix())
    }
}

/// The six base numeric attributes.
///
/// Missing values deserialize as 0.0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct BaseAttributes {
    pub hp: f64,
    pub speed: f64,
    pub attack: f64,
    pub defense: f64,
    pub magic: f64,
    pub resist: f64,
}

impl BaseAttributes {
    pub fn new(hp: f64, speed: f64, attack: f64, defense: f64, magic: f64, resist: f64) -> Self {
        Self {
            hp,
            speed,
            attack,
            defense,
            magic,
            resist,
        }
    }

    /// Copy with every non-finite or negative value replaced by 0.0.
    pub fn sanitized(&self) -> Self {
        fn clean(v: f64) -> f64 {
            if v.is_finite() && v > 0.0 {
                v
            } else {
                0.0
            }
        }
        Self {
            hp: clean(self.hp),
            speed: clean(self.speed),
            attack: clean(self.attack),
            defense: clean(self.defense),
            magic: clean(self.magic),
            resist: clean(self.resist),
        }
    }
}

/// One free-text ability with optional structured fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Ability {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Ability {
    /// Ability carrying only a description.
    pub fn from_text(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            ..Self::default()
        }
    }

    /// Named ability with a description.
    pub fn named(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            description: Some(description.into()),
            ..Self::default()
        }
    }

    /// Name and description joined into one matchable string.
    ///
    /// The name is terminated as its own sentence so clause-level rules never
    /// see it glued onto the first clause of the description.
    pub fn text(&self) -> String {
        let name = self.name.as_deref().map(str::trim).unwrap_or("");
        let desc = self.description.as_deref().map(str::trim).unwrap_or("");
        match (name.is_empty(), desc.is_empty()) {
            (true, true) => String::new(),
            (false, true) => name.to_string(),
            (true, false) => desc.to_string(),
            (false, false) => format!("{}. {}", name, desc),
        }
    }
}

/// One monster in the catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<String>,
    #[serde(default)]
    pub attributes: BaseAttributes,
    #[serde(default)]
    pub abilities: Vec<Ability>,
    /// Category-coded tags. Upstream writers may have left unrecognized
    /// strings here; they are tolerated and preserved.
    #[serde(default)]
    pub tags: TagSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derived: Option<DerivedRecord>,
}

impl Entity {
    pub fn new(id: impl Into<EntityId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_attributes(mut self, attributes: BaseAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn with_ability(mut self, ability: Ability) -> Self {
        self.abilities.push(ability);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn with_element(mut self, element: impl Into<String>) -> Self {
        self.element = Some(element.into());
        self
    }

    /// Check the identity fields required to score this entity.
    pub fn validate(&self) -> Result<()> {
        if !self.id.is_valid() {
            return Err(Error::InvalidEntity {
                id: self.id.0,
                reason: "entity id must be non-zero".to_string(),
            });
        }
        if self.name.trim().is_empty() {
            return Err(Error::InvalidEntity {
                id: self.id.0,
                reason: "entity name is empty".to_string(),
            });
        }
        Ok(())
    }

    /// Per-ability text segments, skipping abilities with no text at all.
    pub fn ability_texts(&self) -> Vec<String> {
        self.abilities
            .iter()
            .map(Ability::text)
            .filter(|t| !t.is_empty())
            .collect()
    }

    /// All ability text concatenated into one blob.
    pub fn ability_blob(&self) -> String {
        self.ability_texts().join("\n")
    }

    /// Categories covered by this entity's recognized tags.
    pub fn tag_categories(&self) -> BTreeSet<TagCategory> {
        TagCategory::present_in(&self.tags)
    }

    /// SHA-256 over the scoring inputs (attributes and abilities).
    ///
    /// Tags are excluded: the engine rewrites them itself, and a record must
    /// not go stale because of its own tag repair.
    pub fn input_fingerprint(&self) -> String {
        let payload = serde_json::json!({
            "attributes": self.attributes.sanitized(),
            "abilities": self.abilities,
        });
        let mut hasher = Sha256::new();
        hasher.update(payload.to_string().as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_category_parsing() {
        assert_eq!(TagCategory::of_tag("buff_heal"), Some(TagCategory::Buff));
        assert_eq!(
            TagCategory::of_tag("debuff_armor_shred"),
            Some(TagCategory::Debuff)
        );
        assert_eq!(
            TagCategory::of_tag("utility_priority"),
            Some(TagCategory::Utility)
        );
        assert_eq!(TagCategory::of_tag("heal"), None);
        assert_eq!(TagCategory::of_tag("buff_"), None);
        assert_eq!(TagCategory::of_tag("buffs_heal"), None);
        assert_eq!(TagCategory::of_tag("misc_thing"), None);
    }

    #[test]
    fn test_present_in_ignores_invalid() {
        let tags: TagSet = ["buff_heal", "legacy tag", "utility_priority"]
            .into_iter()
            .map(String::from)
            .collect();
        let present = TagCategory::present_in(&tags);
        assert!(present.contains(&TagCategory::Buff));
        assert!(present.contains(&TagCategory::Utility));
        assert!(!present.contains(&TagCategory::Debuff));
    }

    #[test]
    fn test_sanitized_attributes() {
        let attrs = BaseAttributes::new(f64::NAN, -5.0, 80.0, f64::INFINITY, 40.0, 0.0);
        let clean = attrs.sanitized();
        assert_eq!(clean.hp, 0.0);
        assert_eq!(clean.speed, 0.0);
        assert_eq!(clean.attack, 80.0);
        assert_eq!(clean.defense, 0.0);
        assert_eq!(clean.magic, 40.0);
    }

    #[test]
    fn test_missing_attributes_default_to_zero() {
        let entity: Entity =
            serde_json::from_str(r#"{"id": 3, "name": "Mossling", "attributes": {"hp": 55}}"#)
                .unwrap();
        assert_eq!(entity.attributes.hp, 55.0);
        assert_eq!(entity.attributes.speed, 0.0);
        assert!(entity.abilities.is_empty());
        assert!(entity.tags.is_empty());
    }

    #[test]
    fn test_validate_identity() {
        assert!(Entity::new(1, "Emberfang").validate().is_ok());
        assert!(Entity::new(0, "Ghost").validate().is_err());
        let err = Entity::new(9, "   ").validate().unwrap_err();
        assert_eq!(err.code(), 10);
    }

    #[test]
    fn test_ability_text_joining() {
        assert_eq!(Ability::named("Bite", "Deals damage").text(), "Bite. Deals damage");
        assert_eq!(Ability::from_text("  Heals allies ").text(), "Heals allies");
        assert_eq!(Ability::default().text(), "");
    }

    #[test]
    fn test_fingerprint_ignores_tags() {
        let base = Entity::new(1, "Emberfang")
            .with_attributes(BaseAttributes::new(100.0, 50.0, 80.0, 60.0, 40.0, 60.0))
            .with_ability(Ability::from_text("Burns the foe"));
        let tagged = base.clone().with_tag("debuff_burn");
        assert_eq!(base.input_fingerprint(), tagged.input_fingerprint());

        let mut changed = base.clone();
        changed.attributes.speed = 51.0;
        assert_ne!(base.input_fingerprint(), changed.input_fingerprint());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn any_attribute() -> impl Strategy<Value = f64> {
        prop_oneof![
            -1e6f64..1e6,
            Just(f64::NAN),
            Just(f64::INFINITY),
            Just(f64::NEG_INFINITY),
            Just(-0.0),
        ]
    }

    proptest! {
        #[test]
        fn sanitized_attributes_are_finite_and_non_negative(
            hp in any_attribute(),
            speed in any_attribute(),
            attack in any_attribute(),
            defense in any_attribute(),
            magic in any_attribute(),
            resist in any_attribute(),
        ) {
            let clean = BaseAttributes::new(hp, speed, attack, defense, magic, resist).sanitized();
            for v in [clean.hp, clean.speed, clean.attack, clean.defense, clean.magic, clean.resist] {
                prop_assert!(v.is_finite());
                prop_assert!(v >= 0.0);
            }
            prop_assert_eq!(clean.sanitized(), clean);
        }

        #[test]
        fn positive_finite_attributes_survive_sanitizing(hp in 0.001f64..1e6, speed in 0.001f64..1e6) {
            let clean = BaseAttributes::new(hp, speed, 1.0, 1.0, 1.0, 1.0).sanitized();
            prop_assert_eq!(clean.hp, hp);
            prop_assert_eq!(clean.speed, speed);
        }

        #[test]
        fn tag_category_follows_prefix(code in "[a-z][a-z0-9_]{0,12}") {
            for category in TagCategory::ALL {
                let tag = format!("{}_{}", category.prefix(), code);
                prop_assert_eq!(TagCategory::of_tag(&tag), Some(category));
            }
        }

        #[test]
        fn unknown_prefixes_have_no_category(prefix in "[a-z]{1,8}", code in "[a-z]{1,8}") {
            prop_assume!(TagCategory::ALL.iter().all(|c| c.prefix() != prefix));
            let tag = format!("{}_{}", prefix, code);
            prop_assert_eq!(TagCategory::of_tag(&tag), None);
        }
    }
}
