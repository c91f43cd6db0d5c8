//! Tag auto-repair.
//!
//! Makes sure an entity carries at least one tag of each category by merging
//! in suggestions. The merge is a union: existing tags are never removed,
//! including unrecognized strings left by upstream writers.

pub mod classifier;
pub mod suggest;

use std::collections::BTreeSet;

use mr_common::{Entity, TagCategory, TagSet};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use classifier::{classify_with_deadline, ClassifierError, TextClassifier};
pub use suggest::{ExternalAssisted, PatternSuggester, SuggestionSource};

#[cfg(feature = "http-classifier")]
pub use classifier::HttpTextClassifier;

/// Result of one repair pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepairOutcome {
    /// Existing tags plus accepted suggestions.
    pub tags: TagSet,
    /// Suggestions that were not already present.
    pub added: BTreeSet<String>,
    /// Suggestions without a recognized category prefix.
    pub rejected: BTreeSet<String>,
    /// True when every category was already covered and no source was asked.
    pub skipped: bool,
}

impl RepairOutcome {
    pub fn changed(&self) -> bool {
        !self.added.is_empty()
    }
}

/// Categories with no tag on the entity.
pub fn missing_categories(tags: &TagSet) -> BTreeSet<TagCategory> {
    let present = TagCategory::present_in(tags);
    TagCategory::ALL
        .into_iter()
        .filter(|c| !present.contains(c))
        .collect()
}

/// Merge suggested tags into the entity's tags when a category is missing.
pub fn ensure_category_tags(entity: &Entity, source: &dyn SuggestionSource) -> RepairOutcome {
    if missing_categories(&entity.tags).is_empty() {
        return RepairOutcome {
            tags: entity.tags.clone(),
            skipped: true,
            ..RepairOutcome::default()
        };
    }

    let mut outcome = RepairOutcome {
        tags: entity.tags.clone(),
        ..RepairOutcome::default()
    };
    for tag in source.suggest(entity) {
        if TagCategory::of_tag(&tag).is_none() {
            outcome.rejected.insert(tag);
        } else if outcome.tags.insert(tag.clone()) {
            outcome.added.insert(tag);
        }
    }

    debug!(
        entity_id = %entity.id,
        source = source.name(),
        added = outcome.added.len(),
        rejected = outcome.rejected.len(),
        "tag repair"
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    struct Fixed(Vec<String>);

    fn fixed(tags: &[&str]) -> Fixed {
        Fixed(tags.iter().map(|s| s.to_string()).collect())
    }

    impl SuggestionSource for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn suggest(&self, _entity: &Entity) -> BTreeSet<String> {
            self.0.iter().cloned().collect()
        }
    }

    struct Panicking;

    impl SuggestionSource for Panicking {
        fn name(&self) -> &'static str {
            "panicking"
        }

        fn suggest(&self, _entity: &Entity) -> BTreeSet<String> {
            panic!("source must not be consulted");
        }
    }

    #[test]
    fn test_complete_entity_is_noop() {
        let entity = Entity::new(1, "Full")
            .with_tag("buff_heal")
            .with_tag("debuff_stun")
            .with_tag("utility_taunt")
            .with_tag("legacy tag");
        let outcome = ensure_category_tags(&entity, &Panicking);
        assert!(outcome.skipped);
        assert_eq!(outcome.tags, entity.tags);
    }

    #[test]
    fn test_union_keeps_existing_and_rejects_bad_prefix() {
        let entity = Entity::new(2, "Partial")
            .with_tag("buff_heal")
            .with_tag("legacy tag");
        let source = fixed(&["debuff_stun", "buff_heal", "heal", "misc_thing"]);
        let outcome = ensure_category_tags(&entity, &source);
        assert!(!outcome.skipped);
        assert!(outcome.tags.contains("legacy tag"));
        assert!(outcome.tags.contains("buff_heal"));
        assert!(outcome.tags.contains("debuff_stun"));
        assert_eq!(outcome.added.len(), 1);
        let rejected: BTreeSet<String> = ["heal", "misc_thing"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(outcome.rejected, rejected);
    }

    #[test]
    fn test_missing_categories() {
        let tags: TagSet = ["buff_heal".to_string()].into_iter().collect();
        let missing = missing_categories(&tags);
        assert_eq!(missing.len(), 2);
        assert!(!missing.contains(&TagCategory::Buff));
    }

    proptest! {
        #[test]
        fn prop_never_removes_existing(
            existing in proptest::collection::btree_set("[a-z_ ]{0,16}", 0..8),
            suggested in proptest::collection::vec("(buff|debuff|utility|misc)_[a-z]{1,8}", 0..8),
        ) {
            let mut entity = Entity::new(3, "Prop");
            entity.tags = existing.clone();
            let outcome = ensure_category_tags(&entity, &Fixed(suggested));
            prop_assert!(existing.is_subset(&outcome.tags));
        }
    }
}
