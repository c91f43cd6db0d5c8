//! Test utilities for mr-core.
//!
//! This module provides:
//! - Entity and derived-record fixtures
//! - Scripted text classifiers (static, slow, failing)
//! - A store wrapper that fails writes for chosen entities
//! - Float comparison assertions

use std::collections::BTreeSet;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use chrono::Utc;
use mr_common::{
    Ability, BaseAttributes, DerivedRecord, Entity, EntityId, InputSnapshot, PercentileScores,
    RawScores, TagSet, FORMULA_VERSION,
};

use crate::catalog::CatalogSnapshot;
use crate::store::{EntityIter, EntityStore, MemoryStore, StoreError};
use crate::tags::{ClassifierError, TextClassifier};

/// Assert that two floating point numbers are approximately equal.
#[macro_export]
macro_rules! assert_approx_eq {
    ($a:expr, $b:expr) => {
        $crate::assert_approx_eq!($a, $b, 1e-6_f64)
    };
    ($a:expr, $b:expr, $epsilon:expr) => {{
        let a: f64 = $a;
        let b: f64 = $b;
        let eps: f64 = $epsilon;
        let diff = (a - b).abs();
        if diff > eps {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{}`\n right: `{}`\n  diff: `{}`\n   eps: `{}`",
                a, b, diff, eps
            );
        }
    }};
}

// ============================================================================
// Fixtures
// ============================================================================

/// The built-in catalog, compiled.
pub fn builtin_snapshot() -> CatalogSnapshot {
    CatalogSnapshot::builtin().expect("built-in catalog compiles")
}

/// Entity with mid-range attributes and the given ability descriptions.
pub fn entity_with_abilities(id: u64, name: &str, abilities: &[&str]) -> Entity {
    abilities.iter().fold(
        Entity::new(id, name).with_attributes(BaseAttributes::new(
            100.0, 50.0, 50.0, 50.0, 50.0, 50.0,
        )),
        |entity, text| entity.with_ability(Ability::from_text(*text)),
    )
}

/// Regression fixture: no abilities, no tags.
///
/// Raw scores without signals are offense 60, survivability 76, control 50,
/// tempo 59, resource pressure 61.
pub fn fixture_entity() -> Entity {
    Entity::new(1u64, "Fixture").with_attributes(BaseAttributes::new(
        100.0, 50.0, 80.0, 60.0, 40.0, 60.0,
    ))
}

/// A persisted record carrying only raw scores, for percentile samples.
pub fn record_with_scores(id: u64, scores: RawScores) -> DerivedRecord {
    DerivedRecord {
        entity_id: EntityId(id),
        scores,
        percentiles: PercentileScores::splat(0.5),
        role: None,
        confidence: None,
        rationale: None,
        inputs: InputSnapshot::default(),
        formula_version: FORMULA_VERSION.to_string(),
        updated_at: Utc::now(),
    }
}

// ============================================================================
// Classifiers
// ============================================================================

/// Returns the same codes for every text.
#[derive(Debug, Clone)]
pub struct StaticClassifier {
    codes: Vec<String>,
}

impl StaticClassifier {
    pub fn new(codes: &[&str]) -> Self {
        Self {
            codes: codes.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl TextClassifier for StaticClassifier {
    fn classify(&self, _text: &str, _timeout: Duration) -> Result<Vec<String>, ClassifierError> {
        Ok(self.codes.clone())
    }
}

/// Sleeps past any reasonable deadline before answering.
#[derive(Debug, Clone)]
pub struct SlowClassifier {
    delay: Duration,
}

impl SlowClassifier {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl TextClassifier for SlowClassifier {
    fn classify(&self, _text: &str, _timeout: Duration) -> Result<Vec<String>, ClassifierError> {
        thread::sleep(self.delay);
        Ok(Vec::new())
    }
}

/// Always fails with a transport error.
#[derive(Debug, Clone, Copy)]
pub struct FailingClassifier;

impl TextClassifier for FailingClassifier {
    fn classify(&self, _text: &str, _timeout: Duration) -> Result<Vec<String>, ClassifierError> {
        Err(ClassifierError::Transport("connection refused".to_string()))
    }
}

// ============================================================================
// Stores
// ============================================================================

/// Memory store whose `save_derived` fails for chosen entities.
#[derive(Debug, Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    failing: Mutex<BTreeSet<EntityId>>,
}

impl FlakyStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            failing: Mutex::new(BTreeSet::new()),
        }
    }

    pub fn fail_writes_for(&self, id: impl Into<EntityId>) {
        self.failing.lock().unwrap().insert(id.into());
    }

    pub fn heal(&self) {
        self.failing.lock().unwrap().clear();
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }
}

impl EntityStore for FlakyStore {
    fn get_entity(&self, id: EntityId) -> Result<Entity, StoreError> {
        self.inner.get_entity(id)
    }

    fn list_all_entities(&self) -> EntityIter<'_> {
        self.inner.list_all_entities()
    }

    fn count_entities(&self) -> Result<usize, StoreError> {
        self.inner.count_entities()
    }

    fn list_derived(&self) -> Result<Vec<DerivedRecord>, StoreError> {
        self.inner.list_derived()
    }

    fn save_derived(
        &self,
        id: EntityId,
        record: &DerivedRecord,
        tags: &TagSet,
    ) -> Result<(), StoreError> {
        if self.failing.lock().unwrap().contains(&id) {
            return Err(StoreError::Rejected {
                id,
                reason: "injected write failure".to_string(),
            });
        }
        self.inner.save_derived(id, record, tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flaky_store_rejects_only_marked_ids() {
        let store = FlakyStore::new(MemoryStore::with_entities([
            fixture_entity(),
            entity_with_abilities(2, "Other", &[]),
        ]));
        store.fail_writes_for(2u64);

        let ok = record_with_scores(1, RawScores::splat(10));
        assert!(store.save_derived(EntityId(1), &ok, &TagSet::new()).is_ok());

        let bad = record_with_scores(2, RawScores::splat(10));
        let err = store.save_derived(EntityId(2), &bad, &TagSet::new()).unwrap_err();
        assert!(matches!(err, StoreError::Rejected { .. }));
        assert_eq!(store.list_derived().unwrap().len(), 1);

        store.heal();
        assert!(store.save_derived(EntityId(2), &bad, &TagSet::new()).is_ok());
    }

    #[test]
    fn test_approx_macro() {
        assert_approx_eq!(0.1 + 0.2, 0.3);
        assert_approx_eq!(1.0, 1.05, 0.1);
    }
}
