//! Single-entity recompute through the engine and an in-memory store.

mod support;

use std::sync::Arc;
use std::time::{Duration, Instant};

use mr_common::{EntityId, ErrorCategory, Role, FORMULA_VERSION};
use mr_core::store::{EntityStore, MemoryStore};
use mr_core::{BatchOptions, NoopSink};
use proptest::prelude::*;
use support::corpus::{
    corpus, engine_over, fixture_entity, memory_engine, monster, BrokenClassifier, FlakyStore,
    HangingClassifier, StaticClassifier,
};

#[test]
fn test_regression_fixture_on_empty_corpus() {
    let (store, engine) = memory_engine(vec![fixture_entity(1)]);

    let record = engine.recompute_one(EntityId(1)).unwrap();
    assert_eq!(record.scores.offense, 60);
    assert_eq!(record.scores.survivability, 76);
    assert_eq!(record.scores.control, 50);
    assert_eq!(record.scores.tempo, 59);
    assert_eq!(record.scores.resource_pressure, 61);

    // Alone in the corpus: linear fallback, raw / 120 * 100
    assert!((record.percentiles.offense - 50.0).abs() < 1e-9);
    assert!((record.percentiles.control - 41.666_666).abs() < 1e-3);
    assert_eq!(record.inputs.corpus_size, 1);

    assert_eq!(record.role, Some(Role::Attacker));
    assert!((record.confidence.unwrap() - 0.0932).abs() < 1e-3);
    assert!(record.rationale.as_deref().unwrap().starts_with("attacker"));
    assert_eq!(record.formula_version, FORMULA_VERSION);

    let stored = store.get(EntityId(1)).unwrap();
    assert_eq!(stored.derived.as_ref(), Some(&record));
    assert!(stored.tags.is_empty());
}

#[test]
fn test_recompute_twice_is_identical() {
    let (_, engine) = memory_engine(corpus(12));
    engine
        .recompute_all(&BatchOptions::default(), &NoopSink)
        .unwrap();

    for id in [1u64, 5, 12] {
        let first = engine.recompute_one(EntityId(id)).unwrap();
        let second = engine.recompute_one(EntityId(id)).unwrap();
        assert!(first.same_outcome(&second), "entity {} drifted", id);
    }
}

#[test]
fn test_sole_entity_stays_on_linear_fallback() {
    let (_, engine) = memory_engine(vec![monster(4, "Viper", &["Poisons the target."])]);
    let first = engine.recompute_one(EntityId(4)).unwrap();
    let second = engine.recompute_one(EntityId(4)).unwrap();
    assert_eq!(second.inputs.corpus_size, 1);
    assert!(first.same_outcome(&second));
}

#[test]
fn test_tag_repair_is_saved_with_record() {
    let (store, engine) = memory_engine(vec![monster(
        7,
        "Viper",
        &["Poisons the target.", "Moves first."],
    )
    .with_tag("buff_custom_aura")]);

    engine.recompute_one(EntityId(7)).unwrap();
    let stored = store.get(EntityId(7)).unwrap();
    assert!(stored.tags.contains("buff_custom_aura"));
    assert!(stored.tags.contains("debuff_poison"));
    assert!(stored.tags.contains("utility_priority"));
}

#[test]
fn test_invalid_entity_fails_without_write() {
    let (store, engine) = memory_engine(vec![monster(3, "  ", &["Poisons the target."])]);

    let err = engine.recompute_one(EntityId(3)).unwrap_err();
    assert_eq!(err.code(), 10);
    assert_eq!(err.category(), ErrorCategory::Input);
    assert_eq!(err.entity_id(), Some(3));
    assert!(store.get(EntityId(3)).unwrap().derived.is_none());
}

#[test]
fn test_unknown_entity_is_reported() {
    let (_, engine) = memory_engine(vec![]);
    let err = engine.recompute_one(EntityId(99)).unwrap_err();
    assert_eq!(err.code(), 11);
}

#[test]
fn test_persistence_failure_is_surfaced() {
    let store = Arc::new(FlakyStore::new(corpus(3)));
    store.fail_writes_for(2);
    let engine = engine_over(store.clone());

    assert!(engine.recompute_one(EntityId(1)).is_ok());
    let err = engine.recompute_one(EntityId(2)).unwrap_err();
    assert_eq!(err.code(), 51);
    assert_eq!(err.category(), ErrorCategory::Persistence);

    // Neither the record nor the repaired tags were written
    let entity = store.get_entity(EntityId(2)).unwrap();
    assert!(entity.derived.is_none());
    assert!(entity.tags.is_empty());
    assert_eq!(store.list_derived().unwrap().len(), 1);
}

#[test]
fn test_percentiles_include_self() {
    let (_, engine) = memory_engine(corpus(9));
    engine
        .recompute_all(&BatchOptions::default(), &NoopSink)
        .unwrap();

    let record = engine.recompute_one(EntityId(4)).unwrap();
    assert_eq!(record.inputs.corpus_size, 9);
    for (_, p) in record.percentiles.iter() {
        assert!((0.0..=100.0).contains(&p));
        // Mid-rank with self counted is never 0 or 100
        assert!(p > 0.0 && p < 100.0);
    }
}

#[test]
fn test_hanging_classifier_falls_back_to_patterns() {
    let entity = monster(5, "Viper", &["Poisons the target."]);
    let store = Arc::new(MemoryStore::with_entities(vec![entity.clone()]));
    let engine = engine_over(store.clone())
        .with_classifier(Arc::new(HangingClassifier), Duration::from_millis(100));

    let start = Instant::now();
    let record = engine.recompute_one(EntityId(5)).unwrap();
    assert!(start.elapsed() < Duration::from_secs(5));

    let plain = memory_engine(vec![entity]).1.recompute_one(EntityId(5)).unwrap();
    assert!(record.same_outcome(&plain));

    let tags = store.get(EntityId(5)).unwrap().tags;
    assert!(tags.contains("debuff_poison"));
    assert!(!tags.contains("utility_priority"));
}

#[test]
fn test_broken_classifier_falls_back_to_patterns() {
    let store = Arc::new(MemoryStore::with_entities(vec![monster(
        6,
        "Viper",
        &["Poisons the target."],
    )]));
    let engine = engine_over(store.clone())
        .with_classifier(Arc::new(BrokenClassifier), Duration::from_secs(1));

    assert!(engine.recompute_one(EntityId(6)).is_ok());
    assert!(store.get(EntityId(6)).unwrap().tags.contains("debuff_poison"));
}

#[test]
fn test_corroborated_classifier_suggestion_is_kept() {
    let store = Arc::new(MemoryStore::with_entities(vec![monster(
        8,
        "Golem",
        &["Protect allies."],
    )]));
    let engine = engine_over(store.clone()).with_classifier(
        Arc::new(StaticClassifier::new(&["buff_shield", "buff_regeneration"])),
        Duration::from_secs(2),
    );

    engine.recompute_one(EntityId(8)).unwrap();
    let tags = store.get(EntityId(8)).unwrap().tags;
    assert!(tags.contains("buff_shield"));
    assert!(!tags.contains("buff_regeneration"));
}

#[test]
fn test_classifier_tag_is_scored_on_first_recompute() {
    let store = Arc::new(MemoryStore::with_entities(vec![monster(
        9,
        "Warden",
        &["Protect your allies from harm."],
    )]));
    let engine = engine_over(store.clone()).with_classifier(
        Arc::new(StaticClassifier::new(&["buff_shield"])),
        Duration::from_secs(2),
    );

    let first = engine.recompute_one(EntityId(9)).unwrap();
    assert_eq!(first.inputs.signals.get("shield"), Some(&1.0));
    assert!(store.get(EntityId(9)).unwrap().tags.contains("buff_shield"));

    let second = engine.recompute_one(EntityId(9)).unwrap();
    assert!(first.same_outcome(&second), "{:?} vs {:?}", first, second);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_scores_bounded_and_deterministic(
        hp in -50.0f64..400.0,
        atk in 0.0f64..250.0,
        spd in 0.0f64..250.0,
        picks in proptest::collection::vec(0usize..7, 0..4),
    ) {
        let texts = [
            "Poisons the target.",
            "Heals an ally for 30% HP.",
            "Stuns the target for one turn.",
            "Moves first.",
            "Raises its attack.",
            "Reduces the opponent's usable move count by 2.",
            "Summons a barrier.",
        ];
        let abilities: Vec<&str> = picks.iter().map(|i| texts[*i]).collect();
        let entity = monster(1, "Prop", &abilities).with_attributes(
            mr_common::BaseAttributes::new(hp, spd, atk, 50.0, 50.0, 50.0),
        );

        let (_, engine) = memory_engine(vec![entity]);
        let a = engine.recompute_one(EntityId(1)).unwrap();
        let b = engine.recompute_one(EntityId(1)).unwrap();
        prop_assert_eq!(a.scores, b.scores);
        for (_, raw) in a.scores.iter() {
            prop_assert!(raw <= 120);
        }
        for (_, p) in a.percentiles.iter() {
            prop_assert!((0.0..=100.0).contains(&p));
        }
    }
}
