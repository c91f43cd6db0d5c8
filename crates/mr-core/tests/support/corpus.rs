//! Corpus fixtures and scripted collaborators for engine integration tests.

#![allow(dead_code)]
// Test support provides more helpers than any single test uses.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mr_common::{Ability, BaseAttributes, DerivedRecord, Entity, EntityId, JobId, TagSet};
use mr_core::driver::{BatchProgressSink, BatchReport, FailedEntity};
use mr_core::store::{EntityIter, EntityStore, MemoryStore, StoreError};
use mr_core::tags::{ClassifierError, TextClassifier};
use mr_core::{CatalogHandle, Engine};

/// Regression fixture: hp 100, speed 50, attack 80, defense 60, magic 40,
/// resist 60, no abilities, no tags.
pub fn fixture_entity(id: u64) -> Entity {
    Entity::new(id, "Fixture").with_attributes(BaseAttributes::new(
        100.0, 50.0, 80.0, 60.0, 40.0, 60.0,
    ))
}

pub fn monster(id: u64, name: &str, abilities: &[&str]) -> Entity {
    abilities.iter().fold(
        Entity::new(id, name).with_attributes(BaseAttributes::new(
            90.0,
            40.0 + (id % 7) as f64 * 10.0,
            50.0 + (id % 5) as f64 * 12.0,
            55.0,
            30.0 + (id % 3) as f64 * 20.0,
            45.0,
        )),
        |entity, text| entity.with_ability(Ability::from_text(*text)),
    )
}

const ABILITIES: &[&str] = &[
    "Poisons the target.",
    "Heals an ally for 30% HP.",
    "Stuns the target for one turn.",
    "Moves first.",
    "Raises its attack.",
    "Reduces the opponent's usable move count by 2.",
    "Summons a barrier.",
];

/// A small mixed corpus with ids `1..=n`.
pub fn corpus(n: u64) -> Vec<Entity> {
    (1u64..=n)
        .map(|id| {
            let first = ABILITIES[(id as usize) % ABILITIES.len()];
            let second = ABILITIES[(id as usize * 3 + 1) % ABILITIES.len()];
            monster(id, &format!("Mon {}", id), &[first, second])
        })
        .collect()
}

pub fn engine_over(store: Arc<dyn EntityStore>) -> Engine {
    Engine::new(store, Arc::new(CatalogHandle::builtin().unwrap()))
}

pub fn memory_engine(entities: Vec<Entity>) -> (Arc<MemoryStore>, Engine) {
    let store = Arc::new(MemoryStore::with_entities(entities));
    let engine = engine_over(store.clone());
    (store, engine)
}

/// Memory store whose `save_derived` fails for chosen entities.
#[derive(Debug, Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    failing: Mutex<BTreeSet<EntityId>>,
}

impl FlakyStore {
    pub fn new(entities: Vec<Entity>) -> Self {
        Self {
            inner: MemoryStore::with_entities(entities),
            failing: Mutex::new(BTreeSet::new()),
        }
    }

    pub fn fail_writes_for(&self, id: u64) {
        self.failing.lock().unwrap().insert(EntityId(id));
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
            return Err(StoreError::Conflict(id));
        }
        self.inner.save_derived(id, record, tags)
    }
}

/// Records every callback and cancels after a set number of entities.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub cancel_after: Option<usize>,
    pub progress: Mutex<Vec<(usize, usize)>>,
    pub failures: Mutex<Vec<FailedEntity>>,
    pub started: Mutex<Option<(JobId, usize)>>,
    pub finished: Mutex<Option<BatchReport>>,
    checks: AtomicUsize,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancelling_after(done: usize) -> Self {
        Self {
            cancel_after: Some(done),
            ..Self::default()
        }
    }

    pub fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }
}

impl BatchProgressSink for RecordingSink {
    fn report_progress(&self, done: usize, total: usize) {
        self.progress.lock().unwrap().push((done, total));
    }

    fn check_cancelled(&self) -> bool {
        self.checks.fetch_add(1, Ordering::SeqCst);
        match self.cancel_after {
            Some(limit) => self.progress.lock().unwrap().len() >= limit,
            None => false,
        }
    }

    fn report_started(&self, job_id: &JobId, total: usize) {
        *self.started.lock().unwrap() = Some((job_id.clone(), total));
    }

    fn report_failure(&self, failure: &FailedEntity) {
        self.failures.lock().unwrap().push(failure.clone());
    }

    fn report_finished(&self, report: &BatchReport) {
        *self.finished.lock().unwrap() = Some(report.clone());
    }
}

/// Returns the same codes for every text.
pub struct StaticClassifier(pub Vec<String>);

impl StaticClassifier {
    pub fn new(codes: &[&str]) -> Self {
        Self(codes.iter().map(|c| c.to_string()).collect())
    }
}

impl TextClassifier for StaticClassifier {
    fn classify(&self, _text: &str, _timeout: Duration) -> Result<Vec<String>, ClassifierError> {
        Ok(self.0.clone())
    }
}

/// Never answers within any test deadline.
pub struct HangingClassifier;

impl TextClassifier for HangingClassifier {
    fn classify(&self, _text: &str, _timeout: Duration) -> Result<Vec<String>, ClassifierError> {
        std::thread::sleep(Duration::from_secs(10));
        Ok(vec!["utility_priority".to_string()])
    }
}

/// Never answers in time, and counts how often it was asked.
#[derive(Default)]
pub struct CountingHangingClassifier {
    calls: std::sync::atomic::AtomicUsize,
}

impl CountingHangingClassifier {
    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

impl TextClassifier for CountingHangingClassifier {
    fn classify(&self, _text: &str, _timeout: Duration) -> Result<Vec<String>, ClassifierError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        std::thread::sleep(Duration::from_secs(10));
        Ok(Vec::new())
    }
}

/// Always fails at the transport.
pub struct BrokenClassifier;

impl TextClassifier for BrokenClassifier {
    fn classify(&self, _text: &str, _timeout: Duration) -> Result<Vec<String>, ClassifierError> {
        Err(ClassifierError::Transport("connection reset".to_string()))
    }
}
