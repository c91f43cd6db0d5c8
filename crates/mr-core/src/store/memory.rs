//! In-memory entity store.

use std::collections::{BTreeMap, VecDeque};
use std::ops::Bound;
use std::sync::RwLock;

use mr_common::{DerivedRecord, Entity, EntityId, TagSet};

use super::{EntityIter, EntityStore, StoreError};

const PAGE_SIZE: usize = 64;

/// Entities keyed by id behind a single lock. A save replaces record and tags
/// under one write lock, which makes it atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entities: RwLock<BTreeMap<EntityId, Entity>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entities(entities: impl IntoIterator<Item = Entity>) -> Self {
        let store = Self::new();
        for entity in entities {
            store.insert(entity);
        }
        store
    }

    /// Insert or replace an entity as upstream writers would.
    pub fn insert(&self, entity: Entity) {
        if let Ok(mut map) = self.entities.write() {
            map.insert(entity.id, entity);
        }
    }

    pub fn get(&self, id: EntityId) -> Option<Entity> {
        self.entities.read().ok()?.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.entities.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn page_after(&self, after: Option<EntityId>) -> Result<Vec<Entity>, StoreError> {
        let map = self
            .entities
            .read()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))?;
        let lower = match after {
            Some(id) => Bound::Excluded(id),
            None => Bound::Unbounded,
        };
        Ok(map
            .range((lower, Bound::Unbounded))
            .take(PAGE_SIZE)
            .map(|(_, e)| e.clone())
            .collect())
    }
}

/// Pages through the map in id order. The lock is held only while a page is
/// copied, so saves proceed between pages.
struct Pages<'a> {
    store: &'a MemoryStore,
    after: Option<EntityId>,
    buffer: VecDeque<Entity>,
    exhausted: bool,
}

impl Iterator for Pages<'_> {
    type Item = Result<Entity, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() && !self.exhausted {
            match self.store.page_after(self.after) {
                Ok(page) => {
                    self.exhausted = page.len() < PAGE_SIZE;
                    self.after = page.last().map(|e| e.id).or(self.after);
                    self.buffer.extend(page);
                }
                Err(e) => {
                    self.exhausted = true;
                    return Some(Err(e));
                }
            }
        }
        self.buffer.pop_front().map(Ok)
    }
}

impl EntityStore for MemoryStore {
    fn get_entity(&self, id: EntityId) -> Result<Entity, StoreError> {
        let map = self
            .entities
            .read()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))?;
        map.get(&id).cloned().ok_or(StoreError::NotFound(id))
    }

    fn list_all_entities(&self) -> EntityIter<'_> {
        Box::new(Pages {
            store: self,
            after: None,
            buffer: VecDeque::new(),
            exhausted: false,
        })
    }

    fn count_entities(&self) -> Result<usize, StoreError> {
        self.entities
            .read()
            .map(|m| m.len())
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))
    }

    fn list_derived(&self) -> Result<Vec<DerivedRecord>, StoreError> {
        let map = self
            .entities
            .read()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))?;
        Ok(map.values().filter_map(|e| e.derived.clone()).collect())
    }

    fn save_derived(
        &self,
        id: EntityId,
        record: &DerivedRecord,
        tags: &TagSet,
    ) -> Result<(), StoreError> {
        if record.entity_id != id {
            return Err(StoreError::Rejected {
                id,
                reason: format!("record belongs to entity {}", record.entity_id),
            });
        }
        let mut map = self
            .entities
            .write()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))?;
        let entity = map.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        entity.derived = Some(record.clone());
        entity.tags = tags.clone();
        Ok(())
    }
}
