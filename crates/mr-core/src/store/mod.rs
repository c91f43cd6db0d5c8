//! Entity store interface.
//!
//! The engine reads entities and persisted derived records through
//! [`EntityStore`] and writes each recompute result with one atomic
//! `save_derived` call. [`MemoryStore`] is the in-process implementation.

pub mod memory;

use mr_common::{DerivedRecord, Entity, EntityId, TagSet};
use thiserror::Error;

pub use memory::MemoryStore;

/// Errors from an entity store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("entity {0} not found")]
    NotFound(EntityId),

    #[error("write conflict on entity {0}")]
    Conflict(EntityId),

    #[error("store rejected write for entity {id}: {reason}")]
    Rejected { id: EntityId, reason: String },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for mr_common::Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => mr_common::Error::EntityNotFound { id: id.0 },
            StoreError::Conflict(id) => mr_common::Error::Conflict { id: id.0 },
            StoreError::Rejected { id, reason } => mr_common::Error::Persistence { id: id.0, reason },
            // Id 0 is never issued, so it marks a store-wide failure
            StoreError::Unavailable(reason) => mr_common::Error::Persistence { id: 0, reason },
        }
    }
}

/// Streaming iterator over the corpus.
pub type EntityIter<'a> = Box<dyn Iterator<Item = Result<Entity, StoreError>> + Send + 'a>;

/// Persistence collaborator for the recompute driver.
pub trait EntityStore: Send + Sync {
    fn get_entity(&self, id: EntityId) -> Result<Entity, StoreError>;

    /// Stream every entity. Implementations page through the corpus rather
    /// than loading it at once.
    fn list_all_entities(&self) -> EntityIter<'_>;

    fn count_entities(&self) -> Result<usize, StoreError>;

    /// Every persisted derived record, for the percentile sample.
    fn list_derived(&self) -> Result<Vec<DerivedRecord>, StoreError>;

    /// Replace the entity's derived record and tags in one transaction.
    /// Either both are written or neither is.
    fn save_derived(
        &self,
        id: EntityId,
        record: &DerivedRecord,
        tags: &TagSet,
    ) -> Result<(), StoreError>;
}
