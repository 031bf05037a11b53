// persistence/store.rs - Entity Stores

//! Store contract consumed by the orchestration engine, plus the in-memory
//! backend used by tests and the demo. Durable backends live outside this
//! crate and implement the same trait.

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;

use crate::engine::ProtocolEntity;

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("backend error: {0}")]
    Backend(String),
}

/// Entity store participating in the ambient transaction.
#[async_trait]
pub trait EntityStore<E>: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<E>, StoreError>;

    /// Full-row upsert of the entire entity, not a delta.
    async fn save(&self, entity: &E) -> Result<(), StoreError>;
}

/// In-memory store keyed by entity id.
pub struct InMemoryStore<E> {
    entities: DashMap<String, E>,
}

impl<E: ProtocolEntity> InMemoryStore<E> {
    pub fn new() -> Self {
        Self {
            entities: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl<E: ProtocolEntity> Default for InMemoryStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<E: ProtocolEntity> EntityStore<E> for InMemoryStore<E> {
    async fn find_by_id(&self, id: &str) -> Result<Option<E>, StoreError> {
        Ok(self.entities.get(id).map(|entry| entry.clone()))
    }

    async fn save(&self, entity: &E) -> Result<(), StoreError> {
        self.entities.insert(entity.id().to_string(), entity.clone());
        Ok(())
    }
}
