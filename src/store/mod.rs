//! Entity persistence.
//!
//! Handlers read and write typed entities through `EntityStore`, which sits
//! on a pluggable `StoreBackend`: Postgres (JSONB documents, one table per
//! entity kind) for real runs, an in-memory map for tests and trial runs.

mod error;
mod memory;
mod migrations;
mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

pub use error::StoreError;
pub use memory::MemoryBackend;
pub use postgres::PostgresBackend;

use crate::entities::Entity;

/// Raw document storage keyed by (entity kind, id).
#[async_trait]
pub trait StoreBackend: Send + Sync {
    async fn get(&self, kind: &str, id: &str) -> Result<Option<JsonValue>, StoreError>;

    async fn put(&self, kind: &str, id: &str, data: JsonValue) -> Result<(), StoreError>;

    async fn ids(&self, kind: &str) -> Result<Vec<String>, StoreError>;
}

/// Typed repository over a `StoreBackend`.
#[derive(Clone)]
pub struct EntityStore {
    backend: Arc<dyn StoreBackend>,
}

impl EntityStore {
    pub fn new(backend: Arc<dyn StoreBackend>) -> Self {
        Self { backend }
    }

    /// Load an entity by id. Absence is not an error.
    pub async fn get<T: Entity>(&self, id: &str) -> Result<Option<T>, StoreError> {
        match self.backend.get(T::KIND, id).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Upsert an entity under its own id.
    pub async fn save<T: Entity>(&self, entity: &T) -> Result<(), StoreError> {
        let value = serde_json::to_value(entity)?;
        self.backend.put(T::KIND, entity.id(), value).await
    }

    /// All stored ids of one entity kind.
    pub async fn ids<T: Entity>(&self) -> Result<Vec<String>, StoreError> {
        self.backend.ids(T::KIND).await
    }
}
