use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use super::{StoreBackend, StoreError};

/// In-memory backend for tests and database-free trial runs.
#[derive(Default)]
pub struct MemoryBackend {
    entities: Mutex<HashMap<(String, String), JsonValue>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StoreBackend for MemoryBackend {
    async fn get(&self, kind: &str, id: &str) -> Result<Option<JsonValue>, StoreError> {
        let entities = self.entities.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entities.get(&(kind.to_string(), id.to_string())).cloned())
    }

    async fn put(&self, kind: &str, id: &str, data: JsonValue) -> Result<(), StoreError> {
        let mut entities = self.entities.lock().unwrap_or_else(|e| e.into_inner());
        entities.insert((kind.to_string(), id.to_string()), data);
        Ok(())
    }

    async fn ids(&self, kind: &str) -> Result<Vec<String>, StoreError> {
        let entities = self.entities.lock().unwrap_or_else(|e| e.into_inner());
        let mut ids: Vec<String> = entities
            .keys()
            .filter(|(k, _)| k == kind)
            .map(|(_, id)| id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }
}
