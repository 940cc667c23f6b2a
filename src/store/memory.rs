//! In-memory key-value backend.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{KeyValueStore, StoredValue};
use crate::errors::StoreError;

#[derive(Default)]
struct MemoryState {
    entries: HashMap<String, StoredValue>,
    revision: i64,
}

/// Process-local store with the same versioning rules as [`super::SqliteStore`].
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<StoredValue>, StoreError> {
        Ok(self.state.lock().await.entries.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<i64, StoreError> {
        let mut state = self.state.lock().await;
        let version = state.entries.get(key).map_or(0, |e| e.version) + 1;
        state.entries.insert(
            key.to_string(),
            StoredValue {
                value: value.to_string(),
                version,
            },
        );
        state.revision += 1;
        Ok(version)
    }

    async fn put_if_version(
        &self,
        key: &str,
        expected_version: i64,
        value: &str,
    ) -> Result<i64, StoreError> {
        let mut state = self.state.lock().await;
        let current = state.entries.get(key).map_or(0, |e| e.version);
        if current != expected_version {
            return Err(StoreError::Conflict {
                message: format!(
                    "Version mismatch on {}: expected {}, current {}",
                    key, expected_version, current
                ),
                current_version: current,
            });
        }
        let version = current + 1;
        state.entries.insert(
            key.to_string(),
            StoredValue {
                value: value.to_string(),
                version,
            },
        );
        state.revision += 1;
        Ok(version)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if state.entries.remove(key).is_some() {
            state.revision += 1;
        }
        Ok(())
    }

    async fn revision(&self) -> Result<i64, StoreError> {
        Ok(self.state.lock().await.revision)
    }
}
