//! Persistent key-value store holding whole JSON collections.
//!
//! [`KeyValueStore`] is the raw backend seam (SQLite on disk, or in memory for
//! tests). [`Store`] layers typed collection reads and writes on top of it.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::StoreError;
use crate::models::{Collection, User, CURRENT_USER_KEY};

/// A raw stored document and the version it was written at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredValue {
    pub value: String,
    pub version: i64,
}

/// Backend storing one string document per key.
///
/// Every key carries a version that starts at 1 on first write and grows by one
/// per write; an absent key has version 0. The store-wide revision grows on
/// every write or removal and lets other processes detect change.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    fn backend_tag(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<StoredValue>, StoreError>;

    /// Overwrite unconditionally and return the new version.
    async fn put(&self, key: &str, value: &str) -> Result<i64, StoreError>;

    /// Write only if the key is still at `expected_version`, else `Conflict`.
    async fn put_if_version(
        &self,
        key: &str,
        expected_version: i64,
        value: &str,
    ) -> Result<i64, StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    async fn revision(&self) -> Result<i64, StoreError>;
}

/// A decoded collection together with the version it was read at.
#[derive(Debug, Clone)]
pub struct Versioned<T> {
    pub value: T,
    pub version: i64,
}

/// Typed access to collections, injected wherever the store is needed.
///
/// A `Store` is one process's handle on the data: clones share the backend and
/// the record of which collections this process already seeded.
#[derive(Clone)]
pub struct Store {
    kv: Arc<dyn KeyValueStore>,
    seed_claims: Arc<Mutex<HashSet<Collection>>>,
}

impl Store {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            seed_claims: Arc::default(),
        }
    }

    /// Open a store backed by an in-memory map.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::default()))
    }

    pub fn backend(&self) -> Arc<dyn KeyValueStore> {
        Arc::clone(&self.kv)
    }

    /// Read a collection; `None` when the key was never written.
    pub async fn read<T: DeserializeOwned>(
        &self,
        collection: Collection,
    ) -> Result<Option<Vec<T>>, StoreError> {
        match self.kv.get(collection.key()).await? {
            Some(stored) => Ok(Some(decode(collection.key(), &stored.value)?)),
            None => Ok(None),
        }
    }

    /// Read a collection with its version; an absent collection reads as empty at version 0.
    pub async fn read_versioned<T: DeserializeOwned>(
        &self,
        collection: Collection,
    ) -> Result<Versioned<Vec<T>>, StoreError> {
        match self.kv.get(collection.key()).await? {
            Some(stored) => Ok(Versioned {
                value: decode(collection.key(), &stored.value)?,
                version: stored.version,
            }),
            None => Ok(Versioned {
                value: Vec::new(),
                version: 0,
            }),
        }
    }

    /// Replace the whole collection.
    pub async fn write<T: Serialize>(
        &self,
        collection: Collection,
        records: &[T],
    ) -> Result<i64, StoreError> {
        let json = serde_json::to_string(records)?;
        self.kv.put(collection.key(), &json).await
    }

    /// Replace the whole collection if nobody wrote it since `expected_version`.
    pub async fn write_if_version<T: Serialize>(
        &self,
        collection: Collection,
        expected_version: i64,
        records: &[T],
    ) -> Result<i64, StoreError> {
        let json = serde_json::to_string(records)?;
        self.kv
            .put_if_version(collection.key(), expected_version, &json)
            .await
    }

    pub async fn remove(&self, collection: Collection) -> Result<(), StoreError> {
        self.kv.delete(collection.key()).await
    }

    /// The logged-in user, if any.
    pub async fn current_user(&self) -> Result<Option<User>, StoreError> {
        match self.kv.get(CURRENT_USER_KEY).await? {
            Some(stored) => Ok(Some(decode(CURRENT_USER_KEY, &stored.value)?)),
            None => Ok(None),
        }
    }

    pub async fn set_current_user(&self, user: &User) -> Result<(), StoreError> {
        let json = serde_json::to_string(user)?;
        self.kv.put(CURRENT_USER_KEY, &json).await?;
        Ok(())
    }

    pub async fn clear_current_user(&self) -> Result<(), StoreError> {
        self.kv.delete(CURRENT_USER_KEY).await
    }

    pub async fn revision(&self) -> Result<i64, StoreError> {
        self.kv.revision().await
    }

    /// Claim the right to seed `collection`; false if this handle already did.
    pub(crate) fn claim_seed(&self, collection: Collection) -> bool {
        self.seed_claims
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(collection)
    }

    pub(crate) fn release_seed(&self, collection: Collection) {
        self.seed_claims
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&collection);
    }
}

fn decode<T: DeserializeOwned>(key: &str, raw: &str) -> Result<T, StoreError> {
    serde_json::from_str(raw).map_err(|e| {
        tracing::error!("Malformed document under {}: {}", key, e);
        StoreError::Deserialization(format!("Malformed document under {}: {}", key, e))
    })
}
