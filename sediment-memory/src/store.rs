//! In-memory store adapter implementation.

use async_trait::async_trait;
use bson::Document;
use indexmap::IndexMap;
use mea::rwlock::RwLock;
use std::{collections::HashMap, sync::Arc};

use sediment_core::{
    adapter::{StoreAdapter, StoreAdapterBuilder},
    error::{StoreError, StoreResult},
};

type CollectionMap = IndexMap<String, Document>;
type StoreMap = HashMap<String, CollectionMap>;

/// Thread-safe in-memory document storage.
///
/// Implements [`StoreAdapter`] over async-aware read-write locks; each
/// collection is an insertion-ordered map from identifier to document, so
/// full scans return documents in the order they were first stored.
///
/// The store is cloneable and `Arc`-backed: every clone shares the same
/// underlying data, which makes it easy to hand one instance to a database
/// handle and keep another for inspection in tests.
///
/// # Batch semantics
///
/// [`put_many`](StoreAdapter::put_many) is all-or-nothing: the whole batch
/// lands under a single write lock and has no mid-batch failure mode.
///
/// # Performance
///
/// Scans visit every document in a collection. That is the intended scale
/// of this adapter — development, testing, and small working sets held
/// fully in memory.
#[derive(Default, Clone, Debug)]
pub struct MemoryStore {
    store: Arc<RwLock<StoreMap>>,
}

impl MemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
        }
    }

    /// Creates a builder for constructing a `MemoryStore`.
    pub fn builder() -> MemoryStoreBuilder {
        MemoryStoreBuilder::default()
    }
}

#[async_trait]
impl StoreAdapter for MemoryStore {
    async fn ensure_collection(&self, name: &str) -> StoreResult<()> {
        self.store
            .write()
            .await
            .entry(name.to_string())
            .or_default();

        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        Ok(self
            .store
            .read()
            .await
            .get(collection)
            .and_then(|col| col.get(id))
            .cloned())
    }

    async fn get_all(&self, collection: &str) -> StoreResult<Vec<Document>> {
        Ok(self
            .store
            .read()
            .await
            .get(collection)
            .map(|col| col.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn put(&self, collection: &str, id: &str, document: Document) -> StoreResult<()> {
        let mut store = self.store.write().await;
        store
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), document);

        Ok(())
    }

    async fn put_many(
        &self,
        collection: &str,
        documents: Vec<(String, Document)>,
    ) -> StoreResult<()> {
        let mut store = self.store.write().await;
        let col = store.entry(collection.to_string()).or_default();
        for (id, document) in documents {
            col.insert(id, document);
        }

        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<bool> {
        let mut store = self.store.write().await;
        let col = store
            .get_mut(collection)
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))?;

        // shift_remove keeps the remaining scan order intact.
        Ok(col.shift_remove(id).is_some())
    }

    async fn clear(&self, collection: &str) -> StoreResult<()> {
        let mut store = self.store.write().await;
        let col = store
            .get_mut(collection)
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))?;
        col.clear();

        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> StoreResult<bool> {
        Ok(self.store.write().await.remove(name).is_some())
    }

    async fn has_collection(&self, name: &str) -> StoreResult<bool> {
        Ok(self.store.read().await.contains_key(name))
    }

    async fn list_collections(&self) -> StoreResult<Vec<String>> {
        Ok(self.store.read().await.keys().cloned().collect())
    }
}

/// Builder for [`MemoryStore`] instances.
///
/// Currently carries no options; it exists so callers construct every
/// adapter the same way.
#[derive(Default)]
pub struct MemoryStoreBuilder;

#[async_trait]
impl StoreAdapterBuilder for MemoryStoreBuilder {
    type Adapter = MemoryStore;

    async fn build(self) -> StoreResult<Self::Adapter> {
        Ok(MemoryStore::new())
    }
}
