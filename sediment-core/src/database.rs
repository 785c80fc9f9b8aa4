//! Database handles and the collection registry.
//!
//! A [`Database`] owns one store adapter and an explicit registry of open
//! collection handles — constructed once per handle and passed explicitly,
//! never ambient or global. Opening a collection validates its name,
//! idempotently materializes backing storage, and caches the shared handle
//! so every caller sees the same [`Collection`].

use log::debug;
use mea::rwlock::RwLock;
use once_cell::sync::Lazy;
use regex::Regex;
use std::{collections::HashMap, sync::Arc};

use crate::{
    adapter::StoreAdapter,
    collection::Collection,
    error::{Error, Result},
    validate::Validator,
};

/// A collection name starts with a letter or underscore, followed by
/// letters, digits, underscores or hyphens.
static COLLECTION_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new("^[A-Za-z_][A-Za-z0-9_-]*$").expect("collection name pattern"));

/// Checks a collection name against the accepted pattern, before any store
/// interaction.
pub fn validate_collection_name(name: &str) -> Result<()> {
    if COLLECTION_NAME.is_match(name) {
        Ok(())
    } else {
        Err(Error::InvalidCollectionName(name.to_string()))
    }
}

/// An open database: one adapter, one registry of collection handles.
#[derive(Debug)]
pub struct Database {
    adapter: Arc<dyn StoreAdapter>,
    collections: RwLock<HashMap<String, Arc<Collection>>>,
}

impl Database {
    /// Creates a database over a concrete adapter.
    pub fn new(adapter: impl StoreAdapter + 'static) -> Self {
        Self::with_adapter(Arc::new(adapter))
    }

    /// Creates a database over an already-shared adapter.
    pub fn with_adapter(adapter: Arc<dyn StoreAdapter>) -> Self {
        Self {
            adapter,
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// Opens (or returns the cached handle for) a named collection.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidCollectionName`] when the name is malformed;
    /// [`Error::Storage`] when materializing backing storage fails.
    pub async fn collection(&self, name: &str) -> Result<Arc<Collection>> {
        self.open(name, None).await
    }

    /// Opens a named collection with a schema validator installed.
    ///
    /// The returned handle replaces any cached handle for the same name, so
    /// later [`collection`](Self::collection) calls see the validated one.
    pub async fn collection_with_validator(
        &self,
        name: &str,
        validator: Arc<dyn Validator>,
    ) -> Result<Arc<Collection>> {
        self.open(name, Some(validator)).await
    }

    async fn open(
        &self,
        name: &str,
        validator: Option<Arc<dyn Validator>>,
    ) -> Result<Arc<Collection>> {
        validate_collection_name(name)?;

        if validator.is_none() {
            if let Some(handle) = self.collections.read().await.get(name) {
                return Ok(handle.clone());
            }
        }

        self.adapter
            .ensure_collection(name)
            .await
            .map_err(|err| Error::storage(name, "ensure_collection", err))?;

        let handle = Arc::new(Collection::new(
            name.to_string(),
            self.adapter.clone(),
            validator,
        ));
        self.collections
            .write()
            .await
            .insert(name.to_string(), handle.clone());
        debug!("opened collection {name}");

        Ok(handle)
    }

    /// Drops a collection from the store and evicts its cached handle.
    /// Returns whether the collection existed.
    pub async fn drop_collection(&self, name: &str) -> Result<bool> {
        validate_collection_name(name)?;
        self.collections.write().await.remove(name);

        self.adapter
            .drop_collection(name)
            .await
            .map_err(|err| Error::storage(name, "drop_collection", err))
    }

    /// Whether a collection with this name exists in the store.
    pub async fn has_collection(&self, name: &str) -> Result<bool> {
        validate_collection_name(name)?;

        self.adapter
            .has_collection(name)
            .await
            .map_err(|err| Error::storage(name, "has_collection", err))
    }

    /// Names of all collections in the store.
    pub async fn list_collections(&self) -> Result<Vec<String>> {
        self.adapter
            .list_collections()
            .await
            .map_err(|err| Error::storage("*", "list_collections", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_collection_names() {
        for name in ["users", "_private", "a", "Order-Items_2024", "x9"] {
            assert!(validate_collection_name(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn rejects_malformed_collection_names() {
        for name in ["", "9users", "-dash", "with space", "dotted.name", "emoji✨"] {
            assert!(
                matches!(
                    validate_collection_name(name),
                    Err(Error::InvalidCollectionName(_))
                ),
                "{name}"
            );
        }
    }
}
