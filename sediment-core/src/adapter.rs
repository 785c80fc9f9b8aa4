//! Keyed persistence abstraction the orchestrator reads from and writes to.
//!
//! The core never talks to storage directly; every persistence concern goes
//! through the [`StoreAdapter`] trait. The contract is deliberately small —
//! point lookups, full scans, and per-key writes on named collections — so
//! that anything from an in-process map to a remote key-value service can
//! back a database. Query evaluation, sorting and pagination are *not*
//! adapter concerns; they run in the core against full-scan snapshots.
//!
//! # Thread safety
//!
//! Implementations must be `Send + Sync` and tolerate concurrent calls from
//! multiple async tasks. The exact locking model is implementation-specific.
//!
//! # Error handling
//!
//! Operations return [`StoreResult`]; the orchestrator wraps any failure
//! with collection and operation context and propagates it unchanged —
//! adapters should not retry internally on behalf of the core.

use async_trait::async_trait;
use bson::Document;
use std::fmt::Debug;

use crate::error::StoreResult;

/// Abstract interface for keyed document storage.
///
/// One adapter instance backs a whole database; collections are addressed
/// by name on every call. Scan order of [`get_all`](Self::get_all) is
/// backend-defined and the core assumes nothing about it.
#[async_trait]
pub trait StoreAdapter: Send + Sync + Debug {
    /// Idempotently materializes backing storage for a named collection.
    async fn ensure_collection(&self, name: &str) -> StoreResult<()>;

    /// Point lookup by identifier. Returns `None` when the key (or the
    /// collection) is absent.
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;

    /// Full scan of a collection, in backend-defined order. An absent
    /// collection scans as empty.
    async fn get_all(&self, collection: &str) -> StoreResult<Vec<Document>>;

    /// Inserts or overwrites one document by identifier.
    async fn put(&self, collection: &str, id: &str, document: Document) -> StoreResult<()>;

    /// Batch insert/overwrite. Partial-failure semantics are
    /// backend-defined; implementations must document whether the batch is
    /// atomic or best-effort.
    async fn put_many(
        &self,
        collection: &str,
        documents: Vec<(String, Document)>,
    ) -> StoreResult<()>;

    /// Deletes one document by identifier. Returns whether a document was
    /// actually removed.
    async fn delete(&self, collection: &str, id: &str) -> StoreResult<bool>;

    /// Removes every document while keeping the collection itself.
    async fn clear(&self, collection: &str) -> StoreResult<()>;

    /// Removes the collection and all its documents. Returns whether the
    /// collection existed.
    async fn drop_collection(&self, name: &str) -> StoreResult<bool>;

    /// Whether a collection with this name exists.
    async fn has_collection(&self, name: &str) -> StoreResult<bool>;

    /// Names of all collections in the store.
    async fn list_collections(&self) -> StoreResult<Vec<String>>;
}

/// Factory trait for constructing adapter instances.
#[async_trait]
pub trait StoreAdapterBuilder {
    /// The adapter type this builder produces.
    type Adapter: StoreAdapter;

    /// Builds and returns the adapter.
    async fn build(self) -> StoreResult<Self::Adapter>;
}
