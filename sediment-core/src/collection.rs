//! Collection handles: the CRUD surface over one named collection.
//!
//! A [`Collection`] binds the predicate and update engines to a store
//! adapter and an optional schema validator. Handles are created through
//! [`Database`](crate::database::Database) and shared by all callers; they
//! hold no per-operation state of their own.
//!
//! Every multi-document operation reads a full snapshot of the collection
//! and computes against it. There is no locking or conflict detection: when
//! another logical operation mutates the store between the snapshot read
//! and this operation's writes, the later write wins. Callers needing
//! stronger guarantees layer them on top.
//!
//! All returned documents are owned defensive copies; mutating them never
//! affects stored state.

use bson::Document;
use log::debug;
use std::sync::Arc;

use crate::{
    adapter::StoreAdapter,
    document,
    error::{Error, Result},
    matcher,
    page::{Page, PaginationParams},
    query::{Expr, Query, SortSpec},
    update::UpdateSpec,
    validate::Validator,
};

/// A handle to one named collection, exposing the CRUD surface.
#[derive(Debug, Clone)]
pub struct Collection {
    name: String,
    adapter: Arc<dyn StoreAdapter>,
    validator: Option<Arc<dyn Validator>>,
}

impl Collection {
    pub(crate) fn new(
        name: String,
        adapter: Arc<dyn StoreAdapter>,
        validator: Option<Arc<dyn Validator>>,
    ) -> Self {
        Self {
            name,
            adapter,
            validator,
        }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Assigns an identifier when absent and runs the configured validator.
    ///
    /// Validation happens before any store interaction; a rejection leaves
    /// the collection untouched. The validator's normalized document is what
    /// gets persisted, but it must preserve the identifier.
    fn prepare(&self, mut doc: Document) -> Result<(String, Document)> {
        let id = document::ensure_id(&mut doc)?;

        let doc = match &self.validator {
            Some(validator) => {
                let normalized = validator.validate(&doc).map_err(Error::Validation)?;
                if document::require_id(&normalized)? != id {
                    return Err(Error::InvalidDocument(
                        "validator must not change the document identifier".to_string(),
                    ));
                }
                normalized
            }
            None => doc,
        };

        Ok((id, doc))
    }

    async fn snapshot(&self, operation: &'static str) -> Result<Vec<Document>> {
        self.adapter
            .get_all(&self.name)
            .await
            .map_err(|err| Error::storage(&self.name, operation, err))
    }

    /// Inserts a document, enforcing identifier uniqueness.
    ///
    /// Assigns a fresh identifier when the document has none, validates,
    /// and performs a point lookup before persisting. Returns a copy of the
    /// stored document.
    ///
    /// # Errors
    ///
    /// [`Error::DuplicateKey`] when the identifier is already present; the
    /// existing document is left untouched.
    pub async fn insert(&self, doc: Document) -> Result<Document> {
        let (id, prepared) = self.prepare(doc)?;

        let existing = self
            .adapter
            .get(&self.name, &id)
            .await
            .map_err(|err| Error::storage(&self.name, "insert", err))?;
        if existing.is_some() {
            return Err(Error::DuplicateKey {
                id,
                collection: self.name.clone(),
            });
        }

        self.persist(&id, prepared, "insert").await
    }

    /// Inserts a document without the duplicate-key lookup.
    ///
    /// The caller accepts the risk of silently overwriting an existing
    /// document with the same identifier at the store layer.
    pub async fn insert_unchecked(&self, doc: Document) -> Result<Document> {
        let (id, prepared) = self.prepare(doc)?;
        self.persist(&id, prepared, "insert_unchecked").await
    }

    async fn persist(
        &self,
        id: &str,
        doc: Document,
        operation: &'static str,
    ) -> Result<Document> {
        self.adapter
            .put(&self.name, id, doc.clone())
            .await
            .map_err(|err| Error::storage(&self.name, operation, err))?;
        debug!("{}: stored document {} in {}", operation, id, self.name);

        Ok(doc)
    }

    /// Inserts a batch of documents.
    ///
    /// Identifier assignment and validation run for every document before
    /// the first store call, so a core-level rejection never leaves a
    /// partial batch. Partial failure *inside* the store write is
    /// adapter-defined.
    pub async fn insert_many(&self, docs: Vec<Document>) -> Result<Vec<Document>> {
        let mut keyed = Vec::with_capacity(docs.len());
        for doc in docs {
            let (id, prepared) = self.prepare(doc)?;
            keyed.push((id, prepared));
        }

        self.adapter
            .put_many(&self.name, keyed.clone())
            .await
            .map_err(|err| Error::storage(&self.name, "insert_many", err))?;
        debug!("insert_many: stored {} documents in {}", keyed.len(), self.name);

        Ok(keyed.into_iter().map(|(_, doc)| doc).collect())
    }

    /// Runs a query through the fixed pipeline: full scan, predicate
    /// filter, stable multi-key sort, skip, limit.
    pub async fn find(&self, query: &Query) -> Result<Vec<Document>> {
        let snapshot = self.snapshot("find").await?;
        let mut matched = matcher::filter(snapshot, query.filter.as_ref())?;
        matcher::sort_documents(&mut matched, &query.sort);

        Ok(matched
            .into_iter()
            .skip(query.offset.unwrap_or(0))
            .take(query.limit.unwrap_or(usize::MAX))
            .collect())
    }

    /// Runs a query with an effective limit of one, returning the first
    /// match or `None`.
    pub async fn find_one(&self, query: &Query) -> Result<Option<Document>> {
        let mut limited = query.clone();
        limited.limit = Some(1);

        Ok(self.find(&limited).await?.into_iter().next())
    }

    /// Point lookup by identifier; bypasses the predicate engine entirely.
    pub async fn find_by_id(&self, id: &str) -> Result<Option<Document>> {
        self.adapter
            .get(&self.name, id)
            .await
            .map_err(|err| Error::storage(&self.name, "find_by_id", err))
    }

    /// Counts the documents matching the filter. Sorting and pagination do
    /// not apply to counts.
    pub async fn count(&self, filter: Option<&Expr>) -> Result<usize> {
        let snapshot = self.snapshot("count").await?;

        Ok(matcher::filter(snapshot, filter)?.len())
    }

    /// Applies an update to every document matching the filter and persists
    /// each result. Returns the number of documents updated.
    pub async fn update(&self, filter: Option<&Expr>, update: &UpdateSpec) -> Result<u64> {
        let snapshot = self.snapshot("update").await?;
        let targets = matcher::filter(snapshot, filter)?;

        let mut updated = 0u64;
        for target in targets {
            let id = document::require_id(&target)?.to_string();
            self.adapter
                .put(&self.name, &id, update.apply(&target))
                .await
                .map_err(|err| Error::storage(&self.name, "update", err))?;
            updated += 1;
        }
        debug!("update: rewrote {} document(s) in {}", updated, self.name);

        Ok(updated)
    }

    /// Applies an update to the first document matching the filter.
    /// Returns the updated document, or `None` when nothing matched.
    pub async fn update_one(
        &self,
        filter: Option<&Expr>,
        update: &UpdateSpec,
    ) -> Result<Option<Document>> {
        let snapshot = self.snapshot("update_one").await?;
        let target = matcher::filter(snapshot, filter)?.into_iter().next();

        match target {
            Some(target) => {
                let id = document::require_id(&target)?.to_string();
                let updated = update.apply(&target);
                self.adapter
                    .put(&self.name, &id, updated.clone())
                    .await
                    .map_err(|err| Error::storage(&self.name, "update_one", err))?;

                Ok(Some(updated))
            }
            None => Ok(None),
        }
    }

    /// Applies an update to the document with this identifier. Returns the
    /// updated document, or `None` when the identifier is absent.
    pub async fn update_by_id(&self, id: &str, update: &UpdateSpec) -> Result<Option<Document>> {
        let target = self.find_by_id(id).await?;

        match target {
            Some(target) => {
                let updated = update.apply(&target);
                self.adapter
                    .put(&self.name, id, updated.clone())
                    .await
                    .map_err(|err| Error::storage(&self.name, "update_by_id", err))?;

                Ok(Some(updated))
            }
            None => Ok(None),
        }
    }

    /// Removes every document matching the filter. Returns the number
    /// removed.
    pub async fn delete(&self, filter: Option<&Expr>) -> Result<u64> {
        let snapshot = self.snapshot("delete").await?;
        let targets = matcher::filter(snapshot, filter)?;

        let mut removed = 0u64;
        for target in targets {
            let id = document::require_id(&target)?;
            if self
                .adapter
                .delete(&self.name, id)
                .await
                .map_err(|err| Error::storage(&self.name, "delete", err))?
            {
                removed += 1;
            }
        }
        debug!("delete: removed {} document(s) from {}", removed, self.name);

        Ok(removed)
    }

    /// Removes the first document matching the filter. Returns the removed
    /// document, or `None` when nothing matched.
    pub async fn delete_one(&self, filter: Option<&Expr>) -> Result<Option<Document>> {
        let snapshot = self.snapshot("delete_one").await?;
        let target = matcher::filter(snapshot, filter)?.into_iter().next();

        match target {
            Some(target) => {
                let id = document::require_id(&target)?;
                self.adapter
                    .delete(&self.name, id)
                    .await
                    .map_err(|err| Error::storage(&self.name, "delete_one", err))?;

                Ok(Some(target))
            }
            None => Ok(None),
        }
    }

    /// Removes the document with this identifier. Returns the removed
    /// document, or `None` when the identifier is absent.
    pub async fn delete_by_id(&self, id: &str) -> Result<Option<Document>> {
        let target = self.find_by_id(id).await?;

        match target {
            Some(target) => {
                self.adapter
                    .delete(&self.name, id)
                    .await
                    .map_err(|err| Error::storage(&self.name, "delete_by_id", err))?;

                Ok(Some(target))
            }
            None => Ok(None),
        }
    }

    /// Removes all documents while keeping the collection's existence.
    pub async fn clear(&self) -> Result<()> {
        self.adapter
            .clear(&self.name)
            .await
            .map_err(|err| Error::storage(&self.name, "clear", err))
    }

    /// Removes the collection itself from the store.
    ///
    /// The handle stays usable afterwards; writes will re-materialize the
    /// collection depending on the adapter.
    pub async fn drop(&self) -> Result<()> {
        self.adapter
            .drop_collection(&self.name)
            .await
            .map_err(|err| Error::storage(&self.name, "drop", err))?;
        debug!("drop: removed collection {}", self.name);

        Ok(())
    }

    /// Returns one page of the filtered, sorted result set along with
    /// navigation metadata.
    pub async fn find_page(
        &self,
        filter: Option<&Expr>,
        sort: &[SortSpec],
        params: &PaginationParams,
    ) -> Result<Page<Document>> {
        let snapshot = self.snapshot("find_page").await?;
        let mut matched = matcher::filter(snapshot, filter)?;
        matcher::sort_documents(&mut matched, sort);

        Ok(params.paginate(matched))
    }
}
