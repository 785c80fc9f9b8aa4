//! Error and result types for document store operations.
//!
//! Two layers of errors exist: [`StoreError`] is what a [`StoreAdapter`]
//! implementation reports, and [`Error`] is the surface raised to callers of
//! the orchestrator, wrapping adapter failures with collection and operation
//! context. "Not found" is deliberately *not* an error anywhere in this
//! crate; point lookups and point mutations encode it as `Ok(None)`.
//!
//! [`StoreAdapter`]: crate::adapter::StoreAdapter

use thiserror::Error;

use crate::validate::ValidationIssue;

/// Represents all possible errors raised by collection and database operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The collection name does not match the accepted pattern
    /// (a letter or underscore followed by letters, digits, underscores or
    /// hyphens). Raised before any store interaction.
    #[error("invalid collection name: {0:?}")]
    InvalidCollectionName(String),
    /// A duplicate-checked insert found the identifier already present in the
    /// target collection. The existing document is left untouched.
    #[error("document {id} already exists in collection {collection}")]
    DuplicateKey {
        /// Identifier of the rejected document.
        id: String,
        /// Collection the insert targeted.
        collection: String,
    },
    /// A configured schema validator rejected the document before any store
    /// mutation. Carries the full list of issues.
    #[error("validation failed with {} issue(s)", .0.len())]
    Validation(Vec<ValidationIssue>),
    /// A query document could not be parsed, or a query operand was
    /// malformed (e.g. a non-array `$in` operand or an invalid `$regex`
    /// pattern).
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    /// An update description could not be parsed (unknown operator, operand
    /// of the wrong shape, or `$`-prefixed and plain keys mixed in one
    /// description).
    #[error("invalid update: {0}")]
    InvalidUpdate(String),
    /// The document violates a structural invariant, such as a missing or
    /// non-string identifier field.
    #[error("invalid document: {0}")]
    InvalidDocument(String),
    /// A migration chain was malformed or a migration step failed.
    #[error("migration error: {0}")]
    Migration(String),
    /// An adapter-reported failure, wrapped with the collection and
    /// operation it occurred in. The adapter error is preserved as the
    /// source.
    #[error("storage failure in {operation} on collection {collection}")]
    Storage {
        /// Collection the failing operation targeted.
        collection: String,
        /// Name of the orchestrator operation that failed.
        operation: &'static str,
        /// The underlying adapter error.
        #[source]
        source: StoreError,
    },
    /// Serialization error while converting documents to or from JSON.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Wraps an adapter error with collection and operation context.
    pub(crate) fn storage(collection: &str, operation: &'static str, source: StoreError) -> Self {
        Error::Storage {
            collection: collection.to_string(),
            operation,
            source,
        }
    }
}

/// A specialized `Result` type for document store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by store adapter implementations.
///
/// Adapters are encouraged to map their native failures onto these variants;
/// the orchestrator propagates them unchanged inside [`Error::Storage`],
/// without retrying or suppressing anything.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The named collection does not exist in the backing store.
    #[error("collection not found: {0}")]
    CollectionNotFound(String),
    /// An I/O failure in the backing store.
    #[error("i/o failure: {0}")]
    Io(String),
    /// Any other backend-specific failure.
    #[error("{0}")]
    Backend(String),
}

/// A specialized `Result` type for store adapter operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<bson::error::Error> for Error {
    fn from(err: bson::error::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
