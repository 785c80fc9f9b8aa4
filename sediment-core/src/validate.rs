//! Pluggable schema validation for documents.
//!
//! The core does not know anything about schemas. It depends only on the
//! [`Validator`] trait: a collection configured with a validator runs every
//! document through it before persisting, and a rejection aborts the write
//! with [`Error::Validation`](crate::error::Error::Validation) carrying the
//! issue list. Any concrete schema system can implement this trait.

use bson::Document;
use std::fmt::{self, Debug, Display};

/// A single schema violation, locating the offending field and describing
/// the problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Path of the offending field (dotted for nested fields).
    pub path: String,
    /// Human-readable description of the violation.
    pub message: String,
}

impl ValidationIssue {
    /// Creates a new issue for the given field path.
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// A schema check invoked before writes.
///
/// On success the validator returns the *normalized* document, which is what
/// gets persisted — this lets implementations fill defaults or coerce types.
/// On failure it returns every issue it found; the write is never partially
/// applied.
pub trait Validator: Send + Sync + Debug {
    /// Validates (and possibly normalizes) a document.
    fn validate(&self, document: &Document) -> std::result::Result<Document, Vec<ValidationIssue>>;
}
