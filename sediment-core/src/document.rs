//! Document representation and identifier handling.
//!
//! A document is an ordered mapping from field names to BSON values
//! ([`bson::Document`]), carrying exactly one mandatory identifier field
//! ([`ID_FIELD`]) that holds a non-empty string. The identifier is immutable
//! once assigned and doubles as the document's key in the backing store.
//!
//! This module provides the identifier helpers used by the orchestrator,
//! dotted-path resolution for the query language, and JSON interop for
//! callers that live on `serde_json` values rather than BSON.
//!
//! # Example
//!
//! ```ignore
//! use bson::doc;
//! use sediment_core::document;
//!
//! let mut product = doc! { "name": "Laptop", "price": 1200 };
//! let id = document::ensure_id(&mut product)?;
//! assert_eq!(document::id_of(&product), Some(id.as_str()));
//! # Ok::<(), sediment_core::error::Error>(())
//! ```

use bson::{Bson, Document};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Name of the mandatory identifier field.
pub const ID_FIELD: &str = "_id";

/// Returns the document's identifier, if it carries a well-formed one
/// (a non-empty string under [`ID_FIELD`]).
pub fn id_of(document: &Document) -> Option<&str> {
    match document.get(ID_FIELD) {
        Some(Bson::String(id)) if !id.is_empty() => Some(id.as_str()),
        _ => None,
    }
}

/// Returns the document's identifier, or an
/// [`Error::InvalidDocument`] if the field is missing, empty, or not a
/// string.
pub fn require_id(document: &Document) -> Result<&str> {
    id_of(document).ok_or_else(|| {
        Error::InvalidDocument(format!(
            "document must carry a non-empty string {ID_FIELD} field"
        ))
    })
}

/// Ensures the document carries an identifier, assigning a fresh UUID v4
/// string when the field is absent.
///
/// # Errors
///
/// Returns [`Error::InvalidDocument`] when an identifier field is present
/// but is not a non-empty string; a malformed identifier is never silently
/// replaced.
pub fn ensure_id(document: &mut Document) -> Result<String> {
    if document.contains_key(ID_FIELD) {
        return require_id(document).map(str::to_string);
    }

    let id = Uuid::new_v4().to_string();
    document.insert(ID_FIELD, Bson::String(id.clone()));

    Ok(id)
}

/// Resolves a dotted field path against a document, segment by segment.
///
/// A plain field name resolves by literal top-level lookup. A path such as
/// `"dimensions.weight.unit"` descends through nested documents; the result
/// is `None` when any segment is absent or its parent is not a nested
/// document.
pub fn resolve_path<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;

    for segment in segments {
        match current {
            Bson::Document(nested) => current = nested.get(segment)?,
            _ => return None,
        }
    }

    Some(current)
}

/// Converts a document to a JSON value.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_json(document: &Document) -> Result<Value> {
    Ok(serde_json::to_value(document)?)
}

/// Creates a document from a JSON value.
///
/// # Errors
///
/// Returns an error if the value is not a JSON object or deserialization
/// fails.
pub fn from_json(value: Value) -> Result<Document> {
    match bson::ser::serialize_to_bson(&value)? {
        Bson::Document(document) => Ok(document),
        other => Err(Error::Serialization(format!(
            "expected a JSON object, got {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn id_of_accepts_only_non_empty_strings() {
        assert_eq!(id_of(&doc! { "_id": "p-1" }), Some("p-1"));
        assert_eq!(id_of(&doc! { "_id": "" }), None);
        assert_eq!(id_of(&doc! { "_id": 42 }), None);
        assert_eq!(id_of(&doc! { "name": "no id" }), None);
    }

    #[test]
    fn ensure_id_assigns_when_absent() {
        let mut document = doc! { "name": "widget" };
        let id = ensure_id(&mut document).unwrap();
        assert!(!id.is_empty());
        assert_eq!(id_of(&document), Some(id.as_str()));
    }

    #[test]
    fn ensure_id_keeps_existing_identifier() {
        let mut document = doc! { "_id": "fixed", "name": "widget" };
        assert_eq!(ensure_id(&mut document).unwrap(), "fixed");
    }

    #[test]
    fn ensure_id_rejects_malformed_identifier() {
        let mut document = doc! { "_id": 7 };
        assert!(matches!(
            ensure_id(&mut document),
            Err(Error::InvalidDocument(_))
        ));
    }

    #[test]
    fn resolve_path_walks_nested_documents() {
        let document = doc! {
            "name": "Laptop",
            "dimensions": { "weight": { "value": 2.5, "unit": "kg" } },
        };

        assert_eq!(
            resolve_path(&document, "dimensions.weight.unit"),
            Some(&Bson::String("kg".to_string()))
        );
        assert_eq!(resolve_path(&document, "name"), Some(&Bson::String("Laptop".to_string())));
        assert_eq!(resolve_path(&document, "dimensions.height"), None);
        // A non-document parent stops resolution.
        assert_eq!(resolve_path(&document, "name.length"), None);
        assert_eq!(resolve_path(&document, "missing.anything"), None);
    }

    #[test]
    fn json_round_trip() {
        let document = doc! { "_id": "p-1", "tags": ["a", "b"], "stock": 3 };
        let json = to_json(&document).unwrap();
        assert_eq!(from_json(json).unwrap(), document);
    }
}
