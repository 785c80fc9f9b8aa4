//! The update engine: computes a new document from an existing document and
//! a declarative update description.
//!
//! [`UpdateSpec::apply`] is a pure function — the input document is never
//! mutated, callers can safely retain prior snapshots. A description is
//! either a **direct replace** (a plain mapping merged field-by-field over a
//! copy) or an **operator** description; operator descriptions always apply
//! in the fixed order `$set`, `$unset`, `$inc`, `$push`, `$pull`,
//! `$addToSet`, so a combined update produces the same result regardless of
//! the order the caller supplied its keys in.
//!
//! The identifier field is immutable: no update mode will overwrite or
//! remove it.
//!
//! # Example
//!
//! ```ignore
//! use bson::doc;
//! use sediment_core::update::UpdateSpec;
//!
//! let update = UpdateSpec::parse(&doc! {
//!     "$inc": { "stock": -1 },
//!     "$addToSet": { "tags": "sale" },
//! })?;
//! let updated = update.apply(&existing);
//! # Ok::<(), sediment_core::error::Error>(())
//! ```

use bson::{Bson, Document};

use crate::{
    document::ID_FIELD,
    error::{Error, Result},
    matcher::values_equal,
};

/// Operator-mode field assignments, grouped per operator.
///
/// Application order is fixed by [`UpdateSpec::apply`], not by the order the
/// operators were supplied.
#[derive(Debug, Clone, Default)]
pub struct UpdateOps {
    /// Fields to overwrite.
    pub set: Vec<(String, Bson)>,
    /// Fields to remove entirely.
    pub unset: Vec<String>,
    /// Numeric fields to increment.
    pub inc: Vec<(String, Bson)>,
    /// Array fields to append to.
    pub push: Vec<(String, Bson)>,
    /// Array fields to remove matching elements from.
    pub pull: Vec<(String, Bson)>,
    /// Array fields to append to unless already present.
    pub add_to_set: Vec<(String, Bson)>,
}

impl UpdateOps {
    fn is_empty(&self) -> bool {
        self.set.is_empty()
            && self.unset.is_empty()
            && self.inc.is_empty()
            && self.push.is_empty()
            && self.pull.is_empty()
            && self.add_to_set.is_empty()
    }
}

/// A declarative description of how to transform one document.
#[derive(Debug, Clone)]
pub enum UpdateSpec {
    /// Direct mode: merge every field into a copy of the document,
    /// overwriting, leaving unspecified fields untouched.
    Replace(Document),
    /// Operator mode: apply the grouped operators in fixed order.
    Operators(UpdateOps),
}

impl UpdateSpec {
    /// Creates a direct-replace description.
    pub fn replace(fields: Document) -> Self {
        UpdateSpec::Replace(fields)
    }

    /// Creates a builder for an operator-mode description.
    pub fn builder() -> UpdateBuilder {
        UpdateBuilder::new()
    }

    /// Parses a declarative update document.
    ///
    /// Mode selection follows the operator sigil: if no key begins with
    /// `$`, the whole description is a direct replace; otherwise every key
    /// must be a known update operator whose operand is a mapping from
    /// field name to operand value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUpdate`] for unknown `$` operators, non-
    /// mapping operands, or descriptions mixing `$` and plain keys.
    pub fn parse(update: &Document) -> Result<Self> {
        let has_operators = update.iter().any(|(k, _)| k.starts_with('$'));
        if !has_operators {
            return Ok(UpdateSpec::Replace(update.clone()));
        }
        if !update.iter().all(|(k, _)| k.starts_with('$')) {
            return Err(Error::InvalidUpdate(
                "update description mixes operators and plain fields".to_string(),
            ));
        }

        let mut ops = UpdateOps::default();
        for (key, value) in update.iter() {
            let fields = match value {
                Bson::Document(fields) => fields,
                other => {
                    return Err(Error::InvalidUpdate(format!(
                        "{key} expects a mapping of fields, got {other:?}"
                    )));
                }
            };
            let pairs = || {
                fields
                    .iter()
                    .map(|(field, operand)| (field.to_string(), operand.clone()))
            };

            match key.as_str() {
                "$set" => ops.set.extend(pairs()),
                "$unset" => ops.unset.extend(fields.iter().map(|(field, _)| field.to_string())),
                "$inc" => ops.inc.extend(pairs()),
                "$push" => ops.push.extend(pairs()),
                "$pull" => ops.pull.extend(pairs()),
                "$addToSet" => ops.add_to_set.extend(pairs()),
                other => {
                    return Err(Error::InvalidUpdate(format!(
                        "unknown update operator {other}"
                    )));
                }
            }
        }

        Ok(UpdateSpec::Operators(ops))
    }

    /// Computes the updated document. Pure: the input is left untouched.
    pub fn apply(&self, document: &Document) -> Document {
        let mut updated = document.clone();

        match self {
            UpdateSpec::Replace(fields) => {
                for (field, value) in fields.iter() {
                    if field != ID_FIELD {
                        updated.insert(field.as_str(), value.clone());
                    }
                }
            }
            UpdateSpec::Operators(ops) => {
                for (field, value) in &ops.set {
                    if field != ID_FIELD {
                        updated.insert(field.as_str(), value.clone());
                    }
                }
                for field in &ops.unset {
                    if field != ID_FIELD {
                        updated.remove(field);
                    }
                }
                for (field, operand) in &ops.inc {
                    if let Some(sum) = numeric_sum(updated.get(field.as_str()), operand) {
                        updated.insert(field.as_str(), sum);
                    }
                }
                for (field, operand) in &ops.push {
                    if let Some(Bson::Array(items)) = updated.get_mut(field.as_str()) {
                        items.push(operand.clone());
                    }
                }
                for (field, operand) in &ops.pull {
                    if let Some(Bson::Array(items)) = updated.get_mut(field.as_str()) {
                        items.retain(|item| !values_equal(item, operand));
                    }
                }
                for (field, operand) in &ops.add_to_set {
                    if let Some(Bson::Array(items)) = updated.get_mut(field.as_str()) {
                        if !items.iter().any(|item| values_equal(item, operand)) {
                            items.push(operand.clone());
                        }
                    }
                }
            }
        }

        updated
    }
}

/// Sums a current value and an increment operand when both are numeric,
/// preserving integer representation when both sides are integers. Returns
/// `None` (the no-op signal) otherwise.
fn numeric_sum(current: Option<&Bson>, operand: &Bson) -> Option<Bson> {
    let current = current?;

    if let (Some(a), Some(b)) = (as_i64(current), as_i64(operand)) {
        return Some(Bson::Int64(a + b));
    }
    match (as_f64(current), as_f64(operand)) {
        (Some(a), Some(b)) => Some(Bson::Double(a + b)),
        _ => None,
    }
}

fn as_i64(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(v) => Some(*v as i64),
        Bson::Int64(v) => Some(*v),
        _ => None,
    }
}

fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(v) => Some(*v as f64),
        Bson::Int64(v) => Some(*v as f64),
        Bson::Double(v) => Some(*v),
        _ => None,
    }
}

/// Fluent builder for operator-mode update descriptions.
#[derive(Debug, Clone, Default)]
pub struct UpdateBuilder {
    ops: UpdateOps,
}

impl UpdateBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites a field with a value.
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.ops.set.push((field.into(), value.into()));
        self
    }

    /// Removes a field entirely.
    pub fn unset(mut self, field: impl Into<String>) -> Self {
        self.ops.unset.push(field.into());
        self
    }

    /// Increments a numeric field.
    pub fn inc(mut self, field: impl Into<String>, amount: impl Into<Bson>) -> Self {
        self.ops.inc.push((field.into(), amount.into()));
        self
    }

    /// Appends a value to an array field.
    pub fn push(mut self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.ops.push.push((field.into(), value.into()));
        self
    }

    /// Removes every matching element from an array field.
    pub fn pull(mut self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.ops.pull.push((field.into(), value.into()));
        self
    }

    /// Appends a value to an array field unless an equal element exists.
    pub fn add_to_set(mut self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.ops.add_to_set.push((field.into(), value.into()));
        self
    }

    /// Builds the final description.
    pub fn build(self) -> UpdateSpec {
        UpdateSpec::Operators(self.ops)
    }

    /// Whether the builder holds no operations yet.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}
