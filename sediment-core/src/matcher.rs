//! The predicate engine: evaluates query expressions against documents.
//!
//! Evaluation is pure — a document and an expression go in, a boolean comes
//! out, and the document is never mutated. [`filter`] applies an optional
//! expression to a list of documents, preserving their order; an absent
//! filter matches everything.
//!
//! Comparison semantics are defined by the [`Comparable`] view over BSON:
//! numbers compare by value across integer and float representations,
//! arrays are equal only element-wise in order, and nested documents are
//! equal only with identical key sets. The same view backs the multi-key
//! document sort used by the find pipeline.

use std::{cmp::Ordering, collections::HashMap};

use bson::{Bson, Document, datetime::DateTime};
use regex::{Regex, RegexBuilder};

use crate::{
    document::resolve_path,
    error::{Error, Result},
    query::{Expr, FieldOp, QueryVisitor, SortDirection, SortSpec},
};

/// Type-erased, comparable representation of BSON values.
///
/// Wraps borrowed BSON values and provides the structural equality and
/// ordering used by the query language. All numeric widths normalize to
/// f64 so that `5`, `5i64` and `5.0` compare equal.
#[derive(Debug)]
enum Comparable<'a> {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Numeric value (all integers and floats normalized to f64).
    Number(f64),
    /// DateTime value.
    DateTime(DateTime),
    /// String value.
    String(&'a str),
    /// Array of comparable values (order-sensitive).
    Array(Vec<Comparable<'a>>),
    /// Map of comparable values (key-set-sensitive, order-insensitive).
    Map(HashMap<&'a str, Comparable<'a>>),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Array(arr) => {
                Comparable::Array(arr.iter().map(Comparable::from).collect::<Vec<_>>())
            }
            Bson::Document(doc) => Comparable::Map(
                doc.iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<HashMap<_, _>>(),
            ),
            _ => Comparable::Null, // Other types are not comparable
        }
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Structural equality between two BSON values, as defined by the query
/// language: numbers compare by value, arrays element-wise in order, nested
/// documents by key set. This is the equality behind `$eq`, `$in`,
/// `$contains`, `$pull` and `$addToSet`.
pub fn values_equal(a: &Bson, b: &Bson) -> bool {
    Comparable::from(a) == Comparable::from(b)
}

/// Evaluates a query expression against a single document.
///
/// # Errors
///
/// Returns [`Error::InvalidQuery`] for operands that cannot be evaluated
/// (an invalid `$regex` pattern, a non-array `$in`/`$nin` operand built
/// without the parser's checks).
pub fn matches(document: &Document, expr: &Expr) -> Result<bool> {
    DocumentMatcher::new(document).evaluate(expr)
}

/// Filters documents against an optional expression, preserving order.
///
/// An absent filter matches every document; the input comes back unchanged
/// in its original order.
pub fn filter(documents: Vec<Document>, expr: Option<&Expr>) -> Result<Vec<Document>> {
    let Some(expr) = expr else {
        return Ok(documents);
    };

    let mut matched = Vec::with_capacity(documents.len());
    for document in documents {
        if matches(&document, expr)? {
            matched.push(document);
        }
    }

    Ok(matched)
}

/// Stable multi-key sort over documents.
///
/// Comparison proceeds spec by spec; the first field that differentiates a
/// pair decides their order, and full ties keep their prior relative order.
/// A document missing the sort field orders after any document that has it,
/// in both directions; incomparable present values compare equal and so
/// also keep their prior order.
pub fn sort_documents(documents: &mut [Document], sort: &[SortSpec]) {
    if sort.is_empty() {
        return;
    }

    documents.sort_by(|a, b| {
        for spec in sort {
            let ordering = compare_for_sort(
                resolve_path(a, &spec.field),
                resolve_path(b, &spec.field),
                spec.direction,
            );
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

fn compare_for_sort(a: Option<&Bson>, b: Option<&Bson>, direction: SortDirection) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        // Missing sorts last regardless of direction.
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => {
            let ordering = Comparable::from(a)
                .partial_cmp(&Comparable::from(b))
                .unwrap_or(Ordering::Equal);
            match direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        }
    }
}

/// Visitor implementation evaluating an expression tree against one document.
struct DocumentMatcher<'a> {
    document: &'a Document,
}

impl<'a> DocumentMatcher<'a> {
    fn new(document: &'a Document) -> Self {
        Self { document }
    }

    fn evaluate(&mut self, expr: &Expr) -> Result<bool> {
        self.visit_expr(expr)
    }
}

impl<'a> QueryVisitor for DocumentMatcher<'a> {
    type Output = bool;
    type Error = Error;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<bool> {
        for expr in exprs {
            if !self.visit_expr(expr)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<bool> {
        for expr in exprs {
            if self.visit_expr(expr)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<bool> {
        Ok(!self.visit_expr(expr)?)
    }

    fn visit_exists(&mut self, path: &str, should_exist: bool) -> Result<bool> {
        Ok(resolve_path(self.document, path).is_some() == should_exist)
    }

    fn visit_field(&mut self, path: &str, op: &FieldOp, operand: &Bson) -> Result<bool> {
        let value = resolve_path(self.document, path);

        match op {
            FieldOp::Eq => Ok(value.map(|v| values_equal(v, operand)).unwrap_or(false)),
            FieldOp::Ne => Ok(value.map(|v| !values_equal(v, operand)).unwrap_or(true)),
            FieldOp::Gt | FieldOp::Gte | FieldOp::Lt | FieldOp::Lte => match value {
                // Absent and null values are outside every range.
                None | Some(Bson::Null) => Ok(false),
                Some(v) => {
                    match Comparable::from(v).partial_cmp(&Comparable::from(operand)) {
                        Some(ordering) => Ok(match op {
                            FieldOp::Gt => ordering == Ordering::Greater,
                            FieldOp::Gte => ordering != Ordering::Less,
                            FieldOp::Lt => ordering == Ordering::Less,
                            FieldOp::Lte => ordering != Ordering::Greater,
                            _ => unreachable!(),
                        }),
                        None => Ok(false),
                    }
                }
            },
            FieldOp::In | FieldOp::Nin => {
                let Bson::Array(items) = operand else {
                    return Err(Error::InvalidQuery(format!(
                        "membership test on {path:?} expects an array operand"
                    )));
                };
                let found = value
                    .map(|v| items.iter().any(|item| values_equal(v, item)))
                    .unwrap_or(false);
                Ok(if *op == FieldOp::In { found } else { !found })
            }
            FieldOp::Regex => {
                let pattern = compile_regex(operand)?;
                match value {
                    Some(Bson::String(s)) => Ok(pattern.is_match(s)),
                    _ => Ok(false),
                }
            }
            FieldOp::StartsWith | FieldOp::EndsWith => match (value, operand) {
                (Some(Bson::String(s)), Bson::String(affix)) => Ok(match op {
                    FieldOp::StartsWith => s.starts_with(affix),
                    _ => s.ends_with(affix),
                }),
                _ => Ok(false),
            },
            FieldOp::Contains => match value {
                Some(Bson::Array(items)) => {
                    Ok(items.iter().any(|item| values_equal(item, operand)))
                }
                _ => Ok(false),
            },
        }
    }
}

/// Compiles a `$regex` operand: either a pattern-source string or a
/// precompiled regular-expression value (whose `i` option is honored).
fn compile_regex(operand: &Bson) -> Result<Regex> {
    let (pattern, options) = match operand {
        Bson::String(pattern) => (pattern.as_str(), ""),
        Bson::RegularExpression(re) => (re.pattern.as_str(), re.options.as_str()),
        other => {
            return Err(Error::InvalidQuery(format!(
                "$regex expects a pattern, got {other:?}"
            )));
        }
    };

    RegexBuilder::new(pattern)
        .case_insensitive(options.contains('i'))
        .build()
        .map_err(|err| Error::InvalidQuery(format!("invalid $regex pattern: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Filter;
    use bson::doc;

    fn product() -> Document {
        doc! {
            "_id": "p-1",
            "name": "Laptop",
            "price": 1200,
            "stock": 5,
            "tags": ["electronics", "sale"],
            "dimensions": { "weight": 2.5, "unit": "kg" },
            "discontinued": Bson::Null,
        }
    }

    fn matches_doc(query: Document, document: &Document) -> bool {
        let expr = Expr::parse(&query).unwrap();
        matches(document, &expr).unwrap()
    }

    #[test]
    fn empty_query_matches_everything() {
        assert!(matches_doc(doc! {}, &product()));
        let docs = vec![doc! { "a": 1 }, doc! { "b": 2 }];
        assert_eq!(filter(docs.clone(), None).unwrap(), docs);
    }

    #[test]
    fn filter_preserves_original_order() {
        let docs = vec![
            doc! { "n": 3 },
            doc! { "n": 1 },
            doc! { "n": 2 },
        ];
        let expr = Expr::parse(&doc! { "n": { "$lte": 2 } }).unwrap();
        let filtered = filter(docs, Some(&expr)).unwrap();
        assert_eq!(filtered, vec![doc! { "n": 1 }, doc! { "n": 2 }]);
    }

    #[test]
    fn literal_equality_is_structural() {
        let p = product();
        assert!(matches_doc(doc! { "name": "Laptop" }, &p));
        assert!(!matches_doc(doc! { "name": "Phone" }, &p));
        // Nested documents compare by key set and values, not identity.
        assert!(matches_doc(
            doc! { "dimensions": { "weight": 2.5, "unit": "kg" } },
            &p
        ));
        assert!(!matches_doc(doc! { "dimensions": { "weight": 2.5 } }, &p));
    }

    #[test]
    fn array_equality_is_order_sensitive() {
        let p = product();
        assert!(matches_doc(doc! { "tags": ["electronics", "sale"] }, &p));
        assert!(!matches_doc(doc! { "tags": ["sale", "electronics"] }, &p));
        assert!(!matches_doc(doc! { "tags": ["electronics"] }, &p));
    }

    #[test]
    fn numbers_compare_by_value_across_widths() {
        let p = product();
        assert!(matches_doc(doc! { "price": 1200i64 }, &p));
        assert!(matches_doc(doc! { "price": 1200.0 }, &p));
        assert!(matches_doc(doc! { "price": { "$gte": 1199.5 } }, &p));
    }

    #[test]
    fn range_operators_reject_missing_and_null() {
        let p = product();
        assert!(!matches_doc(doc! { "missing": { "$gt": 0 } }, &p));
        assert!(!matches_doc(doc! { "discontinued": { "$lt": 1 } }, &p));
        assert!(matches_doc(doc! { "price": { "$gt": 500 } }, &p));
        assert!(!matches_doc(doc! { "price": { "$lt": 500 } }, &p));
        assert!(matches_doc(doc! { "price": { "$lte": 1200 } }, &p));
        assert!(matches_doc(doc! { "price": { "$gte": 1200 } }, &p));
        // Incomparable types fall outside every range.
        assert!(!matches_doc(doc! { "name": { "$gt": 5 } }, &p));
    }

    #[test]
    fn multiple_operators_in_one_predicate_conjoin() {
        let p = product();
        assert!(matches_doc(doc! { "price": { "$gt": 500, "$lt": 2000 } }, &p));
        assert!(!matches_doc(doc! { "price": { "$gt": 500, "$lt": 1000 } }, &p));
    }

    #[test]
    fn in_and_nin_partition_documents() {
        let docs = vec![
            doc! { "n": 1 },
            doc! { "n": 2 },
            doc! { "n": 3 },
            doc! { "other": true },
        ];
        let within = Expr::parse(&doc! { "n": { "$in": [1, 3] } }).unwrap();
        let without = Expr::parse(&doc! { "n": { "$nin": [1, 3] } }).unwrap();

        for document in &docs {
            let a = matches(document, &within).unwrap();
            let b = matches(document, &without).unwrap();
            assert_ne!(a, b, "every document matches exactly one side: {document:?}");
        }
    }

    #[test]
    fn regex_matches_anywhere_in_strings_only() {
        let p = product();
        assert!(matches_doc(doc! { "name": { "$regex": "apt" } }, &p));
        assert!(!matches_doc(doc! { "name": { "$regex": "^apt" } }, &p));
        assert!(!matches_doc(doc! { "price": { "$regex": "12" } }, &p));

        // Precompiled pattern with the case-insensitive option.
        let re = Bson::RegularExpression(bson::Regex {
            pattern: "^LAPTOP$".try_into().unwrap(),
            options: "i".try_into().unwrap(),
        });
        assert!(matches_doc(doc! { "name": { "$regex": re.clone() } }, &p));
        // A bare regular-expression literal behaves the same way.
        assert!(matches_doc(doc! { "name": re }, &p));
    }

    #[test]
    fn invalid_regex_pattern_is_an_error() {
        let expr = Expr::parse(&doc! { "name": { "$regex": "(" } }).unwrap();
        assert!(matches!(
            matches(&product(), &expr),
            Err(Error::InvalidQuery(_))
        ));
    }

    #[test]
    fn exists_tests_presence() {
        let p = product();
        assert!(matches_doc(doc! { "price": { "$exists": true } }, &p));
        assert!(matches_doc(doc! { "warranty": { "$exists": false } }, &p));
        assert!(!matches_doc(doc! { "warranty": { "$exists": true } }, &p));
        // Null is present.
        assert!(matches_doc(doc! { "discontinued": { "$exists": true } }, &p));
    }

    #[test]
    fn string_affix_operators() {
        let p = product();
        assert!(matches_doc(doc! { "name": { "$startsWith": "Lap" } }, &p));
        assert!(!matches_doc(doc! { "name": { "$startsWith": "top" } }, &p));
        assert!(matches_doc(doc! { "name": { "$endsWith": "top" } }, &p));
        assert!(!matches_doc(doc! { "price": { "$startsWith": "12" } }, &p));
    }

    #[test]
    fn contains_tests_array_membership() {
        let p = product();
        assert!(matches_doc(doc! { "tags": { "$contains": "sale" } }, &p));
        assert!(!matches_doc(doc! { "tags": { "$contains": "new" } }, &p));
        // Not an array: fails.
        assert!(!matches_doc(doc! { "name": { "$contains": "Lap" } }, &p));
    }

    #[test]
    fn nested_paths_resolve_segment_by_segment() {
        let p = product();
        assert!(matches_doc(doc! { "dimensions.unit": "kg" }, &p));
        assert!(matches_doc(doc! { "dimensions.weight": { "$lt": 3 } }, &p));
        assert!(!matches_doc(doc! { "dimensions.depth": { "$exists": true } }, &p));
        // A non-document parent makes the whole path absent.
        assert!(!matches_doc(doc! { "name.length": { "$exists": true } }, &p));
    }

    #[test]
    fn ne_and_nin_succeed_on_missing_fields() {
        let p = product();
        assert!(matches_doc(doc! { "warranty": { "$ne": "none" } }, &p));
        assert!(matches_doc(doc! { "warranty": { "$nin": ["none"] } }, &p));
        assert!(!matches_doc(doc! { "warranty": { "$in": ["none"] } }, &p));
    }

    #[test]
    fn logical_combinators_compose() {
        let p = product();
        let a = doc! { "price": { "$gt": 500 } };
        let b = doc! { "stock": { "$gte": 1 } };

        assert!(matches_doc(doc! { "$and": [a.clone(), b.clone()] }, &p));
        assert!(matches_doc(
            doc! { "$or": [ { "price": { "$lt": 100 } }, b.clone() ] },
            &p
        ));
        assert!(!matches_doc(doc! { "$not": a.clone() }, &p));

        // De Morgan consistency across composed trees.
        let and = Expr::parse(&doc! { "$and": [a.clone(), b.clone()] }).unwrap();
        let not_or_not = Expr::parse(
            &doc! { "$not": { "$or": [ { "$not": a }, { "$not": b } ] } },
        )
        .unwrap();
        assert_eq!(
            matches(&p, &and).unwrap(),
            matches(&p, &not_or_not).unwrap()
        );
    }

    #[test]
    fn builder_and_parser_agree() {
        let p = product();
        let built = Filter::gt("price", 500).and(Filter::contains("tags", "sale"));
        let parsed = Expr::parse(&doc! {
            "price": { "$gt": 500 },
            "tags": { "$contains": "sale" },
        })
        .unwrap();
        assert_eq!(matches(&p, &built).unwrap(), matches(&p, &parsed).unwrap());
    }

    #[test]
    fn sort_orders_by_multiple_keys_with_stable_ties() {
        let mut docs = vec![
            doc! { "name": "c", "group": 1 },
            doc! { "name": "a", "group": 2 },
            doc! { "name": "b", "group": 1 },
            doc! { "name": "d", "group": 2 },
        ];
        sort_documents(
            &mut docs,
            &[
                SortSpec::new("group", SortDirection::Asc),
                SortSpec::new("name", SortDirection::Desc),
            ],
        );
        let names: Vec<_> = docs
            .iter()
            .map(|d| d.get_str("name").unwrap().to_string())
            .collect();
        assert_eq!(names, ["c", "b", "d", "a"]);
    }

    #[test]
    fn sort_places_missing_values_last_in_both_directions() {
        let mut docs = vec![
            doc! { "name": "no-age" },
            doc! { "name": "young", "age": 20 },
            doc! { "name": "old", "age": 60 },
        ];

        sort_documents(&mut docs, &[SortSpec::new("age", SortDirection::Asc)]);
        let names: Vec<_> = docs.iter().map(|d| d.get_str("name").unwrap()).collect();
        assert_eq!(names, ["young", "old", "no-age"]);

        sort_documents(&mut docs, &[SortSpec::new("age", SortDirection::Desc)]);
        let names: Vec<_> = docs.iter().map(|d| d.get_str("name").unwrap()).collect();
        assert_eq!(names, ["old", "young", "no-age"]);
    }
}
