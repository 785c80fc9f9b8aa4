//! Query construction and the declarative query language.
//!
//! A query is a tree of [`Expr`] nodes. Trees can be built two ways:
//!
//! - **Fluent builder API** — type-safe construction through [`Filter`] and
//!   the chainable [`Expr`] combinators:
//!
//!   ```ignore
//!   use sediment_core::query::{Query, Filter};
//!
//!   let query = Query::builder()
//!       .filter(Filter::eq("status", "active").and(Filter::gt("age", 18)))
//!       .sort("created_at", SortDirection::Desc)
//!       .limit(10)
//!       .build();
//!   ```
//!
//! - **Declarative documents** — the MongoDB-style tree accepted by
//!   [`Expr::parse`], for callers holding a query as data:
//!
//!   ```ignore
//!   use bson::doc;
//!   use sediment_core::query::Expr;
//!
//!   let expr = Expr::parse(&doc! {
//!       "$or": [ { "price": { "$gt": 500 } }, { "tags": { "$contains": "sale" } } ],
//!       "stock": { "$gte": 1 },
//!   })?;
//!   # Ok::<(), sediment_core::error::Error>(())
//!   ```
//!
//! Field keys may encode nested paths (`"dimensions.weight"`), resolved
//! segment by segment at evaluation time. Execution lives in
//! [`matcher`](crate::matcher); backends that translate queries to a native
//! form instead implement [`QueryVisitor`].

use bson::{Bson, Document};

use crate::error::{Error, Result};

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9, earliest to latest).
    Asc,
    /// Descending order (Z to A, 9 to 0, latest to earliest).
    Desc,
}

impl TryFrom<&Bson> for SortDirection {
    type Error = Error;

    /// Accepts the ascending/descending forms of the declarative language:
    /// `1` / `-1` (any numeric width) and `"asc"` / `"desc"` (or their long
    /// forms).
    fn try_from(value: &Bson) -> Result<Self> {
        match value {
            Bson::Int32(1) | Bson::Int64(1) => Ok(SortDirection::Asc),
            Bson::Int32(-1) | Bson::Int64(-1) => Ok(SortDirection::Desc),
            Bson::Double(d) if *d == 1.0 => Ok(SortDirection::Asc),
            Bson::Double(d) if *d == -1.0 => Ok(SortDirection::Desc),
            Bson::String(s) => match s.as_str() {
                "asc" | "ascending" => Ok(SortDirection::Asc),
                "desc" | "descending" => Ok(SortDirection::Desc),
                other => Err(Error::InvalidQuery(format!(
                    "unknown sort direction {other:?}"
                ))),
            },
            other => Err(Error::InvalidQuery(format!(
                "unsupported sort direction value: {other:?}"
            ))),
        }
    }
}

/// A single (field, direction) pair of a sort specification.
#[derive(Debug, Clone)]
pub struct SortSpec {
    /// The field name to sort by.
    pub field: String,
    /// The sort direction.
    pub direction: SortDirection,
}

impl SortSpec {
    /// Creates a sort spec for one field.
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    /// Parses an ordered sort document such as `{ "age": -1, "name": 1 }`
    /// into a spec list, preserving field order.
    pub fn parse_document(spec: &Document) -> Result<Vec<SortSpec>> {
        spec.iter()
            .map(|(field, direction)| {
                Ok(SortSpec::new(field.as_str(), SortDirection::try_from(direction)?))
            })
            .collect()
    }
}

/// Field comparison operators of the query language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOp {
    /// Structural equality.
    Eq,
    /// Structural inequality.
    Ne,
    /// Greater than.
    Gt,
    /// Greater than or equal to.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal to.
    Lte,
    /// Value structurally equals some element of the operand array.
    In,
    /// Value structurally equals no element of the operand array.
    Nin,
    /// String matches the operand pattern anywhere.
    Regex,
    /// String starts with the operand.
    StartsWith,
    /// String ends with the operand.
    EndsWith,
    /// Array contains an element structurally equal to the operand.
    Contains,
}

/// A filter expression for querying documents.
///
/// Expressions combine through the logical nodes (`And`, `Or`, `Not`) to
/// form arbitrary predicate trees. Leaf nodes test one field, addressed by a
/// (possibly dotted) path.
#[derive(Debug, Clone)]
pub enum Expr {
    /// Logical AND of sub-expressions (all must match; empty matches).
    And(Vec<Expr>),
    /// Logical OR of sub-expressions (at least one must match).
    Or(Vec<Expr>),
    /// Logical NOT (matches iff the inner expression does not).
    Not(Box<Expr>),
    /// Tests whether a field is present (or absent).
    Exists {
        /// Field path to test.
        path: String,
        /// `true` to require presence, `false` to require absence.
        should_exist: bool,
    },
    /// Field comparison against an operand value.
    Field {
        /// Field path to compare.
        path: String,
        /// The comparison operator.
        op: FieldOp,
        /// The operand to compare against.
        operand: Bson,
    },
}

impl Expr {
    /// Creates a field comparison expression.
    pub fn field(path: String, op: FieldOp, operand: Bson) -> Self {
        Expr::Field { path, op, operand }
    }

    /// Combines this expression with another using logical AND.
    ///
    /// If this expression is already an AND, the other expression is
    /// appended to the list. Otherwise, a new AND expression is created.
    pub fn and(self, other: Expr) -> Self {
        match self {
            Expr::And(mut list) => {
                list.push(other);
                Expr::And(list)
            }
            _ => Expr::And(vec![self, other]),
        }
    }

    /// Combines this expression with another using logical OR.
    ///
    /// If this expression is already an OR, the other expression is
    /// appended to the list. Otherwise, a new OR expression is created.
    pub fn or(self, other: Expr) -> Self {
        match self {
            Expr::Or(mut list) => {
                list.push(other);
                Expr::Or(list)
            }
            _ => Expr::Or(vec![self, other]),
        }
    }

    /// Negates this expression (logical NOT).
    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }

    /// Parses a declarative MongoDB-style query document into an expression
    /// tree.
    ///
    /// Every key of the node contributes one conjunct: `$and`, `$or` and
    /// `$not` are the logical combinators, any other key names a field whose
    /// predicate is either a literal value (structural equality) or a
    /// mapping of comparison operators that must all hold. An empty document
    /// parses to an expression that matches every document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidQuery`] for unknown operators or malformed
    /// operands (non-array `$and`/`$or`/`$in`/`$nin`, non-boolean
    /// `$exists`, non-pattern `$regex`).
    pub fn parse(query: &Document) -> Result<Expr> {
        let mut conjuncts = Vec::with_capacity(query.len());

        for (key, value) in query.iter() {
            match key.as_str() {
                "$and" => conjuncts.push(Expr::And(Self::parse_sub_queries(key, value)?)),
                "$or" => conjuncts.push(Expr::Or(Self::parse_sub_queries(key, value)?)),
                "$not" => match value {
                    Bson::Document(sub) => conjuncts.push(Expr::parse(sub)?.not()),
                    other => {
                        return Err(Error::InvalidQuery(format!(
                            "$not expects a query document, got {other:?}"
                        )));
                    }
                },
                other if other.starts_with('$') => {
                    return Err(Error::InvalidQuery(format!("unknown operator {other}")));
                }
                path => conjuncts.push(Self::parse_field_predicate(path, value)?),
            }
        }

        Ok(match conjuncts.len() {
            1 => conjuncts.remove(0),
            _ => Expr::And(conjuncts),
        })
    }

    fn parse_sub_queries(op: &str, value: &Bson) -> Result<Vec<Expr>> {
        match value {
            Bson::Array(items) => items
                .iter()
                .map(|item| match item {
                    Bson::Document(sub) => Expr::parse(sub),
                    other => Err(Error::InvalidQuery(format!(
                        "{op} expects query documents, got {other:?}"
                    ))),
                })
                .collect(),
            other => Err(Error::InvalidQuery(format!(
                "{op} expects an array of query documents, got {other:?}"
            ))),
        }
    }

    fn parse_field_predicate(path: &str, value: &Bson) -> Result<Expr> {
        match value {
            // A mapping with operator keys is an operator predicate; all
            // present operators must hold for the field to match.
            Bson::Document(spec) if spec.iter().any(|(k, _)| k.starts_with('$')) => {
                if !spec.iter().all(|(k, _)| k.starts_with('$')) {
                    return Err(Error::InvalidQuery(format!(
                        "field predicate for {path:?} mixes operators and plain keys"
                    )));
                }

                let mut ops = Vec::with_capacity(spec.len());
                for (op, operand) in spec.iter() {
                    ops.push(Self::parse_field_operator(path, op, operand)?);
                }

                Ok(match ops.len() {
                    1 => ops.remove(0),
                    _ => Expr::And(ops),
                })
            }
            // A literal regular expression value behaves as a pattern test,
            // not as structural equality.
            Bson::RegularExpression(_) => Ok(Expr::field(
                path.to_string(),
                FieldOp::Regex,
                value.clone(),
            )),
            literal => Ok(Expr::field(path.to_string(), FieldOp::Eq, literal.clone())),
        }
    }

    fn parse_field_operator(path: &str, op: &str, operand: &Bson) -> Result<Expr> {
        let op = match op {
            "$eq" => FieldOp::Eq,
            "$ne" => FieldOp::Ne,
            "$gt" => FieldOp::Gt,
            "$gte" => FieldOp::Gte,
            "$lt" => FieldOp::Lt,
            "$lte" => FieldOp::Lte,
            "$in" | "$nin" => {
                if !matches!(operand, Bson::Array(_)) {
                    return Err(Error::InvalidQuery(format!(
                        "{op} on {path:?} expects an array operand"
                    )));
                }
                if op == "$in" { FieldOp::In } else { FieldOp::Nin }
            }
            "$regex" => {
                if !matches!(operand, Bson::String(_) | Bson::RegularExpression(_)) {
                    return Err(Error::InvalidQuery(format!(
                        "$regex on {path:?} expects a pattern string or regular expression"
                    )));
                }
                FieldOp::Regex
            }
            "$exists" => {
                return match operand {
                    Bson::Boolean(should_exist) => Ok(Expr::Exists {
                        path: path.to_string(),
                        should_exist: *should_exist,
                    }),
                    other => Err(Error::InvalidQuery(format!(
                        "$exists on {path:?} expects a boolean, got {other:?}"
                    ))),
                };
            }
            "$startsWith" => FieldOp::StartsWith,
            "$endsWith" => FieldOp::EndsWith,
            "$contains" => FieldOp::Contains,
            other => {
                return Err(Error::InvalidQuery(format!(
                    "unknown comparison operator {other} on {path:?}"
                )));
            }
        };

        Ok(Expr::field(path.to_string(), op, operand.clone()))
    }
}

/// A structured query: an optional filter plus sorting and pagination.
///
/// The orchestrator executes these in a fixed pipeline order: filter, then
/// stable multi-key sort, then offset (skip), then limit.
#[derive(Debug, Clone, Default)]
pub struct Query {
    /// Optional filter expression to match documents. `None` matches every
    /// document.
    pub filter: Option<Expr>,
    /// Sort specification; earlier entries take precedence.
    pub sort: Vec<SortSpec>,
    /// Number of documents to skip after sorting.
    pub offset: Option<usize>,
    /// Maximum number of documents to return after skipping.
    pub limit: Option<usize>,
}

impl Query {
    /// Creates a new empty query matching every document.
    pub fn new() -> Self {
        Query::default()
    }

    /// Creates a new query builder for fluent construction.
    pub fn builder() -> QueryBuilder {
        QueryBuilder::new()
    }

    /// Parses a declarative filter document into a query with no sort or
    /// pagination (see [`Expr::parse`]).
    pub fn parse(filter: &Document) -> Result<Self> {
        Ok(Query {
            filter: Some(Expr::parse(filter)?),
            ..Query::default()
        })
    }
}

/// Helper struct for constructing filter expressions.
///
/// Provides static methods to construct the common leaf predicates in a
/// type-safe manner. Field names and operands are accepted as
/// `Into<String>` / `Into<Bson>` for ergonomics.
///
/// # Example
///
/// ```ignore
/// use sediment_core::query::Filter;
///
/// let expr = Filter::eq("name", "Alice").and(Filter::gt("age", 18));
/// ```
pub struct Filter;

impl Filter {
    /// Matches documents where the field structurally equals the value.
    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Eq, value.into())
    }

    /// Matches documents where the field does not structurally equal the value.
    pub fn ne(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Ne, value.into())
    }

    /// Matches documents where the field is greater than the value.
    pub fn gt(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Gt, value.into())
    }

    /// Matches documents where the field is greater than or equal to the value.
    pub fn gte(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Gte, value.into())
    }

    /// Matches documents where the field is less than the value.
    pub fn lt(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Lt, value.into())
    }

    /// Matches documents where the field is less than or equal to the value.
    pub fn lte(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Lte, value.into())
    }

    /// Matches documents where the field equals any of the given values.
    pub fn any_of<V: Into<Bson>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Expr {
        Expr::field(
            field.into(),
            FieldOp::In,
            Bson::Array(values.into_iter().map(Into::into).collect()),
        )
    }

    /// Matches documents where the field equals none of the given values.
    pub fn none_of<V: Into<Bson>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Expr {
        Expr::field(
            field.into(),
            FieldOp::Nin,
            Bson::Array(values.into_iter().map(Into::into).collect()),
        )
    }

    /// Matches documents where the string field matches the pattern anywhere.
    pub fn regex(field: impl Into<String>, pattern: impl Into<String>) -> Expr {
        Expr::field(field.into(), FieldOp::Regex, Bson::String(pattern.into()))
    }

    /// Matches documents where the field is present.
    pub fn exists(field: impl Into<String>) -> Expr {
        Expr::Exists {
            path: field.into(),
            should_exist: true,
        }
    }

    /// Matches documents where the field is absent.
    pub fn not_exists(field: impl Into<String>) -> Expr {
        Expr::Exists {
            path: field.into(),
            should_exist: false,
        }
    }

    /// Matches documents where the string field starts with the value.
    pub fn starts_with(field: impl Into<String>, value: impl Into<String>) -> Expr {
        Expr::field(
            field.into(),
            FieldOp::StartsWith,
            Bson::String(value.into()),
        )
    }

    /// Matches documents where the string field ends with the value.
    pub fn ends_with(field: impl Into<String>, value: impl Into<String>) -> Expr {
        Expr::field(field.into(), FieldOp::EndsWith, Bson::String(value.into()))
    }

    /// Matches documents where the array field contains an element equal to
    /// the value.
    pub fn contains(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Contains, value.into())
    }

    /// Combines expressions such that all must match.
    pub fn and(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::And(exprs.into_iter().collect())
    }

    /// Combines expressions such that at least one must match.
    pub fn or(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::Or(exprs.into_iter().collect())
    }
}

/// Fluent builder for [`Query`] values.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    /// Creates a new query builder.
    pub fn new() -> Self {
        QueryBuilder {
            query: Query::default(),
        }
    }

    /// Sets the filter expression for this query.
    pub fn filter(mut self, filter: Expr) -> Self {
        self.query.filter = Some(filter);
        self
    }

    /// Appends a sort key; call repeatedly for multi-key sorts, earlier
    /// calls take precedence.
    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.query.sort.push(SortSpec::new(field, direction));
        self
    }

    /// Sets the number of documents to skip (for pagination).
    pub fn offset(mut self, offset: usize) -> Self {
        self.query.offset = Some(offset);
        self
    }

    /// Sets the maximum number of documents to return.
    pub fn limit(mut self, limit: usize) -> Self {
        self.query.limit = Some(limit);
        self
    }

    /// Builds and returns the final query.
    pub fn build(self) -> Query {
        self.query
    }
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Visitor over the expression tree.
///
/// The in-memory predicate engine is one implementation; store adapters
/// that translate queries into a native query language implement this trait
/// instead of re-walking the tree by hand.
pub trait QueryVisitor {
    /// Result of visiting a node.
    type Output;
    /// Error type, convertible into the crate error.
    type Error: Into<Error>;

    /// Visits a logical AND node.
    fn visit_and(&mut self, exprs: &[Expr]) -> std::result::Result<Self::Output, Self::Error>;
    /// Visits a logical OR node.
    fn visit_or(&mut self, exprs: &[Expr]) -> std::result::Result<Self::Output, Self::Error>;
    /// Visits a logical NOT node.
    fn visit_not(&mut self, expr: &Expr) -> std::result::Result<Self::Output, Self::Error>;
    /// Visits a presence test.
    fn visit_exists(
        &mut self,
        path: &str,
        should_exist: bool,
    ) -> std::result::Result<Self::Output, Self::Error>;
    /// Visits a field comparison.
    fn visit_field(
        &mut self,
        path: &str,
        op: &FieldOp,
        operand: &Bson,
    ) -> std::result::Result<Self::Output, Self::Error>;

    /// Dispatches on the node kind.
    fn visit_expr(&mut self, expr: &Expr) -> std::result::Result<Self::Output, Self::Error> {
        match expr {
            Expr::And(exprs) => self.visit_and(exprs),
            Expr::Or(exprs) => self.visit_or(exprs),
            Expr::Not(expr) => self.visit_not(expr),
            Expr::Exists { path, should_exist } => self.visit_exists(path, *should_exist),
            Expr::Field { path, op, operand } => self.visit_field(path, op, operand),
        }
    }
}
