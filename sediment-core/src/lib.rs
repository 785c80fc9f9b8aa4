//! A MongoDB-style document query and update layer over pluggable keyed
//! stores.
//!
//! This crate is the core of the sediment project and provides:
//!
//! - **Document model** ([`document`]) - Ordered BSON documents with string
//!   identifiers, dotted-path resolution, and JSON interop
//! - **Query language** ([`query`]) - A typed expression tree with a fluent
//!   builder and a parser for declarative MongoDB-style query documents
//! - **Predicate engine** ([`matcher`]) - Pure evaluation of query trees
//!   against documents, plus the multi-key document sort
//! - **Update engine** ([`update`]) - Pure, deterministic document
//!   transformation from declarative update descriptions
//! - **Collections** ([`collection`]) - The CRUD surface binding the engines
//!   to storage, with validation, duplicate-key enforcement and pagination
//! - **Database handles** ([`database`]) - Collection registry and name
//!   validation over one store adapter
//! - **Store adapter contract** ([`adapter`]) - The keyed persistence
//!   abstraction backends implement
//! - **Schema validation** ([`validate`]) - The pluggable pre-write check
//! - **Migrations** ([`migrate`]) - Linear schema evolution run through the
//!   update engine
//! - **Error handling** ([`error`]) - The error taxonomy raised to callers
//!
//! # Example
//!
//! ```ignore
//! use bson::doc;
//! use sediment_core::{database::Database, query::Query};
//!
//! let db = Database::new(some_adapter);
//! let products = db.collection("products").await?;
//!
//! products.insert(doc! { "name": "Laptop", "price": 1200 }).await?;
//! let expensive = products
//!     .find(&Query::parse(&doc! { "price": { "$gt": 500 } })?)
//!     .await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as sediment_core;

pub mod adapter;
pub mod collection;
pub mod database;
pub mod document;
pub mod error;
pub mod matcher;
pub mod migrate;
pub mod page;
pub mod query;
pub mod update;
pub mod validate;
