//! Main sediment crate providing a MongoDB-style document layer over
//! pluggable keyed stores.
//!
//! This crate is the primary entry point for users of the sediment project.
//! It re-exports the core types from the sub-crates and bundles the
//! in-memory store adapter.
//!
//! # Features
//!
//! - **Declarative queries** - The familiar `$eq`/`$gt`/`$in`/`$regex`
//!   operator tree, parsed from documents or built fluently
//! - **Declarative updates** - `$set`, `$unset`, `$inc`, `$push`, `$pull`
//!   and `$addToSet` applied deterministically, in a fixed order
//! - **Pluggable storage** - Any keyed backend behind the
//!   [`StoreAdapter`](adapter::StoreAdapter) trait
//! - **Pluggable validation** - Schema checks behind the
//!   [`Validator`](validate::Validator) trait, run before every write
//! - **Schema migrations** - Versioned field migrations executed through
//!   the update engine
//!
//! # Quick Start
//!
//! ```ignore
//! use bson::doc;
//! use sediment::{memory::MemoryStore, prelude::*};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(MemoryStore::new());
//!     let products = db.collection("products").await?;
//!
//!     products.insert(doc! { "name": "Laptop", "price": 1200 }).await?;
//!     products.insert(doc! { "name": "Mouse", "price": 25 }).await?;
//!
//!     // Declarative query documents...
//!     let expensive = products
//!         .find(&Query::parse(&doc! { "price": { "$gt": 500 } })?)
//!         .await?;
//!     assert_eq!(expensive.len(), 1);
//!
//!     // ...or the fluent builder.
//!     let cheap = products
//!         .find(&Query::builder().filter(Filter::lte("price", 100)).build())
//!         .await?;
//!     assert_eq!(cheap.len(), 1);
//!
//!     Ok(())
//! }
//! ```

pub mod prelude;

pub use sediment_core::{
    adapter, collection, database, document, error, matcher, migrate, page, query, update,
    validate,
};

pub use sediment_core::database::Database;

// Re-export BSON types for convenience
pub use bson;

/// In-memory store adapter implementations.
pub mod memory {
    pub use sediment_memory::{MemoryStore, MemoryStoreBuilder};
}
