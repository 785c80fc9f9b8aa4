//! In-memory store adapter for sediment.
//!
//! This crate provides a thread-safe, in-memory implementation of the
//! [`StoreAdapter`](sediment_core::adapter::StoreAdapter) trait. It uses
//! async-aware read-write locks for concurrent access and is ideal for
//! development, testing, and small working sets.
//!
//! # Quick Start
//!
//! ```ignore
//! use bson::doc;
//! use sediment::{memory::MemoryStore, Database};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(MemoryStore::new());
//!     let users = db.collection("users").await?;
//!
//!     let alice = users.insert(doc! { "name": "Alice" }).await?;
//!     println!("stored {:?}", alice);
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as sediment_memory;

pub mod store;

pub use store::{MemoryStore, MemoryStoreBuilder};
