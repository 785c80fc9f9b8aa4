//! Convenient re-exports of commonly used types from sediment.
//!
//! Import this prelude module to quickly access the most frequently used
//! types and traits without needing to import from multiple sub-modules:
//!
//! ```ignore
//! use sediment::prelude::*;
//! ```

pub use sediment_core::{
    adapter::{StoreAdapter, StoreAdapterBuilder},
    collection::Collection,
    database::Database,
    document::{self, ID_FIELD},
    error::{Error, Result, StoreError, StoreResult},
    matcher,
    migrate::{MigrateOp, Migration, MigrationRef, Migrations, Migrator},
    page::{Page, PaginationParams},
    query::{Expr, FieldOp, Filter, Query, QueryBuilder, QueryVisitor, SortDirection, SortSpec},
    update::{UpdateBuilder, UpdateSpec},
    validate::{ValidationIssue, Validator},
};
