//! Schema migration framework for document collections.
//!
//! Migrations evolve stored documents across versions of an application's
//! data model. Each [`Migration`] names its predecessor, forming a linear
//! chain; a [`Migrations`] registry collects them; the [`Migrator`]
//! extension on [`Database`] walks the chain in either direction.
//!
//! Field operations run through the normal orchestrator path — scans plus
//! update-engine rewrites — so migrations need nothing from the store
//! adapter beyond the standard keyed contract. The applied-revision state
//! lives in a reserved `_migrations` collection, read and written like any
//! other document.
//!
//! # Example
//!
//! ```ignore
//! use sediment_core::migrate::{Migration, Migrations, MigrateOp, MigrationRef, Migrator};
//! use sediment_core::error::Result;
//!
//! struct AddStock;
//!
//! #[async_trait::async_trait]
//! impl Migration for AddStock {
//!     fn id(&self) -> &'static str { "add_stock" }
//!     fn previous_id(&self) -> Option<&'static str> { None }
//!
//!     async fn up(&self, op: &MigrateOp<'_>) -> Result<()> {
//!         op.add_field("products", "stock", 0).await?;
//!         Ok(())
//!     }
//!
//!     async fn down(&self, op: &MigrateOp<'_>) -> Result<()> {
//!         op.remove_field("products", "stock").await?;
//!         Ok(())
//!     }
//! }
//!
//! struct AppMigrations;
//!
//! impl Migrations for AppMigrations {
//!     fn migrations() -> Vec<MigrationRef> {
//!         vec![Box::new(AddStock)]
//!     }
//! }
//!
//! // db.upgrade::<AppMigrations>().await?;
//! ```

use async_trait::async_trait;
use bson::{Bson, doc};
use log::debug;

use crate::{
    database::Database,
    document,
    error::{Error, Result},
    query::{Filter, Query},
    update::UpdateSpec,
};

/// Reserved collection holding the applied-revision state.
pub const MIGRATIONS_COLLECTION: &str = "_migrations";

const STATE_ID: &str = "state";
const REVISION_FIELD: &str = "revision";

/// A single migration step in the schema evolution chain.
///
/// Each migration has a unique id and names the migration it follows;
/// the initial migration returns `None` from [`previous_id`](Self::previous_id).
#[async_trait]
pub trait Migration: Send + Sync {
    /// Unique identifier for this migration.
    fn id(&self) -> &'static str;

    /// Identifier of the migration this one follows, `None` for the
    /// initial migration.
    fn previous_id(&self) -> Option<&'static str>;

    /// Applies this migration.
    async fn up(&self, op: &MigrateOp<'_>) -> Result<()>;

    /// Reverses the changes made by [`up`](Self::up).
    async fn down(&self, op: &MigrateOp<'_>) -> Result<()>;
}

/// A boxed migration step.
pub type MigrationRef = Box<dyn Migration>;

/// Registry of every migration an application defines.
pub trait Migrations: Send + Sync {
    /// All migration steps, in any order; the chain is ordered by
    /// `previous_id` links.
    fn migrations() -> Vec<MigrationRef>;
}

/// Operation context handed to a running migration.
pub struct MigrateOp<'a> {
    database: &'a Database,
}

impl<'a> MigrateOp<'a> {
    fn new(database: &'a Database) -> Self {
        Self { database }
    }

    /// The database under migration, for data migrations that outgrow the
    /// field helpers.
    pub fn database(&self) -> &Database {
        self.database
    }

    /// Idempotently creates a collection.
    pub async fn create_collection(&self, name: &str) -> Result<()> {
        self.database.collection(name).await.map(|_| ())
    }

    /// Drops a collection and everything in it.
    pub async fn drop_collection(&self, name: &str) -> Result<()> {
        self.database.drop_collection(name).await.map(|_| ())
    }

    /// Sets a default value for a field on every document that lacks it.
    /// Returns the number of documents rewritten.
    pub async fn add_field(
        &self,
        collection: &str,
        field: &str,
        default: impl Into<Bson> + Send,
    ) -> Result<u64> {
        let collection = self.database.collection(collection).await?;
        let missing = Filter::not_exists(field);
        let update = UpdateSpec::builder().set(field, default).build();

        collection.update(Some(&missing), &update).await
    }

    /// Removes a field from every document that carries it. Returns the
    /// number of documents rewritten.
    pub async fn remove_field(&self, collection: &str, field: &str) -> Result<u64> {
        let collection = self.database.collection(collection).await?;
        let present = Filter::exists(field);
        let update = UpdateSpec::builder().unset(field).build();

        collection.update(Some(&present), &update).await
    }

    /// Renames a field across every document that carries it, preserving
    /// each document's value. Returns the number of documents rewritten.
    pub async fn rename_field(&self, collection: &str, field: &str, new: &str) -> Result<u64> {
        let collection = self.database.collection(collection).await?;
        let targets = collection
            .find(&Query::builder().filter(Filter::exists(field)).build())
            .await?;

        let mut renamed = 0u64;
        for target in targets {
            let id = document::require_id(&target)?.to_string();
            let value = target.get(field).cloned().unwrap_or(Bson::Null);
            let update = UpdateSpec::builder().set(new, value).unset(field).build();
            if collection.update_by_id(&id, &update).await?.is_some() {
                renamed += 1;
            }
        }

        Ok(renamed)
    }
}

/// Migration runner, implemented for [`Database`].
#[async_trait]
pub trait Migrator {
    /// The id of the most recently applied migration, `None` when nothing
    /// has been applied yet.
    async fn current_revision(&self) -> Result<Option<String>>;

    /// Applies every pending migration, in chain order.
    async fn upgrade<M>(&self) -> Result<()>
    where
        M: Migrations + 'static;

    /// Walks back down the chain until `target_id` is the most recently
    /// applied migration. Already at or below the target is a no-op.
    async fn downgrade_to<M>(&self, target_id: &str) -> Result<()>
    where
        M: Migrations + 'static;
}

#[async_trait]
impl Migrator for Database {
    async fn current_revision(&self) -> Result<Option<String>> {
        let state = self.collection(MIGRATIONS_COLLECTION).await?;

        Ok(state.find_by_id(STATE_ID).await?.and_then(|doc| {
            doc.get_str(REVISION_FIELD)
                .ok()
                .map(str::to_string)
        }))
    }

    async fn upgrade<M>(&self) -> Result<()>
    where
        M: Migrations + 'static,
    {
        let chain = ordered_chain(M::migrations())?;
        let start = match self.current_revision().await? {
            Some(current) => position_of(&chain, &current)? + 1,
            None => 0,
        };

        for migration in &chain[start.min(chain.len())..] {
            debug!("applying migration {}", migration.id());
            migration.up(&MigrateOp::new(self)).await?;
            set_revision(self, migration.id()).await?;
        }

        Ok(())
    }

    async fn downgrade_to<M>(&self, target_id: &str) -> Result<()>
    where
        M: Migrations + 'static,
    {
        let chain = ordered_chain(M::migrations())?;
        let target = position_of(&chain, target_id)?;
        let current = match self.current_revision().await? {
            Some(current) => position_of(&chain, &current)?,
            None => return Ok(()),
        };
        if current <= target {
            return Ok(());
        }

        for migration in chain[target + 1..=current].iter().rev() {
            debug!("reverting migration {}", migration.id());
            migration.down(&MigrateOp::new(self)).await?;
        }
        set_revision(self, target_id).await?;

        Ok(())
    }
}

/// Orders a registry into its linear chain, starting from the migration
/// with no predecessor.
fn ordered_chain(mut migrations: Vec<MigrationRef>) -> Result<Vec<MigrationRef>> {
    if migrations.is_empty() {
        return Ok(migrations);
    }

    let head = migrations
        .iter()
        .position(|m| m.previous_id().is_none())
        .ok_or_else(|| {
            Error::Migration("no initial migration (every step names a predecessor)".to_string())
        })?;

    let mut chain = Vec::with_capacity(migrations.len());
    chain.push(migrations.swap_remove(head));
    let mut last_id = chain[0].id();

    while !migrations.is_empty() {
        let next = migrations
            .iter()
            .position(|m| m.previous_id() == Some(last_id))
            .ok_or_else(|| {
                Error::Migration(format!("broken migration chain after {last_id}"))
            })?;
        let migration = migrations.swap_remove(next);
        last_id = migration.id();
        chain.push(migration);
    }

    Ok(chain)
}

fn position_of(chain: &[MigrationRef], id: &str) -> Result<usize> {
    chain
        .iter()
        .position(|m| m.id() == id)
        .ok_or_else(|| Error::Migration(format!("unknown migration id {id:?}")))
}

async fn set_revision(database: &Database, revision: &str) -> Result<()> {
    let state = database.collection(MIGRATIONS_COLLECTION).await?;
    let update = UpdateSpec::builder().set(REVISION_FIELD, revision).build();

    if state.update_by_id(STATE_ID, &update).await?.is_none() {
        state
            .insert(doc! { "_id": STATE_ID, "revision": revision })
            .await?;
    }

    Ok(())
}
