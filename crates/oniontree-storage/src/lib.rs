//! OnionTree relational store
//!
//! The importer talks to persistence only through two traits:
//!
//! ```text
//!   Store ──begin()──► StoreTx ──┬─ find(kind, natural_key)
//!     │                          ├─ insert_if_absent(new_row)
//!     │                          ├─ associations(service_id)
//!     │                          ├─ save_service(row, associations)
//!     │                          └─ commit()   (drop = rollback)
//!     ├─ reset_all(kinds)
//!     └─ counts()
//! ```
//!
//! Every natural key (`slug`, `external_id`, URL `value`, tag `name`) is
//! unique per kind, and `insert_if_absent` checks and creates as one atomic
//! step, so a row is created at most once no matter how many descriptors
//! reference it.
//!
//! Two backends implement the contract: [`SqliteStore`] for real imports and
//! [`MemoryStore`] as an in-process reference with failure injection.

pub mod error;
pub mod memory;
pub mod sqlite;
pub mod types;


pub use error::StoreError;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use types::{
    Associations, EntityKind, NewPublicKey, NewRow, NewService, PublicKeyRow, Row, RowId,
    ServiceRow, StoreCounts, TagRow, Upserted, UrlRow,
};

use chrono::{DateTime, Utc};

/// One unit of work against the store.
///
/// Nothing is visible to other transactions until [`StoreTx::commit`];
/// dropping the transaction discards all of its writes.
pub trait StoreTx {
    /// Point lookup by natural key.
    fn find(&self, kind: EntityKind, natural_key: &str) -> Result<Option<Row>, StoreError>;

    /// Creates `row` unless a row with the same natural key exists. The
    /// existing row is returned untouched in that case.
    fn insert_if_absent(&mut self, row: &NewRow, now: DateTime<Utc>)
        -> Result<Upserted, StoreError>;

    /// Current associations of a service.
    fn associations(&self, service_id: RowId) -> Result<Associations, StoreError>;

    /// Writes the service together with its full association set.
    ///
    /// Only `updated_at` changes on the service row itself; `name`,
    /// `description` and `created_at` keep the values from creation.
    /// Associations are added, never removed.
    fn save_service(
        &mut self,
        service: &ServiceRow,
        associations: &Associations,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    fn commit(self) -> Result<(), StoreError>
    where
        Self: Sized;
}

pub trait Store {
    type Tx<'a>: StoreTx
    where
        Self: 'a;

    fn begin(&mut self) -> Result<Self::Tx<'_>, StoreError>;

    /// Deletes every row of the given kinds together with the association
    /// rows that reference them, and restarts their id sequences.
    fn reset_all(&mut self, kinds: &[EntityKind]) -> Result<(), StoreError>;

    fn counts(&self) -> Result<StoreCounts, StoreError>;
}
