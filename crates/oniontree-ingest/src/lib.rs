//! OnionTree import pipeline
//!
//! ```text
//!  DirectorySource ──(path, ServiceEntry | ParseError)──► BatchDriver
//!                                                             │
//!                                                             ▼
//!                                                        Reconciler
//!                                                   (one transaction per
//!                                                       descriptor)
//!                                                             │
//!                                   IdentityResolver ◄────────┤
//!                                                             ▼
//!                                                           Store
//! ```
//!
//! The reconciler merges a descriptor into the store entity kind by entity
//! kind: service by slug, public keys by id, URLs by value and the tag by
//! directory name. Existing rows keep their id and creation time, and
//! associations only ever grow.
//!
//! Per-descriptor failures (unreadable files, bad YAML, rejected writes) are collected in the
//! [`ImportReport`]; an unreadable tree or a lost store connection ends the
//! run with an [`ImportError`].

pub mod cancel;
pub mod config;
pub mod driver;
pub mod error;
pub mod identity;
pub mod reconcile;
pub mod reset;
pub mod source;

#[cfg(test)]
mod testing;

pub use cancel::CancelToken;
pub use config::ImportConfig;
pub use driver::{BatchDriver, ImportReport, ItemError, ItemErrorClass};
pub use error::{EntryError, ImportError, ReconcileError, StreamError};
pub use identity::{natural_key, IdentityResolver};
pub use reconcile::{CreatedCounts, Reconciled, Reconciler};
pub use reset::{reset_managed, MANAGED_KINDS};
pub use source::{DirectorySource, SourceItem};

use oniontree_storage::Store;

/// Walks `config.root` and reconciles every descriptor into `store`,
/// truncating first when `config.truncate` is set.
pub fn import_directory<S: Store>(
    store: &mut S,
    config: ImportConfig,
    cancel: CancelToken,
) -> Result<ImportReport, ImportError> {
    BatchDriver::new(store, config, Reconciler::new(cancel)).run_import()
}
