//! OnionTree importer workspace
//!
//! Re-exports the library crates so the workspace-level integration tests
//! and downstream tools can depend on a single package.
//!
//! - [`model`]: descriptor parsing, slugs and tag derivation
//! - [`storage`]: store contract, in-memory and SQLite backends
//! - [`ingest`]: directory source, reconciler and batch driver

pub use oniontree_ingest as ingest;
pub use oniontree_model as model;
pub use oniontree_storage as storage;
