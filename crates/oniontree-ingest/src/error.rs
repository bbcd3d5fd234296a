use oniontree_model::ParseError;
use oniontree_storage::{EntityKind, StoreError};
use std::path::PathBuf;
use thiserror::Error;

/// The descriptor source itself failed; the run cannot continue.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("import root {root} is not a readable directory")]
    MissingRoot { root: PathBuf },

    #[error("failed to walk descriptor tree: {0}")]
    Walk(#[from] walkdir::Error),
}

/// A single descriptor file could not be turned into a service entry.
#[derive(Debug, Error)]
pub enum EntryError {
    #[error("cannot read descriptor: {0}")]
    Read(std::io::Error),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Why a single descriptor was not reconciled.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("store returned a {found} row where a {expected} was expected")]
    KindMismatch {
        expected: EntityKind,
        found: EntityKind,
    },

    #[error("import cancelled")]
    Cancelled,
}

/// A failure that ends the whole import run.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error("failed to reset store: {0}")]
    Reset(#[source] StoreError),

    #[error("store failure while importing {path}: {source}")]
    Store {
        path: PathBuf,
        #[source]
        source: StoreError,
    },
}
