use crate::types::{EntityKind, RowId};
use rusqlite::ErrorCode;
use thiserror::Error;

/// Failure reported by a store operation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("sqlite: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("unknown {kind} id {id}")]
    UnknownId { kind: EntityKind, id: RowId },

    #[error("{kind} {key:?} vanished after insert")]
    MissingAfterInsert { kind: EntityKind, key: String },

    #[error("rejected {kind} {key:?}: {reason}")]
    Rejected {
        kind: EntityKind,
        key: String,
        reason: String,
    },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Connectivity-class failures end the whole run; everything else is
    /// a data problem with the current descriptor.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Io(_) | Self::Unavailable(_) => true,
            Self::Sql(err) => matches!(
                err.sqlite_error_code(),
                Some(
                    ErrorCode::CannotOpen
                        | ErrorCode::NotADatabase
                        | ErrorCode::DatabaseCorrupt
                        | ErrorCode::ReadOnly
                        | ErrorCode::DiskFull
                        | ErrorCode::SystemIoFailure
                        | ErrorCode::DatabaseBusy
                        | ErrorCode::DatabaseLocked
                        | ErrorCode::PermissionDenied
                        | ErrorCode::OutOfMemory
                        | ErrorCode::FileLockingProtocolFailed
                )
            ),
            Self::UnknownId { .. } | Self::MissingAfterInsert { .. } | Self::Rejected { .. } => {
                false
            }
        }
    }
}
