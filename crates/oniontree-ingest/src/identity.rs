//! Natural-key identity and existence lookups.

use oniontree_model::slugify;
use oniontree_storage::{Associations, EntityKind, Row, RowId, StoreError, StoreTx};

/// Canonical identity key of `raw` for `kind`.
///
/// Services are identified by slug, so both a display name and an existing
/// slug resolve to the same key. Other kinds compare their trimmed value.
pub fn natural_key(kind: EntityKind, raw: &str) -> String {
    match kind {
        EntityKind::Service => slugify(raw),
        EntityKind::PublicKey | EntityKind::Url | EntityKind::Tag => raw.trim().to_string(),
    }
}

/// Read-only view answering "does a row with this key exist?".
pub struct IdentityResolver<'t, T: ?Sized> {
    tx: &'t T,
}

impl<'t, T: StoreTx + ?Sized> IdentityResolver<'t, T> {
    pub fn new(tx: &'t T) -> Self {
        Self { tx }
    }

    /// The existing row of `kind` whose natural key matches `raw`, if any.
    pub fn find(&self, kind: EntityKind, raw: &str) -> Result<Option<Row>, StoreError> {
        let key = natural_key(kind, raw);
        if key.is_empty() {
            return Ok(None);
        }
        self.tx.find(kind, &key)
    }

    /// Associations currently stored for a service.
    pub fn associations(&self, service_id: RowId) -> Result<Associations, StoreError> {
        self.tx.associations(service_id)
    }
}
