//! Truncate-before-import.

use oniontree_storage::{EntityKind, Store, StoreCounts, StoreError};

/// Every kind the importer owns, in reset order.
pub const MANAGED_KINDS: [EntityKind; 4] = [
    EntityKind::Tag,
    EntityKind::Service,
    EntityKind::PublicKey,
    EntityKind::Url,
];

/// Removes all managed rows and their associations. Irreversible.
///
/// Returns the row counts that were present before the reset.
pub fn reset_managed<S: Store>(store: &mut S) -> Result<StoreCounts, StoreError> {
    let before = store.counts()?;
    store.reset_all(&MANAGED_KINDS)?;
    for kind in MANAGED_KINDS {
        tracing::debug!(%kind, rows = before.rows(kind), "cleared");
    }
    tracing::info!(
        services = before.services,
        public_keys = before.public_keys,
        urls = before.urls,
        tags = before.tags,
        associations = before.associations(),
        "truncated managed tables"
    );
    Ok(before)
}
