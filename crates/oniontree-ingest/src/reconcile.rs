//! Merging one descriptor into the store.

use crate::{CancelToken, IdentityResolver, ReconcileError};
use chrono::{DateTime, Utc};
use oniontree_model::{PublicKeyEntry, ServiceEntry};
use oniontree_storage::{
    EntityKind, NewPublicKey, NewRow, NewService, Row, RowId, Store, StoreError, StoreTx,
    Upserted,
};
use serde::Serialize;

/// Rows and associations written for one batch or one descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CreatedCounts {
    pub services: usize,
    pub public_keys: usize,
    pub urls: usize,
    pub tags: usize,
    pub associations: usize,
}

impl CreatedCounts {
    fn record(&mut self, kind: EntityKind) {
        let slot = match kind {
            EntityKind::Service => &mut self.services,
            EntityKind::PublicKey => &mut self.public_keys,
            EntityKind::Url => &mut self.urls,
            EntityKind::Tag => &mut self.tags,
        };
        *slot += 1;
    }
}

impl std::ops::AddAssign for CreatedCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.services = self.services.saturating_add(rhs.services);
        self.public_keys = self.public_keys.saturating_add(rhs.public_keys);
        self.urls = self.urls.saturating_add(rhs.urls);
        self.tags = self.tags.saturating_add(rhs.tags);
        self.associations = self.associations.saturating_add(rhs.associations);
    }
}

/// Summary of one reconciled descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reconciled {
    pub slug: String,
    pub service_id: RowId,
    pub service_created: bool,
    pub created: CreatedCounts,
}

/// Create-or-attach with a prior existence check.
///
/// The lookup keeps the common "already there" case read-only; the insert is
/// itself insert-if-absent, so a concurrent creator cannot produce a second
/// row for the same key.
pub(crate) fn upsert<T: StoreTx>(
    tx: &mut T,
    fresh: &NewRow,
    now: DateTime<Utc>,
) -> Result<Upserted, StoreError> {
    if let Some(row) = IdentityResolver::new(&*tx).find(fresh.kind(), fresh.natural_key())? {
        return Ok(Upserted {
            row,
            created: false,
        });
    }
    tx.insert_if_absent(fresh, now)
}

fn new_public_key(key: &PublicKeyEntry) -> NewRow {
    NewRow::PublicKey(NewPublicKey {
        external_id: key.id.clone(),
        owner_id: key.user_id.clone(),
        fingerprint: key.fingerprint.clone(),
        description: key.description.clone(),
        value: key.value.clone(),
    })
}

/// Merges descriptors into a store without duplicating rows.
#[derive(Debug, Clone)]
pub struct Reconciler {
    cancel: CancelToken,
    clock: fn() -> DateTime<Utc>,
}

impl Reconciler {
    pub fn new(cancel: CancelToken) -> Self {
        Self {
            cancel,
            clock: Utc::now,
        }
    }

    /// Replaces the timestamp source used for `created_at`/`updated_at`.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    fn checkpoint(&self) -> Result<(), ReconcileError> {
        if self.cancel.is_cancelled() {
            return Err(ReconcileError::Cancelled);
        }
        Ok(())
    }

    /// Brings the store in line with `entry` inside a single transaction.
    ///
    /// An existing service keeps its id, `created_at`, `name` and
    /// `description`: the descriptor only defines those on first import.
    /// Keys, URLs and the tag are created if new and attached if not already
    /// attached. Nothing is ever detached. On error or cancellation the
    /// transaction is dropped and the store is left as it was.
    pub fn reconcile<S: Store>(
        &self,
        store: &mut S,
        entry: &ServiceEntry,
    ) -> Result<Reconciled, ReconcileError> {
        self.checkpoint()?;
        let now = (self.clock)();
        let mut tx = store.begin()?;
        let mut created = CreatedCounts::default();

        let fresh = NewRow::Service(NewService {
            slug: entry.slug.clone(),
            name: entry.descriptor.name.clone(),
            description: entry.descriptor.description.clone(),
        });
        let outcome = upsert(&mut tx, &fresh, now)?;
        let service_created = outcome.created;
        let service = match outcome.row {
            Row::Service(row) => row,
            other => {
                return Err(ReconcileError::KindMismatch {
                    expected: EntityKind::Service,
                    found: other.kind(),
                })
            }
        };
        if service_created {
            created.record(EntityKind::Service);
        }

        let mut links = IdentityResolver::new(&tx).associations(service.id)?;

        let keys = entry.descriptor.public_keys.iter().map(new_public_key);
        let urls = entry.descriptor.urls.iter().map(|value| NewRow::Url {
            value: value.clone(),
        });
        let tag = std::iter::once(NewRow::Tag {
            name: entry.tag.clone(),
        });

        for fresh in keys.chain(urls).chain(tag) {
            self.checkpoint()?;
            let outcome = upsert(&mut tx, &fresh, now)?;
            let kind = outcome.row.kind();
            if kind != fresh.kind() {
                return Err(ReconcileError::KindMismatch {
                    expected: fresh.kind(),
                    found: kind,
                });
            }
            if outcome.created {
                created.record(kind);
            }
            if links.insert(kind, outcome.row.id()) {
                created.associations += 1;
            }
        }

        self.checkpoint()?;
        tx.save_service(&service, &links, now)?;
        tx.commit()?;

        tracing::debug!(
            slug = %service.slug,
            service_id = service.id,
            service_created,
            associations = links.len(),
            "reconciled descriptor"
        );

        Ok(Reconciled {
            slug: service.slug,
            service_id: service.id,
            service_created,
            created,
        })
    }
}
