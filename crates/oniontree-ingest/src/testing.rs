//! Store wrappers used by the unit tests.

use crate::CancelToken;
use chrono::{DateTime, Utc};
use oniontree_storage::memory::MemoryTx;
use oniontree_storage::{
    Associations, EntityKind, MemoryStore, NewRow, Row, RowId, ServiceRow, Store, StoreCounts,
    StoreError, StoreTx, Upserted,
};

/// Memory store that cancels `cancel` right after a given row is written,
/// i.e. in the middle of a descriptor's transaction.
pub(crate) struct CancelOnWrite {
    pub inner: MemoryStore,
    trip: (EntityKind, &'static str),
    cancel: CancelToken,
}

impl CancelOnWrite {
    pub fn new(kind: EntityKind, natural_key: &'static str, cancel: CancelToken) -> Self {
        Self {
            inner: MemoryStore::new(),
            trip: (kind, natural_key),
            cancel,
        }
    }
}

pub(crate) struct CancelOnWriteTx<'a> {
    inner: MemoryTx<'a>,
    trip: (EntityKind, &'static str),
    cancel: CancelToken,
}

impl StoreTx for CancelOnWriteTx<'_> {
    fn find(&self, kind: EntityKind, natural_key: &str) -> Result<Option<Row>, StoreError> {
        self.inner.find(kind, natural_key)
    }

    fn insert_if_absent(
        &mut self,
        row: &NewRow,
        now: DateTime<Utc>,
    ) -> Result<Upserted, StoreError> {
        let upserted = self.inner.insert_if_absent(row, now)?;
        if (row.kind(), row.natural_key()) == self.trip {
            self.cancel.cancel();
        }
        Ok(upserted)
    }

    fn associations(&self, service_id: RowId) -> Result<Associations, StoreError> {
        self.inner.associations(service_id)
    }

    fn save_service(
        &mut self,
        service: &ServiceRow,
        associations: &Associations,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.inner.save_service(service, associations, now)
    }

    fn commit(self) -> Result<(), StoreError> {
        self.inner.commit()
    }
}

impl Store for CancelOnWrite {
    type Tx<'a> = CancelOnWriteTx<'a>;

    fn begin(&mut self) -> Result<Self::Tx<'_>, StoreError> {
        Ok(CancelOnWriteTx {
            inner: self.inner.begin()?,
            trip: self.trip,
            cancel: self.cancel.clone(),
        })
    }

    fn reset_all(&mut self, kinds: &[EntityKind]) -> Result<(), StoreError> {
        self.inner.reset_all(kinds)
    }

    fn counts(&self) -> Result<StoreCounts, StoreError> {
        self.inner.counts()
    }
}
