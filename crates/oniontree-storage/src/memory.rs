//! In-process store.
//!
//! Transactions work on a copy of the tables and swap it in on commit.

use crate::types::*;
use crate::{Store, StoreError, StoreTx};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
struct Tables {
    sequences: BTreeMap<EntityKind, RowId>,
    services: BTreeMap<String, ServiceRow>,
    public_keys: BTreeMap<String, PublicKeyRow>,
    urls: BTreeMap<String, UrlRow>,
    tags: BTreeMap<String, TagRow>,
    links: BTreeMap<RowId, Associations>,
}

impl Tables {
    fn next_id(&mut self, kind: EntityKind) -> RowId {
        let seq = self.sequences.entry(kind).or_insert(0);
        *seq += 1;
        *seq
    }

    fn find(&self, kind: EntityKind, key: &str) -> Option<Row> {
        match kind {
            EntityKind::Service => self.services.get(key).cloned().map(Row::Service),
            EntityKind::PublicKey => self.public_keys.get(key).cloned().map(Row::PublicKey),
            EntityKind::Url => self.urls.get(key).cloned().map(Row::Url),
            EntityKind::Tag => self.tags.get(key).cloned().map(Row::Tag),
        }
    }

    fn insert(&mut self, new: &NewRow, now: DateTime<Utc>) -> Row {
        let id = self.next_id(new.kind());
        match new {
            NewRow::Service(new) => {
                let row = ServiceRow {
                    id,
                    slug: new.slug.clone(),
                    name: new.name.clone(),
                    description: new.description.clone(),
                    created_at: now,
                    updated_at: now,
                };
                self.services.insert(row.slug.clone(), row.clone());
                Row::Service(row)
            }
            NewRow::PublicKey(new) => {
                let row = PublicKeyRow {
                    id,
                    external_id: new.external_id.clone(),
                    owner_id: new.owner_id.clone(),
                    fingerprint: new.fingerprint.clone(),
                    description: new.description.clone(),
                    value: new.value.clone(),
                    created_at: now,
                };
                self.public_keys.insert(row.external_id.clone(), row.clone());
                Row::PublicKey(row)
            }
            NewRow::Url { value } => {
                let row = UrlRow {
                    id,
                    value: value.clone(),
                    created_at: now,
                };
                self.urls.insert(row.value.clone(), row.clone());
                Row::Url(row)
            }
            NewRow::Tag { name } => {
                let row = TagRow {
                    id,
                    name: name.clone(),
                    created_at: now,
                };
                self.tags.insert(row.name.clone(), row.clone());
                Row::Tag(row)
            }
        }
    }

    fn has_id(&self, kind: EntityKind, id: RowId) -> bool {
        match kind {
            EntityKind::Service => self.services.values().any(|row| row.id == id),
            EntityKind::PublicKey => self.public_keys.values().any(|row| row.id == id),
            EntityKind::Url => self.urls.values().any(|row| row.id == id),
            EntityKind::Tag => self.tags.values().any(|row| row.id == id),
        }
    }

    fn reset(&mut self, kind: EntityKind) {
        self.sequences.remove(&kind);
        match kind {
            EntityKind::Service => {
                self.services.clear();
                self.links.clear();
            }
            EntityKind::PublicKey => self.public_keys.clear(),
            EntityKind::Url => self.urls.clear(),
            EntityKind::Tag => self.tags.clear(),
        }
        for links in self.links.values_mut() {
            if let Some(set) = links.set_mut(kind) {
                set.clear();
            }
        }
    }
}

/// Injected failure for a natural key.
#[derive(Debug, Clone)]
struct Fault {
    kind: EntityKind,
    key: String,
    fatal: bool,
}

/// Store kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Tables,
    faults: Vec<Fault>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every attempt to create `kind` with `natural_key` fail.
    ///
    /// `fatal` selects a connectivity-class error ([`StoreError::Unavailable`])
    /// instead of a data-class one ([`StoreError::Rejected`]).
    pub fn fail_on(&mut self, kind: EntityKind, natural_key: &str, fatal: bool) {
        self.faults.push(Fault {
            kind,
            key: natural_key.to_string(),
            fatal,
        });
    }
}

pub struct MemoryTx<'a> {
    store: &'a mut MemoryStore,
    work: Tables,
}

impl MemoryTx<'_> {
    fn check_faults(&self, new: &NewRow) -> Result<(), StoreError> {
        let kind = new.kind();
        let key = new.natural_key();
        match self
            .store
            .faults
            .iter()
            .find(|fault| fault.kind == kind && fault.key == key)
        {
            Some(fault) if fault.fatal => Err(StoreError::Unavailable(format!(
                "injected failure creating {kind} {key:?}"
            ))),
            Some(_) => Err(StoreError::Rejected {
                kind,
                key: key.to_string(),
                reason: "injected failure".to_string(),
            }),
            None => Ok(()),
        }
    }
}

impl StoreTx for MemoryTx<'_> {
    fn find(&self, kind: EntityKind, natural_key: &str) -> Result<Option<Row>, StoreError> {
        Ok(self.work.find(kind, natural_key))
    }

    fn insert_if_absent(
        &mut self,
        row: &NewRow,
        now: DateTime<Utc>,
    ) -> Result<Upserted, StoreError> {
        if let Some(existing) = self.work.find(row.kind(), row.natural_key()) {
            return Ok(Upserted {
                row: existing,
                created: false,
            });
        }
        self.check_faults(row)?;
        Ok(Upserted {
            row: self.work.insert(row, now),
            created: true,
        })
    }

    fn associations(&self, service_id: RowId) -> Result<Associations, StoreError> {
        Ok(self.work.links.get(&service_id).cloned().unwrap_or_default())
    }

    fn save_service(
        &mut self,
        service: &ServiceRow,
        associations: &Associations,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let stored = self
            .work
            .services
            .get_mut(&service.slug)
            .filter(|row| row.id == service.id)
            .ok_or(StoreError::UnknownId {
                kind: EntityKind::Service,
                id: service.id,
            })?;
        stored.updated_at = now;

        for kind in [EntityKind::PublicKey, EntityKind::Url, EntityKind::Tag] {
            let ids = associations.set(kind).into_iter().flatten();
            for &id in ids {
                if !self.work.has_id(kind, id) {
                    return Err(StoreError::UnknownId { kind, id });
                }
                self.work
                    .links
                    .entry(service.id)
                    .or_default()
                    .insert(kind, id);
            }
        }
        Ok(())
    }

    fn commit(self) -> Result<(), StoreError> {
        self.store.tables = self.work;
        Ok(())
    }
}

impl Store for MemoryStore {
    type Tx<'a> = MemoryTx<'a>;

    fn begin(&mut self) -> Result<Self::Tx<'_>, StoreError> {
        let work = self.tables.clone();
        Ok(MemoryTx { store: self, work })
    }

    fn reset_all(&mut self, kinds: &[EntityKind]) -> Result<(), StoreError> {
        for &kind in kinds {
            self.tables.reset(kind);
        }
        Ok(())
    }

    fn counts(&self) -> Result<StoreCounts, StoreError> {
        let links = self.tables.links.values();
        Ok(StoreCounts {
            services: self.tables.services.len(),
            public_keys: self.tables.public_keys.len(),
            urls: self.tables.urls.len(),
            tags: self.tables.tags.len(),
            service_public_keys: links.clone().map(|l| l.public_keys.len()).sum(),
            service_urls: links.clone().map(|l| l.urls.len()).sum(),
            service_tags: links.map(|l| l.tags.len()).sum(),
        })
    }
}
