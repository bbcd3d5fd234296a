//! Rows, natural keys and association sets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Store-assigned surrogate identifier.
pub type RowId = i64;

/// The entity kinds managed by the importer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Service,
    PublicKey,
    Url,
    Tag,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Service,
        EntityKind::PublicKey,
        EntityKind::Url,
        EntityKind::Tag,
    ];
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntityKind::Service => "service",
            EntityKind::PublicKey => "public key",
            EntityKind::Url => "url",
            EntityKind::Tag => "tag",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRow {
    pub id: RowId,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyRow {
    pub id: RowId,
    pub external_id: String,
    pub owner_id: String,
    pub fingerprint: String,
    pub description: String,
    pub value: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlRow {
    pub id: RowId,
    pub value: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRow {
    pub id: RowId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A persisted row of any managed kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Row {
    Service(ServiceRow),
    PublicKey(PublicKeyRow),
    Url(UrlRow),
    Tag(TagRow),
}

impl Row {
    pub fn kind(&self) -> EntityKind {
        match self {
            Row::Service(_) => EntityKind::Service,
            Row::PublicKey(_) => EntityKind::PublicKey,
            Row::Url(_) => EntityKind::Url,
            Row::Tag(_) => EntityKind::Tag,
        }
    }

    pub fn id(&self) -> RowId {
        match self {
            Row::Service(row) => row.id,
            Row::PublicKey(row) => row.id,
            Row::Url(row) => row.id,
            Row::Tag(row) => row.id,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            Row::Service(row) => row.created_at,
            Row::PublicKey(row) => row.created_at,
            Row::Url(row) => row.created_at,
            Row::Tag(row) => row.created_at,
        }
    }

    pub fn natural_key(&self) -> &str {
        match self {
            Row::Service(row) => &row.slug,
            Row::PublicKey(row) => &row.external_id,
            Row::Url(row) => &row.value,
            Row::Tag(row) => &row.name,
        }
    }

    pub fn into_service(self) -> Option<ServiceRow> {
        match self {
            Row::Service(row) => Some(row),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewService {
    pub slug: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPublicKey {
    pub external_id: String,
    pub owner_id: String,
    pub fingerprint: String,
    pub description: String,
    pub value: String,
}

/// Fresh field values for a row that may not exist yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewRow {
    Service(NewService),
    PublicKey(NewPublicKey),
    Url { value: String },
    Tag { name: String },
}

impl NewRow {
    pub fn kind(&self) -> EntityKind {
        match self {
            NewRow::Service(_) => EntityKind::Service,
            NewRow::PublicKey(_) => EntityKind::PublicKey,
            NewRow::Url { .. } => EntityKind::Url,
            NewRow::Tag { .. } => EntityKind::Tag,
        }
    }

    pub fn natural_key(&self) -> &str {
        match self {
            NewRow::Service(new) => &new.slug,
            NewRow::PublicKey(new) => &new.external_id,
            NewRow::Url { value } => value,
            NewRow::Tag { name } => name,
        }
    }
}

/// Outcome of an insert-if-absent: the row now in the store, and whether
/// this call created it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upserted {
    pub row: Row,
    pub created: bool,
}

/// The public keys, URLs and tags attached to one service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Associations {
    pub public_keys: BTreeSet<RowId>,
    pub urls: BTreeSet<RowId>,
    pub tags: BTreeSet<RowId>,
}

impl Associations {
    /// The set holding ids of `kind`; services are never associated with
    /// each other, so `Service` has no set.
    pub fn set(&self, kind: EntityKind) -> Option<&BTreeSet<RowId>> {
        match kind {
            EntityKind::Service => None,
            EntityKind::PublicKey => Some(&self.public_keys),
            EntityKind::Url => Some(&self.urls),
            EntityKind::Tag => Some(&self.tags),
        }
    }

    pub fn set_mut(&mut self, kind: EntityKind) -> Option<&mut BTreeSet<RowId>> {
        match kind {
            EntityKind::Service => None,
            EntityKind::PublicKey => Some(&mut self.public_keys),
            EntityKind::Url => Some(&mut self.urls),
            EntityKind::Tag => Some(&mut self.tags),
        }
    }

    /// Adds `id` to the set of `kind`. Returns `true` if it was not there.
    pub fn insert(&mut self, kind: EntityKind, id: RowId) -> bool {
        self.set_mut(kind).is_some_and(|set| set.insert(id))
    }

    pub fn contains(&self, kind: EntityKind, id: RowId) -> bool {
        self.set(kind).is_some_and(|set| set.contains(&id))
    }

    pub fn len(&self) -> usize {
        self.public_keys.len() + self.urls.len() + self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Row counts per table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreCounts {
    pub services: usize,
    pub public_keys: usize,
    pub urls: usize,
    pub tags: usize,
    pub service_public_keys: usize,
    pub service_urls: usize,
    pub service_tags: usize,
}

impl StoreCounts {
    pub fn rows(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Service => self.services,
            EntityKind::PublicKey => self.public_keys,
            EntityKind::Url => self.urls,
            EntityKind::Tag => self.tags,
        }
    }

    pub fn associations(&self) -> usize {
        self.service_public_keys + self.service_urls + self.service_tags
    }
}
