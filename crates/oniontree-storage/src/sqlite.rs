//! SQLite-backed store.

use crate::types::*;
use crate::{Store, StoreError, StoreTx};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::path::{Path, PathBuf};
use std::time::Duration;

const SCHEMA_VERSION: i64 = 1;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS services (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    slug        TEXT NOT NULL UNIQUE,
    name        TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS public_keys (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    external_id TEXT NOT NULL UNIQUE,
    owner_id    TEXT NOT NULL DEFAULT '',
    fingerprint TEXT NOT NULL DEFAULT '',
    description TEXT NOT NULL DEFAULT '',
    value       TEXT NOT NULL DEFAULT '',
    created_at  TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS urls (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    value      TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS tags (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    name       TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS service_public_keys (
    service_id    INTEGER NOT NULL REFERENCES services(id) ON DELETE CASCADE,
    public_key_id INTEGER NOT NULL REFERENCES public_keys(id) ON DELETE CASCADE,
    PRIMARY KEY (service_id, public_key_id)
);
CREATE TABLE IF NOT EXISTS service_urls (
    service_id INTEGER NOT NULL REFERENCES services(id) ON DELETE CASCADE,
    url_id     INTEGER NOT NULL REFERENCES urls(id) ON DELETE CASCADE,
    PRIMARY KEY (service_id, url_id)
);
CREATE TABLE IF NOT EXISTS service_tags (
    service_id INTEGER NOT NULL REFERENCES services(id) ON DELETE CASCADE,
    tag_id     INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
    PRIMARY KEY (service_id, tag_id)
);
";

fn table(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Service => "services",
        EntityKind::PublicKey => "public_keys",
        EntityKind::Url => "urls",
        EntityKind::Tag => "tags",
    }
}

/// Association table and member column for a non-service kind.
fn link_table(kind: EntityKind) -> Option<(&'static str, &'static str)> {
    match kind {
        EntityKind::Service => None,
        EntityKind::PublicKey => Some(("service_public_keys", "public_key_id")),
        EntityKind::Url => Some(("service_urls", "url_id")),
        EntityKind::Tag => Some(("service_tags", "tag_id")),
    }
}

const LINK_KINDS: [EntityKind; 3] = [EntityKind::PublicKey, EntityKind::Url, EntityKind::Tag];

#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Opens (creating if needed) the database at `path` and installs the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&path)?;
        tracing::debug!(path = %path.display(), "opened sqlite store");
        Self::init(conn, Some(path))
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> Result<Self, StoreError> {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        install_schema(&conn)?;
        Ok(Self { conn, path })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

fn install_schema(conn: &Connection) -> Result<(), StoreError> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if version > SCHEMA_VERSION {
        tracing::warn!(
            found = version,
            expected = SCHEMA_VERSION,
            "database schema is newer than this importer"
        );
    }
    conn.execute_batch(SCHEMA)?;
    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    Ok(())
}

fn count(conn: &Connection, table: &str) -> Result<usize, StoreError> {
    let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
        row.get(0)
    })?;
    Ok(usize::try_from(n).unwrap_or_default())
}

pub struct SqliteTx<'a> {
    tx: Transaction<'a>,
}

impl SqliteTx<'_> {
    fn find_service(&self, slug: &str) -> rusqlite::Result<Option<Row>> {
        self.tx
            .prepare_cached(
                "SELECT id, slug, name, description, created_at, updated_at \
                 FROM services WHERE slug = ?1",
            )?
            .query_row(params![slug], |row| {
                Ok(Row::Service(ServiceRow {
                    id: row.get(0)?,
                    slug: row.get(1)?,
                    name: row.get(2)?,
                    description: row.get(3)?,
                    created_at: row.get(4)?,
                    updated_at: row.get(5)?,
                }))
            })
            .optional()
    }

    fn find_public_key(&self, external_id: &str) -> rusqlite::Result<Option<Row>> {
        self.tx
            .prepare_cached(
                "SELECT id, external_id, owner_id, fingerprint, description, value, created_at \
                 FROM public_keys WHERE external_id = ?1",
            )?
            .query_row(params![external_id], |row| {
                Ok(Row::PublicKey(PublicKeyRow {
                    id: row.get(0)?,
                    external_id: row.get(1)?,
                    owner_id: row.get(2)?,
                    fingerprint: row.get(3)?,
                    description: row.get(4)?,
                    value: row.get(5)?,
                    created_at: row.get(6)?,
                }))
            })
            .optional()
    }

    fn find_url(&self, value: &str) -> rusqlite::Result<Option<Row>> {
        self.tx
            .prepare_cached("SELECT id, value, created_at FROM urls WHERE value = ?1")?
            .query_row(params![value], |row| {
                Ok(Row::Url(UrlRow {
                    id: row.get(0)?,
                    value: row.get(1)?,
                    created_at: row.get(2)?,
                }))
            })
            .optional()
    }

    fn find_tag(&self, name: &str) -> rusqlite::Result<Option<Row>> {
        self.tx
            .prepare_cached("SELECT id, name, created_at FROM tags WHERE name = ?1")?
            .query_row(params![name], |row| {
                Ok(Row::Tag(TagRow {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    created_at: row.get(2)?,
                }))
            })
            .optional()
    }

    /// Inserts unless the natural key is taken; returns the number of rows written.
    fn insert_ignoring_conflict(
        &self,
        row: &NewRow,
        now: DateTime<Utc>,
    ) -> rusqlite::Result<usize> {
        match row {
            NewRow::Service(new) => self.tx.execute(
                "INSERT INTO services(slug, name, description, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?4) ON CONFLICT(slug) DO NOTHING",
                params![new.slug, new.name, new.description, now],
            ),
            NewRow::PublicKey(new) => self.tx.execute(
                "INSERT INTO public_keys(external_id, owner_id, fingerprint, description, value, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6) ON CONFLICT(external_id) DO NOTHING",
                params![
                    new.external_id,
                    new.owner_id,
                    new.fingerprint,
                    new.description,
                    new.value,
                    now
                ],
            ),
            NewRow::Url { value } => self.tx.execute(
                "INSERT INTO urls(value, created_at) VALUES (?1, ?2) ON CONFLICT(value) DO NOTHING",
                params![value, now],
            ),
            NewRow::Tag { name } => self.tx.execute(
                "INSERT INTO tags(name, created_at) VALUES (?1, ?2) ON CONFLICT(name) DO NOTHING",
                params![name, now],
            ),
        }
    }
}

impl StoreTx for SqliteTx<'_> {
    fn find(&self, kind: EntityKind, natural_key: &str) -> Result<Option<Row>, StoreError> {
        let row = match kind {
            EntityKind::Service => self.find_service(natural_key)?,
            EntityKind::PublicKey => self.find_public_key(natural_key)?,
            EntityKind::Url => self.find_url(natural_key)?,
            EntityKind::Tag => self.find_tag(natural_key)?,
        };
        Ok(row)
    }

    fn insert_if_absent(
        &mut self,
        row: &NewRow,
        now: DateTime<Utc>,
    ) -> Result<Upserted, StoreError> {
        let written = self.insert_ignoring_conflict(row, now)?;
        let stored = self
            .find(row.kind(), row.natural_key())?
            .ok_or_else(|| StoreError::MissingAfterInsert {
                kind: row.kind(),
                key: row.natural_key().to_string(),
            })?;
        Ok(Upserted {
            row: stored,
            created: written > 0,
        })
    }

    fn associations(&self, service_id: RowId) -> Result<Associations, StoreError> {
        let mut out = Associations::default();
        for kind in LINK_KINDS {
            let Some((link, column)) = link_table(kind) else {
                continue;
            };
            let mut stmt = self.tx.prepare_cached(&format!(
                "SELECT {column} FROM {link} WHERE service_id = ?1"
            ))?;
            let ids = stmt.query_map(params![service_id], |row| row.get::<_, RowId>(0))?;
            for id in ids {
                out.insert(kind, id?);
            }
        }
        Ok(out)
    }

    fn save_service(
        &mut self,
        service: &ServiceRow,
        associations: &Associations,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let updated = self.tx.execute(
            "UPDATE services SET updated_at = ?2 WHERE id = ?1",
            params![service.id, now],
        )?;
        if updated == 0 {
            return Err(StoreError::UnknownId {
                kind: EntityKind::Service,
                id: service.id,
            });
        }

        for kind in LINK_KINDS {
            let (Some((link, column)), Some(ids)) = (link_table(kind), associations.set(kind))
            else {
                continue;
            };
            let mut stmt = self.tx.prepare_cached(&format!(
                "INSERT OR IGNORE INTO {link}(service_id, {column}) VALUES (?1, ?2)"
            ))?;
            for id in ids {
                stmt.execute(params![service.id, id])?;
            }
        }
        Ok(())
    }

    fn commit(self) -> Result<(), StoreError> {
        self.tx.commit()?;
        Ok(())
    }
}

impl Store for SqliteStore {
    type Tx<'a> = SqliteTx<'a>;

    fn begin(&mut self) -> Result<Self::Tx<'_>, StoreError> {
        Ok(SqliteTx {
            tx: self.conn.transaction()?,
        })
    }

    fn reset_all(&mut self, kinds: &[EntityKind]) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        for &kind in kinds {
            let links: Vec<&str> = match link_table(kind) {
                Some((link, _)) => vec![link],
                None => LINK_KINDS
                    .iter()
                    .filter_map(|&k| link_table(k).map(|(link, _)| link))
                    .collect(),
            };
            for link in links {
                tx.execute(&format!("DELETE FROM {link}"), [])?;
            }
            tx.execute(&format!("DELETE FROM {}", table(kind)), [])?;
            tx.execute(
                "DELETE FROM sqlite_sequence WHERE name = ?1",
                params![table(kind)],
            )?;
            tracing::debug!(%kind, table = table(kind), "reset table");
        }
        tx.commit()?;
        Ok(())
    }

    fn counts(&self) -> Result<StoreCounts, StoreError> {
        Ok(StoreCounts {
            services: count(&self.conn, "services")?,
            public_keys: count(&self.conn, "public_keys")?,
            urls: count(&self.conn, "urls")?,
            tags: count(&self.conn, "tags")?,
            service_public_keys: count(&self.conn, "service_public_keys")?,
            service_urls: count(&self.conn, "service_urls")?,
            service_tags: count(&self.conn, "service_tags")?,
        })
    }
}
