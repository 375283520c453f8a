//! SQLite-backed object store.
//!
//! Objects are stored as JSON documents in a single table keyed by id. An
//! in-memory connection gives every temporary editing context its own
//! throwaway database.

use crate::{ChangeSet, ObjectStore, StorageError, StorageResult};
use ecrule_model::Entity;
use ecrule_types::EntityId;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

const SELECT_COLUMNS: &str = "SELECT id, entity_name, data, created_at, modified_at FROM eo_objects";

pub struct SqliteObjectStore {
    conn: Option<Arc<Mutex<Connection>>>,
}

impl SqliteObjectStore {
    /// Opens (or creates) a store at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        Self::open_with_conn(Arc::new(Mutex::new(Connection::open(path)?)))
    }

    /// Opens a private in-memory store.
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::open_with_conn(Arc::new(Mutex::new(Connection::open_in_memory()?)))
    }

    /// Uses an existing connection, e.g. one shared between several stores.
    pub fn open_with_conn(conn: Arc<Mutex<Connection>>) -> StorageResult<Self> {
        let store = Self { conn: Some(conn) };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        let conn = self.conn.as_ref().ok_or(StorageError::Closed)?;
        Ok(conn.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn init_schema(&self) -> StorageResult<()> {
        self.conn()?.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS eo_objects (
                id TEXT PRIMARY KEY,
                entity_name TEXT NOT NULL,
                data TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                modified_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_eo_objects_entity ON eo_objects(entity_name);
            ",
        )?;
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.conn.is_none()
    }
}

type RawRow = (String, String, String, i64, i64);

fn read_row(row: &Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn decode((id, entity_name, data, created_at, modified_at): RawRow) -> StorageResult<Entity> {
    let id = EntityId::parse(&id)
        .map_err(|e| StorageError::InvalidData(format!("invalid object id '{id}': {e}")))?;
    Ok(Entity {
        id,
        entity_name,
        data: serde_json::from_str(&data)?,
        created_at,
        modified_at,
    })
}

impl ObjectStore for SqliteObjectStore {
    fn fetch_all(&self, entity_name: &str) -> StorageResult<Vec<Entity>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} WHERE entity_name = ?1 ORDER BY id"))?;
        let rows = stmt.query_map(params![entity_name], read_row)?;

        let mut result = Vec::new();
        for row in rows {
            result.push(decode(row?)?);
        }
        Ok(result)
    }

    fn fetch(&self, id: &EntityId) -> StorageResult<Option<Entity>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE id = ?1"),
                params![id.to_string()],
                read_row,
            )
            .optional()?;
        row.map(decode).transpose()
    }

    fn commit(&mut self, changes: &ChangeSet) -> StorageResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        for id in &changes.deleted {
            let removed = tx.execute("DELETE FROM eo_objects WHERE id = ?1", params![id.to_string()])?;
            if removed == 0 {
                return Err(StorageError::NotFound(*id));
            }
        }

        for (id, entity) in &changes.inserted {
            let exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM eo_objects WHERE id = ?1)",
                params![id.to_string()],
                |row| row.get(0),
            )?;
            if exists {
                return Err(StorageError::DuplicateObject(*id));
            }
            tx.execute(
                "INSERT INTO eo_objects (id, entity_name, data, created_at, modified_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    id.to_string(),
                    entity.entity_name,
                    serde_json::to_string(&entity.data)?,
                    entity.created_at,
                    entity.modified_at,
                ],
            )?;
        }

        for (id, entity) in &changes.updated {
            let updated = tx.execute(
                "UPDATE eo_objects SET data = ?2, modified_at = ?3 WHERE id = ?1",
                params![
                    id.to_string(),
                    serde_json::to_string(&entity.data)?,
                    entity.modified_at,
                ],
            )?;
            if updated == 0 {
                return Err(StorageError::NotFound(*id));
            }
        }

        // Returning early above drops `tx`, which rolls the transaction back.
        tx.commit()?;
        debug!(changes = changes.len(), "Committed change set");
        Ok(())
    }

    fn close(&mut self) -> StorageResult<()> {
        self.conn = None;
        Ok(())
    }
}
