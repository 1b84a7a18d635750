//! SQLite-backed content store.
//!
//! Each object is one row; its fields are stored as a JSON blob. Writes open
//! an implicit transaction on first use, so nothing is durable until
//! [`ContentStore::commit`] runs.

use crate::{ContentStore, NewObject, StoreError, StoreResult, TargetObject};
use chrono::{DateTime, Utc};
use contentsync_types::{FieldMap, FieldValue, ModificationDate, ObjectUid, RemoteId};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

const COLUMNS: &str =
    "uid, remote_id, container, object_type, fields, modification_date, review_state, synced, indexed_at";

/// Persistent content store backed by SQLite.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens (or creates) a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        debug!("Opened content store at {}", path.as_ref().display());
        Self::with_connection(conn)
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS objects (
                uid TEXT PRIMARY KEY,
                remote_id TEXT NOT NULL,
                container TEXT NOT NULL,
                object_type TEXT NOT NULL,
                fields TEXT NOT NULL,
                modification_date TEXT,
                review_state TEXT,
                synced INTEGER NOT NULL DEFAULT 0,
                indexed_at TEXT,
                UNIQUE(container, remote_id)
            );

            CREATE INDEX IF NOT EXISTS idx_objects_remote_id ON objects(remote_id);
            ",
        )?;
        Ok(())
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Locks the connection and makes sure a transaction is open.
    fn lock_for_write(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        let conn = self.lock()?;
        if conn.is_autocommit() {
            conn.execute_batch("BEGIN")?;
        }
        Ok(conn)
    }

    fn load(conn: &Connection, uid: ObjectUid) -> StoreResult<TargetObject> {
        let raw = conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM objects WHERE uid = ?1"),
                params![uid.to_string()],
                RawObject::from_row,
            )
            .optional()?;
        raw.ok_or_else(|| StoreError::NotFound(uid.to_string()))?
            .into_object()
    }

    fn query(conn: &Connection, sql: &str, args: &[&dyn rusqlite::ToSql]) -> StoreResult<Vec<TargetObject>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(args, RawObject::from_row)?;
        let mut objects = Vec::new();
        for raw in rows {
            objects.push(raw?.into_object()?);
        }
        Ok(objects)
    }

    fn update_column(
        &self,
        uid: ObjectUid,
        column: &str,
        value: Option<String>,
    ) -> StoreResult<()> {
        let conn = self.lock_for_write()?;
        let changed = conn.execute(
            &format!("UPDATE objects SET {column} = ?1 WHERE uid = ?2"),
            params![value, uid.to_string()],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(uid.to_string()));
        }
        Ok(())
    }
}

impl ContentStore for SqliteStore {
    fn find(&self, container: &str, remote_id: &RemoteId) -> StoreResult<Option<TargetObject>> {
        let conn = self.lock()?;
        let found = Self::query(
            &conn,
            &format!("SELECT {COLUMNS} FROM objects WHERE container = ?1 AND remote_id = ?2"),
            params![container, remote_id.as_str()],
        )?;
        Ok(found.into_iter().next())
    }

    fn find_by_remote_id(&self, remote_id: &RemoteId) -> StoreResult<Option<TargetObject>> {
        let conn = self.lock()?;
        let found = Self::query(
            &conn,
            &format!("SELECT {COLUMNS} FROM objects WHERE remote_id = ?1 ORDER BY uid LIMIT 1"),
            params![remote_id.as_str()],
        )?;
        Ok(found.into_iter().next())
    }

    fn get(&self, uid: ObjectUid) -> StoreResult<Option<TargetObject>> {
        let conn = self.lock()?;
        match Self::load(&conn, uid) {
            Ok(object) => Ok(Some(object)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn create(&self, object: NewObject) -> StoreResult<TargetObject> {
        let conn = self.lock_for_write()?;
        let created = object.into_object();
        let fields = serde_json::to_string(&created.fields)?;
        let result = conn.execute(
            &format!("INSERT INTO objects ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, 0, NULL)"),
            params![
                created.uid.to_string(),
                created.remote_id.as_str(),
                created.container,
                created.object_type,
                fields,
                created.modification_date.map(|d| d.to_string()),
            ],
        );
        match result {
            Ok(_) => Ok(created),
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                Err(StoreError::Duplicate {
                    container: created.container,
                    remote_id: created.remote_id.to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    fn set_field(&self, uid: ObjectUid, name: &str, value: Option<FieldValue>) -> StoreResult<()> {
        let conn = self.lock_for_write()?;
        let mut object = Self::load(&conn, uid)?;
        match value {
            Some(value) => object.fields.insert(name.to_string(), value),
            None => object.fields.remove(name),
        };
        conn.execute(
            "UPDATE objects SET fields = ?1 WHERE uid = ?2",
            params![serde_json::to_string(&object.fields)?, uid.to_string()],
        )?;
        Ok(())
    }

    fn set_modification_date(&self, uid: ObjectUid, date: Option<ModificationDate>) -> StoreResult<()> {
        self.update_column(uid, "modification_date", date.map(|d| d.to_string()))
    }

    fn delete(&self, uid: ObjectUid) -> StoreResult<()> {
        let conn = self.lock_for_write()?;
        let removed = conn.execute("DELETE FROM objects WHERE uid = ?1", params![uid.to_string()])?;
        if removed == 0 {
            return Err(StoreError::NotFound(uid.to_string()));
        }
        Ok(())
    }

    fn reindex(&self, uid: ObjectUid) -> StoreResult<()> {
        self.update_column(uid, "indexed_at", Some(Utc::now().to_rfc3339()))
    }

    fn get_state(&self, uid: ObjectUid) -> StoreResult<Option<String>> {
        let conn = self.lock()?;
        Ok(Self::load(&conn, uid)?.review_state)
    }

    fn transition(&self, uid: ObjectUid, state: &str) -> StoreResult<()> {
        if state.trim().is_empty() {
            return Err(StoreError::InvalidTransition("empty target state".to_string()));
        }
        self.update_column(uid, "review_state", Some(state.to_string()))
    }

    fn mark_synced(&self, uid: ObjectUid) -> StoreResult<()> {
        let conn = self.lock_for_write()?;
        let changed = conn.execute("UPDATE objects SET synced = 1 WHERE uid = ?1", params![uid.to_string()])?;
        if changed == 0 {
            return Err(StoreError::NotFound(uid.to_string()));
        }
        Ok(())
    }

    fn synced_objects(&self, container: &str) -> StoreResult<Vec<TargetObject>> {
        let conn = self.lock()?;
        Self::query(
            &conn,
            &format!("SELECT {COLUMNS} FROM objects WHERE synced = 1 AND container = ?1 ORDER BY uid"),
            params![container],
        )
    }

    fn commit(&self) -> StoreResult<()> {
        let conn = self.lock()?;
        if !conn.is_autocommit() {
            conn.execute_batch("COMMIT")?;
        }
        Ok(())
    }

    fn rollback(&self) -> StoreResult<()> {
        let conn = self.lock()?;
        if !conn.is_autocommit() {
            conn.execute_batch("ROLLBACK")?;
        }
        Ok(())
    }
}

/// A row as stored, before parsing.
struct RawObject {
    uid: String,
    remote_id: String,
    container: String,
    object_type: String,
    fields: String,
    modification_date: Option<String>,
    review_state: Option<String>,
    synced: bool,
    indexed_at: Option<String>,
}

impl RawObject {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            uid: row.get(0)?,
            remote_id: row.get(1)?,
            container: row.get(2)?,
            object_type: row.get(3)?,
            fields: row.get(4)?,
            modification_date: row.get(5)?,
            review_state: row.get(6)?,
            synced: row.get(7)?,
            indexed_at: row.get(8)?,
        })
    }

    fn into_object(self) -> StoreResult<TargetObject> {
        let uid = ObjectUid::parse(&self.uid)
            .map_err(|e| StoreError::InvalidData(format!("bad uid {}: {e}", self.uid)))?;
        let remote_id = RemoteId::new(&self.remote_id)
            .ok_or_else(|| StoreError::InvalidData(format!("blank remote id on {uid}")))?;
        let fields: FieldMap = serde_json::from_str(&self.fields)?;
        let modification_date = self
            .modification_date
            .map(|s| ModificationDate::parse(&s))
            .transpose()
            .map_err(|e| StoreError::InvalidData(e.to_string()))?;
        let indexed_at = self
            .indexed_at
            .map(|s| DateTime::parse_from_rfc3339(&s).map(|dt| dt.with_timezone(&Utc)))
            .transpose()
            .map_err(|e| StoreError::InvalidData(format!("bad index time on {uid}: {e}")))?;

        Ok(TargetObject {
            uid,
            remote_id,
            container: self.container,
            object_type: self.object_type,
            fields,
            modification_date,
            review_state: self.review_state,
            synced: self.synced,
            indexed_at,
        })
    }
}
