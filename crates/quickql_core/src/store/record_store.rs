//! Collection-scoped JSON record store.
//!
//! # Responsibility
//! - Persist extension records as JSON documents keyed by `(collection, id)`.
//! - Serialize access so handlers can run from concurrent requests.
//!
//! # Invariants
//! - Every stored record is a JSON object carrying its own `id` field.
//! - `list` returns records in insertion order.

use super::{open_connection, open_connection_in_memory, StoreError, StoreResult};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Field name carrying the record identity inside each stored document.
pub const RECORD_ID_FIELD: &str = "id";

/// Thread-safe record store shared by every handler of one process.
pub struct RecordStore {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore").finish_non_exhaustive()
    }
}

impl RecordStore {
    /// Opens (or creates) a file-backed store.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Ok(Self::from_connection(open_connection(path)?))
    }

    /// Opens a process-local store that vanishes on exit.
    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self::from_connection(open_connection_in_memory()?))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Inserts `fields` as a new record with a freshly generated UUID `id`.
    ///
    /// A caller-supplied `id` field is replaced.
    pub fn insert(&self, collection: &str, mut fields: Map<String, Value>) -> StoreResult<Value> {
        let id = Uuid::new_v4().to_string();
        fields.insert(RECORD_ID_FIELD.to_string(), Value::String(id.clone()));
        let record = Value::Object(fields);
        let body = serde_json::to_string(&record)?;

        self.lock()?.execute(
            "INSERT INTO records (collection, id, body) VALUES (?1, ?2, ?3);",
            params![collection, id, body],
        )?;
        Ok(record)
    }

    /// Returns every record of `collection` in insertion order.
    pub fn list(&self, collection: &str) -> StoreResult<Vec<Value>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT body FROM records WHERE collection = ?1 ORDER BY seq ASC;")?;
        let bodies = stmt
            .query_map(params![collection], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        bodies
            .iter()
            .map(|body| serde_json::from_str(body).map_err(StoreError::from))
            .collect()
    }

    /// Returns the number of records stored in `collection`.
    pub fn count(&self, collection: &str) -> StoreResult<u64> {
        let count = self.lock()?.query_row(
            "SELECT COUNT(*) FROM records WHERE collection = ?1;",
            params![collection],
            |row| row.get::<_, i64>(0),
        )?;
        Ok(count.max(0) as u64)
    }

    /// Returns one record by id.
    pub fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Value>> {
        let conn = self.lock()?;
        read_body(&conn, collection, id)
    }

    /// Merges `patch` into an existing record; `id` is never overwritten.
    ///
    /// Returns `None` when the record does not exist.
    pub fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Map<String, Value>,
    ) -> StoreResult<Option<Value>> {
        let conn = self.lock()?;
        let Some(Value::Object(mut record)) = read_body(&conn, collection, id)? else {
            return Ok(None);
        };

        for (key, value) in patch {
            if key != RECORD_ID_FIELD {
                record.insert(key, value);
            }
        }
        let record = Value::Object(record);
        let body = serde_json::to_string(&record)?;
        conn.execute(
            "UPDATE records SET body = ?3 WHERE collection = ?1 AND id = ?2;",
            params![collection, id, body],
        )?;
        Ok(Some(record))
    }

    /// Deletes one record and returns it; `None` when nothing matched.
    pub fn remove(&self, collection: &str, id: &str) -> StoreResult<Option<Value>> {
        let conn = self.lock()?;
        let existing = read_body(&conn, collection, id)?;
        if existing.is_some() {
            conn.execute(
                "DELETE FROM records WHERE collection = ?1 AND id = ?2;",
                params![collection, id],
            )?;
        }
        Ok(existing)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

fn read_body(conn: &Connection, collection: &str, id: &str) -> StoreResult<Option<Value>> {
    let body = conn
        .query_row(
            "SELECT body FROM records WHERE collection = ?1 AND id = ?2;",
            params![collection, id],
            |row| row.get::<_, String>(0),
        )
        .optional()?;

    match body {
        Some(body) => Ok(Some(serde_json::from_str(&body)?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::{RecordStore, RECORD_ID_FIELD};
    use serde_json::{json, Map, Value};
    use uuid::Uuid;

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object fixture, got {other}"),
        }
    }

    #[test]
    fn insert_assigns_uuid_and_overrides_caller_id() {
        let store = RecordStore::open_in_memory().expect("in-memory store");
        let record = store
            .insert("books", fields(json!({ "id": "mine", "name": "Dune" })))
            .expect("insert should succeed");

        let id = record[RECORD_ID_FIELD].as_str().expect("id is a string");
        assert_ne!(id, "mine");
        assert!(Uuid::parse_str(id).is_ok());
        assert_eq!(record["name"], "Dune");
    }

    #[test]
    fn list_keeps_insertion_order_and_scopes_by_collection() {
        let store = RecordStore::open_in_memory().expect("in-memory store");
        for name in ["Dune", "Emma", "Ulysses"] {
            store
                .insert("books", fields(json!({ "name": name })))
                .expect("insert book");
        }
        store
            .insert("movies", fields(json!({ "name": "Alien" })))
            .expect("insert movie");

        let names: Vec<Value> = store
            .list("books")
            .expect("list books")
            .into_iter()
            .map(|record| record["name"].clone())
            .collect();
        assert_eq!(names, vec![json!("Dune"), json!("Emma"), json!("Ulysses")]);
        assert_eq!(store.count("movies").expect("count movies"), 1);
        assert_eq!(store.count("shows").expect("count shows"), 0);
    }

    #[test]
    fn update_merges_fields_without_touching_id() {
        let store = RecordStore::open_in_memory().expect("in-memory store");
        let record = store
            .insert("books", fields(json!({ "name": "Dune" })))
            .expect("insert");
        let id = record["id"].as_str().expect("id").to_string();

        let updated = store
            .update("books", &id, fields(json!({ "id": "other", "year": 1965 })))
            .expect("update should succeed")
            .expect("record exists");
        assert_eq!(updated["id"], json!(id));
        assert_eq!(updated["year"], 1965);
        assert_eq!(
            store.get("books", &id).expect("get").expect("present"),
            updated
        );

        let missing = store
            .update("books", "nope", Map::new())
            .expect("update of missing record is not an error");
        assert!(missing.is_none());
    }

    #[test]
    fn remove_returns_deleted_record_once() {
        let store = RecordStore::open_in_memory().expect("in-memory store");
        let record = store
            .insert("books", fields(json!({ "name": "Dune" })))
            .expect("insert");
        let id = record["id"].as_str().expect("id").to_string();

        assert_eq!(store.remove("books", &id).expect("remove"), Some(record));
        assert_eq!(store.remove("books", &id).expect("second remove"), None);
        assert!(store.list("books").expect("list").is_empty());
    }
}
