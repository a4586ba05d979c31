use quickql_core::store::migrations::latest_version;
use quickql_core::store::{open_connection, RecordStore, StoreError};
use rusqlite::Connection;
use serde_json::json;

#[test]
fn file_backed_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("records.sqlite3");

    {
        let store = RecordStore::open(&path).unwrap();
        let fields = json!({ "name": "Dune" }).as_object().cloned().unwrap();
        store.insert("books", fields).unwrap();
    }

    let reopened = RecordStore::open(&path).unwrap();
    let books = reopened.list("books").unwrap();
    assert_eq!(books.len(), 1);
    assert_eq!(books[0]["name"], "Dune");
}

#[test]
fn opening_applies_migrations_idempotently() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("records.sqlite3");

    drop(open_connection(&path).unwrap());
    let conn = open_connection(&path).unwrap();
    assert_eq!(schema_version(&conn), latest_version());
}

#[test]
fn opening_store_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = RecordStore::open(&path).unwrap_err();
    match err {
        StoreError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}
