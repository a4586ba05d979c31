//! SQLite record storage backing declarative extension handlers.
//!
//! # Responsibility
//! - Open and configure SQLite connections for extension records.
//! - Apply schema migrations in deterministic order.
//! - Expose collection-scoped JSON record operations.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Handlers must not touch records before migrations succeed.
//! - Records keep insertion order inside one collection.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;
mod record_store;

pub use open::{open_connection, open_connection_in_memory};
pub use record_store::{RecordStore, RECORD_ID_FIELD};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug)]
pub enum StoreError {
    Sqlite(rusqlite::Error),
    Json(serde_json::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    Poisoned,
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Json(err) => write!(f, "stored record is not valid JSON: {err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "record store schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::Poisoned => write!(f, "record store lock was poisoned by a panicking handler"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Json(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } | Self::Poisoned => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}
