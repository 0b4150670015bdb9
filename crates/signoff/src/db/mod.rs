//! SQLite persistence for requests and documents.
//!
//! All access is serialized through a `Mutex<Connection>`. Statuses are
//! stored as their integer codes. One engine process owns a database file:
//! opening it reverts batches a previous process left unfinished.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection};

use crate::status::RequestStatus;

pub mod document_repo;
pub mod error;
pub mod migrations;
pub mod request_repo;

pub use error::DatabaseError;

/// Thread-safe database handle wrapping a single rusqlite connection.
///
/// Cloning is cheap (inner `Arc`). WAL mode is enabled for file databases.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Opens (or creates) the database at the given path and runs all
    /// pending migrations.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DatabaseError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

        migrations::run_all(&conn)?;
        recover_interrupted_batches(&conn)?;

        log::info!("Database opened at {}", path.display());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens an in-memory database. Runs all migrations.
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        migrations::run_all(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Provides locked access to the underlying connection.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, DatabaseError>
    where
        F: FnOnce(&Connection) -> Result<T, DatabaseError>,
    {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        f(&conn)
    }
}

/// Reverts requests stranded in `InProcess` by a batch that never finished.
///
/// Documents signed before the interruption stay signed. Rows without a
/// recorded pre-batch status fall back to `ReadyForSign`.
fn recover_interrupted_batches(conn: &Connection) -> Result<usize, DatabaseError> {
    let reverted = conn.execute(
        "UPDATE requests SET status = COALESCE(pre_batch_status, ?2), pre_batch_status = NULL
         WHERE status = ?1",
        params![
            RequestStatus::InProcess.code(),
            RequestStatus::ReadyForSign.code()
        ],
    )?;
    if reverted > 0 {
        log::warn!(
            "Reverted {} request(s) left in process by an interrupted batch",
            reverted
        );
    }
    Ok(reverted)
}

/// Returns the canonical database path: `~/.signoff/data/signoff.db`.
pub fn default_database_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".signoff").join("data").join("signoff.db"))
}
