//! Opening SQLite connections.
//!
//! Every returned connection has `foreign_keys=ON` and all migrations
//! applied.

use std::path::Path;
use std::time::{Duration, Instant};

use rusqlite::Connection;
use tracing::{error, info};

use super::migrations::apply_migrations;
use crate::error::{PersistenceError, Result};

/// How long a writer waits on a locked database before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open (creating if needed) a database file and migrate it.
pub fn open_db(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();
    let started_at = Instant::now();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| PersistenceError::DirectoryError {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let mut conn = Connection::open(path)?;
    match bootstrap_connection(&mut conn) {
        Ok(()) => {
            info!(
                path = %path.display(),
                duration_ms = started_at.elapsed().as_millis() as u64,
                "Database opened"
            );
            Ok(conn)
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "Database bootstrap failed");
            Err(e)
        }
    }
}

/// Open a private in-memory database and migrate it.
pub fn open_db_in_memory() -> Result<Connection> {
    let mut conn = Connection::open_in_memory()?;
    bootstrap_connection(&mut conn)?;
    Ok(conn)
}

fn bootstrap_connection(conn: &mut Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    apply_migrations(conn)?;
    Ok(())
}
