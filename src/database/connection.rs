//! Owner of the SQLite connection behind the pending-screenshot list.

use std::path::Path;

use rusqlite::Connection;
use tracing::debug;

use super::migrations;

/// Migrated connection to the screenshot store.
///
/// Opening always runs the versioned migrations, so a file written by an
/// older build gains the `size` column before the first query.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens the store file at `path`, creating it when missing. The file is
    /// switched to WAL journaling.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, rusqlite::Error> {
        debug!(path = %path.as_ref().display(), "opening screenshot store");
        Self::migrated(Connection::open(path)?)
    }

    /// A store that lives as long as the value. The demo binary and the
    /// tests use it.
    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        Self::migrated(Connection::open_in_memory()?)
    }

    fn migrated(conn: Connection) -> Result<Self, rusqlite::Error> {
        migrations::run_all(&conn)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}
