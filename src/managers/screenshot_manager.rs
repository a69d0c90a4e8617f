//! Screenshot Manager for pagesnap.
//!
//! Implements `ScreenshotManagerTrait`: the list of captured screenshots
//! waiting to be uploaded, backed by SQLite via `rusqlite`. Lists are
//! returned newest first.

use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::services::upload_service::now_millis;
use crate::types::errors::ScreenshotError;
use crate::types::screenshot::StoredScreenshot;

/// Trait defining pending screenshot operations.
pub trait ScreenshotManagerTrait {
    fn add(&mut self, data: &str) -> Result<StoredScreenshot, ScreenshotError>;
    fn list(&self) -> Result<Vec<StoredScreenshot>, ScreenshotError>;
    fn get(&self, id: &str) -> Result<StoredScreenshot, ScreenshotError>;
    fn delete(&mut self, id: &str) -> Result<(), ScreenshotError>;
    fn clear(&mut self) -> Result<usize, ScreenshotError>;
    fn count(&self) -> Result<usize, ScreenshotError>;
}

/// Screenshot manager backed by a SQLite connection.
pub struct ScreenshotManager<'a> {
    conn: &'a Connection,
}

impl<'a> ScreenshotManager<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn row_to_screenshot(row: &rusqlite::Row) -> rusqlite::Result<StoredScreenshot> {
        Ok(StoredScreenshot {
            id: row.get(0)?,
            data: row.get(1)?,
            timestamp: row.get(2)?,
            size: row.get(3)?,
        })
    }

    fn db_err(e: rusqlite::Error) -> ScreenshotError {
        ScreenshotError::DatabaseError(e.to_string())
    }
}

impl<'a> ScreenshotManagerTrait for ScreenshotManager<'a> {
    /// Stores a data URL and returns the new record.
    fn add(&mut self, data: &str) -> Result<StoredScreenshot, ScreenshotError> {
        let screenshot = StoredScreenshot {
            id: Uuid::new_v4().to_string(),
            data: data.to_string(),
            timestamp: now_millis(),
            size: StoredScreenshot::estimated_size(data),
        };
        self.conn
            .execute(
                "INSERT INTO screenshots (id, data, timestamp, size) VALUES (?1, ?2, ?3, ?4)",
                params![screenshot.id, screenshot.data, screenshot.timestamp, screenshot.size],
            )
            .map_err(Self::db_err)?;
        Ok(screenshot)
    }

    fn list(&self) -> Result<Vec<StoredScreenshot>, ScreenshotError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, data, timestamp, size FROM screenshots
                 ORDER BY timestamp DESC, rowid DESC",
            )
            .map_err(Self::db_err)?;
        let rows = stmt
            .query_map([], Self::row_to_screenshot)
            .map_err(Self::db_err)?;
        let screenshots = rows.collect::<Result<Vec<_>, _>>().map_err(Self::db_err)?;
        Ok(screenshots)
    }

    fn get(&self, id: &str) -> Result<StoredScreenshot, ScreenshotError> {
        self.conn
            .query_row(
                "SELECT id, data, timestamp, size FROM screenshots WHERE id = ?1",
                params![id],
                Self::row_to_screenshot,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => ScreenshotError::NotFound(id.to_string()),
                other => Self::db_err(other),
            })
    }

    fn delete(&mut self, id: &str) -> Result<(), ScreenshotError> {
        let affected = self
            .conn
            .execute("DELETE FROM screenshots WHERE id = ?1", params![id])
            .map_err(Self::db_err)?;
        if affected == 0 {
            return Err(ScreenshotError::NotFound(id.to_string()));
        }
        Ok(())
    }

    /// Removes every screenshot; returns how many were removed.
    fn clear(&mut self) -> Result<usize, ScreenshotError> {
        self.conn
            .execute("DELETE FROM screenshots", [])
            .map_err(Self::db_err)
    }

    fn count(&self) -> Result<usize, ScreenshotError> {
        self.conn
            .query_row("SELECT COUNT(*) FROM screenshots", [], |row| row.get::<_, i64>(0))
            .map(|n| n as usize)
            .map_err(Self::db_err)
    }
}
