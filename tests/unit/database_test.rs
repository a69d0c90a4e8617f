//! Unit tests for the pagesnap database layer (connection + migrations).

use pagesnap::database::migrations::{get_schema_version, run_all, CURRENT_SCHEMA_VERSION};
use pagesnap::database::Database;
use rusqlite::Connection;
use tempfile::TempDir;

#[test]
fn test_open_in_memory_succeeds() {
    let db = Database::open_in_memory();
    assert!(db.is_ok(), "open_in_memory should succeed");
}

#[test]
fn test_migrations_create_screenshots_table_and_index() {
    let db = Database::open_in_memory().expect("open_in_memory failed");
    let conn = db.connection();

    for (kind, name) in [("table", "screenshots"), ("index", "idx_screenshots_timestamp")] {
        let exists: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type=?1 AND name=?2",
                [kind, name],
                |row| row.get(0),
            )
            .unwrap_or(false);
        assert!(exists, "{} '{}' should exist after migrations", kind, name);
    }
}

#[test]
fn test_schema_version_is_current() {
    let db = Database::open_in_memory().expect("open_in_memory failed");
    assert_eq!(get_schema_version(db.connection()), CURRENT_SCHEMA_VERSION);
}

#[test]
fn test_migrations_are_idempotent() {
    let db = Database::open_in_memory().expect("open_in_memory failed");
    let result = run_all(db.connection());
    assert!(result.is_ok(), "Running migrations twice should succeed (idempotent)");

    let versions: i64 = db
        .connection()
        .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
        .unwrap();
    assert_eq!(versions, CURRENT_SCHEMA_VERSION as i64);
}

#[test]
fn test_v2_backfills_size_of_existing_rows() {
    let conn = Connection::open_in_memory().unwrap();
    // A database left at version 1.
    conn.execute_batch(
        "CREATE TABLE schema_version (
             version INTEGER PRIMARY KEY,
             applied_at INTEGER NOT NULL,
             description TEXT NOT NULL
         );
         INSERT INTO schema_version VALUES (1, 0, 'v1');
         CREATE TABLE screenshots (
             id TEXT PRIMARY KEY,
             data TEXT NOT NULL,
             timestamp INTEGER NOT NULL
         );
         INSERT INTO screenshots VALUES ('s-1', 'AAAAAAAA', 1700000000000);",
    )
    .unwrap();

    run_all(&conn).unwrap();

    let size: i64 = conn
        .query_row("SELECT size FROM screenshots WHERE id = 's-1'", [], |row| row.get(0))
        .unwrap();
    assert_eq!(size, 6);
    assert_eq!(get_schema_version(&conn), 2);
}

#[test]
fn test_open_file_database() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("pagesnap.db");

    let db = Database::open(&db_path);
    assert!(db.is_ok(), "open with file path should succeed");
    assert!(db_path.exists(), "Database file should exist on disk");
}
