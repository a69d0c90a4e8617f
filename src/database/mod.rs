//! Pending-screenshot store.
//!
//! Captures wait in a single SQLite table until they are uploaded or
//! cleared. [`Database`] owns the connection and brings the schema to
//! [`migrations::CURRENT_SCHEMA_VERSION`] before handing it out;
//! `ScreenshotManager` borrows it for each list operation.
//!
//! ```no_run
//! use pagesnap::database::Database;
//! use pagesnap::managers::screenshot_manager::{ScreenshotManager, ScreenshotManagerTrait};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::open("pending.db")?;
//! let mut shots = ScreenshotManager::new(db.connection());
//! shots.add("data:image/png;base64,iVBORw0KGgo=")?;
//! println!("{} waiting for upload", shots.count()?);
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod migrations;

pub use connection::Database;
