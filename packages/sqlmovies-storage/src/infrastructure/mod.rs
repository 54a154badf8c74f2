//! Infrastructure layer - Storage adapters
//!
//! SQLite snapshot files and the connection handle over them

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::{SnapshotStore, SqliteDatabase};
