//! SQLite adapter
//!
//! - `SnapshotStore`: stage files on disk (naming, fork, list, remove)
//! - `SqliteDatabase`: `QueryExecutor` over one opened stage file

mod database;
mod snapshot_store;

pub use database::SqliteDatabase;
pub use snapshot_store::SnapshotStore;
