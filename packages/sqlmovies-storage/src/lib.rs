//! sqlmovies-storage - Stage snapshots for the SQL movies lessons
//!
//! Every lesson stage persists its database as a file named after a
//! two-digit token. A stage starts from a copy of the stage before it, then
//! runs literal SQL against the copy and compares the rows it gets back with
//! hand-written fixtures.
//!
//! ## Core Principles
//!
//! 1. **Copy, never mutate**: deriving stage "07" copies "06"; the source file is read-only
//! 2. **Schema-free rows**: a row is whatever the projection produced, column name → value
//! 3. **Explicit handles**: a suite opens its handle in setup and closes it in teardown
//!
//! ## Usage
//!
//! ```rust,ignore
//! use serde_json::json;
//! use sqlmovies_storage::{QueryExecutor, SqliteDatabase, StoreConfig};
//!
//! let config = StoreConfig::in_dir("db");
//! let db = SqliteDatabase::from_existing(&config, "06", "07").await?;
//!
//! let row = db
//!     .select_single_row("SELECT original_title FROM movies ORDER BY id LIMIT 1")
//!     .await?;
//! assert_eq!(row, json!({"original_title": "Avatar"}));
//!
//! db.close().await?;
//! ```

pub mod config;
pub mod domain;
pub mod error;

#[cfg(feature = "sqlite")]
pub mod infrastructure;

pub use config::StoreConfig;
pub use error::{ErrorKind, Result, StorageError};

pub use domain::{queries, rows_to_value, schema, QueryExecutor, Row, StageId};

#[cfg(feature = "sqlite")]
pub use infrastructure::{SnapshotStore, SqliteDatabase};
