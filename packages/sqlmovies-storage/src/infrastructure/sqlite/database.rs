//! SQLite snapshot handle
//!
//! Owns one connection to one stage file. Every call runs on tokio's
//! blocking pool so a long join never stalls the runtime, and `interrupt()`
//! aborts whatever statement is in flight.
use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{Connection, InterruptHandle, OpenFlags};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use super::snapshot_store::SnapshotStore;
use crate::config::StoreConfig;
use crate::domain::{QueryExecutor, Row, StageId};
use crate::error::abbreviate;
use crate::{Result, StorageError};

/// Open handle to one stage snapshot
///
/// Cloning shares the connection; statements from clones are serialised.
#[derive(Clone)]
pub struct SqliteDatabase {
    conn: Arc<Mutex<Connection>>,
    interrupt: Arc<InterruptHandle>,
    stage: StageId,
    path: PathBuf,
}

impl std::fmt::Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteDatabase")
            .field("stage", &self.stage)
            .field("path", &self.path)
            .finish()
    }
}

impl SqliteDatabase {
    /// Start a stage from an empty database, replacing any existing file
    pub async fn create(config: &StoreConfig, stage: &str) -> Result<Self> {
        let stage: StageId = stage.parse()?;
        let store = SnapshotStore::new(config.clone())?;
        let config = config.clone();

        run_blocking(move || {
            store.ensure_dir()?;
            store.remove(stage)?;
            let db = Self::connect(&config, stage, store.path_for(stage))?;
            tracing::info!("Created snapshot {} at {}", stage, db.path.display());
            Ok(db)
        })
        .await
    }

    /// Open an existing stage in place
    pub async fn open(config: &StoreConfig, stage: &str) -> Result<Self> {
        let stage: StageId = stage.parse()?;
        let store = SnapshotStore::new(config.clone())?;
        let config = config.clone();

        run_blocking(move || {
            let path = store.path_for(stage);
            if !path.is_file() {
                return Err(StorageError::snapshot_not_found(format!(
                    "stage {} ({})",
                    stage,
                    path.display()
                )));
            }
            let db = Self::connect(&config, stage, path)?;
            db.verify_readable_blocking()?;
            tracing::info!("Opened snapshot {}", stage);
            Ok(db)
        })
        .await
    }

    /// Derive stage `dest` from the persisted snapshot of stage `source`
    ///
    /// Copies the source file over the destination file and opens the copy.
    /// The source snapshot is left untouched.
    ///
    /// # Errors
    ///
    /// All failures are setup failures (`ErrorKind::is_setup_failure`):
    /// - `InvalidStage` for malformed tokens
    /// - `SnapshotNotFound` if the source file is missing
    /// - `Setup` if the copy fails or the source is not a readable database
    pub async fn from_existing(config: &StoreConfig, source: &str, dest: &str) -> Result<Self> {
        let source: StageId = source.parse()?;
        let dest: StageId = dest.parse()?;
        let store = SnapshotStore::new(config.clone())?;
        let config = config.clone();

        run_blocking(move || {
            let path = store.fork(source, dest)?;
            let db = Self::connect(&config, dest, path)?;
            db.verify_readable_blocking()?;
            tracing::info!("Loaded stage {} from stage {}", dest, source);
            Ok(db)
        })
        .await
    }

    fn connect(config: &StoreConfig, stage: StageId, path: PathBuf) -> Result<Self> {
        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| {
            StorageError::setup(format!("Cannot open snapshot {}", path.display())).with_source(e)
        })?;
        conn.busy_timeout(config.busy_timeout_duration())?;
        conn.pragma_update(None, "foreign_keys", config.foreign_keys)?;

        let interrupt = conn.get_interrupt_handle();
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            interrupt: Arc::new(interrupt),
            stage,
            path,
        })
    }

    /// SQLite opens files lazily; touch the schema so a corrupt or foreign
    /// file fails here instead of in the first test
    fn verify_readable_blocking(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| {
            row.get::<_, i64>(0)
        })
        .map_err(|e| {
            StorageError::setup(format!(
                "Snapshot {} is not a readable database: {}",
                self.path.display(),
                e
            ))
            .with_source(e)
        })?;
        Ok(())
    }

    pub fn stage(&self) -> StageId {
        self.stage
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Abort the statement currently running on this handle
    ///
    /// The pending call resolves to an `ErrorKind::Query` error. Calling it
    /// while nothing runs has no effect on later statements.
    pub fn interrupt(&self) {
        self.interrupt.interrupt();
    }

    /// Bulk insert inside one transaction
    ///
    /// Identifiers are quoted; values bind positionally to `columns`.
    /// Any failing row rolls back the whole batch.
    ///
    /// # Returns
    ///
    /// Number of rows inserted
    pub async fn insert_rows(
        &self,
        table: &str,
        columns: &[&str],
        rows: Vec<Vec<Value>>,
    ) -> Result<usize> {
        if columns.is_empty() {
            return Err(StorageError::query(format!(
                "Insert into {} needs at least one column",
                table
            )));
        }
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_identifier(table),
            columns
                .iter()
                .map(|c| quote_identifier(c))
                .collect::<Vec<_>>()
                .join(", "),
            (1..=columns.len())
                .map(|i| format!("?{}", i))
                .collect::<Vec<_>>()
                .join(", ")
        );
        let width = columns.len();
        let conn = self.conn.clone();
        let stage = self.stage;

        run_blocking(move || {
            let started = Instant::now();
            let mut conn = conn.lock();
            let tx = conn.transaction()?;
            let count = rows.len();
            {
                let mut stmt = tx.prepare(&sql).map_err(|e| query_error(&sql, e))?;
                for (index, row) in rows.into_iter().enumerate() {
                    if row.len() != width {
                        return Err(StorageError::query(format!(
                            "Row {} has {} values for {} columns",
                            index,
                            row.len(),
                            width
                        )));
                    }
                    let params = row
                        .iter()
                        .map(json_to_sql)
                        .collect::<Result<Vec<_>>>()?;
                    stmt.execute(rusqlite::params_from_iter(params.iter()))
                        .map_err(|e| query_error(&sql, e))?;
                }
            }
            tx.commit()?;
            tracing::debug!(
                "[{}] inserted {} rows in {:?}: {}",
                stage,
                count,
                started.elapsed(),
                abbreviate(&sql)
            );
            Ok(count)
        })
        .await
    }

    /// Release the connection. Clones that are still alive keep it open.
    pub async fn close(self) -> Result<()> {
        let stage = self.stage;
        match Arc::try_unwrap(self.conn) {
            Ok(mutex) => {
                run_blocking(move || {
                    mutex
                        .into_inner()
                        .close()
                        .map_err(|(_, e)| StorageError::from(e))
                })
                .await?;
                tracing::info!("Closed snapshot {}", stage);
            }
            Err(_) => tracing::debug!("Snapshot {} still shared, leaving it open", stage),
        }
        Ok(())
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        run_blocking(move || {
            let conn = conn.lock();
            f(&conn)
        })
        .await
    }
}

#[async_trait]
impl QueryExecutor for SqliteDatabase {
    async fn execute(&self, sql: &str) -> Result<usize> {
        let sql = sql.to_owned();
        let stage = self.stage;
        self.with_conn(move |conn| {
            let changed = conn.execute(&sql, []).map_err(|e| query_error(&sql, e))?;
            tracing::debug!("[{}] {} rows changed: {}", stage, changed, abbreviate(&sql));
            Ok(changed)
        })
        .await
    }

    async fn execute_batch(&self, sql: &str) -> Result<()> {
        let sql = sql.to_owned();
        let stage = self.stage;
        self.with_conn(move |conn| {
            conn.execute_batch(&sql).map_err(|e| query_error(&sql, e))?;
            tracing::debug!("[{}] batch applied: {}", stage, abbreviate(&sql));
            Ok(())
        })
        .await
    }

    async fn select_single_row(&self, sql: &str) -> Result<Row> {
        let sql = sql.to_owned();
        let stage = self.stage;
        self.with_conn(move |conn| {
            let (mut rows, more) = fetch_rows(conn, &sql, Some(1))?;
            if more {
                tracing::warn!(
                    "[{}] single-row query produced more than one row, keeping the first: {}",
                    stage,
                    abbreviate(&sql)
                );
            }
            rows.pop().ok_or_else(|| StorageError::empty_result(&sql))
        })
        .await
    }

    async fn select_multiple_rows(&self, sql: &str) -> Result<Vec<Row>> {
        let sql = sql.to_owned();
        let stage = self.stage;
        self.with_conn(move |conn| {
            let started = Instant::now();
            let (rows, _) = fetch_rows(conn, &sql, None)?;
            tracing::debug!(
                "[{}] {} rows in {:?}: {}",
                stage,
                rows.len(),
                started.elapsed(),
                abbreviate(&sql)
            );
            Ok(rows)
        })
        .await
    }
}

/// Run a query, stopping after `limit` rows. The flag reports whether the
/// engine had more rows to give.
fn fetch_rows(conn: &Connection, sql: &str, limit: Option<usize>) -> Result<(Vec<Row>, bool)> {
    let mut stmt = conn.prepare(sql).map_err(|e| query_error(sql, e))?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let mut cursor = stmt.query([]).map_err(|e| query_error(sql, e))?;

    let mut rows = Vec::new();
    while let Some(raw) = cursor.next().map_err(|e| query_error(sql, e))? {
        if limit.is_some_and(|n| rows.len() >= n) {
            return Ok((rows, true));
        }
        let mut row = Row::new();
        for (index, column) in columns.iter().enumerate() {
            let value = raw.get_ref(index).map_err(|e| query_error(sql, e))?;
            row.insert(column.clone(), sql_to_json(column, value)?);
        }
        rows.push(row);
    }
    Ok((rows, false))
}

fn sql_to_json(column: &str, value: ValueRef<'_>) -> Result<Value> {
    match value {
        ValueRef::Null => Ok(Value::Null),
        ValueRef::Integer(i) => Ok(Value::from(i)),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .ok_or_else(|| {
                StorageError::serialization(format!("Column '{}' holds non-finite value {}", column, f))
            }),
        ValueRef::Text(bytes) => std::str::from_utf8(bytes)
            .map(|s| Value::String(s.to_owned()))
            .map_err(|e| {
                StorageError::serialization(format!("Column '{}' is not valid UTF-8", column))
                    .with_source(e)
            }),
        ValueRef::Blob(_) => Err(StorageError::serialization(format!(
            "Column '{}' holds a BLOB; rows carry numbers and strings only",
            column
        ))),
    }
}

fn json_to_sql(value: &Value) -> Result<SqlValue> {
    match value {
        Value::Null => Ok(SqlValue::Null),
        Value::Bool(b) => Ok(SqlValue::Integer(i64::from(*b))),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(SqlValue::Integer(i)),
            None => n.as_f64().map(SqlValue::Real).ok_or_else(|| {
                StorageError::serialization(format!("Number {} does not fit SQLite", n))
            }),
        },
        Value::String(s) => Ok(SqlValue::Text(s.clone())),
        Value::Array(_) | Value::Object(_) => Err(StorageError::serialization(format!(
            "Cannot bind {} as a column value",
            value
        ))),
    }
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn query_error(sql: &str, err: rusqlite::Error) -> StorageError {
    StorageError::query(format!("{} (in: {})", err, abbreviate(sql))).with_source(err)
}

async fn run_blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        StorageError::database(format!("Blocking task failed: {}", e)).with_source(e)
    })?
}
