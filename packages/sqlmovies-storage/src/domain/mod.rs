//! Domain layer for the stage snapshot harness
//!
//! # Domain Models
//!
//! - `StageId`: two-digit lesson stage token ("06", "07")
//! - `Row`: one result row, column name → scalar value, no fixed schema
//!
//! # Port Trait
//!
//! - `QueryExecutor`: raw SQL in, rows out
//!
//! # Examples
//!
//! ```rust,ignore
//! use sqlmovies_storage::domain::{QueryExecutor, StageId};
//!
//! async fn example(db: impl QueryExecutor) -> Result<()> {
//!     let top = db
//!         .select_multiple_rows("SELECT genre FROM genres ORDER BY genre LIMIT 3")
//!         .await?;
//!     let life = db
//!         .select_single_row("SELECT original_title FROM movies WHERE id = 1")
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod queries;
pub mod schema;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::{Result, StorageError};

// ═══════════════════════════════════════════════════════════════════════════
// Domain Models
// ═══════════════════════════════════════════════════════════════════════════

/// Lesson stage identifier
///
/// Each stage of the lesson series persists its database under a
/// two-character, zero-padded token. Stage "07" is derived from "06".
///
/// # Examples
///
/// ```rust
/// use sqlmovies_storage::domain::StageId;
///
/// let stage: StageId = "06".parse().unwrap();
/// assert_eq!(stage.next().unwrap().to_string(), "07");
/// assert!("6".parse::<StageId>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StageId(u8);

impl StageId {
    pub const MAX: u8 = 99;

    pub fn from_number(number: u8) -> Result<Self> {
        if number > Self::MAX {
            return Err(StorageError::invalid_stage(number.to_string()));
        }
        Ok(Self(number))
    }

    pub fn number(&self) -> u8 {
        self.0
    }

    /// The stage that follows this one
    pub fn next(&self) -> Result<Self> {
        Self::from_number(self.0.saturating_add(1))
    }
}

impl FromStr for StageId {
    type Err = StorageError;

    fn from_str(token: &str) -> Result<Self> {
        if token.len() != 2 || !token.bytes().all(|b| b.is_ascii_digit()) {
            return Err(StorageError::invalid_stage(token));
        }
        let number = token
            .parse::<u8>()
            .map_err(|_| StorageError::invalid_stage(token))?;
        Ok(Self(number))
    }
}

impl TryFrom<String> for StageId {
    type Error = StorageError;

    fn try_from(token: String) -> Result<Self> {
        token.parse()
    }
}

impl From<StageId> for String {
    fn from(stage: StageId) -> Self {
        stage.to_string()
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

/// One result row
///
/// Columns keep projection order; equality ignores it, so a row equals a
/// `json!` fixture with the same keys and values in any order. Values are
/// integers, floats, strings or null exactly as the engine reported them:
/// `COUNT(*)` yields an integer, `ROUND(x, 2)` a float.
///
/// # Examples
///
/// ```rust
/// use serde_json::json;
/// use sqlmovies_storage::domain::Row;
///
/// let mut row = Row::new();
/// row.insert("original_title", json!("Life"));
/// row.insert("count", json!(12));
///
/// assert_eq!(row, json!({"count": 12, "original_title": "Life"}));
/// assert_eq!(row.columns().collect::<Vec<_>>(), ["original_title", "count"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(Map<String, Value>);

impl Row {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Insert a column; a repeated column name keeps its first position and
    /// takes the later value
    pub fn insert(&mut self, column: impl Into<String>, value: Value) {
        self.0.insert(column.into(), value);
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    pub fn get_i64(&self, column: &str) -> Option<i64> {
        self.get(column).and_then(Value::as_i64)
    }

    pub fn get_f64(&self, column: &str) -> Option<f64> {
        self.get(column).and_then(Value::as_f64)
    }

    pub fn get_str(&self, column: &str) -> Option<&str> {
        self.get(column).and_then(Value::as_str)
    }

    /// Column names in projection order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Row {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl PartialEq<Value> for Row {
    fn eq(&self, other: &Value) -> bool {
        matches!(other, Value::Object(map) if *map == self.0)
    }
}

impl PartialEq<Row> for Value {
    fn eq(&self, other: &Row) -> bool {
        other == self
    }
}

/// Convert a result set into one JSON array, for fixture comparison and output
pub fn rows_to_value(rows: Vec<Row>) -> Value {
    Value::Array(rows.into_iter().map(Row::into_value).collect())
}

// ═══════════════════════════════════════════════════════════════════════════
// Port Trait: QueryExecutor
// ═══════════════════════════════════════════════════════════════════════════

/// Raw SQL execution against one open snapshot
///
/// Statements are literal text; there is no parameter binding. Each call is a
/// single request/response round trip to the engine.
///
/// # Implementations
///
/// - `SqliteDatabase`: SQLite snapshot file
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Run one statement that returns no rows (DDL, INSERT, UPDATE)
    ///
    /// # Returns
    ///
    /// Number of rows changed
    async fn execute(&self, sql: &str) -> Result<usize>;

    /// Run a semicolon-separated script (schema creation, seed data)
    async fn execute_batch(&self, sql: &str) -> Result<()>;

    /// Run a query and return its first row
    ///
    /// # Errors
    ///
    /// - `ErrorKind::EmptyResult` if the query produced no rows
    /// - `ErrorKind::Query` if the engine rejected the statement
    async fn select_single_row(&self, sql: &str) -> Result<Row>;

    /// Run a query and return every row, in engine order
    async fn select_multiple_rows(&self, sql: &str) -> Result<Vec<Row>>;
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════
