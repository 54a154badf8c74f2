//! Error types for sqlmovies-storage

use std::fmt;
use thiserror::Error;

/// Storage error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Engine errors outside of a query (open, pragma, transaction)
    Database,
    /// SQL rejected or failed by the engine while running a statement
    Query,
    /// Single-row query produced no rows
    EmptyResult,
    /// Value conversion errors (row values, JSON)
    Serialization,
    /// Snapshot file for a stage does not exist
    SnapshotNotFound,
    /// Malformed stage token
    InvalidStage,
    /// Snapshot could not be prepared (copy failed, corrupt source)
    Setup,
    /// Configuration errors
    Config,
    /// I/O errors
    IO,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Database => "database",
            ErrorKind::Query => "query",
            ErrorKind::EmptyResult => "empty_result",
            ErrorKind::Serialization => "serialization",
            ErrorKind::SnapshotNotFound => "snapshot_not_found",
            ErrorKind::InvalidStage => "invalid_stage",
            ErrorKind::Setup => "setup",
            ErrorKind::Config => "config",
            ErrorKind::IO => "io",
        }
    }

    /// Errors raised while preparing a snapshot. These abort a whole suite,
    /// everything else only fails the statement that raised it.
    pub fn is_setup_failure(&self) -> bool {
        matches!(
            self,
            ErrorKind::SnapshotNotFound
                | ErrorKind::InvalidStage
                | ErrorKind::Setup
                | ErrorKind::Config
                | ErrorKind::IO
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Storage error type
#[derive(Debug, Error)]
#[error("[{kind}] {message}")]
pub struct StorageError {
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    pub kind: ErrorKind,
    pub message: String,
}

impl StorageError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // Convenience constructors
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    pub fn query(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Query, message)
    }

    pub fn empty_result(sql: &str) -> Self {
        Self::new(
            ErrorKind::EmptyResult,
            format!("Query returned no rows: {}", abbreviate(sql)),
        )
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Serialization, message)
    }

    pub fn snapshot_not_found(stage: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::SnapshotNotFound,
            format!("Snapshot not found: {}", stage.into()),
        )
    }

    pub fn invalid_stage(token: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::InvalidStage,
            format!(
                "Invalid stage '{}': expected a two-digit token such as \"06\"",
                token.into()
            ),
        )
    }

    pub fn setup(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Setup, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }
}

/// First line of a statement, capped, for error messages and logs
pub(crate) fn abbreviate(sql: &str) -> String {
    const MAX: usize = 80;
    let line = sql.trim().lines().next().unwrap_or_default().trim();
    if line.chars().count() > MAX {
        let cut: String = line.chars().take(MAX).collect();
        format!("{}...", cut)
    } else {
        line.to_string()
    }
}

// SQLite error conversions
#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::database(format!("SQLite error: {}", err)).with_source(err)
    }
}

// JSON error conversions
impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::serialization(format!("JSON error: {}", err)).with_source(err)
    }
}

impl From<serde_yaml::Error> for StorageError {
    fn from(err: serde_yaml::Error) -> Self {
        StorageError::config(format!("YAML error: {}", err)).with_source(err)
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::new(ErrorKind::IO, format!("IO error: {}", err)).with_source(err)
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, StorageError>;
