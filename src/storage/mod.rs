//! Storage collaborator module
//!
//! The router never talks to the database directly: every action delegates to
//! a [`QueryExecutor`], which runs one read-only query and returns ordered
//! rows. The gateway ships a SQLite-backed implementation.

mod sqlite;

pub use sqlite::SqliteExecutor;

use async_trait::async_trait;
use thiserror::Error;

/// One result row: column name to scalar value.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Faults raised by the storage collaborator.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The underlying database rejected or failed the query.
    #[error("{0}")]
    Database(String),
    /// The blocking query task was cancelled or panicked.
    #[error("query task failed: {0}")]
    Task(String),
}

/// Read-only query execution seam.
///
/// Parameters bind positionally, in the order given. An empty result set is
/// `Ok(vec![])`, never an error.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, sql: &str, params: &[String]) -> Result<Vec<Record>, StorageError>;
}
