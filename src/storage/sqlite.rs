//! SQLite-backed query executor
//!
//! Queries run on the blocking thread pool; the connection lives behind a
//! mutex because a `rusqlite::Connection` is not `Sync`.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::{params_from_iter, Connection, OpenFlags};
use serde_json::Value;

use super::{QueryExecutor, Record, StorageError};

/// Executes read queries against a local SQLite database file.
pub struct SqliteExecutor {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteExecutor {
    /// Open the database read-only. The gateway performs no writes, so a
    /// missing file is an error rather than something to create.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    #[cfg(test)]
    fn open_in_memory() -> Self {
        let conn = Connection::open_in_memory().expect("in-memory database");
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }
}

#[async_trait]
impl QueryExecutor for SqliteExecutor {
    async fn execute(&self, sql: &str, params: &[String]) -> Result<Vec<Record>, StorageError> {
        let conn = Arc::clone(&self.conn);
        let sql = sql.to_string();
        let params = params.to_vec();

        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|_| StorageError::Task("connection mutex poisoned".to_string()))?;
            run_query(&conn, &sql, &params)
        })
        .await
        .map_err(|e| StorageError::Task(e.to_string()))?
    }
}

fn run_query(conn: &Connection, sql: &str, params: &[String]) -> Result<Vec<Record>, StorageError> {
    let mut stmt = conn.prepare(sql).map_err(db_err)?;
    let column_names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(ToString::to_string)
        .collect();

    let mut rows = stmt.query(params_from_iter(params.iter())).map_err(db_err)?;
    let mut records = Vec::new();

    while let Some(row) = rows.next().map_err(db_err)? {
        let mut record = Record::new();
        for (idx, name) in column_names.iter().enumerate() {
            let value = match row.get_ref(idx).map_err(db_err)? {
                ValueRef::Null => Value::Null,
                ValueRef::Integer(i) => Value::from(i),
                ValueRef::Real(f) => Value::from(f),
                ValueRef::Text(t) => Value::from(String::from_utf8_lossy(t).into_owned()),
                // Homepage tables carry no blob columns; surface any as lossy text
                ValueRef::Blob(b) => Value::from(String::from_utf8_lossy(b).into_owned()),
            };
            record.insert(name.clone(), value);
        }
        records.push(record);
    }

    Ok(records)
}

fn db_err(e: rusqlite::Error) -> StorageError {
    StorageError::Database(e.to_string())
}
