//! DuckDB session - the connection handle owned by one runner invocation

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use duckdb::Connection;
use tracing::{debug, warn};

use crate::domain::result::{Error, Result};
use crate::ports::{split_qualified, SchemaHandle};

/// Maximum number of attempts when the database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
        || lower.contains("could not set lock on file")
}

/// A single DuckDB connection shared by the ledger and migration procedures
///
/// The connection sits behind a `Mutex` so the session can be shared through
/// an `Arc`; each call takes the lock for one statement or batch only.
pub struct DuckDbSession {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl DuckDbSession {
    /// Open (or create) a database file
    ///
    /// Retries with exponential backoff while another process holds the
    /// file lock.
    pub fn open(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: Some(db_path.to_path_buf()),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        warn!(
                            "Database busy, retrying in {}ms (attempt {}/{}): {}",
                            delay.as_millis(),
                            attempt + 1,
                            MAX_RETRIES,
                            err_msg
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            Error::database(format!("Failed to open database after {} retries", MAX_RETRIES))
        }))
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_in_memory_with_flags(config)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: None,
        })
    }

    fn try_open_connection(db_path: &Path) -> Result<Connection> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        // Extension autoloading stays off; migrations only need core SQL
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Ok(Connection::open_with_flags(db_path, config)?)
    }

    /// Path of the database file, `None` for in-memory sessions
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Lock the connection for the duration of one operation
    pub fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::database(format!("Connection lock poisoned: {}", e)))
    }
}

impl SchemaHandle for DuckDbSession {
    fn has_table(&self, table: &str) -> Result<bool> {
        let (schema, table) = split_qualified(table);
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM information_schema.tables
             WHERE table_schema = ? AND table_name = ?",
            [schema, table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn has_column(&self, table: &str, column: &str) -> Result<bool> {
        let (schema, table) = split_qualified(table);
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM information_schema.columns
             WHERE table_schema = ? AND table_name = ? AND column_name = ?",
            [schema, table, column],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn execute(&self, sql: &str) -> Result<usize> {
        debug!(sql = %sql, "execute");
        let conn = self.lock()?;
        Ok(conn.execute(sql, [])?)
    }

    fn execute_batch(&self, sql: &str) -> Result<()> {
        debug!(sql = %sql, "execute batch");
        let conn = self.lock()?;
        conn.execute_batch(sql)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(is_retryable_error(
            "IO Error: Could not set lock on file \"x.duckdb\": Conflicting lock is held"
        ));
        assert!(is_retryable_error("The process cannot access the file because it is being used by another process"));
        assert!(!is_retryable_error("Catalog Error: Table with name users does not exist!"));
    }

    #[test]
    fn test_in_memory_schema_handle() {
        let session = DuckDbSession::open_in_memory().unwrap();
        assert!(session.db_path().is_none());
        assert!(!session.has_table("users").unwrap());

        session
            .create_table("users", &["id INTEGER", "email VARCHAR"])
            .unwrap();
        assert!(session.has_table("users").unwrap());
        assert!(session.has_table("main.users").unwrap());
        assert!(session.has_column("users", "email").unwrap());
        assert!(!session.has_column("users", "name").unwrap());

        session.add_column("users", "name VARCHAR").unwrap();
        assert!(session.has_column("users", "name").unwrap());

        let inserted = session
            .execute("INSERT INTO users (id, email, name) VALUES (1, 'a@example.com', 'a')")
            .unwrap();
        assert_eq!(inserted, 1);

        session.rename_table("users", "accounts").unwrap();
        assert!(!session.has_table("users").unwrap());
        assert!(session.has_table("accounts").unwrap());

        session.drop_table("accounts").unwrap();
        assert!(!session.has_table("accounts").unwrap());
    }

    #[test]
    fn test_execute_reports_sql_errors() {
        let session = DuckDbSession::open_in_memory().unwrap();
        let err = session.execute_batch("SELEC 1").unwrap_err();
        assert!(matches!(err, Error::Database(_)));
    }
}
