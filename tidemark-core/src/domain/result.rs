//! Result and error types for the core library

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core library error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(String),

    /// A ledger insert collided with an existing entry name
    #[error("Migration already recorded: {0}")]
    Duplicate(String),

    /// The migrations folder could not be read
    #[error("Discovery error: {0}")]
    Discovery(String),

    /// An apply or revert procedure failed
    #[error("Migration {name} failed: {source}")]
    Migration {
        name: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Wrap a procedure failure with the name of the unit that raised it
    pub fn migration(name: impl Into<String>, source: Error) -> Self {
        Self::Migration {
            name: name.into(),
            source: Box::new(source),
        }
    }

    /// Whether this error is a ledger uniqueness violation
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate(_))
    }
}

impl From<duckdb::Error> for Error {
    fn from(err: duckdb::Error) -> Self {
        let msg = err.to_string();
        if is_unique_violation(&msg) {
            Self::Duplicate(msg)
        } else {
            Self::Database(msg)
        }
    }
}

/// Check if a DuckDB error message reports a unique/primary key violation
fn is_unique_violation(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    lower.contains("duplicate key") || lower.contains("unique constraint")
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

/// Operation result envelope (for JSON output)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> OperationResult<T> {
    /// Create a successful result
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Create a failed result
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

impl<T> From<Result<T>> for OperationResult<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::fail(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_result_ok() {
        let result: OperationResult<i32> = OperationResult::ok(42);
        assert!(result.success);
        assert_eq!(result.data, Some(42));
        assert!(result.error.is_none());
    }

    #[test]
    fn test_from_result() {
        let ok: Result<i32> = Ok(42);
        let result: OperationResult<i32> = ok.into();
        assert!(result.success);

        let err: Result<i32> = Err(Error::validation("bad input"));
        let result: OperationResult<i32> = err.into();
        assert!(!result.success);
        assert!(result.error.unwrap().contains("Validation error"));
    }

    #[test]
    fn test_migration_error_names_unit() {
        let err = Error::migration("0001_create_users", Error::database("table exists"));
        let msg = err.to_string();
        assert!(msg.contains("0001_create_users"));
        assert!(msg.contains("table exists"));
        assert!(!err.is_duplicate());
    }

    #[test]
    fn test_duckdb_unique_violation_converts_to_duplicate() {
        let conn = duckdb::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (name VARCHAR UNIQUE); INSERT INTO t VALUES ('a');")
            .unwrap();

        let err: Error = conn.execute("INSERT INTO t VALUES ('a')", []).unwrap_err().into();
        assert!(err.is_duplicate(), "unexpected error: {}", err);

        let err: Error = conn.execute("INSERT INTO missing VALUES (1)", []).unwrap_err().into();
        assert!(matches!(err, Error::Database(_)));
    }

    #[test]
    fn test_unique_violation_detection() {
        assert!(is_unique_violation(
            "Constraint Error: Duplicate key \"name: 0001_a\" violates unique constraint."
        ));
        assert!(!is_unique_violation("Catalog Error: Table with name foo does not exist!"));
    }
}
