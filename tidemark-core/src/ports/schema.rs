//! Schema handle port - what apply/revert procedures can do to the database

use regex::Regex;

use crate::domain::result::{Error, Result};

/// Live schema access handed to migration procedures
///
/// Implementations only need the introspection and raw execution methods;
/// the DDL helpers are built on top of `execute_batch`.
pub trait SchemaHandle {
    // === Introspection ===

    /// Check whether a table exists (`schema.table` or bare `table`)
    fn has_table(&self, table: &str) -> Result<bool>;

    /// Check whether a column exists on a table
    fn has_column(&self, table: &str, column: &str) -> Result<bool>;

    // === Raw execution ===

    /// Execute a single statement, returning the number of affected rows
    fn execute(&self, sql: &str) -> Result<usize>;

    /// Execute one or more `;`-separated statements
    fn execute_batch(&self, sql: &str) -> Result<()>;

    // === DDL ===

    /// Create a table from raw column definitions, e.g. `"id INTEGER PRIMARY KEY"`
    fn create_table(&self, table: &str, columns: &[&str]) -> Result<()> {
        validate_identifier(table)?;
        if columns.is_empty() {
            return Err(Error::validation(format!(
                "Table {} needs at least one column",
                table
            )));
        }
        self.execute_batch(&format!("CREATE TABLE {} ({})", table, columns.join(", ")))
    }

    /// Drop a table if it exists
    fn drop_table(&self, table: &str) -> Result<()> {
        validate_identifier(table)?;
        self.execute_batch(&format!("DROP TABLE IF EXISTS {}", table))
    }

    /// Add a column from a raw definition, e.g. `"email VARCHAR"`
    fn add_column(&self, table: &str, column_def: &str) -> Result<()> {
        validate_identifier(table)?;
        self.execute_batch(&format!("ALTER TABLE {} ADD COLUMN {}", table, column_def))
    }

    fn drop_column(&self, table: &str, column: &str) -> Result<()> {
        validate_identifier(table)?;
        validate_identifier(column)?;
        self.execute_batch(&format!("ALTER TABLE {} DROP COLUMN {}", table, column))
    }

    fn rename_table(&self, from: &str, to: &str) -> Result<()> {
        validate_identifier(from)?;
        validate_identifier(to)?;
        self.execute_batch(&format!("ALTER TABLE {} RENAME TO {}", from, to))
    }
}

/// Accept `name` or `schema.name` made of ASCII letters, digits and underscores
pub fn validate_identifier(ident: &str) -> Result<()> {
    let re = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$")
        .map_err(|e| Error::Other(e.to_string()))?;
    if re.is_match(ident) {
        Ok(())
    } else {
        Err(Error::validation(format!("Invalid identifier: {:?}", ident)))
    }
}

/// Split `schema.table` into its parts, defaulting the schema to `main`
pub fn split_qualified(ident: &str) -> (&str, &str) {
    match ident.split_once('.') {
        Some((schema, table)) => (schema, table),
        None => ("main", ident),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Records every batch instead of executing it
    #[derive(Default)]
    struct RecordingHandle {
        statements: RefCell<Vec<String>>,
    }

    impl SchemaHandle for RecordingHandle {
        fn has_table(&self, _table: &str) -> Result<bool> {
            Ok(false)
        }

        fn has_column(&self, _table: &str, _column: &str) -> Result<bool> {
            Ok(false)
        }

        fn execute(&self, sql: &str) -> Result<usize> {
            self.statements.borrow_mut().push(sql.to_string());
            Ok(0)
        }

        fn execute_batch(&self, sql: &str) -> Result<()> {
            self.statements.borrow_mut().push(sql.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_ddl_helpers_emit_sql() {
        let handle = RecordingHandle::default();
        handle
            .create_table("users", &["id INTEGER PRIMARY KEY", "email VARCHAR"])
            .unwrap();
        handle.add_column("users", "name VARCHAR").unwrap();
        handle.drop_column("users", "name").unwrap();
        handle.rename_table("users", "accounts").unwrap();
        handle.drop_table("accounts").unwrap();

        let statements = handle.statements.borrow();
        assert_eq!(
            statements.as_slice(),
            &[
                "CREATE TABLE users (id INTEGER PRIMARY KEY, email VARCHAR)",
                "ALTER TABLE users ADD COLUMN name VARCHAR",
                "ALTER TABLE users DROP COLUMN name",
                "ALTER TABLE users RENAME TO accounts",
                "DROP TABLE IF EXISTS accounts",
            ]
        );
    }

    #[test]
    fn test_create_table_requires_columns() {
        let handle = RecordingHandle::default();
        assert!(handle.create_table("users", &[]).is_err());
        assert!(handle.statements.borrow().is_empty());
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("migrations").is_ok());
        assert!(validate_identifier("main.schema_migrations").is_ok());
        assert!(validate_identifier("_private1").is_ok());

        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("1users").is_err());
        assert!(validate_identifier("users; DROP TABLE x").is_err());
        assert!(validate_identifier("a.b.c").is_err());
    }

    #[test]
    fn test_split_qualified() {
        assert_eq!(split_qualified("users"), ("main", "users"));
        assert_eq!(split_qualified("audit.events"), ("audit", "events"));
    }
}
