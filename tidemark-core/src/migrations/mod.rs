//! SQL-file migrations
//!
//! A migrations folder holds one `<name>.sql` file per unit, plus an optional
//! `<name>.down.sql` holding the revert SQL. Down files strip to
//! `<name>.down`, which is never registered, so discovery skips them.
//!
//! sqlparser's DuckDB dialect is only used to spot files holding nothing but
//! comments. SQL it cannot parse is kept as-is and left to DuckDB, which
//! accepts statements the parser does not know.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use regex::Regex;
use sqlparser::dialect::DuckDbDialect;
use sqlparser::parser::Parser;
use tracing::{debug, warn};

use crate::domain::result::{Error, Result};
use crate::domain::{MigrationRegistry, MigrationUnit};
use crate::services::discovery::{list_file_names, unit_name};

/// Extension of apply files
pub const SQL_EXTENSION: &str = ".sql";

/// Suffix of revert files
pub const DOWN_SUFFIX: &str = ".down.sql";

/// Timestamp prefix used for new migration files
const STAMP_FORMAT: &str = "%Y_%m_%d_%H%M%S";

/// Whether a SQL script holds at least one statement
///
/// Scripts sqlparser rejects count as non-empty; DuckDB reports any real
/// syntax error when the script runs.
fn has_statements(sql: &str, source: &str) -> bool {
    let dialect = DuckDbDialect {};
    match Parser::parse_sql(&dialect, sql) {
        Ok(statements) => !statements.is_empty(),
        Err(e) => {
            warn!(file = %source, error = %e, "sql parser could not read migration, running it as-is");
            !sql.trim().is_empty()
        }
    }
}

/// Build a unit from up/down SQL, leaving out procedures with no statements
fn sql_unit(name: &str, file_name: &str, up_sql: String, down_sql: Option<String>) -> MigrationUnit {
    let mut unit = MigrationUnit::new(name);

    if has_statements(&up_sql, file_name) {
        unit = unit.with_apply(move |schema| schema.execute_batch(&up_sql));
    }

    if let Some(down_sql) = down_sql {
        let down_file = format!("{}{}", name, DOWN_SUFFIX);
        if has_statements(&down_sql, &down_file) {
            unit = unit.with_revert(move |schema| schema.execute_batch(&down_sql));
        }
    }

    unit
}

/// Build a registry from the `.sql` / `.down.sql` files in a folder
pub fn load_sql_dir(folder: &Path) -> Result<MigrationRegistry> {
    let mut file_names = list_file_names(folder)?;
    file_names.sort();

    let mut registry = MigrationRegistry::new();
    for file_name in &file_names {
        if !file_name.ends_with(SQL_EXTENSION) || file_name.ends_with(DOWN_SUFFIX) {
            continue;
        }

        let name = unit_name(file_name);
        let up_sql = fs::read_to_string(folder.join(file_name))?;
        let down_path = folder.join(format!("{}{}", name, DOWN_SUFFIX));
        let down_sql = if down_path.is_file() {
            Some(fs::read_to_string(&down_path)?)
        } else {
            None
        };

        debug!(name = %name, has_down = down_sql.is_some(), "loaded sql migration");
        registry.register(sql_unit(name, file_name, up_sql, down_sql));
    }

    Ok(registry)
}

/// Paths of a freshly created migration file pair
#[derive(Debug, Clone)]
pub struct CreatedMigration {
    pub name: String,
    pub up_path: PathBuf,
    pub down_path: PathBuf,
}

/// Create `<stamp>_<slug>.sql` and `<stamp>_<slug>.down.sql` in a folder
///
/// The slug must be lowercase snake case. Existing files are never
/// overwritten.
pub fn create_sql_pair(folder: &Path, slug: &str, now: NaiveDateTime) -> Result<CreatedMigration> {
    let slug_re = Regex::new(r"^[a-z0-9]+(_[a-z0-9]+)*$").map_err(|e| Error::Other(e.to_string()))?;
    if !slug_re.is_match(slug) {
        return Err(Error::validation(format!(
            "Migration name must be lowercase snake_case, got {:?}",
            slug
        )));
    }

    fs::create_dir_all(folder)?;

    let name = format!("{}_{}", now.format(STAMP_FORMAT), slug);
    let up_path = folder.join(format!("{}{}", name, SQL_EXTENSION));
    let down_path = folder.join(format!("{}{}", name, DOWN_SUFFIX));

    if up_path.exists() || down_path.exists() {
        return Err(Error::validation(format!("Migration {} already exists", name)));
    }

    fs::write(&up_path, format!("-- {}: apply\n", name))?;
    fs::write(&down_path, format!("-- {}: revert\n", name))?;

    Ok(CreatedMigration {
        name,
        up_path,
        down_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    use crate::adapters::duckdb::DuckDbSession;
    use crate::ports::SchemaHandle;

    fn stamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(14, 5, 7)
            .unwrap()
    }

    #[test]
    fn test_has_statements() {
        assert!(has_statements("CREATE TABLE a (id INTEGER); DROP TABLE b", "x.sql"));
        assert!(!has_statements("-- nothing here\n", "x.sql"));
        assert!(!has_statements("", "x.sql"));
        // Unparseable but non-empty scripts are left to the database
        assert!(has_statements("CREATE TABLE (", "x.sql"));
    }

    #[test]
    fn test_load_pairs_up_and_down_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("0001_users.sql"), "CREATE TABLE users (id INTEGER);").unwrap();
        fs::write(dir.path().join("0001_users.down.sql"), "DROP TABLE users;").unwrap();
        fs::write(dir.path().join("0002_posts.sql"), "CREATE TABLE posts (id INTEGER);").unwrap();
        fs::write(dir.path().join("notes.txt"), "not a migration").unwrap();

        let registry = load_sql_dir(dir.path()).unwrap();
        assert_eq!(registry.names(), vec!["0001_users", "0002_posts"]);

        let users = registry.get("0001_users").unwrap();
        assert!(users.has_apply());
        assert!(users.has_revert());

        let posts = registry.get("0002_posts").unwrap();
        assert!(posts.has_apply());
        assert!(!posts.has_revert());

        assert!(!registry.contains("0001_users.down"));
    }

    #[test]
    fn test_load_keeps_sql_the_parser_cannot_read() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("0001_documented.sql"),
            "CREATE TABLE users (id INTEGER);\nCOMMENT ON TABLE users IS 'registered users';",
        )
        .unwrap();
        fs::write(dir.path().join("0001_documented.down.sql"), "DROP TABLE users;").unwrap();

        let registry = load_sql_dir(dir.path()).unwrap();
        let unit = registry.get("0001_documented").unwrap();
        assert!(unit.has_apply());

        let session = DuckDbSession::open_in_memory().unwrap();
        unit.apply(&session).unwrap();
        assert!(session.has_table("users").unwrap());
        unit.revert(&session).unwrap();
        assert!(!session.has_table("users").unwrap());
    }

    #[test]
    fn test_malformed_sql_fails_when_applied() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("0001_bad.sql"), "CREATE TABLE (").unwrap();

        let registry = load_sql_dir(dir.path()).unwrap();
        let unit = registry.get("0001_bad").unwrap();
        assert!(unit.has_apply());

        let session = DuckDbSession::open_in_memory().unwrap();
        let err = unit.apply(&session).unwrap_err();
        assert!(matches!(err, Error::Database(_)));
    }

    #[test]
    fn test_create_sql_pair() {
        let dir = TempDir::new().unwrap();
        let folder = dir.path().join("database").join("migrations");

        let created = create_sql_pair(&folder, "create_users", stamp()).unwrap();
        assert_eq!(created.name, "2024_03_09_140507_create_users");
        assert!(created.up_path.is_file());
        assert!(created.down_path.is_file());
        assert!(created.down_path.to_string_lossy().ends_with(".down.sql"));

        // Comment-only scaffolds load as units without procedures
        let registry = load_sql_dir(&folder).unwrap();
        let unit = registry.get("2024_03_09_140507_create_users").unwrap();
        assert!(!unit.has_apply());
        assert!(!unit.has_revert());

        let err = create_sql_pair(&folder, "create_users", stamp()).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_create_sql_pair_rejects_bad_slug() {
        let dir = TempDir::new().unwrap();
        for slug in ["", "Create Users", "create-users", "_x", "x_"] {
            assert!(create_sql_pair(dir.path(), slug, stamp()).is_err(), "{:?}", slug);
        }
    }
}
