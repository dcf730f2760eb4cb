//! CLI command implementations

pub mod init;
pub mod new;
pub mod rollback;
pub mod status;
pub mod up;

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;
use tidemark_core::config::Config;
use tidemark_core::{OperationResult, TidemarkContext};

/// Resolve the project directory from `--dir` / `TIDEMARK_DIR`, or the
/// current directory
pub fn get_project_dir(dir: Option<PathBuf>) -> Result<PathBuf> {
    match dir {
        Some(dir) => Ok(dir),
        None => std::env::current_dir().context("Could not determine current directory"),
    }
}

/// Open the project database with units loaded from the migrations folder
pub fn get_context(project_dir: &Path) -> Result<TidemarkContext> {
    let config = Config::load(project_dir)?;
    if let Some(hint) = missing_project_hint(&config) {
        bail!(hint);
    }

    let database = config.database.clone();
    TidemarkContext::with_sql_migrations(config)
        .with_context(|| format!("Failed to open tidemark project at {}", database.display()))
}

/// Explain an uninitialized project, `None` when the migrations folder exists
fn missing_project_hint(config: &Config) -> Option<String> {
    if config.migrations_dir.is_dir() {
        return None;
    }
    Some(format!(
        "Migrations folder {} does not exist (run `tidemark init` first?)",
        config.migrations_dir.display()
    ))
}

/// Print a runner result as a JSON envelope, failing the command on error
pub fn print_json<T: Serialize>(result: tidemark_core::domain::result::Result<T>) -> Result<()> {
    let failure = result.as_ref().err().map(|e| e.to_string());
    let envelope = OperationResult::from(result);
    println!("{}", serde_json::to_string_pretty(&envelope)?);

    match failure {
        Some(msg) => Err(anyhow!(msg)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_hint_only_for_missing_migrations_folder() {
        let dir = TempDir::new().unwrap();
        let config = Config::defaults(dir.path());

        let hint = missing_project_hint(&config).unwrap();
        assert!(hint.contains("tidemark init"));

        fs::create_dir_all(&config.migrations_dir).unwrap();
        assert!(missing_project_hint(&config).is_none());
    }

    #[test]
    fn test_open_errors_do_not_suggest_init() {
        let dir = TempDir::new().unwrap();
        let config = Config::defaults(dir.path());
        fs::create_dir_all(&config.migrations_dir).unwrap();
        fs::write(config.migrations_dir.join("0001_a.sql"), "CREATE TABLE a (id INTEGER);").unwrap();
        // A directory in place of the database file cannot be opened
        fs::create_dir_all(&config.database).unwrap();

        let err = get_context(dir.path()).err().unwrap();
        let msg = format!("{:#}", err);
        assert!(msg.contains("Failed to open tidemark project"));
        assert!(!msg.contains("tidemark init"));
    }

    #[test]
    fn test_uninitialized_project_suggests_init() {
        let dir = TempDir::new().unwrap();
        let err = get_context(dir.path()).err().unwrap();
        assert!(err.to_string().contains("tidemark init"));
    }
}
