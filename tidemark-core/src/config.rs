//! Configuration management
//!
//! Project settings live in `tidemark.json` at the project root:
//! ```json
//! {
//!   "database": "database.duckdb",
//!   "migrationsDir": "database/migrations",
//!   "ledgerTable": "migrations",
//!   "rollbackPolicy": "continue"
//! }
//! ```
//! Every key is optional. Relative paths resolve against the project root.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::result::Error;
use crate::ports::validate_identifier;
use crate::services::{RollbackPolicy, DEFAULT_LEDGER_TABLE};

/// Settings file name inside the project directory
pub const SETTINGS_FILE: &str = "tidemark.json";

/// Default database file, relative to the project directory
pub const DEFAULT_DATABASE: &str = "database.duckdb";

/// Default migrations folder, relative to the project directory
pub const DEFAULT_MIGRATIONS_DIR: &str = "database/migrations";

/// Environment variable overriding the database path
pub const DATABASE_ENV: &str = "TIDEMARK_DATABASE";

/// Environment variable overriding the migrations folder
pub const MIGRATIONS_DIR_ENV: &str = "TIDEMARK_MIGRATIONS_DIR";

/// Raw tidemark.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    database: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    migrations_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ledger_table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rollback_policy: Option<RollbackPolicy>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Resolved tidemark configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub project_dir: PathBuf,
    pub database: PathBuf,
    pub migrations_dir: PathBuf,
    pub ledger_table: String,
    pub rollback_policy: RollbackPolicy,
    // Keep the raw settings for preservation when saving
    _raw_settings: SettingsFile,
}

impl Config {
    /// Defaults for a project directory, ignoring any settings file
    pub fn defaults(project_dir: &Path) -> Self {
        Self::resolve(project_dir, SettingsFile::default(), |_| None)
    }

    /// Load config from a project directory
    ///
    /// `TIDEMARK_DATABASE` and `TIDEMARK_MIGRATIONS_DIR` override the
    /// settings file.
    pub fn load(project_dir: &Path) -> Result<Self> {
        Self::load_with_env(project_dir, |key| std::env::var(key).ok())
    }

    /// Load config with a custom environment lookup
    pub fn load_with_env<F>(project_dir: &Path, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let settings_path = project_dir.join(SETTINGS_FILE);

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)
                .with_context(|| format!("Failed to read {}", settings_path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid settings in {}", settings_path.display()))?
        } else {
            SettingsFile::default()
        };

        let config = Self::resolve(project_dir, raw, env);
        validate_identifier(&config.ledger_table).map_err(|_| {
            Error::Config(format!(
                "ledgerTable {:?} in {} is not a valid table name",
                config.ledger_table,
                settings_path.display()
            ))
        })?;
        Ok(config)
    }

    fn resolve<F>(project_dir: &Path, raw: SettingsFile, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let resolve_path = |value: String| {
            let path = PathBuf::from(value);
            if path.is_absolute() {
                path
            } else {
                project_dir.join(path)
            }
        };

        let database = env(DATABASE_ENV)
            .filter(|v| !v.is_empty())
            .or_else(|| raw.database.clone())
            .unwrap_or_else(|| DEFAULT_DATABASE.to_string());

        let migrations_dir = env(MIGRATIONS_DIR_ENV)
            .filter(|v| !v.is_empty())
            .or_else(|| raw.migrations_dir.clone())
            .unwrap_or_else(|| DEFAULT_MIGRATIONS_DIR.to_string());

        Self {
            project_dir: project_dir.to_path_buf(),
            database: resolve_path(database),
            migrations_dir: resolve_path(migrations_dir),
            ledger_table: raw
                .ledger_table
                .clone()
                .unwrap_or_else(|| DEFAULT_LEDGER_TABLE.to_string()),
            rollback_policy: raw.rollback_policy.unwrap_or_default(),
            _raw_settings: raw,
        }
    }

    /// Path of the settings file for this project
    pub fn settings_path(&self) -> PathBuf {
        self.project_dir.join(SETTINGS_FILE)
    }

    /// Save config to the project directory
    /// Preserves keys this crate doesn't manage
    pub fn save(&self) -> Result<()> {
        let mut settings = self._raw_settings.clone();

        settings.database = Some(self.relative(&self.database));
        settings.migrations_dir = Some(self.relative(&self.migrations_dir));
        settings.ledger_table = Some(self.ledger_table.clone());
        settings.rollback_policy = Some(self.rollback_policy);

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(self.settings_path(), content)?;
        Ok(())
    }

    fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.project_dir)
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned()
    }
}
