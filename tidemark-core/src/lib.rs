//! Tidemark Core - schema migrations for DuckDB databases
//!
//! This crate follows a hexagonal layout:
//!
//! - **domain**: Migration units, ledger entries and run reports
//! - **ports**: The schema-manipulation handle procedures receive
//! - **services**: Ledger, discovery and the migration runner
//! - **adapters**: The DuckDB session implementing the schema handle
//! - **migrations**: Loading and scaffolding `.sql` migration files

pub mod adapters;
pub mod config;
pub mod domain;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use adapters::duckdb::DuckDbSession;
use config::Config;
use services::{Discovery, LedgerService};

// Re-export commonly used types at crate root
pub use domain::result::{Error, OperationResult};
pub use domain::{
    FailedStep, LedgerEntry, MigrationRegistry, MigrationUnit, Progress, RollbackReport,
    UnitState, UnitStatus, UpReport,
};
pub use ports::SchemaHandle;
pub use services::{MigrationRunner, RollbackPolicy};

/// Main context for tidemark operations
///
/// Holds the resolved configuration, the open database session and a
/// runner wired to the project's migrations folder.
pub struct TidemarkContext {
    pub config: Config,
    pub session: Arc<DuckDbSession>,
    pub runner: MigrationRunner,
}

impl TidemarkContext {
    /// Create a context for a project using an explicit unit registry
    pub fn new(project_dir: &Path, registry: MigrationRegistry) -> Result<Self> {
        let config = Config::load(project_dir)?;
        Self::with_config(config, registry)
    }

    /// Create a context whose units come from the `.sql` files in the
    /// configured migrations folder
    pub fn from_sql_dir(project_dir: &Path) -> Result<Self> {
        Self::with_sql_migrations(Config::load(project_dir)?)
    }

    /// Create a context from a resolved configuration, loading units from
    /// its migrations folder
    pub fn with_sql_migrations(config: Config) -> Result<Self> {
        let registry = migrations::load_sql_dir(&config.migrations_dir)?;
        Self::with_config(config, registry)
    }

    /// Create a context from an already resolved configuration
    pub fn with_config(config: Config, registry: MigrationRegistry) -> Result<Self> {
        let session = Arc::new(DuckDbSession::open(&config.database)?);
        let ledger = LedgerService::new(Arc::clone(&session), config.ledger_table.clone())?;
        let discovery = Discovery::new(config.migrations_dir.clone(), Arc::new(registry));
        let runner = MigrationRunner::new(Arc::clone(&session), ledger, discovery)
            .with_policy(config.rollback_policy);

        Ok(Self {
            config,
            session,
            runner,
        })
    }
}
