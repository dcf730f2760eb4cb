//! Init command - set up a project directory

use std::path::Path;

use anyhow::{Context, Result};
use tidemark_core::config::Config;
use tidemark_core::{MigrationRegistry, TidemarkContext};

use crate::output;

pub fn run(project_dir: &Path) -> Result<()> {
    let config = Config::load(project_dir)?;

    if config.settings_path().exists() {
        output::warning(&format!(
            "{} already exists, keeping it",
            config.settings_path().display()
        ));
    } else {
        std::fs::create_dir_all(project_dir)
            .with_context(|| format!("Failed to create {}", project_dir.display()))?;
        config.save()?;
        output::success(&format!("Wrote {}", config.settings_path().display()));
    }

    std::fs::create_dir_all(&config.migrations_dir).with_context(|| {
        format!("Failed to create {}", config.migrations_dir.display())
    })?;
    output::success(&format!("Migrations folder {}", config.migrations_dir.display()));

    let ctx = TidemarkContext::with_config(config, MigrationRegistry::new())?;
    if ctx.runner.ledger().ensure_table()? {
        output::success(&format!(
            "Created ledger table {} in {}",
            ctx.runner.ledger().table(),
            ctx.config.database.display()
        ));
    } else {
        output::info(&format!("Ledger table {} already present", ctx.runner.ledger().table()));
    }

    Ok(())
}
