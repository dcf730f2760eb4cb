//! Status command - list applied and pending migrations

use std::path::Path;

use anyhow::Result;
use colored::Colorize;
use tidemark_core::UnitState;

use super::{get_context, print_json};
use crate::output;

pub fn run(project_dir: &Path, json: bool) -> Result<()> {
    let ctx = get_context(project_dir)?;
    let result = ctx.runner.status();

    if json {
        return print_json(result);
    }
    let status = result?;

    if status.is_empty() {
        output::info(&format!(
            "No migrations found in {}",
            ctx.config.migrations_dir.display()
        ));
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Migration", "Batch", "Status"]);
    for unit in &status {
        match unit.state {
            UnitState::Applied { batch, .. } => {
                table.add_row(vec![unit.name.clone(), batch.to_string(), "applied".to_string()]);
            }
            UnitState::Pending => {
                table.add_row(vec![unit.name.clone(), "-".to_string(), "pending".to_string()]);
            }
        }
    }
    println!("{}", table);

    let pending = status.iter().filter(|s| !s.is_applied()).count();
    if pending == 0 {
        println!("{}", "Database is up to date.".dimmed());
    } else {
        println!("{}", format!("{} pending migration(s)", pending).yellow());
    }
    Ok(())
}
