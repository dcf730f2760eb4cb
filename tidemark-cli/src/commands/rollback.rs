//! Rollback command - revert the most recent batch

use std::path::Path;

use anyhow::Result;
use colored::Colorize;
use dialoguer::Confirm;

use super::{get_context, print_json};
use crate::output;

pub fn run(project_dir: &Path, force: bool, json: bool) -> Result<()> {
    let ctx = get_context(project_dir)?;

    // Confirm removal unless --force
    if !force && !json {
        let ledger = ctx.runner.ledger();
        ledger.ensure_table()?;
        let batch = ledger.latest_batch()?;
        if batch == 0 {
            output::info("Ledger is empty, nothing to rollback.");
            return Ok(());
        }

        let entries = ledger.entries_in_batch(batch)?;
        println!("\n{}", format!("This will roll back batch {}:", batch).yellow());
        for entry in &entries {
            println!("  • {}", entry.name);
        }
        println!();

        if !Confirm::new()
            .with_prompt("Are you sure?")
            .default(false)
            .interact()?
        {
            println!("{}\n", "Cancelled".dimmed());
            return Ok(());
        }
    }

    if json {
        return print_json(ctx.runner.rollback());
    }

    let report = ctx.runner.rollback_with_progress(output::progress)?;

    if report.is_empty() {
        output::info("Ledger is empty, nothing to rollback.");
    }
    Ok(())
}
