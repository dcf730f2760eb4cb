//! Up command - apply pending migrations

use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use super::{get_context, print_json};
use crate::output;

pub fn run(project_dir: &Path, json: bool) -> Result<()> {
    let ctx = get_context(project_dir)?;

    if json {
        return print_json(ctx.runner.up());
    }

    let report = ctx.runner.up_with_progress(output::progress)?;

    if report.is_up_to_date() {
        output::info("Database is up to date.");
        return Ok(());
    }

    if let Some(batch) = report.batch {
        println!(
            "{}",
            format!("{} migration(s) applied in batch {}", report.applied.len(), batch).dimmed()
        );
    }
    Ok(())
}
