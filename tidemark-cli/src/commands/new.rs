//! New command - scaffold a migration file pair

use std::path::Path;

use anyhow::Result;
use chrono::Local;
use colored::Colorize;
use tidemark_core::config::Config;
use tidemark_core::migrations::create_sql_pair;

use crate::output;

pub fn run(project_dir: &Path, name: &str) -> Result<()> {
    let config = Config::load(project_dir)?;
    let created = create_sql_pair(&config.migrations_dir, name, Local::now().naive_local())?;

    output::success(&format!("Created migration {}", created.name.bold()));
    println!("  {}", created.up_path.display().to_string().dimmed());
    println!("  {}", created.down_path.display().to_string().dimmed());
    Ok(())
}
