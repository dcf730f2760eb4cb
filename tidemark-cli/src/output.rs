//! Output formatting utilities

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};
use tidemark_core::Progress;

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Print one migration step as the runner reaches it
pub fn progress(step: Progress) {
    match step {
        Progress::Migrating { name, .. } => println!("{}", format!("Migrating {}", name).dimmed()),
        Progress::Migrated { name, .. } => success(&format!("Migrated {}", name)),
        Progress::RollingBack { name, .. } => {
            println!("{}", format!("Rolling back {}", name).dimmed())
        }
        Progress::RolledBack { name, .. } => success(&format!("Rolled back {}", name)),
        Progress::DeleteFailed { name, error } => {
            warning(&format!("Could not remove {} from the ledger: {}", name, error))
        }
    }
}
