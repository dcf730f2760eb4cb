//! Discovery service - lists migration units from the migrations folder
//!
//! Each directory entry's name, minus its extension, is looked up in the
//! registry. Entries without a registered unit are not migrations and are
//! skipped. Units come back in lexical file-name order, so units must be
//! named with sortable prefixes (timestamps or zero-padded counters).
//! Several files sharing a stem (`0001_a.sql`, `0001_a.md`) yield the unit
//! once, at the position of the first file.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::domain::result::{Error, Result};
use crate::domain::{MigrationRegistry, MigrationUnit};

/// Resolves directory entries to registered migration units
pub struct Discovery {
    folder: PathBuf,
    registry: Arc<MigrationRegistry>,
}

impl Discovery {
    pub fn new(folder: impl Into<PathBuf>, registry: Arc<MigrationRegistry>) -> Self {
        Self {
            folder: folder.into(),
            registry,
        }
    }

    /// List every registered unit present in the folder, in name order
    ///
    /// An unreadable folder is an [`Error::Discovery`].
    pub fn list_units(&self) -> Result<Vec<MigrationUnit>> {
        let mut file_names = list_file_names(&self.folder)?;
        file_names.sort();

        let mut units = Vec::new();
        let mut seen = HashSet::new();
        for file_name in &file_names {
            let name = unit_name(file_name);
            match self.registry.get(name) {
                Some(unit) if seen.insert(name) => units.push(unit.clone()),
                Some(_) => debug!(entry = %file_name, "unit already discovered, skipping"),
                None => debug!(entry = %file_name, "skipping non-migration entry"),
            }
        }
        Ok(units)
    }

    /// Resolve a unit by its exact name
    pub fn lookup(&self, name: &str) -> Option<MigrationUnit> {
        self.registry.get(name).cloned()
    }
}

/// Derive a unit name by stripping the last extension from a file name
pub fn unit_name(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(0) | None => file_name,
        Some(idx) => &file_name[..idx],
    }
}

/// Names of the regular files in a folder
pub(crate) fn list_file_names(folder: &Path) -> Result<Vec<String>> {
    let entries = std::fs::read_dir(folder).map_err(|e| {
        Error::Discovery(format!("Cannot read migrations folder {}: {}", folder.display(), e))
    })?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| {
            Error::Discovery(format!("Cannot read migrations folder {}: {}", folder.display(), e))
        })?;
        if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            continue;
        }
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    Ok(names)
}
