//! Migration unit domain model

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::domain::result::Result;
use crate::ports::SchemaHandle;

/// Forward or backward schema mutation run against a live schema handle
pub type Procedure = Arc<dyn Fn(&dyn SchemaHandle) -> Result<()> + Send + Sync>;

/// One named, reversible schema change
///
/// Units are cheap to clone: procedures are shared behind `Arc`.
#[derive(Clone)]
pub struct MigrationUnit {
    name: String,
    apply: Option<Procedure>,
    revert: Option<Procedure>,
}

impl MigrationUnit {
    /// Create a unit with neither procedure set
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            apply: None,
            revert: None,
        }
    }

    /// Set the apply procedure
    pub fn with_apply<F>(mut self, apply: F) -> Self
    where
        F: Fn(&dyn SchemaHandle) -> Result<()> + Send + Sync + 'static,
    {
        self.apply = Some(Arc::new(apply));
        self
    }

    /// Set the revert procedure
    pub fn with_revert<F>(mut self, revert: F) -> Self
    where
        F: Fn(&dyn SchemaHandle) -> Result<()> + Send + Sync + 'static,
    {
        self.revert = Some(Arc::new(revert));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_apply(&self) -> bool {
        self.apply.is_some()
    }

    pub fn has_revert(&self) -> bool {
        self.revert.is_some()
    }

    /// Run the apply procedure; a unit without one is a no-op
    pub fn apply(&self, schema: &dyn SchemaHandle) -> Result<()> {
        match &self.apply {
            Some(apply) => apply(schema),
            None => Ok(()),
        }
    }

    /// Run the revert procedure; a unit without one is a no-op
    pub fn revert(&self, schema: &dyn SchemaHandle) -> Result<()> {
        match &self.revert {
            Some(revert) => revert(schema),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for MigrationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationUnit")
            .field("name", &self.name)
            .field("apply", &self.apply.is_some())
            .field("revert", &self.revert.is_some())
            .finish()
    }
}

/// Explicit name → unit mapping, populated at startup
#[derive(Debug, Clone, Default)]
pub struct MigrationRegistry {
    units: HashMap<String, MigrationUnit>,
}

impl MigrationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a unit, replacing any previous unit with the same name.
    /// Units with an empty name are ignored.
    pub fn register(&mut self, unit: MigrationUnit) -> &mut Self {
        if !unit.name.is_empty() {
            self.units.insert(unit.name.clone(), unit);
        }
        self
    }

    /// Builder-style variant of [`register`](Self::register)
    pub fn with(mut self, unit: MigrationUnit) -> Self {
        self.register(unit);
        self
    }

    /// Exact-name lookup
    pub fn get(&self, name: &str) -> Option<&MigrationUnit> {
        self.units.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.units.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Registered names in lexical order
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.units.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_without_procedures_is_noop() {
        let unit = MigrationUnit::new("0001_empty");
        assert_eq!(unit.name(), "0001_empty");
        assert!(!unit.has_apply());
        assert!(!unit.has_revert());
    }

    #[test]
    fn test_registry_lookup_is_exact() {
        let registry = MigrationRegistry::new()
            .with(MigrationUnit::new("0002_b"))
            .with(MigrationUnit::new("0001_a"))
            .with(MigrationUnit::new(""));

        assert_eq!(registry.len(), 2);
        assert!(registry.get("0001_a").is_some());
        assert!(registry.get("0001").is_none());
        assert!(registry.get("0001_a.sql").is_none());
        assert_eq!(registry.names(), vec!["0001_a", "0002_b"]);
    }

    #[test]
    fn test_debug_hides_closures() {
        let unit = MigrationUnit::new("0001_a").with_apply(|_| Ok(()));
        let debug = format!("{:?}", unit);
        assert!(debug.contains("0001_a"));
        assert!(debug.contains("apply: true"));
        assert!(debug.contains("revert: false"));
    }
}
