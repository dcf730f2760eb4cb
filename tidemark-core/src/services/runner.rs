//! Migration runner - applies pending units and rolls back batches
//!
//! `up` applies every discovered unit missing from the ledger, in name
//! order, under one new batch number. `rollback` reverts the entries of the
//! most recent batch, newest first. Neither pass is transactional across
//! units: units applied before a failure stay recorded.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::adapters::duckdb::DuckDbSession;
use crate::domain::result::{Error, Result};
use crate::domain::{FailedStep, Progress, RollbackReport, UnitState, UnitStatus, UpReport};
use crate::services::discovery::Discovery;
use crate::services::ledger::LedgerService;

/// What rollback does when a ledger entry cannot be deleted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RollbackPolicy {
    /// Report the failure and keep rolling back the rest of the batch
    #[default]
    Continue,
    /// Stop at the first failed delete, leaving later entries in place
    Abort,
}

/// Orchestrates discovery, the ledger and unit procedures
pub struct MigrationRunner {
    session: Arc<DuckDbSession>,
    ledger: LedgerService,
    discovery: Discovery,
    policy: RollbackPolicy,
}

impl MigrationRunner {
    pub fn new(session: Arc<DuckDbSession>, ledger: LedgerService, discovery: Discovery) -> Self {
        Self {
            session,
            ledger,
            discovery,
            policy: RollbackPolicy::default(),
        }
    }

    /// Set the delete-failure policy used by [`rollback`](Self::rollback)
    pub fn with_policy(mut self, policy: RollbackPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn ledger(&self) -> &LedgerService {
        &self.ledger
    }

    pub fn discovery(&self) -> &Discovery {
        &self.discovery
    }

    /// Apply all pending units under a new batch number
    pub fn up(&self) -> Result<UpReport> {
        self.up_with_progress(|_| {})
    }

    /// Like [`up`](Self::up), reporting each unit to `on_progress` as it
    /// is applied
    ///
    /// Steps reported before a failure stay applied and recorded.
    pub fn up_with_progress<F>(&self, mut on_progress: F) -> Result<UpReport>
    where
        F: FnMut(Progress),
    {
        self.ledger.ensure_table()?;

        let units = self.discovery.list_units()?;
        let applied = self.ledger.applied_units()?;
        let batch = self.ledger.latest_batch()? + 1;

        let mut report = UpReport::default();

        for unit in &units {
            if applied.contains(unit.name()) {
                report.already_applied += 1;
                continue;
            }

            if unit.has_apply() {
                info!(name = unit.name(), batch, "migrating");
            }
            on_progress(Progress::Migrating {
                name: unit.name().to_string(),
                batch,
            });
            unit.apply(&*self.session)
                .map_err(|e| Error::migration(unit.name(), e))?;
            self.ledger.record(unit.name(), batch)?;
            info!(name = unit.name(), batch, "migrated");
            on_progress(Progress::Migrated {
                name: unit.name().to_string(),
                batch,
            });

            report.applied.push(unit.name().to_string());
        }

        if report.applied.is_empty() {
            info!("database is up to date");
        } else {
            report.batch = Some(batch);
        }
        Ok(report)
    }

    /// Revert the most recent batch, newest entry first
    pub fn rollback(&self) -> Result<RollbackReport> {
        self.rollback_with_progress(|_| {})
    }

    /// Like [`rollback`](Self::rollback), reporting each entry to
    /// `on_progress` as it is reverted
    pub fn rollback_with_progress<F>(&self, mut on_progress: F) -> Result<RollbackReport>
    where
        F: FnMut(Progress),
    {
        self.ledger.ensure_table()?;

        let mut report = RollbackReport::default();

        let latest = self.ledger.latest_batch()?;
        if latest == 0 {
            info!("ledger is empty, nothing to rollback");
            return Ok(report);
        }

        let entries = self.ledger.entries_in_batch(latest)?;
        if entries.is_empty() {
            info!(batch = latest, "nothing to rollback");
            return Ok(report);
        }
        report.batch = Some(latest);

        for entry in &entries {
            info!(name = %entry.name, batch = latest, "rolling back");
            on_progress(Progress::RollingBack {
                name: entry.name.clone(),
                batch: latest,
            });

            match self.discovery.lookup(&entry.name) {
                Some(unit) => unit
                    .revert(&*self.session)
                    .map_err(|e| Error::migration(&entry.name, e))?,
                None => warn!(name = %entry.name, "no registered unit, removing ledger entry only"),
            }

            if let Err(e) = self.ledger.delete(entry) {
                warn!(name = %entry.name, error = %e, "failed to delete ledger entry");
                if self.policy == RollbackPolicy::Abort {
                    return Err(Error::database(format!(
                        "Rollback of batch {} stopped at {}: {}",
                        latest, entry.name, e
                    )));
                }
                on_progress(Progress::DeleteFailed {
                    name: entry.name.clone(),
                    error: e.to_string(),
                });
                report.failed.push(FailedStep {
                    name: entry.name.clone(),
                    error: e.to_string(),
                });
                continue;
            }

            info!(name = %entry.name, "rolled back");
            on_progress(Progress::RolledBack {
                name: entry.name.clone(),
                batch: latest,
            });
            report.rolled_back.push(entry.name.clone());
        }

        Ok(report)
    }

    /// Applied/pending state of every discovered unit, in name order
    pub fn status(&self) -> Result<Vec<UnitStatus>> {
        self.ledger.ensure_table()?;

        let units = self.discovery.list_units()?;
        let entries: HashMap<String, (i64, i32)> = self
            .ledger
            .entries()?
            .into_iter()
            .map(|e| (e.name, (e.id, e.batch)))
            .collect();

        Ok(units
            .iter()
            .map(|unit| UnitStatus {
                name: unit.name().to_string(),
                state: match entries.get(unit.name()) {
                    Some(&(id, batch)) => UnitState::Applied { id, batch },
                    None => UnitState::Pending,
                },
            })
            .collect())
    }

    /// Names of discovered units not yet applied
    pub fn pending(&self) -> Result<Vec<String>> {
        Ok(self
            .status()?
            .into_iter()
            .filter(|s| !s.is_applied())
            .map(|s| s.name)
            .collect())
    }
}
