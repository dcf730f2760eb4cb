//! Ledger records and run reports

use serde::{Deserialize, Serialize};

/// One applied migration as stored in the ledger table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Storage-assigned id; ordering reflects application order
    pub id: i64,
    /// Name of the applied unit
    pub name: String,
    /// Batch the unit was applied in
    pub batch: i32,
}

/// Outcome of an `up` run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpReport {
    /// Batch number the new entries were recorded under, if any were applied
    pub batch: Option<i32>,
    /// Names of newly applied units, in application order
    pub applied: Vec<String>,
    /// Count of discovered units that were already applied
    pub already_applied: usize,
}

impl UpReport {
    pub fn is_up_to_date(&self) -> bool {
        self.applied.is_empty()
    }
}

/// A ledger delete that failed during rollback
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedStep {
    pub name: String,
    pub error: String,
}

/// Outcome of a `rollback` run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RollbackReport {
    /// Batch that was rolled back, if the ledger had one
    pub batch: Option<i32>,
    /// Names of reverted units, in revert order
    pub rolled_back: Vec<String>,
    /// Units whose revert ran but whose ledger entry could not be deleted
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub failed: Vec<FailedStep>,
}

impl RollbackReport {
    /// True when nothing was reverted
    pub fn is_empty(&self) -> bool {
        self.rolled_back.is_empty() && self.failed.is_empty()
    }
}

/// One step of an up or rollback pass, reported as it happens
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    /// A unit's apply procedure is about to run
    Migrating { name: String, batch: i32 },
    /// A unit was applied and recorded
    Migrated { name: String, batch: i32 },
    /// A unit's revert procedure is about to run
    RollingBack { name: String, batch: i32 },
    /// A unit was reverted and its ledger entry removed
    RolledBack { name: String, batch: i32 },
    /// A unit was reverted but its ledger entry could not be removed
    DeleteFailed { name: String, error: String },
}

/// Whether a discovered unit has been applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum UnitState {
    Pending,
    Applied { id: i64, batch: i32 },
}

/// Status line for one discovered unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitStatus {
    pub name: String,
    #[serde(flatten)]
    pub state: UnitState,
}

impl UnitStatus {
    pub fn is_applied(&self) -> bool {
        matches!(self.state, UnitState::Applied { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_reports() {
        assert!(UpReport::default().is_up_to_date());
        assert!(RollbackReport::default().is_empty());

        let report = RollbackReport {
            batch: Some(1),
            rolled_back: Vec::new(),
            failed: vec![FailedStep {
                name: "0001_a".to_string(),
                error: "connection lost".to_string(),
            }],
        };
        assert!(!report.is_empty());
    }

    #[test]
    fn test_unit_status_serializes_flat() {
        let status = UnitStatus {
            name: "0001_a".to_string(),
            state: UnitState::Applied { id: 3, batch: 2 },
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["name"], "0001_a");
        assert_eq!(json["state"], "applied");
        assert_eq!(json["batch"], 2);

        let pending = UnitStatus {
            name: "0002_b".to_string(),
            state: UnitState::Pending,
        };
        assert!(!pending.is_applied());
        let json = serde_json::to_value(&pending).unwrap();
        assert_eq!(json["state"], "pending");
    }
}
