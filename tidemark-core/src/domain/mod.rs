//! Core domain entities
//!
//! Migration units, ledger records and run reports. Apart from the
//! procedures a unit carries, nothing here performs I/O.

pub mod ledger;
pub mod migration;
pub mod result;

pub use ledger::{
    FailedStep, LedgerEntry, Progress, RollbackReport, UnitState, UnitStatus, UpReport,
};
pub use migration::{MigrationRegistry, MigrationUnit, Procedure};
