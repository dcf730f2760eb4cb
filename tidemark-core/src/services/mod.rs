//! Service layer - migration orchestration
//!
//! The ledger persists what has been applied, discovery resolves the
//! migrations folder to registered units, and the runner ties both to the
//! unit procedures.

pub mod discovery;
pub mod ledger;
pub mod runner;

pub use discovery::{unit_name, Discovery};
pub use ledger::{LedgerService, DEFAULT_LEDGER_TABLE};
pub use runner::{MigrationRunner, RollbackPolicy};
