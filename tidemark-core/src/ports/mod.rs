//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. Migration
//! procedures depend only on these traits, not on the DuckDB adapter.

mod schema;

pub use schema::{split_qualified, validate_identifier, SchemaHandle};
