//! Ledger service - the persisted record of applied migrations
//!
//! The ledger is a single table (`migrations` by default) with an
//! auto-incrementing id, a unique unit name and a batch number. Entries are
//! only ever inserted or deleted, never updated in place.

use std::collections::HashSet;
use std::sync::Arc;

use duckdb::params;
use tracing::debug;

use crate::adapters::duckdb::DuckDbSession;
use crate::domain::result::{Error, Result};
use crate::domain::LedgerEntry;
use crate::ports::{validate_identifier, SchemaHandle};

/// Default ledger table name
pub const DEFAULT_LEDGER_TABLE: &str = "migrations";

/// Service for reading and writing ledger entries
pub struct LedgerService {
    session: Arc<DuckDbSession>,
    table: String,
}

impl LedgerService {
    /// Create a ledger service over the given table name
    pub fn new(session: Arc<DuckDbSession>, table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        validate_identifier(&table)?;
        Ok(Self { session, table })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn sequence(&self) -> String {
        format!("{}_id_seq", self.table)
    }

    /// Create the ledger table if it does not exist yet
    ///
    /// Returns `true` when the table was created by this call.
    pub fn ensure_table(&self) -> Result<bool> {
        if self.session.has_table(&self.table)? {
            return Ok(false);
        }

        let sql = format!(
            "CREATE SEQUENCE IF NOT EXISTS {seq} START 1;
             CREATE TABLE {table} (
                 id BIGINT PRIMARY KEY DEFAULT nextval('{seq}'),
                 name VARCHAR(255) NOT NULL UNIQUE,
                 batch INTEGER NOT NULL
             );",
            seq = self.sequence(),
            table = self.table
        );
        self.session.execute_batch(&sql).map_err(|e| {
            Error::database(format!("Failed to create ledger table {}: {}", self.table, e))
        })?;

        debug!(table = %self.table, "created ledger table");
        Ok(true)
    }

    /// Names of all applied units
    pub fn applied_units(&self) -> Result<HashSet<String>> {
        let conn = self.session.lock()?;
        let mut stmt = conn.prepare(&format!("SELECT name FROM {}", self.table))?;
        let names = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut result = HashSet::new();
        for name in names {
            result.insert(name?);
        }
        Ok(result)
    }

    /// Record a unit as applied in the given batch
    ///
    /// Fails with [`Error::Duplicate`] when an entry with this name exists.
    pub fn record(&self, name: &str, batch: i32) -> Result<LedgerEntry> {
        let conn = self.session.lock()?;

        conn.execute(
            &format!("INSERT INTO {} (name, batch) VALUES (?, ?)", self.table),
            params![name, batch],
        )
        .map_err(|e| match Error::from(e) {
            Error::Duplicate(_) => Error::Duplicate(name.to_string()),
            Error::Database(msg) => {
                Error::database(format!("Failed to record migration {}: {}", name, msg))
            }
            other => other,
        })?;

        let id: i64 = conn.query_row(
            &format!("SELECT id FROM {} WHERE name = ?", self.table),
            params![name],
            |row| row.get(0),
        )?;

        debug!(name = %name, batch, id, "recorded migration");
        Ok(LedgerEntry {
            id,
            name: name.to_string(),
            batch,
        })
    }

    /// Highest batch number present, 0 when the ledger is empty
    pub fn latest_batch(&self) -> Result<i32> {
        let conn = self.session.lock()?;
        let batch: i32 = conn.query_row(
            &format!("SELECT COALESCE(MAX(batch), 0) FROM {}", self.table),
            [],
            |row| row.get(0),
        )?;
        Ok(batch)
    }

    /// Entries of one batch, most recently applied first
    pub fn entries_in_batch(&self, batch: i32) -> Result<Vec<LedgerEntry>> {
        self.query_entries(
            &format!(
                "SELECT id, name, batch FROM {} WHERE batch = ? ORDER BY id DESC",
                self.table
            ),
            Some(batch),
        )
    }

    /// All entries in application order
    pub fn entries(&self) -> Result<Vec<LedgerEntry>> {
        self.query_entries(
            &format!("SELECT id, name, batch FROM {} ORDER BY id ASC", self.table),
            None,
        )
    }

    /// Remove one entry
    pub fn delete(&self, entry: &LedgerEntry) -> Result<()> {
        let conn = self.session.lock()?;
        let deleted = conn.execute(
            &format!("DELETE FROM {} WHERE id = ?", self.table),
            params![entry.id],
        )?;

        if deleted == 0 {
            return Err(Error::not_found(format!(
                "Ledger entry {} ({}) no longer exists",
                entry.id, entry.name
            )));
        }
        debug!(name = %entry.name, id = entry.id, "deleted ledger entry");
        Ok(())
    }

    fn query_entries(&self, sql: &str, batch: Option<i32>) -> Result<Vec<LedgerEntry>> {
        let conn = self.session.lock()?;
        let mut stmt = conn.prepare(sql)?;

        let rows = match batch {
            Some(batch) => stmt.query_map(params![batch], row_to_entry)?,
            None => stmt.query_map([], row_to_entry)?,
        };

        let mut entries = Vec::new();
        for entry in rows {
            entries.push(entry?);
        }
        Ok(entries)
    }
}

fn row_to_entry(row: &duckdb::Row) -> duckdb::Result<LedgerEntry> {
    Ok(LedgerEntry {
        id: row.get(0)?,
        name: row.get(1)?,
        batch: row.get(2)?,
    })
}
