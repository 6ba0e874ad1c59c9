//! Namespace Resolution
//!
//! A namespace is the (database, table) pair scoping key uniqueness. Each
//! part resolves as: operation option > store option > backend fallback.

use std::fmt;

use crate::error::{Result, StoreError};
use crate::models::Options;

// == Namespace ==
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Namespace {
    pub database: String,
    pub table: String,
}

impl Namespace {
    pub fn new(database: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            table: table.into(),
        }
    }

    /// Resolves the effective namespace for one operation.
    pub fn resolve(
        database: Option<&str>,
        table: Option<&str>,
        store: &Options,
        fallback: &Namespace,
    ) -> Namespace {
        Namespace {
            database: pick(database, store.database.as_deref(), &fallback.database),
            table: pick(table, store.table.as_deref(), &fallback.table),
        }
    }

    // == Validation ==
    /// Database names may only contain letters.
    pub fn validate_database(&self) -> Result<()> {
        if self.database.is_empty() || !self.database.chars().all(char::is_alphabetic) {
            return Err(StoreError::InvalidConfig(format!(
                "database name {:?} must only contain letters",
                self.database
            )));
        }
        Ok(())
    }

    /// Table names are non-empty ASCII letters, digits and underscores.
    pub fn validate_table(&self) -> Result<()> {
        let valid = !self.table.is_empty()
            && self
                .table
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(StoreError::InvalidConfig(format!(
                "table name {:?} must only contain ASCII letters, digits or '_'",
                self.table
            )));
        }
        Ok(())
    }
}

fn pick<'a>(op: Option<&'a str>, store: Option<&'a str>, fallback: &'a str) -> String {
    op.filter(|s| !s.is_empty())
        .or(store.filter(|s| !s.is_empty()))
        .unwrap_or(fallback)
        .to_string()
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.table)
    }
}
