use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{MigrationId, MigrationOrdering};
use crate::error::{MigrateError, Result};

/// A unit recorded as applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    pub id: MigrationId,
    pub applied_at: Option<DateTime<Utc>>,
}

impl LedgerEntry {
    pub fn new(id: impl Into<MigrationId>) -> Self {
        Self {
            id: id.into(),
            applied_at: None,
        }
    }
}

/// Units already applied to the target database, in ledger order.
#[derive(Debug, Clone, Default)]
pub struct AppliedLedger {
    entries: Vec<LedgerEntry>,
    ids: HashSet<MigrationId>,
}

impl AppliedLedger {
    pub fn new(entries: Vec<LedgerEntry>) -> Self {
        let ids = entries.iter().map(|e| e.id.clone()).collect();
        Self { entries, ids }
    }

    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<MigrationId>,
    {
        Self::new(ids.into_iter().map(LedgerEntry::new).collect())
    }

    /// Re-sort entries ascending with `ordering`.
    ///
    /// The database returns rows in its own collation; the sequencer needs
    /// the last entry to be the newest under the catalogue's ordering.
    pub fn sorted_by(mut self, ordering: &dyn MigrationOrdering) -> Self {
        self.entries.sort_by(|a, b| ordering.compare(&a.id, &b.id));
        self
    }

    /// Most recently applied unit, if any.
    pub fn last(&self) -> Option<&MigrationId> {
        self.entries.last().map(|e| &e.id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn ids(&self) -> impl Iterator<Item = &MigrationId> {
        self.entries.iter().map(|e| &e.id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Validated, possibly schema-qualified name of the ledger table.
///
/// The name is interpolated into SQL, so only plain identifiers are accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerTable {
    schema: Option<String>,
    name: String,
}

impl LedgerTable {
    pub fn new(qualified: &str) -> Result<Self> {
        let mut parts = qualified.split('.');
        let first = parts.next().unwrap_or_default();
        let second = parts.next();
        if parts.next().is_some() {
            return Err(MigrateError::Config(format!(
                "Invalid ledger table name '{}': too many qualifiers",
                qualified
            )));
        }

        let (schema, name) = match second {
            Some(name) => (Some(first), name),
            None => (None, first),
        };

        for part in schema.iter().copied().chain(std::iter::once(name)) {
            if !is_identifier(part) {
                return Err(MigrateError::Config(format!(
                    "Invalid ledger table name '{}'",
                    qualified
                )));
            }
        }

        Ok(Self {
            schema: schema.map(str::to_string),
            name: name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    /// Double-quoted form for use in SQL text.
    pub fn quoted(&self) -> String {
        match &self.schema {
            Some(schema) => format!("\"{}\".\"{}\"", schema, self.name),
            None => format!("\"{}\"", self.name),
        }
    }
}

impl Default for LedgerTable {
    fn default() -> Self {
        Self {
            schema: None,
            name: "migrations".to_string(),
        }
    }
}

impl fmt::Display for LedgerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => f.write_str(&self.name),
        }
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    s.len() <= 63 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
