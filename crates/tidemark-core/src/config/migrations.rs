use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::migration::{LedgerTable, OrderingKind};

/// Migration catalogue and ledger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationsConfig {
    /// Directory holding the migration files.
    #[serde(default = "default_dir")]
    pub dir: PathBuf,

    /// Ledger table name, optionally schema-qualified.
    #[serde(default = "default_table")]
    pub table: String,

    /// File extension that marks a migration file.
    #[serde(default = "default_extension")]
    pub extension: String,

    /// How identifiers are ordered.
    #[serde(default)]
    pub ordering: OrderingKind,

    /// Create the ledger table when it does not exist.
    #[serde(default = "default_true")]
    pub create_ledger: bool,
}

impl Default for MigrationsConfig {
    fn default() -> Self {
        Self {
            dir: default_dir(),
            table: default_table(),
            extension: default_extension(),
            ordering: OrderingKind::default(),
            create_ledger: true,
        }
    }
}

impl MigrationsConfig {
    pub fn ledger_table(&self) -> Result<LedgerTable> {
        LedgerTable::new(&self.table)
    }
}

fn default_dir() -> PathBuf {
    PathBuf::from("./migrations")
}

fn default_table() -> String {
    "migrations".to_string()
}

fn default_extension() -> String {
    "sql".to_string()
}

fn default_true() -> bool {
    true
}
