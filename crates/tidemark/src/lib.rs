//! tidemark - versioned PostgreSQL schema migrations.
//!
//! Brings a database to a target migration, upgrading or downgrading one unit
//! at a time and keeping the ledger table in step.

pub mod cli;
pub mod logging;

pub use tidemark_core::{MigrateError, TidemarkConfig};
pub use tidemark_runtime::{Database, MigrationRunner};
