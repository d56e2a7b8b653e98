use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::MigrationId;
use crate::error::{MigrateError, Result};

/// Direction of a migration step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}

/// One side (up or down) of a migration unit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MigrationScript {
    /// Statements in execution order.
    pub statements: Vec<String>,
    /// Whether the statements and the ledger change run in one transaction.
    pub transactional: bool,
}

impl MigrationScript {
    pub fn new(statements: Vec<String>) -> Self {
        Self {
            statements,
            transactional: true,
        }
    }

    /// Mark the script as running outside a transaction.
    pub fn without_transaction(mut self) -> Self {
        self.transactional = false;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

/// A named, reversible schema change.
#[derive(Debug, Clone)]
pub struct MigrationUnit {
    pub id: MigrationId,
    pub up: MigrationScript,
    /// `None` when the file declares no down action.
    pub down: Option<MigrationScript>,
    /// File the unit was loaded from, if any.
    pub source: Option<PathBuf>,
}

impl MigrationUnit {
    pub fn new(id: impl Into<MigrationId>, up: MigrationScript) -> Self {
        Self {
            id: id.into(),
            up,
            down: None,
            source: None,
        }
    }

    pub fn with_down(mut self, down: MigrationScript) -> Self {
        self.down = Some(down);
        self
    }

    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn is_reversible(&self) -> bool {
        self.down.is_some()
    }

    /// Script for the given direction.
    ///
    /// Fails with `InvalidScript` when asked for a down action the unit does
    /// not have.
    pub fn script(&self, direction: Direction) -> Result<&MigrationScript> {
        match direction {
            Direction::Up => Ok(&self.up),
            Direction::Down => self.down.as_ref().ok_or_else(|| MigrateError::InvalidScript {
                unit: self.id.to_string(),
                reason: "no down action declared".to_string(),
            }),
        }
    }
}
