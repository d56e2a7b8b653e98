//! Seams between the sequencer and the database.

use std::future::Future;
use std::pin::Pin;

use crate::error::Result;
use crate::migration::{AppliedLedger, Direction, MigrationUnit};

/// Boxed future returned by the collaborator traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Applies or reverts exactly one migration unit.
///
/// Each call must be atomic with respect to the ledger: either the script
/// ran and the ledger entry was written (or removed), or neither happened.
/// The returned count is the number of units affected (0 or 1) and is only
/// used for reporting.
pub trait StepExecutor: Send + Sync {
    /// Run the unit's up action and record it in the ledger.
    fn apply_up<'a>(&'a self, unit: &'a MigrationUnit) -> BoxFuture<'a, Result<u64>>;

    /// Run the unit's down action and remove it from the ledger.
    fn apply_down<'a>(&'a self, unit: &'a MigrationUnit) -> BoxFuture<'a, Result<u64>>;

    /// Dispatch on direction.
    fn apply<'a>(
        &'a self,
        unit: &'a MigrationUnit,
        direction: Direction,
    ) -> BoxFuture<'a, Result<u64>> {
        match direction {
            Direction::Up => self.apply_up(unit),
            Direction::Down => self.apply_down(unit),
        }
    }
}

/// Reads the persisted ledger of applied units.
pub trait LedgerReader: Send + Sync {
    /// Applied identifiers, ascending by the ledger's ordering key.
    fn applied(&self) -> BoxFuture<'_, Result<AppliedLedger>>;
}
