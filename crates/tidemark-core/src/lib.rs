pub mod config;
pub mod error;
pub mod executor;
pub mod migration;
pub mod sequencer;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::TidemarkConfig;
pub use error::{MigrateError, Result};
pub use executor::{BoxFuture, LedgerReader, StepExecutor};
pub use migration::{
    AppliedLedger, Catalogue, Direction, LedgerEntry, LedgerTable, MigrationId, MigrationOrdering,
    MigrationScript, MigrationStatus, MigrationUnit, OrderingKind, Target,
};
pub use sequencer::{Decision, MigrationPlan, RunReport, Sequencer, StepAction};
