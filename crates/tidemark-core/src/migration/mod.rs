//! Migration data model: units, the on-disk catalogue, the applied ledger,
//! run targets and the ordering used to compare identifiers.

mod catalogue;
mod id;
mod ledger;
mod ordering;
mod status;
mod target;
mod unit;

pub use catalogue::Catalogue;
pub use id::MigrationId;
pub use ledger::{AppliedLedger, LedgerEntry, LedgerTable};
pub use ordering::{Lexicographic, MigrationOrdering, NumericPrefix, OrderingKind};
pub use status::MigrationStatus;
pub use target::Target;
pub use unit::{Direction, MigrationScript, MigrationUnit};
