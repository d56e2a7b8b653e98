mod executor;
mod ledger;
mod loader;
mod runner;
mod script;

pub use executor::PgStepExecutor;
pub use ledger::PgLedgerReader;
pub use loader::{load_catalogue, load_migrations_from_dir};
pub use runner::{MigrationPlanSummary, MigrationRunner, Snapshot};
pub use script::{parse_migration, split_sql_statements};
