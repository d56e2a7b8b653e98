pub mod db;
pub mod migrations;

pub use db::Database;
pub use migrations::{
    load_catalogue, MigrationPlanSummary, MigrationRunner, PgLedgerReader, PgStepExecutor,
};
