use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::debug;

use tidemark_core::error::{MigrateError, Result};
use tidemark_core::executor::{BoxFuture, LedgerReader};
use tidemark_core::migration::{
    AppliedLedger, LedgerEntry, LedgerTable, MigrationId, MigrationOrdering,
};

/// Reads applied units from the ledger table.
pub struct PgLedgerReader {
    pool: PgPool,
    table: LedgerTable,
    ordering: Arc<dyn MigrationOrdering>,
}

impl PgLedgerReader {
    pub fn new(pool: PgPool, table: LedgerTable, ordering: Arc<dyn MigrationOrdering>) -> Self {
        Self {
            pool,
            table,
            ordering,
        }
    }

    /// Fetch all ledger rows, ascending by identifier.
    pub async fn read(&self) -> Result<AppliedLedger> {
        let sql = format!(
            "SELECT id, applied_at FROM {} ORDER BY id ASC",
            self.table.quoted()
        );

        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| MigrateError::LedgerQueryFailed(format!("{}: {}", self.table, e)))?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: String = row
                .try_get("id")
                .map_err(|e| MigrateError::LedgerQueryFailed(format!("Failed to read migration ID: {}", e)))?;
            let applied_at: Option<DateTime<Utc>> = row.try_get("applied_at").map_err(|e| {
                MigrateError::LedgerQueryFailed(format!("Failed to read applied_at: {}", e))
            })?;
            entries.push(LedgerEntry {
                id: MigrationId::new(id),
                applied_at,
            });
        }

        debug!("Ledger {} holds {} applied migrations", self.table, entries.len());
        Ok(AppliedLedger::new(entries).sorted_by(self.ordering.as_ref()))
    }
}

impl LedgerReader for PgLedgerReader {
    fn applied(&self) -> BoxFuture<'_, Result<AppliedLedger>> {
        Box::pin(self.read())
    }
}
