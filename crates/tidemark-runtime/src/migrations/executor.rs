use std::time::Instant;

use sqlx::{PgConnection, PgPool};
use tracing::{debug, info};

use tidemark_core::error::{MigrateError, Result};
use tidemark_core::executor::{BoxFuture, StepExecutor};
use tidemark_core::migration::{Direction, LedgerTable, MigrationScript, MigrationUnit};

/// Applies single migration units against PostgreSQL and keeps the ledger
/// table in step.
pub struct PgStepExecutor {
    pool: PgPool,
    table: LedgerTable,
}

impl PgStepExecutor {
    /// Create a new step executor writing to `table`.
    pub fn new(pool: PgPool, table: LedgerTable) -> Self {
        Self { pool, table }
    }

    pub fn table(&self) -> &LedgerTable {
        &self.table
    }

    /// Create the ledger table if it does not exist.
    pub async fn ensure_ledger(&self) -> Result<()> {
        if let Some(schema) = self.table.schema() {
            sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS \"{}\"", schema))
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    MigrateError::Database(format!("Failed to create ledger schema: {}", e))
                })?;
        }

        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id TEXT PRIMARY KEY,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
            self.table.quoted()
        ))
        .execute(&self.pool)
        .await
        .map_err(|e| MigrateError::Database(format!("Failed to create ledger table: {}", e)))?;

        debug!("Ledger table {} ready", self.table);
        Ok(())
    }

    async fn step(&self, unit: &MigrationUnit, direction: Direction) -> Result<u64> {
        let script = unit.script(direction)?;
        let start = Instant::now();

        let affected = if script.transactional {
            let mut tx = self.pool.begin().await.map_err(|e| {
                MigrateError::Database(format!("Failed to start transaction: {}", e))
            })?;
            run_statements(&mut tx, unit, script).await?;
            let affected = self.record(&mut tx, unit, direction).await?;
            tx.commit().await.map_err(|e| {
                MigrateError::Database(format!(
                    "Failed to commit migration {}: {}",
                    unit.id, e
                ))
            })?;
            affected
        } else {
            let mut conn = self.pool.acquire().await.map_err(|e| {
                MigrateError::Database(format!("Failed to acquire connection: {}", e))
            })?;
            run_statements(&mut conn, unit, script).await?;
            self.record(&mut conn, unit, direction).await?
        };

        info!(
            unit = %unit.id,
            %direction,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Migration {} {}",
            unit.id,
            if direction == Direction::Up { "applied" } else { "reverted" }
        );
        Ok(affected)
    }

    async fn record(
        &self,
        conn: &mut PgConnection,
        unit: &MigrationUnit,
        direction: Direction,
    ) -> Result<u64> {
        let sql = match direction {
            Direction::Up => format!(
                "INSERT INTO {} (id, applied_at) VALUES ($1, NOW())",
                self.table.quoted()
            ),
            Direction::Down => format!("DELETE FROM {} WHERE id = $1", self.table.quoted()),
        };

        let result = sqlx::query(&sql)
            .bind(unit.id.as_str())
            .execute(conn)
            .await
            .map_err(|e| {
                MigrateError::Database(format!(
                    "Failed to record migration '{}': {}",
                    unit.id, e
                ))
            })?;

        Ok(result.rows_affected())
    }
}

async fn run_statements(
    conn: &mut PgConnection,
    unit: &MigrationUnit,
    script: &MigrationScript,
) -> Result<()> {
    for (i, statement) in script.statements.iter().enumerate() {
        debug!(unit = %unit.id, statement = i + 1, "Executing: {}", statement);
        sqlx::query(statement)
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                MigrateError::Database(format!(
                    "Failed to apply migration '{}' (statement {}): {}",
                    unit.id,
                    i + 1,
                    e
                ))
            })?;
    }
    Ok(())
}

impl StepExecutor for PgStepExecutor {
    fn apply_up<'a>(&'a self, unit: &'a MigrationUnit) -> BoxFuture<'a, Result<u64>> {
        Box::pin(self.step(unit, Direction::Up))
    }

    fn apply_down<'a>(&'a self, unit: &'a MigrationUnit) -> BoxFuture<'a, Result<u64>> {
        Box::pin(self.step(unit, Direction::Down))
    }
}
