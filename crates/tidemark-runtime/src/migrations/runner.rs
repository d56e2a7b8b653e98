//! One migration run: load the catalogue, read the ledger, let the sequencer
//! decide, then step.
//!
//! Catalogue and ledger are loaded fresh on every call; nothing is cached
//! between runs. Concurrent runs against one database are not guarded.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sqlx::PgPool;
use tracing::{debug, info};

use tidemark_core::config::MigrationsConfig;
use tidemark_core::error::Result;
use tidemark_core::migration::{
    AppliedLedger, Catalogue, LedgerTable, MigrationId, MigrationOrdering, MigrationStatus,
    Target,
};
use tidemark_core::sequencer::{Decision, MigrationPlan, RunReport, Sequencer, StepAction};

use super::executor::PgStepExecutor;
use super::ledger::PgLedgerReader;
use super::loader::load_catalogue;

/// Catalogue and ledger captured at the start of a run.
pub struct Snapshot {
    pub catalogue: Catalogue,
    pub ledger: AppliedLedger,
}

impl Snapshot {
    pub fn sequencer(&self) -> Sequencer<'_> {
        Sequencer::new(&self.catalogue, &self.ledger)
    }

    /// Plan a run toward `target` without executing it.
    pub fn plan(&self, target: &Target) -> Result<MigrationPlan<'_>> {
        let sequencer = self.sequencer();
        let decision = sequencer.decide(target)?;
        Ok(sequencer.plan(decision))
    }

    pub fn status(&self) -> MigrationStatus {
        MigrationStatus::compute(&self.catalogue, &self.ledger)
    }
}

/// Wires the directory loader, ledger reader and step executor around the
/// sequencer.
pub struct MigrationRunner {
    dir: PathBuf,
    extension: String,
    create_ledger: bool,
    ordering: Arc<dyn MigrationOrdering>,
    reader: PgLedgerReader,
    executor: PgStepExecutor,
}

impl MigrationRunner {
    pub fn new(pool: PgPool, config: &MigrationsConfig) -> Result<Self> {
        let table: LedgerTable = config.ledger_table()?;
        let ordering = config.ordering.comparator();

        Ok(Self {
            dir: config.dir.clone(),
            extension: config.extension.clone(),
            create_ledger: config.create_ledger,
            reader: PgLedgerReader::new(pool.clone(), table.clone(), Arc::clone(&ordering)),
            executor: PgStepExecutor::new(pool, table),
            ordering,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load the catalogue and the ledger.
    ///
    /// A missing directory surfaces as `DirectoryNotFound` before the ledger
    /// is touched.
    pub async fn snapshot(&self) -> Result<Snapshot> {
        let catalogue = load_catalogue(&self.dir, &self.extension, Arc::clone(&self.ordering))?;
        info!("Found {} migrations in {:?}", catalogue.len(), self.dir);

        if self.create_ledger {
            self.executor.ensure_ledger().await?;
        }
        let ledger = self.reader.read().await?;
        debug!(
            "Last applied migration: {}",
            ledger.last().map(|id| id.as_str()).unwrap_or("<none>")
        );

        Ok(Snapshot { catalogue, ledger })
    }

    /// Bring the database to `target`.
    pub async fn run(&self, target: &Target) -> Result<RunReport> {
        let snapshot = self.snapshot().await?;
        match target {
            Target::Latest => info!("Migrating to latest version"),
            Target::Version(v) => info!("Migrating to version {}", v),
        }
        let sequencer = snapshot.sequencer();
        let report = sequencer.run(target, &self.executor).await?;
        Ok(report)
    }

    /// Plan a run toward `target` without executing anything.
    pub async fn plan(&self, target: &Target) -> Result<MigrationPlanSummary> {
        let snapshot = self.snapshot().await?;
        let plan = snapshot.plan(target)?;
        Ok(MigrationPlanSummary::from_plan(&plan))
    }

    /// Applied and pending units.
    pub async fn status(&self) -> Result<MigrationStatus> {
        Ok(self.snapshot().await?.status())
    }
}

/// Owned rendering of a plan, detached from the snapshot it borrows.
#[derive(Debug, Clone)]
pub struct MigrationPlanSummary {
    pub decision: Decision,
    pub steps: Vec<(MigrationId, StepAction)>,
}

impl MigrationPlanSummary {
    pub fn from_plan(plan: &MigrationPlan<'_>) -> Self {
        Self {
            decision: plan.decision.clone(),
            steps: plan
                .steps
                .iter()
                .map(|s| (s.id().clone(), s.action))
                .collect(),
        }
    }

    pub fn is_noop(&self) -> bool {
        self.steps.iter().all(|(_, action)| action.is_skip())
    }
}
