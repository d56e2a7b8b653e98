//! In-memory step executor for testing.
//!
//! Keeps the ledger in memory, records every executor call and can be told to
//! fail specific steps.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use crate::error::{MigrateError, Result};
use crate::executor::{BoxFuture, LedgerReader, StepExecutor};
use crate::migration::{
    AppliedLedger, Direction, Lexicographic, MigrationId, MigrationOrdering, MigrationUnit,
};

/// Mock step executor backed by an in-memory ledger.
///
/// # Example
///
/// ```ignore
/// let executor = MockStepExecutor::with_applied(["001_init"]).fail_on(Direction::Up, "003_index");
/// let ledger = executor.applied().await?;
/// let result = Sequencer::new(&catalogue, &ledger).run(&Target::Latest, &executor).await;
///
/// executor.assert_called(Direction::Up, "002_add_col");
/// executor.assert_not_called(Direction::Up, "004_later");
/// ```
pub struct MockStepExecutor {
    ledger: RwLock<Vec<MigrationId>>,
    calls: RwLock<Vec<(Direction, MigrationId)>>,
    failures: HashSet<(Direction, MigrationId)>,
    ordering: Arc<dyn MigrationOrdering>,
}

impl MockStepExecutor {
    /// Create an executor with an empty ledger.
    pub fn new() -> Self {
        Self {
            ledger: RwLock::new(Vec::new()),
            calls: RwLock::new(Vec::new()),
            failures: HashSet::new(),
            ordering: Arc::new(Lexicographic),
        }
    }

    /// Create an executor whose ledger already holds `ids`.
    pub fn with_applied<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<MigrationId>,
    {
        let executor = Self::new();
        *executor.ledger.write().unwrap() = ids.into_iter().map(Into::into).collect();
        executor
    }

    /// Make the given step fail without touching the ledger.
    pub fn fail_on(mut self, direction: Direction, id: &str) -> Self {
        self.failures.insert((direction, MigrationId::new(id)));
        self
    }

    /// Ordering used when the ledger is read back.
    pub fn with_ordering(mut self, ordering: Arc<dyn MigrationOrdering>) -> Self {
        self.ordering = ordering;
        self
    }

    /// Current ledger, ascending.
    pub fn ledger(&self) -> Vec<MigrationId> {
        let mut ids = self.ledger.read().unwrap().clone();
        ids.sort_by(|a, b| self.ordering.compare(a, b));
        ids
    }

    /// Every executor call in order, including failed ones.
    pub fn calls(&self) -> Vec<(Direction, MigrationId)> {
        self.calls.read().unwrap().clone()
    }

    pub fn was_called(&self, direction: Direction, id: &str) -> bool {
        self.calls
            .read()
            .unwrap()
            .iter()
            .any(|(d, call)| *d == direction && call == id)
    }

    /// Assert that a step was attempted.
    pub fn assert_called(&self, direction: Direction, id: &str) {
        assert!(
            self.was_called(direction, id),
            "Expected {} step for '{}', but it wasn't attempted. Calls: {:?}",
            direction,
            id,
            self.calls()
        );
    }

    /// Assert that a step was never attempted.
    pub fn assert_not_called(&self, direction: Direction, id: &str) {
        assert!(
            !self.was_called(direction, id),
            "Expected {} step for '{}' NOT to be attempted, but it was",
            direction,
            id
        );
    }

    fn step(&self, unit: &MigrationUnit, direction: Direction) -> Result<u64> {
        self.calls
            .write()
            .unwrap()
            .push((direction, unit.id.clone()));

        if self.failures.contains(&(direction, unit.id.clone())) {
            return Err(MigrateError::Database(format!(
                "simulated {} failure for {}",
                direction, unit.id
            )));
        }

        // Same contract as a real executor: no down action, no step.
        unit.script(direction)?;

        let mut ledger = self.ledger.write().unwrap();
        match direction {
            Direction::Up => {
                if ledger.contains(&unit.id) {
                    return Err(MigrateError::Database(format!(
                        "duplicate ledger entry {}",
                        unit.id
                    )));
                }
                ledger.push(unit.id.clone());
                Ok(1)
            }
            Direction::Down => {
                let before = ledger.len();
                ledger.retain(|id| id != &unit.id);
                Ok((before - ledger.len()) as u64)
            }
        }
    }
}

impl Default for MockStepExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl StepExecutor for MockStepExecutor {
    fn apply_up<'a>(&'a self, unit: &'a MigrationUnit) -> BoxFuture<'a, Result<u64>> {
        Box::pin(async move { self.step(unit, Direction::Up) })
    }

    fn apply_down<'a>(&'a self, unit: &'a MigrationUnit) -> BoxFuture<'a, Result<u64>> {
        Box::pin(async move { self.step(unit, Direction::Down) })
    }
}

impl LedgerReader for MockStepExecutor {
    fn applied(&self) -> BoxFuture<'_, Result<AppliedLedger>> {
        Box::pin(async move { Ok(AppliedLedger::from_ids(self.ledger())) })
    }
}
