use super::{Decision, StepAction};
use crate::migration::MigrationId;

/// Outcome of one processed unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub id: MigrationId,
    pub action: StepAction,
    /// Units affected as reported by the executor; 0 for skips.
    pub affected: u64,
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub decision: Decision,
    pub outcomes: Vec<StepOutcome>,
}

impl RunReport {
    pub fn new(decision: Decision) -> Self {
        Self {
            decision,
            outcomes: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, id: MigrationId, action: StepAction, affected: u64) {
        self.outcomes.push(StepOutcome {
            id,
            action,
            affected,
        });
    }

    pub fn applied(&self) -> impl Iterator<Item = &MigrationId> {
        self.of(StepAction::Apply)
    }

    pub fn reverted(&self) -> impl Iterator<Item = &MigrationId> {
        self.of(StepAction::Revert)
    }

    pub fn skipped(&self) -> impl Iterator<Item = &MigrationId> {
        self.outcomes
            .iter()
            .filter(|o| o.action.is_skip())
            .map(|o| &o.id)
    }

    fn of(&self, action: StepAction) -> impl Iterator<Item = &MigrationId> {
        self.outcomes
            .iter()
            .filter(move |o| o.action == action)
            .map(|o| &o.id)
    }

    /// Sum of executor-reported affected counts.
    pub fn total_affected(&self) -> u64 {
        self.outcomes.iter().map(|o| o.affected).sum()
    }

    /// True when the run changed nothing.
    pub fn is_noop(&self) -> bool {
        self.outcomes.iter().all(|o| o.action.is_skip())
    }
}
