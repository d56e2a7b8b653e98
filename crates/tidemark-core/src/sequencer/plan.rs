use std::fmt;

use crate::migration::{Direction, MigrationId, MigrationUnit};

/// What a run will do, decided once from catalogue, ledger and target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The last applied unit already is the target.
    UpToDate,
    /// Apply pending units ascending, stopping after `stop_at` when set.
    Upgrade { stop_at: Option<MigrationId> },
    /// Revert applied units descending, down to but excluding `stop_at`.
    Downgrade { stop_at: MigrationId },
}

impl Decision {
    pub fn direction(&self) -> Option<Direction> {
        match self {
            Decision::UpToDate => None,
            Decision::Upgrade { .. } => Some(Direction::Up),
            Decision::Downgrade { .. } => Some(Direction::Down),
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::UpToDate => f.write_str("already up to date"),
            Decision::Upgrade { stop_at: None } => f.write_str("upgrade to latest"),
            Decision::Upgrade { stop_at: Some(id) } => write!(f, "upgrade to {}", id),
            Decision::Downgrade { stop_at } => write!(f, "downgrade to {}", stop_at),
        }
    }
}

/// Per-unit action within a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepAction {
    Apply,
    Revert,
    /// Upgrade pass met a unit that is already applied.
    SkipApplied,
    /// Downgrade pass met a unit that was never applied.
    SkipNotApplied,
}

impl StepAction {
    /// Direction of the executor call, `None` for skips.
    pub fn direction(self) -> Option<Direction> {
        match self {
            StepAction::Apply => Some(Direction::Up),
            StepAction::Revert => Some(Direction::Down),
            StepAction::SkipApplied | StepAction::SkipNotApplied => None,
        }
    }

    pub fn is_skip(self) -> bool {
        self.direction().is_none()
    }
}

impl fmt::Display for StepAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StepAction::Apply => "apply",
            StepAction::Revert => "revert",
            StepAction::SkipApplied => "skip (already applied)",
            StepAction::SkipNotApplied => "skip (not applied)",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct PlannedStep<'a> {
    pub unit: &'a MigrationUnit,
    pub action: StepAction,
}

impl PlannedStep<'_> {
    pub fn id(&self) -> &MigrationId {
        &self.unit.id
    }
}

/// Ordered steps of one pass.
#[derive(Debug, Clone)]
pub struct MigrationPlan<'a> {
    pub decision: Decision,
    pub steps: Vec<PlannedStep<'a>>,
}

impl<'a> MigrationPlan<'a> {
    /// Steps that call the executor.
    pub fn pending(&self) -> impl Iterator<Item = &PlannedStep<'a>> {
        self.steps.iter().filter(|s| !s.action.is_skip())
    }

    pub fn is_noop(&self) -> bool {
        self.pending().next().is_none()
    }
}
