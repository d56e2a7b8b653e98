//! The migration state machine.
//!
//! Given a catalogue, the applied ledger and a target, the sequencer decides
//! between no-op, an upgrade pass and a downgrade pass, lays the pass out as
//! a plan and drives the step executor through it one unit at a time.
//!
//! A step failure aborts the pass. Steps completed before the failure are
//! left in place and reported in the error.

mod plan;
mod report;

pub use plan::{Decision, MigrationPlan, PlannedStep, StepAction};
pub use report::{RunReport, StepOutcome};

use std::cmp::Ordering;

use tracing::{debug, info, warn};

use crate::error::{MigrateError, Result};
use crate::executor::StepExecutor;
use crate::migration::{AppliedLedger, Catalogue, MigrationId, Target};

/// Decision core over one snapshot of catalogue and ledger.
pub struct Sequencer<'a> {
    catalogue: &'a Catalogue,
    applied: &'a AppliedLedger,
}

impl<'a> Sequencer<'a> {
    pub fn new(catalogue: &'a Catalogue, applied: &'a AppliedLedger) -> Self {
        Self { catalogue, applied }
    }

    /// Decide what a run toward `target` must do.
    ///
    /// An explicit target must name a catalogue unit; anything else fails
    /// with `UnknownTarget` before any step is planned.
    pub fn decide(&self, target: &Target) -> Result<Decision> {
        let target = match target {
            Target::Latest => return Ok(Decision::Upgrade { stop_at: None }),
            Target::Version(id) => id,
        };

        if !self.catalogue.contains(target.as_str()) {
            return Err(MigrateError::UnknownTarget(target.to_string()));
        }

        let decision = match self.applied.last() {
            None => Decision::Upgrade {
                stop_at: Some(target.clone()),
            },
            Some(last) => match self.catalogue.ordering().compare(last, target) {
                Ordering::Greater => Decision::Downgrade {
                    stop_at: target.clone(),
                },
                Ordering::Less => Decision::Upgrade {
                    stop_at: Some(target.clone()),
                },
                Ordering::Equal => Decision::UpToDate,
            },
        };

        debug!(
            last_applied = ?self.applied.last().map(MigrationId::as_str),
            %decision,
            "Sequencer decision"
        );
        Ok(decision)
    }

    /// Lay out the steps of the pass selected by `decision`.
    pub fn plan(&self, decision: Decision) -> MigrationPlan<'a> {
        let steps = match &decision {
            Decision::UpToDate => Vec::new(),
            Decision::Upgrade { stop_at } => self.upgrade_steps(stop_at.as_ref()),
            Decision::Downgrade { stop_at } => self.downgrade_steps(stop_at),
        };
        MigrationPlan { decision, steps }
    }

    fn upgrade_steps(&self, stop_at: Option<&MigrationId>) -> Vec<PlannedStep<'a>> {
        let mut steps = Vec::new();
        for unit in self.catalogue.iter() {
            let action = if self.applied.contains(unit.id.as_str()) {
                StepAction::SkipApplied
            } else {
                StepAction::Apply
            };
            steps.push(PlannedStep { unit, action });

            if stop_at == Some(&unit.id) {
                break;
            }
        }
        steps
    }

    fn downgrade_steps(&self, stop_at: &MigrationId) -> Vec<PlannedStep<'a>> {
        let mut steps = Vec::new();
        for unit in self.catalogue.iter().rev() {
            if &unit.id == stop_at {
                break;
            }
            let action = if self.applied.contains(unit.id.as_str()) {
                StepAction::Revert
            } else {
                StepAction::SkipNotApplied
            };
            steps.push(PlannedStep { unit, action });
        }
        steps
    }

    /// Decide, plan and execute a run toward `target`.
    pub async fn run<E>(&self, target: &Target, executor: &E) -> Result<RunReport>
    where
        E: StepExecutor + ?Sized,
    {
        let decision = self.decide(target)?;
        let plan = self.plan(decision);
        Self::execute(&plan, executor).await
    }

    /// Drive the executor through `plan`, strictly one step at a time.
    pub async fn execute<E>(plan: &MigrationPlan<'_>, executor: &E) -> Result<RunReport>
    where
        E: StepExecutor + ?Sized,
    {
        let mut report = RunReport::new(plan.decision.clone());
        let mut completed: Vec<MigrationId> = Vec::new();

        if plan.decision == Decision::UpToDate {
            info!("Migrations already up to date");
            return Ok(report);
        }
        info!(decision = %plan.decision, steps = plan.steps.len(), "Starting migration pass");

        for step in &plan.steps {
            let id = step.id();
            let direction = match step.action.direction() {
                Some(direction) => direction,
                None => {
                    match step.action {
                        StepAction::SkipApplied => {
                            info!(unit = %id, "Migration already applied, skipping")
                        }
                        _ => info!(unit = %id, "Migration not applied, skipping"),
                    }
                    report.record(id.clone(), step.action, 0);
                    continue;
                }
            };

            match executor.apply(step.unit, direction).await {
                Ok(affected) => {
                    info!(unit = %id, %direction, affected, "Migration step complete");
                    completed.push(id.clone());
                    report.record(id.clone(), step.action, affected);
                }
                Err(e) => {
                    warn!(
                        unit = %id,
                        %direction,
                        completed = completed.len(),
                        error = %e,
                        "Migration step failed, aborting pass"
                    );
                    return Err(MigrateError::StepFailed {
                        unit: id.clone(),
                        direction,
                        completed,
                        source: Box::new(e),
                    });
                }
            }
        }

        Ok(report)
    }
}
