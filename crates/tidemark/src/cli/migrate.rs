use anyhow::Result;
use clap::Parser;
use console::style;
use tracing::error;

use tidemark_core::config::TidemarkConfig;
use tidemark_core::migration::Target;
use tidemark_core::sequencer::{RunReport, StepAction};
use tidemark_core::MigrateError;
use tidemark_runtime::MigrationPlanSummary;

use super::{banner, benign_notice, connect, ConnectionArgs};

/// Bring the database to a target version.
#[derive(Parser, Debug)]
pub struct MigrateCommand {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Target migration identifier. Empty or absent means latest.
    #[arg(long)]
    pub version: Option<String>,

    /// Print the planned steps without executing them.
    #[arg(long)]
    pub dry_run: bool,
}

impl MigrateCommand {
    pub async fn execute(self, mut config: TidemarkConfig) -> Result<()> {
        self.connection.apply(&mut config)?;
        let target = Target::from_arg(self.version.as_deref());

        banner();
        let (db, runner) = connect(&config).await?;

        let outcome = if self.dry_run {
            runner.plan(&target).await.map(|plan| print_plan(&target, &plan))
        } else {
            println!("  {} Migrating to {}", style("→").dim(), describe_target(&target));
            runner.run(&target).await.map(|report| print_report(&report))
        };
        db.close().await;

        match outcome {
            Ok(()) => {
                println!();
                Ok(())
            }
            Err(err) => match benign_notice(&err) {
                Some(notice) => {
                    println!("  {} {}", style("ℹ").blue(), notice);
                    println!();
                    Ok(())
                }
                None => {
                    error!("Migration run failed: {}", err);
                    print_failure(&err);
                    Err(err.into())
                }
            },
        }
    }
}

fn describe_target(target: &Target) -> String {
    match target {
        Target::Latest => "latest".to_string(),
        Target::Version(v) => format!("version {}", v),
    }
}

fn print_report(report: &RunReport) {
    if report.is_noop() {
        println!("  {} Migrations already up to date", style("ℹ").blue());
        return;
    }

    for outcome in &report.outcomes {
        match outcome.action {
            StepAction::Apply => {
                println!("  {} Applied: {}", style("✓").green(), style(&outcome.id).cyan())
            }
            StepAction::Revert => {
                println!("  {} Reverted: {}", style("↓").green(), style(&outcome.id).cyan())
            }
            StepAction::SkipApplied | StepAction::SkipNotApplied => {
                println!("  {} {} ({})", style("-").dim(), style(&outcome.id).dim(), outcome.action)
            }
        }
    }

    println!();
    println!("  {} {}", style("✓").green(), summary_line(report));
}

fn summary_line(report: &RunReport) -> String {
    format!(
        "Done: {} applied, {} reverted, {} skipped",
        report.applied().count(),
        report.reverted().count(),
        report.skipped().count()
    )
}

fn print_plan(target: &Target, plan: &MigrationPlanSummary) {
    println!(
        "  {} Plan toward {}: {}",
        style("ℹ").blue(),
        describe_target(target),
        plan.decision
    );
    if plan.is_noop() {
        println!("  {} Nothing to do", style("-").dim());
        return;
    }

    for (id, action) in &plan.steps {
        let marker = match action {
            StepAction::Apply => style("↑").yellow(),
            StepAction::Revert => style("↓").yellow(),
            StepAction::SkipApplied | StepAction::SkipNotApplied => style("-").dim(),
        };
        println!("    {} {} {}", marker, style(id).cyan(), style(action).dim());
    }
}

fn print_failure(err: &MigrateError) {
    println!();
    match err {
        MigrateError::StepFailed {
            unit,
            direction,
            completed,
            source,
        } => {
            println!(
                "  {} Migration {} failed ({}): {}",
                style("✗").red(),
                style(unit).bold(),
                direction,
                source
            );
            if completed.is_empty() {
                println!("  {} No steps completed before the failure", style("ℹ").blue());
            } else {
                println!("  {} Completed before the failure:", style("ℹ").blue());
                for id in completed {
                    println!("    {} {}", style("✓").green(), id);
                }
            }
        }
        other => println!("  {} {}", style("✗").red(), other),
    }
    println!();
}
