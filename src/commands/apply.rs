use anyhow::{Result, bail};
use colored::Colorize;
use reconcile::{ActionOutcome, CommandExecutor, Registry, SystemExecutor};
use std::collections::BTreeMap;

use crate::Context;
use crate::cli::ApplyArgs;
use crate::config::Plan;
use crate::ui;

/// Counts of a finished apply run
#[derive(Debug, Default, Clone)]
pub struct ApplySummary {
    pub changed: usize,
    pub unchanged: usize,
    pub failed: usize,
    /// Failures raised before any command changed the target
    pub untouched: usize,
    /// Not attempted because an earlier operation failed under `--fail-fast`
    pub skipped: usize,
    pub outcomes: Vec<ActionOutcome>,
}

impl ApplySummary {
    pub fn total(&self) -> usize {
        self.changed + self.unchanged + self.failed + self.skipped
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Changed outcomes counted per classification tag
    pub fn changes_by_tag(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for outcome in self.outcomes.iter().filter(|o| o.changed) {
            *counts.entry(outcome.tag()).or_insert(0) += 1;
        }
        counts
    }

    fn record(&mut self, outcome: ActionOutcome) {
        if outcome.changed {
            self.changed += 1;
        } else {
            self.unchanged += 1;
        }
        self.outcomes.push(outcome);
    }
}

pub fn run(ctx: &Context, args: ApplyArgs) -> Result<()> {
    let registry = Registry::with_defaults();
    let plan = Plan::load(&args.plan, &registry)?;
    let exec = SystemExecutor::dry_run(args.dry_run);

    if plan.operations.is_empty() {
        ui::warn(&format!("{} has no operations", args.plan.display()));
        return Ok(());
    }

    if !ctx.quiet {
        ui::header(&format!(
            "Applying {} on {}",
            args.plan.display(),
            plan.host.name
        ));
        if exec.is_dry_run() {
            ui::info("Dry run - state-changing commands are logged, not run");
        }
    }

    let summary = apply_plan(ctx, &plan, &exec, args.fail_fast);
    print_summary(&summary, exec.is_dry_run());
    log::debug!("outcomes: {}", serde_json::to_string(&summary.outcomes)?);

    if !summary.is_success() {
        bail!("{} of {} operations failed", summary.failed, summary.total());
    }
    Ok(())
}

/// Apply every operation in order.
///
/// A failed operation doesn't affect the others unless `fail_fast` is set,
/// in which case the rest of the plan is skipped.
pub fn apply_plan(
    ctx: &Context,
    plan: &Plan,
    exec: &dyn CommandExecutor,
    fail_fast: bool,
) -> ApplySummary {
    let mut summary = ApplySummary::default();

    for (index, op) in plan.operations.iter().enumerate() {
        log::debug!("{}", op.description());

        match op.apply(&plan.host, exec) {
            Ok(outcome) => {
                if outcome.changed || !ctx.quiet {
                    ui::outcome(&op.id(), &outcome);
                }
                summary.record(outcome);
            }
            Err(err) => {
                let category = err.category();
                summary.failed += 1;
                if category.is_side_effect_free() {
                    summary.untouched += 1;
                }
                ui::failure(op.kind(), &op.id(), &err.to_string());
                if ctx.verbose > 0 {
                    ui::dim(&format!("{}: {}", category.description(), category.advice()));
                }

                if fail_fast {
                    summary.skipped = plan.operations.len() - index - 1;
                    break;
                }
            }
        }
    }

    summary
}

fn print_summary(summary: &ApplySummary, dry_run: bool) {
    println!();
    if summary.is_success() {
        ui::success(if dry_run {
            "Plan checked (dry run)"
        } else {
            "Plan applied successfully"
        });
    } else {
        println!("{} Plan applied with errors", "⚠".yellow().bold());
    }

    if summary.changed > 0 {
        let tags: Vec<String> = summary
            .changes_by_tag()
            .into_iter()
            .map(|(tag, count)| format!("{tag} {count}"))
            .collect();
        println!("    • {} changed ({})", summary.changed, tags.join(", "));
    }
    if summary.unchanged > 0 {
        println!("    • {} unchanged", summary.unchanged);
    }
    if summary.skipped > 0 {
        println!("    • {} skipped", summary.skipped);
    }
    if summary.failed > 0 {
        println!("    • {} {}", summary.failed, "failed".red());
        if summary.untouched > 0 {
            ui::dim(&format!(
                "{} of them failed before touching the target",
                summary.untouched
            ));
        }
    }
}
