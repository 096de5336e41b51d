use anyhow::Result;
use reconcile::Registry;

use crate::Context;
use crate::cli::PlanArgs;
use crate::config::Plan;
use crate::ui;

pub fn run(ctx: &Context, args: PlanArgs) -> Result<()> {
    let plan = Plan::load(&args.plan, &Registry::with_defaults())?;

    if !ctx.quiet {
        ui::header(&format!("Plan {}", plan.source.display()));
        ui::kv("Host", &plan.host.name);
        ui::kv("Operations", &plan.operations.len().to_string());
        println!();
        for op in &plan.operations {
            ui::dim(&format!("{}:{}  {}", op.kind(), op.id(), op.description()));
        }
        println!();
    }

    ui::success(&format!(
        "{} valid ({} operations)",
        args.plan.display(),
        plan.operations.len()
    ));
    Ok(())
}
