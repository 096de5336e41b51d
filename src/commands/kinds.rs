use anyhow::Result;
use reconcile::Registry;

use crate::Context;
use crate::ui;

pub fn run(ctx: &Context) -> Result<()> {
    let registry = Registry::with_defaults();
    if ctx.quiet {
        for kind in registry.kinds() {
            println!("{kind}");
        }
        return Ok(());
    }

    ui::header("Operation kinds");
    for kind in registry.kinds() {
        println!("  {kind}");
    }
    Ok(())
}
