//! Init command - creates the sentinel file

use super::Context;

pub async fn run(ctx: &Context) -> anyhow::Result<()> {
    let sentinel = ctx.sentinel();
    if sentinel.ensure()? {
        println!("Created {}", sentinel.path().display());
    } else {
        println!("{} already exists", sentinel.path().display());
    }
    Ok(())
}
