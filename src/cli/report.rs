//! Report command - lets an assistant write its own status

use super::Context;
use genwatch::SelfReportedStatus;

pub async fn run(ctx: &Context, status: SelfReportedStatus) -> anyhow::Result<()> {
    let sentinel = ctx.sentinel();
    sentinel.write(status)?;
    println!("Reported {} to {}", status, sentinel.path().display());
    Ok(())
}
