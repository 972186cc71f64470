//! Config command - prints the effective settings

use super::Context;

pub async fn run(ctx: &Context) -> anyhow::Result<()> {
    match ctx.config_path {
        Some(ref path) if path.exists() => println!("# from {}", path.display()),
        _ => println!("# defaults (no settings file)"),
    }
    print!("{}", serde_yaml::to_string(&ctx.settings)?);
    Ok(())
}
