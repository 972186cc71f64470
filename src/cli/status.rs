//! Status command - shows daemon and sentinel status

use super::Context;
use genwatch::web::routes::StatusResponse;
use std::time::Duration;

pub async fn run(ctx: &Context) -> anyhow::Result<()> {
    println!("🎮 genwatch Status");
    println!("─────────────────");

    let sentinel = ctx.sentinel();
    let reported = std::fs::read_to_string(sentinel.path())
        .map(|c| c.trim().to_string())
        .unwrap_or_else(|_| "(missing)".to_string());
    println!("Sentinel: {} = {}", sentinel.path().display(), reported);

    if !ctx.settings.web.enabled {
        println!("Daemon: status server disabled");
        return Ok(());
    }

    let url = format!("http://127.0.0.1:{}/api/status", ctx.settings.web.port);
    let client = reqwest::Client::builder().timeout(Duration::from_secs(2)).build()?;

    match client.get(&url).send().await {
        Ok(resp) => {
            let status: StatusResponse = resp.error_for_status()?.json().await?;
            println!("Daemon: 🟢 Running (v{}, up {}s)", status.version, status.uptime_secs);
            println!("Activity: {}", status.activity.status);
            if let Some(method) = status.activity.last_method {
                println!(
                    "Last signal: {} ({:.0}%)",
                    method,
                    status.activity.last_confidence.unwrap_or(0.0) * 100.0
                );
            }
            println!("Generations: {}", status.activity.cycles);
        }
        Err(_) => {
            println!("Daemon: 🔴 Stopped");
            println!("\nRun 'genwatch start' to start the daemon");
        }
    }

    Ok(())
}
