//! Start command - runs the detection daemon

use super::Context;
use genwatch::engine::{Engine, EngineInput};
use genwatch::presenter::create_presenters;
use genwatch::{bridge, sentinel, web, DetectionMethod, EditorEvent, SelfReportedStatus};
use std::fs;
use std::time::Duration;
use tokio::io::BufReader;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};

pub(crate) const PID_FILE: &str = "/tmp/genwatch.pid";

pub async fn run(ctx: &Context, read_stdin: bool) -> anyhow::Result<()> {
    if is_running() {
        eprintln!("⚠️  genwatch is already running!");
        return Ok(());
    }

    write_pid()?;
    let _guard = scopeguard::guard((), |_| {
        remove_pid();
    });

    info!("Starting genwatch daemon (PID: {})...", std::process::id());

    let settings = ctx.settings.clone();
    let sentinel_file = ctx.sentinel();
    match sentinel_file.ensure() {
        Ok(true) => {}
        Ok(false) => info!("Using sentinel file {:?}", sentinel_file.path()),
        Err(e) => warn!("Could not create sentinel file {:?}: {}", sentinel_file.path(), e),
    }

    let (tx, rx) = mpsc::channel::<EngineInput>(256);

    let web_tx = if settings.web.enabled {
        let (web_tx, _) = broadcast::channel(64);
        Some(web_tx)
    } else {
        None
    };

    let presenter_tx = web_tx.clone();
    let engine = Engine::new(settings.clone(), Vec::new())
        .with_presenter_factory(move |s| create_presenters(s, presenter_tx.clone()))
        .with_sentinel(sentinel_file.clone())
        .with_config_path(ctx.config_path.clone());

    let mut tasks = Vec::new();

    if let Some(web_tx) = web_tx {
        let snapshot = engine.subscribe();
        let port = settings.web.port;
        tasks.push(tokio::spawn(async move {
            if let Err(e) = web::start_server(port, snapshot, web_tx).await {
                error!("Status server error: {}", e);
            }
        }));
    }

    let _watch = if settings.scorers.self_report.enabled {
        let debounce = Duration::from_millis(settings.sentinel.debounce_ms);
        match sentinel::watch(sentinel_file.clone(), debounce, tx.clone()) {
            Ok(w) => {
                // A report written before startup still counts
                if sentinel_file.read() == Some(SelfReportedStatus::Working) {
                    tx.send(EngineInput::SelfReport(SelfReportedStatus::Working)).await?;
                }
                Some(w)
            }
            Err(e) => {
                warn!("Sentinel watch unavailable, self-report disabled: {}", e);
                tx.send(EngineInput::Editor(EditorEvent::Capabilities {
                    unsupported: vec![DetectionMethod::SelfReport],
                }))
                .await?;
                None
            }
        }
    } else {
        None
    };

    if read_stdin {
        let bridge_tx = tx.clone();
        tasks.push(tokio::spawn(async move {
            let stdin = BufReader::new(tokio::io::stdin());
            bridge::forward_events(stdin, bridge_tx).await;
        }));
    }

    let signal_tx = tx.clone();
    tasks.push(tokio::spawn(async move {
        if let Err(e) = wait_for_signal().await {
            error!("Signal handler error: {}", e);
            return;
        }
        info!("Shutdown signal received");
        let _ = signal_tx.send(EngineInput::Shutdown).await;
    }));

    // The engine stops on Shutdown, so this sender only keeps the channel open
    let _tx_keepalive = tx;

    info!("✅ genwatch started, watching for AI activity...");
    let result = engine.run(rx).await;

    for task in tasks {
        task.abort();
    }

    result
}

async fn wait_for_signal() -> anyhow::Result<()> {
    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res?,
        _ = terminate.recv() => {}
    }
    Ok(())
}

fn is_running() -> bool {
    read_pid().map_or(false, |pid| unsafe { libc::kill(pid, 0) == 0 })
}

pub(crate) fn read_pid() -> Option<i32> {
    fs::read_to_string(PID_FILE).ok()?.trim().parse::<i32>().ok()
}

fn write_pid() -> anyhow::Result<()> {
    let pid = std::process::id();
    fs::write(PID_FILE, pid.to_string())?;
    Ok(())
}

fn remove_pid() {
    let _ = fs::remove_file(PID_FILE);
}
