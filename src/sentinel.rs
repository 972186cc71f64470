//! Sentinel status file
//!
//! The assistant writes `true`/`working` or `false`/`idle` into a well-known
//! file. A missing file is recreated with idle content and malformed content
//! is healed the same way. Read errors never escape this module.

use super::engine::EngineInput;
use super::{Result, SelfReportedStatus};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct SentinelFile {
    path: PathBuf,
}

impl SentinelFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the file with idle content if it does not exist.
    /// Returns whether the file was created.
    pub fn ensure(&self) -> Result<bool> {
        if self.path.exists() {
            return Ok(false);
        }
        self.write(SelfReportedStatus::Idle)?;
        info!("Created sentinel file {:?}", self.path);
        Ok(true)
    }

    /// Read the reported status. `None` means no usable signal this time.
    pub fn read(&self) -> Option<SelfReportedStatus> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                if let Err(e) = self.ensure() {
                    warn!("Failed to recreate sentinel file {:?}: {}", self.path, e);
                }
                return Some(SelfReportedStatus::Absent);
            }
            Err(e) => {
                warn!("Failed to read sentinel file {:?}: {}", self.path, e);
                return None;
            }
        };

        match SelfReportedStatus::parse(&content) {
            Some(status) => Some(status),
            None => {
                warn!("Malformed sentinel content {:?}, resetting to idle", content.trim());
                if let Err(e) = self.write(SelfReportedStatus::Idle) {
                    warn!("Failed to heal sentinel file {:?}: {}", self.path, e);
                }
                Some(SelfReportedStatus::Idle)
            }
        }
    }

    pub fn write(&self, status: SelfReportedStatus) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, status.as_file_content())?;
        Ok(())
    }
}

/// Running watch on a sentinel file. Dropping it stops the watch.
pub struct SentinelWatch {
    _watcher: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl Drop for SentinelWatch {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Watch the sentinel file and forward each settled read to the engine
pub fn watch(
    sentinel: SentinelFile,
    debounce: Duration,
    tx: mpsc::Sender<EngineInput>,
) -> Result<SentinelWatch> {
    let dir = match sentinel.path().parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir)?;

    let file_name = sentinel.path().file_name().map(|n| n.to_os_string());
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<()>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<notify::Event>| match res {
            Ok(event) => {
                if event.paths.iter().any(|p| p.file_name() == file_name.as_deref()) {
                    let _ = event_tx.send(());
                }
            }
            Err(e) => warn!("Sentinel watch error: {}", e),
        },
        notify::Config::default(),
    )?;
    watcher.watch(&dir, RecursiveMode::NonRecursive)?;

    info!("Watching sentinel file {:?}", sentinel.path());

    let task = tokio::spawn(async move {
        while event_rx.recv().await.is_some() {
            // Wait for the burst of events from a single write to settle
            loop {
                match tokio::time::timeout(debounce, event_rx.recv()).await {
                    Ok(Some(())) => continue,
                    Ok(None) => return,
                    Err(_) => break,
                }
            }

            let Some(status) = sentinel.read() else {
                continue;
            };
            debug!("Sentinel reports {}", status);
            if tx.send(EngineInput::SelfReport(status)).await.is_err() {
                return;
            }
        }
    });

    Ok(SentinelWatch {
        _watcher: watcher,
        task,
    })
}
