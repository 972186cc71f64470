//! Detection engine
//!
//! A single task owns the aggregator and the scorers. Event sources only
//! send [`EngineInput`] messages, so the activity state has exactly one
//! writer. The watchdog is the aggregator's deadline, re-armed on every
//! iteration of the loop.

use super::aggregator::{Aggregator, Transition, TransitionReason};
use super::config::Settings;
use super::presenter::Presenter;
use super::scorers::{create_scorers, Scorer};
use super::sentinel::SentinelFile;
use super::{
    ActivitySnapshot, DetectionMethod, EditorEvent, Notification, SelfReportedStatus, Signal,
};
use std::collections::HashSet;
use std::path::PathBuf;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Messages accepted by the engine loop
#[derive(Debug, Clone, PartialEq)]
pub enum EngineInput {
    /// Raw event from the editor host
    Editor(EditorEvent),
    /// Settled read of the sentinel file
    SelfReport(SelfReportedStatus),
    /// Replace the running settings
    Reload(Box<Settings>),
    /// Dispose everything and stop
    Shutdown,
}

/// Builds the presenter set for a given configuration
pub type PresenterFactory = Box<dyn Fn(&Settings) -> Vec<Box<dyn Presenter>> + Send + Sync>;

pub struct Engine {
    settings: Settings,
    config_path: Option<PathBuf>,
    aggregator: Aggregator,
    scorers: Vec<Box<dyn Scorer>>,
    unsupported: HashSet<DetectionMethod>,
    presenters: Vec<Box<dyn Presenter>>,
    presenter_factory: Option<PresenterFactory>,
    presenters_stale: bool,
    sentinel: Option<SentinelFile>,
    snapshot_tx: watch::Sender<ActivitySnapshot>,
}

impl Engine {
    pub fn new(settings: Settings, presenters: Vec<Box<dyn Presenter>>) -> Self {
        let aggregator = Aggregator::new(settings.confidence_threshold, &settings.watchdog);
        let scorers = create_scorers(&settings.scorers);
        let (snapshot_tx, _) = watch::channel(aggregator.snapshot());

        Self {
            settings,
            config_path: None,
            aggregator,
            scorers,
            unsupported: HashSet::new(),
            presenters,
            presenter_factory: None,
            presenters_stale: false,
            sentinel: None,
            snapshot_tx,
        }
    }

    /// Build presenters from settings, and rebuild them whenever a reload
    /// changes the show delay or the presenter settings
    pub fn with_presenter_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&Settings) -> Vec<Box<dyn Presenter>> + Send + Sync + 'static,
    {
        self.presenters = factory(&self.settings);
        self.presenter_factory = Some(Box::new(factory));
        self
    }

    /// Sentinel to reset to idle at the end of every generation
    pub fn with_sentinel(mut self, sentinel: SentinelFile) -> Self {
        self.sentinel = Some(sentinel);
        self
    }

    /// File to reload when the editor reports a configuration change
    pub fn with_config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    /// Subscribe to activity snapshots
    pub fn subscribe(&self) -> watch::Receiver<ActivitySnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Names of the scorers currently in use
    pub fn active_scorers(&self) -> Vec<&'static str> {
        self.scorers
            .iter()
            .filter(|s| !self.unsupported.contains(&s.method()))
            .map(|s| s.name())
            .collect()
    }

    /// Run until shutdown is requested or every sender is dropped
    pub async fn run(mut self, mut inputs: mpsc::Receiver<EngineInput>) -> anyhow::Result<()> {
        info!("Detection engine running with scorers: {:?}", self.active_scorers());

        loop {
            let deadline = self.aggregator.deadline();
            tokio::select! {
                input = inputs.recv() => match input {
                    Some(EngineInput::Shutdown) | None => break,
                    Some(input) => self.handle(input, Instant::now()).await,
                },
                _ = sleep_until(deadline) => {
                    if let Some(transition) = self.aggregator.expire(Instant::now()) {
                        self.dispatch(transition).await;
                    }
                }
            }
            self.publish();
        }

        self.shutdown().await;
        Ok(())
    }

    async fn handle(&mut self, input: EngineInput, now: Instant) {
        match input {
            EngineInput::Editor(EditorEvent::ConfigurationChanged) => {
                self.reload_from_source().await
            }
            EngineInput::Editor(EditorEvent::Capabilities { unsupported }) => {
                for method in unsupported {
                    debug!("Event source {} unsupported by host, scorer disabled", method);
                    self.unsupported.insert(method);
                }
            }
            EngineInput::Editor(event) => self.score(Signal::Editor(event), now).await,
            EngineInput::SelfReport(status) => self.score(Signal::SelfReport(status), now).await,
            EngineInput::Reload(settings) => self.apply_settings(*settings).await,
            EngineInput::Shutdown => {}
        }
    }

    async fn score(&mut self, signal: Signal, now: Instant) {
        if !self.settings.enabled {
            return;
        }

        let mut transitions = Vec::new();
        for scorer in self.scorers.iter_mut() {
            if self.unsupported.contains(&scorer.method()) {
                continue;
            }
            let Some(event) = scorer.score(&signal, now) else {
                continue;
            };
            debug!(
                "{} scored {:.2} ({:?}): {}",
                scorer.name(),
                event.confidence,
                event.polarity,
                event.descriptor
            );
            if let Some(transition) = self.aggregator.apply(&event, now) {
                transitions.push(transition);
            }
        }

        for transition in transitions {
            self.dispatch(transition).await;
        }
    }

    async fn reload_from_source(&mut self) {
        match Settings::load(self.config_path.as_deref()) {
            Ok(settings) => self.apply_settings(settings).await,
            Err(e) => warn!("Keeping current settings, reload failed: {}", e),
        }
    }

    async fn apply_settings(&mut self, settings: Settings) {
        if let Err(e) = settings.validate() {
            warn!("Rejected settings: {}", e);
            return;
        }

        self.aggregator
            .reconfigure(settings.confidence_threshold, &settings.watchdog);
        if settings.scorers != self.settings.scorers {
            self.scorers = create_scorers(&settings.scorers);
        }
        warn_restart_required(&self.settings, &settings);

        let presenters_changed = settings.show_delay_ms != self.settings.show_delay_ms
            || settings.presenters != self.settings.presenters;
        let disabled = self.settings.enabled && !settings.enabled;
        self.settings = settings;
        info!(
            "Settings applied (enabled: {}, threshold: {:.2})",
            self.settings.enabled, self.settings.confidence_threshold
        );

        if presenters_changed && self.presenter_factory.is_some() {
            self.presenters_stale = true;
        }

        if disabled {
            if let Some(transition) = self.aggregator.force_idle() {
                self.dispatch(transition).await;
            }
        }

        // Presenters only change between generations
        if !self.aggregator.is_generating() {
            self.rebuild_presenters().await;
        }
    }

    async fn rebuild_presenters(&mut self) {
        if !self.presenters_stale {
            return;
        }
        let Some(ref factory) = self.presenter_factory else {
            return;
        };
        let presenters = factory(&self.settings);
        self.presenters_stale = false;

        let previous = std::mem::replace(&mut self.presenters, presenters);
        for presenter in &previous {
            presenter.close().await;
        }
        info!(
            "Presenters rebuilt: {:?}",
            self.presenters.iter().map(|p| p.name()).collect::<Vec<_>>()
        );
    }

    async fn dispatch(&mut self, transition: Transition) {
        info!("{} ({})", transition.notification, transition.reason);

        for presenter in &self.presenters {
            if let Err(e) = presenter.notify(transition.notification).await {
                error!("Presenter {} failed: {}", presenter.name(), e);
            }
        }

        if transition.notification == Notification::GenerationEnded {
            if transition.reason != TransitionReason::ExplicitIdle {
                self.reset_sentinel();
            }
            self.rebuild_presenters().await;
        }
    }

    /// Overwrite a stale working report once the cycle is over
    fn reset_sentinel(&self) {
        let Some(ref sentinel) = self.sentinel else {
            return;
        };
        if let Err(e) = sentinel.write(SelfReportedStatus::Idle) {
            warn!("Failed to reset sentinel file {:?}: {}", sentinel.path(), e);
        }
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.aggregator.snapshot());
    }

    async fn shutdown(&mut self) {
        if let Some(transition) = self.aggregator.force_idle() {
            self.dispatch(transition).await;
        }
        for presenter in &self.presenters {
            presenter.close().await;
        }
        self.publish();
        info!("Detection engine stopped");
    }
}

/// Settings only read at startup
fn warn_restart_required(current: &Settings, next: &Settings) {
    if next.sentinel != current.sentinel {
        warn!("Sentinel settings changed, restart genwatch to apply them");
    }
    if next.web != current.web {
        warn!("Web settings changed, restart genwatch to apply them");
    }
    if next.scorers.self_report.enabled && !current.scorers.self_report.enabled {
        warn!("Self-report enabled, restart genwatch to start watching the sentinel file");
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
