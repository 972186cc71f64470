//! Presentation consumers
//!
//! Every transition produces one notification, fanned out to all configured
//! presenters. Presenter failures are logged by the engine and never escalate.

pub mod hook;

use super::config::Settings;
use super::Notification;
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Trait for notification consumers
#[async_trait]
pub trait Presenter: Send + Sync {
    /// Name of the presenter
    fn name(&self) -> &'static str;

    /// Deliver one notification
    async fn notify(&self, notification: Notification) -> anyhow::Result<()>;

    /// Flush anything still queued. Called once on shutdown.
    async fn close(&self) {}
}

/// Create all configured presenters
pub fn create_presenters(
    settings: &Settings,
    web_tx: Option<broadcast::Sender<Notification>>,
) -> Vec<Box<dyn Presenter>> {
    let mut surfaces: Vec<Box<dyn Presenter>> = Vec::new();

    if settings.presenters.stdout {
        surfaces.push(Box::new(JsonLinesPresenter::new(tokio::io::stdout())));
    }

    if let Some(ref url) = settings.presenters.hook_url {
        surfaces.push(Box::new(hook::HookPresenter::new(url.clone())));
    }

    if let Some(tx) = web_tx {
        surfaces.push(Box::new(BroadcastPresenter::new(tx)));
    }

    let mut presenters: Vec<Box<dyn Presenter>> = vec![Box::new(LogPresenter)];
    let delay = Duration::from_millis(settings.show_delay_ms);
    if delay.is_zero() {
        presenters.extend(surfaces);
    } else {
        presenters.extend(
            surfaces
                .into_iter()
                .map(|p| Box::new(Delayed::new(Arc::from(p), delay)) as Box<dyn Presenter>),
        );
    }

    presenters
}

/// Logs every notification
pub struct LogPresenter;

#[async_trait]
impl Presenter for LogPresenter {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn notify(&self, notification: Notification) -> anyhow::Result<()> {
        match notification {
            Notification::GenerationStarted => info!("🎮 {}: show game", notification),
            Notification::GenerationEnded => info!("💤 {}: hide game", notification),
        }
        Ok(())
    }
}

/// Writes `{"event":"generationStarted"}` style lines for the editor host
pub struct JsonLinesPresenter<W> {
    out: tokio::sync::Mutex<W>,
}

impl<W: AsyncWrite + Unpin + Send + 'static> JsonLinesPresenter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: tokio::sync::Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send + 'static> Presenter for JsonLinesPresenter<W> {
    fn name(&self) -> &'static str {
        "stdout"
    }

    async fn notify(&self, notification: Notification) -> anyhow::Result<()> {
        let mut line = serde_json::to_vec(&notification)?;
        line.push(b'\n');

        let mut out = self.out.lock().await;
        out.write_all(&line).await?;
        out.flush().await?;
        Ok(())
    }
}

/// Publishes notifications to WebSocket subscribers
pub struct BroadcastPresenter {
    tx: broadcast::Sender<Notification>,
}

impl BroadcastPresenter {
    pub fn new(tx: broadcast::Sender<Notification>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl Presenter for BroadcastPresenter {
    fn name(&self) -> &'static str {
        "websocket"
    }

    async fn notify(&self, notification: Notification) -> anyhow::Result<()> {
        // No subscribers is not an error
        let _ = self.tx.send(notification);
        Ok(())
    }
}

/// Holds back the start notification for a show delay.
///
/// If the generation ends before the delay elapses, neither notification
/// reaches the inner presenter.
pub struct Delayed {
    inner: Arc<dyn Presenter>,
    delay: Duration,
    state: Arc<Mutex<DelayState>>,
}

#[derive(Default)]
struct DelayState {
    /// Bumped on every notification, a pending start only fires if unchanged
    epoch: u64,
    shown: bool,
    pending: Option<JoinHandle<()>>,
}

impl Delayed {
    pub fn new(inner: Arc<dyn Presenter>, delay: Duration) -> Self {
        Self {
            inner,
            delay,
            state: Arc::new(Mutex::new(DelayState::default())),
        }
    }
}

fn lock(state: &Mutex<DelayState>) -> MutexGuard<'_, DelayState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl Presenter for Delayed {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn notify(&self, notification: Notification) -> anyhow::Result<()> {
        match notification {
            Notification::GenerationStarted => {
                let mut state = lock(&self.state);
                state.epoch += 1;
                let epoch = state.epoch;

                let inner = self.inner.clone();
                let shared = self.state.clone();
                let delay = self.delay;
                let handle = tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    {
                        let mut state = lock(&shared);
                        if state.epoch != epoch {
                            return;
                        }
                        state.shown = true;
                    }
                    if let Err(e) = inner.notify(Notification::GenerationStarted).await {
                        error!("Presenter {} failed: {}", inner.name(), e);
                    }
                });

                if let Some(previous) = state.pending.replace(handle) {
                    previous.abort();
                }
                Ok(())
            }
            Notification::GenerationEnded => {
                let (shown, pending) = {
                    let mut state = lock(&self.state);
                    state.epoch += 1;
                    (std::mem::take(&mut state.shown), state.pending.take())
                };

                if !shown {
                    if let Some(handle) = pending {
                        handle.abort();
                    }
                    return Ok(());
                }
                // The start may still be in flight to the inner presenter
                if let Some(handle) = pending {
                    let _ = handle.await;
                }
                self.inner.notify(Notification::GenerationEnded).await
            }
        }
    }

    async fn close(&self) {
        if let Some(handle) = lock(&self.state).pending.take() {
            handle.abort();
        }
        self.inner.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder {
        seen: Arc<Mutex<Vec<Notification>>>,
    }

    #[async_trait]
    impl Presenter for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        async fn notify(&self, notification: Notification) -> anyhow::Result<()> {
            self.seen.lock().unwrap().push(notification);
            Ok(())
        }
    }

    fn recorder() -> (Arc<dyn Presenter>, Arc<Mutex<Vec<Notification>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        (Arc::new(Recorder { seen: seen.clone() }), seen)
    }

    #[tokio::test]
    async fn test_json_lines_output() {
        let presenter = JsonLinesPresenter::new(Vec::new());
        presenter.notify(Notification::GenerationStarted).await.unwrap();
        presenter.notify(Notification::GenerationEnded).await.unwrap();

        let out = String::from_utf8(presenter.into_inner()).unwrap();
        assert_eq!(
            out,
            "{\"event\":\"generationStarted\"}\n{\"event\":\"generationEnded\"}\n"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_forwards_after_delay() {
        let (inner, seen) = recorder();
        let delayed = Delayed::new(inner, Duration::from_secs(2));

        delayed.notify(Notification::GenerationStarted).await.unwrap();
        assert!(seen.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(*seen.lock().unwrap(), vec![Notification::GenerationStarted]);

        delayed.notify(Notification::GenerationEnded).await.unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            vec![Notification::GenerationStarted, Notification::GenerationEnded]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_swallows_short_generation() {
        let (inner, seen) = recorder();
        let delayed = Delayed::new(inner, Duration::from_secs(2));

        delayed.notify(Notification::GenerationStarted).await.unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        delayed.notify(Notification::GenerationEnded).await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_delayed_pairs_stay_matched_under_races() {
        let (inner, seen) = recorder();
        let delayed = Delayed::new(inner, Duration::from_millis(1));

        for i in 0..200u64 {
            delayed.notify(Notification::GenerationStarted).await.unwrap();
            // Land the end on both sides of the delay
            tokio::time::sleep(Duration::from_micros(900 + (i % 5) * 50)).await;
            delayed.notify(Notification::GenerationEnded).await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(20)).await;

        let seen = seen.lock().unwrap().clone();
        assert_eq!(seen.len() % 2, 0);
        for pair in seen.chunks(2) {
            assert_eq!(
                pair,
                [Notification::GenerationStarted, Notification::GenerationEnded]
            );
        }
    }

    #[tokio::test]
    async fn test_create_presenters() {
        let mut settings = Settings::default();
        settings.presenters.stdout = false;
        let names: Vec<_> = create_presenters(&settings, None)
            .iter()
            .map(|p| p.name())
            .collect();
        assert_eq!(names, vec!["log"]);

        settings.presenters.hook_url = Some("http://127.0.0.1:9/hook".to_string());
        let (tx, _rx) = broadcast::channel(4);
        let names: Vec<_> = create_presenters(&settings, Some(tx))
            .iter()
            .map(|p| p.name())
            .collect();
        assert_eq!(names, vec!["log", "hook", "websocket"]);
    }
}
