//! Webhook presenter, for game windows that listen over HTTP
//!
//! Deliveries go through a queue drained by one worker task, so notifications
//! arrive in order and a slow endpoint never holds up the engine.

use super::super::Notification;
use reqwest::Client;
use serde_json::json;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

const QUEUE_CAPACITY: usize = 32;
const CLOSE_TIMEOUT: Duration = Duration::from_secs(3);

pub struct HookPresenter {
    url: String,
    queue: Mutex<Option<mpsc::Sender<Notification>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl HookPresenter {
    /// Must be called from within a tokio runtime
    pub fn new(url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap_or_else(|_| Client::new());

        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        let worker = tokio::spawn(deliver(client, url.clone(), rx));

        Self {
            url,
            queue: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
        }
    }
}

async fn deliver(client: Client, url: String, mut rx: mpsc::Receiver<Notification>) {
    while let Some(notification) = rx.recv().await {
        let result = client
            .post(&url)
            .json(&payload(notification))
            .send()
            .await
            .and_then(|resp| resp.error_for_status());

        match result {
            Ok(_) => info!("Sent {} to {}", notification, url),
            Err(e) => warn!("Hook {} failed for {}: {}", url, notification, e),
        }
    }
}

pub(crate) fn payload(notification: Notification) -> serde_json::Value {
    json!({
        "event": notification.to_string(),
        "at": chrono::Utc::now().to_rfc3339(),
    })
}

#[async_trait::async_trait]
impl super::Presenter for HookPresenter {
    fn name(&self) -> &'static str {
        "hook"
    }

    async fn notify(&self, notification: Notification) -> anyhow::Result<()> {
        let queue = self.queue.lock().ok().and_then(|q| q.clone());
        let Some(queue) = queue else {
            anyhow::bail!("hook {} is closed", self.url);
        };
        queue.try_send(notification).map_err(|e| {
            anyhow::anyhow!("hook {} queue rejected {}: {}", self.url, notification, e)
        })
    }

    async fn close(&self) {
        // Dropping the sender lets the worker finish what is queued
        if let Ok(mut queue) = self.queue.lock() {
            queue.take();
        }
        let worker = self.worker.lock().ok().and_then(|mut w| w.take());
        if let Some(worker) = worker {
            if tokio::time::timeout(CLOSE_TIMEOUT, worker).await.is_err() {
                warn!("Gave up flushing hook {}", self.url);
            }
        }
    }
}
