use async_trait::async_trait;
use genwatch::config::Settings;
use genwatch::engine::{Engine, EngineInput};
use genwatch::presenter::Presenter;
use genwatch::sentinel::SentinelFile;
use genwatch::{ActivityStatus, EditorEvent, Notification, SelfReportedStatus};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;

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

struct Harness {
    tx: mpsc::Sender<EngineInput>,
    seen: Arc<Mutex<Vec<Notification>>>,
    snapshot: tokio::sync::watch::Receiver<genwatch::ActivitySnapshot>,
    task: JoinHandle<anyhow::Result<()>>,
}

impl Harness {
    fn start(engine_setup: impl FnOnce(Engine) -> Engine) -> Self {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let engine = Engine::new(
            Settings::default(),
            vec![Box::new(Recorder { seen: seen.clone() })],
        );
        let engine = engine_setup(engine);
        let snapshot = engine.subscribe();
        let (tx, rx) = mpsc::channel(64);
        let task = tokio::spawn(engine.run(rx));
        Self { tx, seen, snapshot, task }
    }

    async fn send(&self, input: EngineInput) {
        self.tx.send(input).await.unwrap();
    }

    fn seen(&self) -> Vec<Notification> {
        self.seen.lock().unwrap().clone()
    }

    fn status(&self) -> ActivityStatus {
        self.snapshot.borrow().status
    }

    async fn stop(self) -> Vec<Notification> {
        self.send(EngineInput::Shutdown).await;
        self.task.await.unwrap().unwrap();
        let seen = self.seen.lock().unwrap().clone();
        seen
    }
}

fn edit(chars: usize) -> EngineInput {
    EngineInput::Editor(EditorEvent::DocumentChange {
        uri: "file:///workspace/src/main.rs".to_string(),
        inserted: chars,
        removed: 0,
    })
}

#[tokio::test(start_paused = true)]
async fn burst_of_large_fast_edits_starts_exactly_once() {
    let harness = Harness::start(|e| e);

    for _ in 0..20 {
        harness.send(edit(120)).await;
        sleep(Duration::from_millis(100)).await;
    }

    assert_eq!(harness.seen(), vec![Notification::GenerationStarted]);
    assert_eq!(harness.status(), ActivityStatus::Generating);
    harness.stop().await;
}

#[tokio::test(start_paused = true)]
async fn silence_after_last_edit_ends_exactly_once() {
    let harness = Harness::start(|e| e);

    harness.send(edit(80)).await;
    sleep(Duration::from_millis(200)).await;
    harness.send(edit(80)).await;

    sleep(Duration::from_secs(4)).await;
    assert_eq!(harness.seen(), vec![Notification::GenerationStarted]);

    sleep(Duration::from_secs(30)).await;
    assert_eq!(
        harness.seen(),
        vec![Notification::GenerationStarted, Notification::GenerationEnded]
    );
    assert_eq!(harness.status(), ActivityStatus::Idle);

    // Shutdown while idle fires nothing more
    let seen = harness.stop().await;
    assert_eq!(seen.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn explicit_idle_report_ends_immediately() {
    let harness = Harness::start(|e| e);

    harness.send(EngineInput::SelfReport(SelfReportedStatus::Working)).await;
    sleep(Duration::from_secs(1)).await;
    assert_eq!(harness.status(), ActivityStatus::Generating);

    harness.send(EngineInput::SelfReport(SelfReportedStatus::Idle)).await;
    sleep(Duration::from_millis(10)).await;

    assert_eq!(
        harness.seen(),
        vec![Notification::GenerationStarted, Notification::GenerationEnded]
    );
    assert_eq!(harness.status(), ActivityStatus::Idle);
    harness.stop().await;
}

#[tokio::test(start_paused = true)]
async fn repeated_working_reports_do_not_restart() {
    let harness = Harness::start(|e| e);

    for _ in 0..5 {
        harness.send(EngineInput::SelfReport(SelfReportedStatus::Working)).await;
        harness.send(edit(200)).await;
        sleep(Duration::from_secs(10)).await;
    }

    assert_eq!(harness.seen(), vec![Notification::GenerationStarted]);
    assert_eq!(harness.snapshot.borrow().cycles, 1);
    harness.stop().await;
}

#[tokio::test(start_paused = true)]
async fn single_paste_causes_no_transition() {
    let harness = Harness::start(|e| e);

    harness.send(edit(80)).await;
    sleep(Duration::from_secs(10)).await;
    harness.send(edit(80)).await;
    sleep(Duration::from_secs(1)).await;

    assert!(harness.seen().is_empty());
    assert_eq!(harness.status(), ActivityStatus::Idle);
    harness.stop().await;
}

#[tokio::test(start_paused = true)]
async fn small_selection_causes_no_transition() {
    let harness = Harness::start(|e| e);

    harness
        .send(EngineInput::Editor(EditorEvent::SelectionChange {
            uri: "file:///workspace/src/main.rs".to_string(),
            selected: 10,
        }))
        .await;
    sleep(Duration::from_secs(1)).await;

    assert!(harness.seen().is_empty());
    assert_eq!(harness.status(), ActivityStatus::Idle);
    harness.stop().await;
}

#[tokio::test(start_paused = true)]
async fn focus_alone_never_starts_generation() {
    let harness = Harness::start(|e| e);

    for i in 0..10 {
        harness
            .send(EngineInput::Editor(EditorEvent::FocusChange { focused: i % 2 == 0 }))
            .await;
        sleep(Duration::from_millis(100)).await;
    }

    assert!(harness.seen().is_empty());
    harness.stop().await;
}

#[tokio::test(start_paused = true)]
async fn shutdown_while_generating_ends_generation() {
    let harness = Harness::start(|e| e);

    harness.send(edit(150)).await;
    sleep(Duration::from_millis(100)).await;
    harness.send(edit(150)).await;
    sleep(Duration::from_millis(10)).await;

    let seen = harness.stop().await;
    assert_eq!(
        seen,
        vec![Notification::GenerationStarted, Notification::GenerationEnded]
    );
}

#[tokio::test(start_paused = true)]
async fn absent_sentinel_is_created_without_notification() {
    let dir = tempfile::tempdir().unwrap();
    let sentinel = SentinelFile::new(dir.path().join(".genwatch/status"));

    assert!(sentinel.ensure().unwrap());
    assert_eq!(std::fs::read_to_string(sentinel.path()).unwrap(), "false");

    let reader = sentinel.clone();
    let harness = Harness::start(move |e| e.with_sentinel(reader));
    if let Some(status) = sentinel.read() {
        harness.send(EngineInput::SelfReport(status)).await;
    }
    sleep(Duration::from_secs(1)).await;

    assert!(harness.seen().is_empty());
    harness.stop().await;
}
