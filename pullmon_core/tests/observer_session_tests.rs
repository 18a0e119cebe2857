use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use pullmon_core::job::registry::JobRegistry;
use pullmon_core::progress::observer::PullObserver;
use pullmon_core::session::manifest::{FileManifestStore, ManifestStore};
use pullmon_core::session::observer_session::ObserverSession;
use pullmon_core::types::types::{Category, ProgressEvent};

/// Records every dispatched callback as `(kind, event)`.
struct RecordingObserver {
    seen: Mutex<Vec<(&'static str, ProgressEvent)>>,
}

impl RecordingObserver {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            seen: Mutex::new(Vec::new()),
        })
    }

    fn seen(&self) -> Vec<(&'static str, ProgressEvent)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl PullObserver for RecordingObserver {
    async fn on_progress(&self, event: &ProgressEvent) {
        self.seen.lock().unwrap().push(("progress", event.clone()));
    }

    async fn on_complete(&self, event: &ProgressEvent) {
        self.seen.lock().unwrap().push(("complete", event.clone()));
    }

    async fn on_failure(&self, event: &ProgressEvent) {
        self.seen.lock().unwrap().push(("failure", event.clone()));
    }
}

struct Fixture {
    registry: Arc<JobRegistry>,
    store: Arc<FileManifestStore>,
    observer: Arc<RecordingObserver>,
    session: ObserverSession,
    _tmp: TempDir,
}

fn fixture(category: Option<&str>, grace_ms: u64) -> Fixture {
    let tmp = TempDir::new().unwrap();
    let path = tmp
        .path()
        .join(format!("manifest_{}.json", uuid::Uuid::new_v4()));
    let registry = Arc::new(JobRegistry::new(Duration::from_millis(grace_ms)));
    let store = Arc::new(FileManifestStore::new(path));
    let observer = RecordingObserver::new();
    let session = ObserverSession::new(
        Arc::clone(&registry),
        store.clone(),
        observer.clone(),
        category.map(Category::new),
    );
    Fixture {
        registry,
        store,
        observer,
        session,
        _tmp: tmp,
    }
}

fn manifest_of(ids: &[&str]) -> BTreeSet<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

/// Give the session's dispatch tasks a moment to run.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::test]
async fn start_pull_records_manifest_and_streams_events() {
    let fx = fixture(Some("ivi"), 1000);

    fx.session
        .start_pull("img1", Category::new("ivi"))
        .await
        .unwrap();
    assert_eq!(fx.store.load().await.unwrap(), manifest_of(&["img1"]));

    fx.registry.deliver_signal("img1", "Downloading:45").await;
    settle().await;

    let seen = fx.observer.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, "progress");
    assert_eq!(seen[0].1.percent, 45);
}

#[tokio::test]
async fn complete_prunes_manifest_and_retires_job() {
    let fx = fixture(Some("ivi"), 50);

    fx.session
        .start_pull("img1", Category::new("ivi"))
        .await
        .unwrap();

    for raw in ["Downloading:0", "Downloading:45", "Extracting:45", "Complete:100"] {
        fx.registry.deliver_signal("img1", raw).await;
    }
    settle().await;

    let seen = fx.observer.seen();
    let kinds: Vec<&str> = seen.iter().map(|(kind, _)| *kind).collect();
    assert_eq!(kinds, vec!["progress", "progress", "progress", "complete"]);

    // The completed job left the manifest, and the registry after the grace.
    assert!(fx.store.load().await.unwrap().is_empty());
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(fx.registry.lookup("img1").await.is_none());
}

#[tokio::test]
async fn failure_keeps_manifest_entry_and_allows_restart() {
    let fx = fixture(Some("cluster"), 1000);

    fx.session
        .start_pull("img2", Category::new("cluster"))
        .await
        .unwrap();

    fx.registry.deliver_signal("img2", "Failure:0").await;
    settle().await;

    let seen = fx.observer.seen();
    assert_eq!(seen.last().unwrap().0, "failure");
    assert_eq!(seen.last().unwrap().1.percent, 0);
    assert_eq!(fx.store.load().await.unwrap(), manifest_of(&["img2"]));

    // Restart under the same id; the next signal resumes downloading.
    fx.session
        .start_pull("img2", Category::new("cluster"))
        .await
        .unwrap();
    fx.registry.deliver_signal("img2", "Downloading:20").await;
    settle().await;

    let seen = fx.observer.seen();
    assert_eq!(seen.last().unwrap().0, "progress");
    assert_eq!(seen.last().unwrap().1.percent, 20);
}

#[tokio::test]
async fn reconcile_resumes_active_jobs_and_prunes_inactive() {
    let fx = fixture(Some("ivi"), 1000);

    // The observer previously started imgA and imgB; only imgA survived.
    fx.store
        .store(&manifest_of(&["imgA", "imgB"]))
        .await
        .unwrap();
    fx.registry.start_job("imgA", Category::new("ivi")).await;

    let resumed = fx.session.reconcile().await.unwrap();
    assert_eq!(resumed, vec!["imgA".to_string()]);
    assert_eq!(fx.store.load().await.unwrap(), manifest_of(&["imgA"]));
    assert_eq!(fx.session.watched_jobs().await, vec!["imgA".to_string()]);

    // The resumed subscription is live.
    fx.registry.deliver_signal("imgA", "Downloading:80").await;
    settle().await;
    assert_eq!(fx.observer.seen().last().unwrap().1.percent, 80);
}

#[tokio::test]
async fn reconcile_leaves_other_categories_untouched() {
    let fx = fixture(Some("ivi"), 1000);

    fx.store.store(&manifest_of(&["imgX"])).await.unwrap();
    fx.registry.start_job("imgX", Category::new("cluster")).await;

    let resumed = fx.session.reconcile().await.unwrap();
    assert!(resumed.is_empty());
    assert!(fx.session.watched_jobs().await.is_empty());
    // Not pruned either: the job is alive, just not this session's.
    assert_eq!(fx.store.load().await.unwrap(), manifest_of(&["imgX"]));
}

#[tokio::test]
async fn reconcile_without_category_is_skipped() {
    let fx = fixture(None, 1000);

    fx.store.store(&manifest_of(&["long-gone"])).await.unwrap();

    let resumed = fx.session.reconcile().await.unwrap();
    assert!(resumed.is_empty());
    // Manifest untouched, even though the job no longer exists.
    assert_eq!(fx.store.load().await.unwrap(), manifest_of(&["long-gone"]));
}

#[tokio::test]
async fn detach_stops_dispatch_but_not_the_job() {
    let fx = fixture(Some("ivi"), 1000);

    fx.session
        .start_pull("img1", Category::new("ivi"))
        .await
        .unwrap();
    fx.registry.deliver_signal("img1", "Downloading:10").await;
    settle().await;
    assert_eq!(fx.observer.seen().len(), 1);

    fx.session.detach();
    settle().await;

    fx.registry.deliver_signal("img1", "Downloading:90").await;
    settle().await;

    // No further dispatch, but the job itself keeps running.
    assert_eq!(fx.observer.seen().len(), 1);
    assert!(fx.registry.lookup("img1").await.is_some());
}

#[tokio::test]
async fn fresh_manifest_store_loads_empty() {
    let fx = fixture(Some("ivi"), 1000);
    assert!(fx.store.load().await.unwrap().is_empty());
}
