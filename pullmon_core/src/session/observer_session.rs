use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::job::registry::{JobHandle, JobRegistry};
use crate::progress::observer::PullObserver;
use crate::session::manifest::ManifestStore;
use crate::types::types::{Category, PullError, PullState};

/// Resolve the category an attaching observer reconciles against.
///
/// An explicit tag wins; otherwise an ambient context indicator such as a
/// URL fragment (`"#ivi"` → `ivi`) is consulted. `None` when neither
/// resolves; reconciliation is then skipped and the manifest left alone.
pub fn resolve_category(
    explicit: Option<&str>,
    ambient_fragment: Option<&str>,
) -> Option<Category> {
    if let Some(tag) = explicit.filter(|t| !t.is_empty()) {
        return Some(Category::new(tag));
    }
    ambient_fragment
        .map(|fragment| fragment.trim_start_matches('#'))
        .filter(|fragment| !fragment.is_empty())
        .map(Category::new)
}

/// One observer's live view of the engine.
///
/// The session subscribes to the jobs the observer cares about, dispatches
/// their events to the [`PullObserver`], and keeps the observer's durable
/// manifest in sync: a job id is added when a pull starts and removed when
/// its `Complete` event is seen. `Failure` leaves the manifest entry in
/// place so the job can be restarted under the same id.
///
/// Sessions are ephemeral: [`detach`](ObserverSession::detach) (or drop)
/// stops all dispatch without cancelling the underlying jobs.
pub struct ObserverSession {
    registry: Arc<JobRegistry>,
    manifest: Arc<dyn ManifestStore>,
    observer: Arc<dyn PullObserver>,
    category: Option<Category>,
    watching: Arc<Mutex<BTreeSet<String>>>,
    // Serializes load-modify-store cycles on the manifest across the
    // session's dispatch tasks.
    manifest_lock: Arc<Mutex<()>>,
    cancel: CancellationToken,
}

impl ObserverSession {
    pub fn new(
        registry: Arc<JobRegistry>,
        manifest: Arc<dyn ManifestStore>,
        observer: Arc<dyn PullObserver>,
        category: Option<Category>,
    ) -> Self {
        Self {
            registry,
            manifest,
            observer,
            category,
            watching: Arc::new(Mutex::new(BTreeSet::new())),
            manifest_lock: Arc::new(Mutex::new(())),
            cancel: CancellationToken::new(),
        }
    }

    pub fn category(&self) -> Option<&Category> {
        self.category.as_ref()
    }

    /// Job ids this session currently has a dispatch task for.
    pub async fn watched_jobs(&self) -> Vec<String> {
        self.watching.lock().await.iter().cloned().collect()
    }

    /// The reattach protocol: for every manifest entry, resume watching the
    /// job if it is still active and belongs to this session's category, and
    /// prune entries whose jobs are gone. Entries for other categories stay
    /// untouched. Returns the ids that were resumed.
    ///
    /// Resuming replays the fresh-start path (idempotent start + subscribe)
    /// rather than querying current state, so the observer picks up at the
    /// next published event, exactly as a fresh start would.
    pub async fn reconcile(&self) -> Result<Vec<String>, PullError> {
        let Some(category) = self.category.clone() else {
            log::debug!("[session] no category resolved, reconciliation skipped");
            return Ok(Vec::new());
        };

        let _guard = self.manifest_lock.lock().await;
        let mut manifest = self.manifest.load().await?;
        let mut resumed = Vec::new();
        let mut pruned = false;

        for job_id in manifest.clone() {
            match self.registry.lookup(&job_id).await {
                None => {
                    manifest.remove(&job_id);
                    pruned = true;
                    log::debug!("[session] pruned inactive job {} from manifest", job_id);
                }
                Some(handle) if handle.category() == &category => {
                    let handle = self.registry.start_job(&job_id, category.clone()).await;
                    self.watch(handle).await;
                    resumed.push(job_id);
                }
                Some(_) => {} // another category's job; not ours to touch
            }
        }

        if pruned {
            self.manifest.store(&manifest).await?;
        }
        Ok(resumed)
    }

    /// Begin a pull on behalf of this observer: record the id in the durable
    /// manifest, start (or coalesce into) the job, and watch its events.
    pub async fn start_pull(
        &self,
        job_id: &str,
        category: Category,
    ) -> Result<JobHandle, PullError> {
        {
            let _guard = self.manifest_lock.lock().await;
            let mut manifest = self.manifest.load().await?;
            if manifest.insert(job_id.to_string()) {
                self.manifest.store(&manifest).await?;
            }
        }

        let handle = self.registry.start_job(job_id, category).await;
        self.watch(handle.clone()).await;
        Ok(handle)
    }

    /// Stop dispatching to the observer. The underlying jobs keep running;
    /// only this session's subscriptions are dropped.
    pub fn detach(&self) {
        self.cancel.cancel();
    }

    /// Subscribe to `handle` and dispatch its events until the job ends or
    /// the session detaches. Watching the same job twice is a no-op.
    async fn watch(&self, handle: JobHandle) {
        let job_id = handle.job_id().to_string();
        {
            let mut watching = self.watching.lock().await;
            if !watching.insert(job_id.clone()) {
                return;
            }
        }

        let mut subscription = handle.subscribe();
        let observer = Arc::clone(&self.observer);
        let manifest = Arc::clone(&self.manifest);
        let manifest_lock = Arc::clone(&self.manifest_lock);
        let watching = Arc::clone(&self.watching);
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    _ = cancel.cancelled() => break,
                    event = subscription.next() => match event {
                        Some(event) => event,
                        None => break, // job retired, stream ended
                    },
                };

                match event.state {
                    PullState::Complete => {
                        observer.on_complete(&event).await;
                        if let Err(e) =
                            remove_manifest_entry(&manifest, &manifest_lock, &job_id).await
                        {
                            log::warn!(
                                "[session] could not prune {} from manifest: {}",
                                job_id,
                                e
                            );
                        }
                        break;
                    }
                    PullState::Failure => observer.on_failure(&event).await,
                    _ => observer.on_progress(&event).await,
                }
            }

            watching.lock().await.remove(&job_id);
        });
    }
}

impl Drop for ObserverSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn remove_manifest_entry(
    manifest: &Arc<dyn ManifestStore>,
    manifest_lock: &Mutex<()>,
    job_id: &str,
) -> Result<(), PullError> {
    let _guard = manifest_lock.lock().await;
    let mut jobs = manifest.load().await?;
    if jobs.remove(job_id) {
        manifest.store(&jobs).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_category_wins() {
        let category = resolve_category(Some("cluster"), Some("#ivi")).unwrap();
        assert_eq!(category.as_str(), "cluster");
    }

    #[test]
    fn fragment_resolves_when_no_explicit_tag() {
        let category = resolve_category(None, Some("#ivi")).unwrap();
        assert_eq!(category.as_str(), "ivi");
    }

    #[test]
    fn nothing_resolves_to_none() {
        assert!(resolve_category(None, None).is_none());
        assert!(resolve_category(Some(""), Some("#")).is_none());
    }
}
