use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};

use crate::job::state_machine::JobStateMachine;
use crate::progress::channel::{NotificationChannel, Subscription};
use crate::types::types::{Category, JobSnapshot, PullState, RawSignal};

/// Delay between a `Complete` event and the job being removed from the
/// registry, leaving attached observers time for a final refresh.
pub const DEFAULT_RETIRE_GRACE: Duration = Duration::from_secs(2);

/// One registered job: its state machine (single writer, serialized by the
/// mutex) and the broadcast channel its events fan out on.
struct ActiveJob {
    job_id: String,
    category: Category,
    machine: Mutex<JobStateMachine>,
    channel: NotificationChannel,
}

/// Cloneable reference to an active job handed out by [`JobRegistry`].
///
/// Holding a handle does not keep the job alive past retirement; it only
/// keeps the subscription endpoint reachable.
#[derive(Clone)]
pub struct JobHandle {
    inner: Arc<ActiveJob>,
}

impl JobHandle {
    pub fn job_id(&self) -> &str {
        &self.inner.job_id
    }

    pub fn category(&self) -> &Category {
        &self.inner.category
    }

    /// Subscribe to this job's progress events, starting from the next one
    /// published. Earlier events are not replayed.
    pub fn subscribe(&self) -> Subscription {
        self.inner.channel.subscribe()
    }

    pub async fn snapshot(&self) -> JobSnapshot {
        self.inner.machine.lock().await.snapshot()
    }
}

/// Process-wide table of in-flight pull jobs keyed by job id.
///
/// The registry is the single shared mutable structure of the engine and is
/// meant to be created once and injected (`Arc<JobRegistry>`) into every
/// component that needs it.
pub struct JobRegistry {
    jobs: Arc<RwLock<HashMap<String, Arc<ActiveJob>>>>,
    retire_grace: Duration,
}

impl JobRegistry {
    pub fn new(retire_grace: Duration) -> Self {
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            retire_grace,
        }
    }

    /// Begin tracking a pull, or return the handle of the job already
    /// tracking `job_id`. Duplicate starts coalesce: concurrent calls for
    /// the same id serialize on the table's write lock and exactly one
    /// state machine is created.
    pub async fn start_job(&self, job_id: &str, category: Category) -> JobHandle {
        let mut jobs = self.jobs.write().await;
        if let Some(existing) = jobs.get(job_id) {
            log::debug!("[registry] start coalesced into active job {}", job_id);
            return JobHandle {
                inner: Arc::clone(existing),
            };
        }

        let job = Arc::new(ActiveJob {
            job_id: job_id.to_string(),
            category: category.clone(),
            machine: Mutex::new(JobStateMachine::new(job_id, category)),
            channel: NotificationChannel::new(),
        });
        jobs.insert(job_id.to_string(), Arc::clone(&job));
        log::info!("[registry] job {} started ({})", job_id, job.category);

        JobHandle { inner: job }
    }

    /// Non-failing lookup; `None` means the job was never started or has
    /// already been retired.
    pub async fn lookup(&self, job_id: &str) -> Option<JobHandle> {
        self.jobs.read().await.get(job_id).map(|job| JobHandle {
            inner: Arc::clone(job),
        })
    }

    /// Remove a job and close its channel. Attached subscribers observe the
    /// end of their event stream, not an error.
    pub async fn retire(&self, job_id: &str) {
        Self::remove_job(&self.jobs, job_id).await;
    }

    /// Inbound callback for the fetch mechanism: one raw `"State:percent"`
    /// signal for `job_id`.
    ///
    /// Signals for unknown jobs and unparsable signals are dropped; a
    /// straggler or malformed report must never stall other jobs.
    pub async fn deliver_signal(&self, job_id: &str, raw: &str) {
        let job = match self.lookup(job_id).await {
            Some(handle) => handle.inner,
            None => {
                log::debug!("[registry] signal for unknown job {} dropped", job_id);
                return;
            }
        };

        let signal: RawSignal = match raw.parse() {
            Ok(signal) => signal,
            Err(e) => {
                log::warn!("[registry] dropping signal for {}: {}", job_id, e);
                return;
            }
        };

        // Publish while holding the machine lock so concurrent signals for
        // the same job cannot reorder between transition and delivery.
        let completed = {
            let mut machine = job.machine.lock().await;
            match machine.apply(&signal) {
                Some(event) => {
                    let completed = event.state == PullState::Complete;
                    job.channel.publish(event);
                    completed
                }
                None => return,
            }
        };

        if completed {
            self.schedule_retire(job_id);
        }
    }

    /// Snapshots of every active job (order unspecified).
    pub async fn snapshots(&self) -> Vec<JobSnapshot> {
        let jobs = self.jobs.read().await;
        let mut snapshots = Vec::with_capacity(jobs.len());
        for job in jobs.values() {
            snapshots.push(job.machine.lock().await.snapshot());
        }
        snapshots
    }

    pub async fn active_count(&self) -> usize {
        self.jobs.read().await.len()
    }

    /// Retire `job_id` after the grace delay, off the caller's task.
    fn schedule_retire(&self, job_id: &str) {
        let jobs = Arc::clone(&self.jobs);
        let job_id = job_id.to_string();
        let grace = self.retire_grace;
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            Self::remove_job(&jobs, &job_id).await;
        });
    }

    async fn remove_job(jobs: &RwLock<HashMap<String, Arc<ActiveJob>>>, job_id: &str) {
        if let Some(job) = jobs.write().await.remove(job_id) {
            job.channel.close();
            log::info!("[registry] job {} retired", job_id);
        }
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_RETIRE_GRACE)
    }
}
