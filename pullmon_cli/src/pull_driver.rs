use std::sync::Arc;
use std::time::Duration;

use pullmon_core::job::registry::JobRegistry;

/// Stand-in for the real artifact fetcher: feeds a plausible raw-signal
/// sequence for one job into the registry. Downloads in 5% steps, runs a
/// short extraction phase, then completes, unless `fail_at` is reached
/// first, in which case a single failure signal is emitted.
pub async fn drive_pull(
    registry: Arc<JobRegistry>,
    job_id: String,
    tick: Duration,
    fail_at: Option<u8>,
) {
    for percent in (0..=100u8).step_by(5) {
        if fail_at.is_some_and(|limit| percent >= limit) {
            registry.deliver_signal(&job_id, "Failure:0").await;
            return;
        }
        registry
            .deliver_signal(&job_id, &format!("Downloading:{}", percent))
            .await;
        tokio::time::sleep(tick).await;
    }

    for percent in [25, 50, 75, 100] {
        registry
            .deliver_signal(&job_id, &format!("Extracting:{}", percent))
            .await;
        tokio::time::sleep(tick).await;
    }

    registry.deliver_signal(&job_id, "Complete:100").await;
}
