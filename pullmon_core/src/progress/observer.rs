use async_trait::async_trait;

use crate::types::types::ProgressEvent;

/// Trait for anything that wants to observe pull progress.
///
/// An [`ObserverSession`](crate::session::observer_session::ObserverSession)
/// calls these methods as events arrive on the jobs it watches.
///
/// Lifecycle:
/// - `on_progress` is called for every `Downloading`/`Extracting` event.
/// - `on_complete` is called once when the job finishes; afterwards the
///   session stops watching it and removes it from the durable manifest.
/// - `on_failure` is called when the job fails (percent reset to 0). The
///   manifest entry is kept, since the same job id may be restarted.
#[async_trait]
pub trait PullObserver: Send + Sync + 'static {
    async fn on_progress(&self, event: &ProgressEvent);

    async fn on_complete(&self, event: &ProgressEvent);

    async fn on_failure(&self, event: &ProgressEvent);
}
