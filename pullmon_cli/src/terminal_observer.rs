use async_trait::async_trait;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::sync::Mutex;

use pullmon_core::progress::observer::PullObserver;
use pullmon_core::types::types::ProgressEvent;

/// Renders pull progress as indicatif terminal bars.
///
/// One `ProgressBar` is created per job, lazily on its first event. All bars
/// live under a shared `MultiProgress` so they render cleanly.
pub struct TerminalPullObserver {
    multi: MultiProgress,
    /// job_id → ProgressBar
    bars: Mutex<HashMap<String, ProgressBar>>,
}

impl TerminalPullObserver {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            bars: Mutex::new(HashMap::new()),
        }
    }

    fn bar_for(&self, event: &ProgressEvent) -> ProgressBar {
        let mut bars = self.bars.lock().unwrap();
        bars.entry(event.job_id.clone())
            .or_insert_with(|| {
                let style = ProgressStyle::with_template(
                    "{prefix:>24} [{bar:30.cyan/blue}] {pos:>3}% {msg}",
                )
                .unwrap()
                .progress_chars("=>-");

                let pb = self.multi.add(ProgressBar::new(100));
                pb.set_style(style);
                pb.set_prefix(event.job_id.clone());
                pb
            })
            .clone()
    }
}

#[async_trait]
impl PullObserver for TerminalPullObserver {
    async fn on_progress(&self, event: &ProgressEvent) {
        let pb = self.bar_for(event);
        pb.set_position(event.percent as u64);
        pb.set_message(event.state.to_string());
    }

    async fn on_complete(&self, event: &ProgressEvent) {
        let pb = self.bar_for(event);
        pb.set_position(100);
        pb.finish_with_message("Complete");
    }

    async fn on_failure(&self, event: &ProgressEvent) {
        // Mirror a failed pull's reset: back to 0, restart possible.
        let pb = self.bar_for(event);
        pb.set_position(0);
        pb.set_message("Failure (restart available)");
    }
}
