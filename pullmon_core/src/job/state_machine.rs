use crate::types::types::{Category, JobSnapshot, ProgressEvent, PullState, RawSignal};

/// Per-job state machine driven by raw `"State:percent"` signals.
///
/// | Signal state  | Effect                                                     |
/// |---------------|------------------------------------------------------------|
/// | `Downloading` | enters `Downloading` once percent > 0; percent 0 only      |
/// |               | updates the percent (the job is not visibly started yet)   |
/// | `Extracting`  | enters `Extracting`, any percent                           |
/// | `Complete`    | enters `Complete`; every later signal is ignored           |
/// | `Failure`     | emits `Failure`/percent 0, then re-enters `Idle` so the    |
/// |               | same job id can be restarted                               |
///
/// The upstream signal source is at-least-once and unordered within a state,
/// so the machine is deliberately permissive: percent regressions are kept
/// as-is (last value wins) and a `Complete` arriving before any
/// `Downloading` is accepted.
pub struct JobStateMachine {
    job_id: String,
    category: Category,
    state: PullState,
    percent: u8,
}

impl JobStateMachine {
    pub fn new(job_id: impl Into<String>, category: Category) -> Self {
        Self {
            job_id: job_id.into(),
            category,
            state: PullState::Idle,
            percent: 0,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn category(&self) -> &Category {
        &self.category
    }

    pub fn state(&self) -> PullState {
        self.state
    }

    pub fn percent(&self) -> u8 {
        self.percent
    }

    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            job_id: self.job_id.clone(),
            category: self.category.clone(),
            state: self.state,
            percent: self.percent,
        }
    }

    /// Advance the machine with one raw signal and return the event to
    /// publish, or `None` when the signal must not produce one (the job
    /// already completed).
    pub fn apply(&mut self, signal: &RawSignal) -> Option<ProgressEvent> {
        if self.state.is_terminal() {
            return None;
        }

        let event_state = match signal.state {
            PullState::Downloading => {
                if signal.percent > 0 {
                    self.state = PullState::Downloading;
                }
                self.percent = signal.percent;
                PullState::Downloading
            }
            PullState::Extracting => {
                self.state = PullState::Extracting;
                self.percent = signal.percent;
                PullState::Extracting
            }
            PullState::Complete => {
                self.state = PullState::Complete;
                self.percent = signal.percent;
                PullState::Complete
            }
            PullState::Failure => {
                // Reset in place: the job stays registered and may be
                // restarted under the same id.
                self.state = PullState::Idle;
                self.percent = 0;
                PullState::Failure
            }
            // Not part of the upstream vocabulary; keep the percent, do not
            // transition.
            PullState::Idle => {
                self.percent = signal.percent;
                PullState::Idle
            }
        };

        Some(ProgressEvent {
            job_id: self.job_id.clone(),
            state: event_state,
            percent: self.percent,
        })
    }
}
