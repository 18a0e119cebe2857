use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle state of a pull job.
///
/// `Idle` is the pre-download state a job is created in; the remaining four
/// are the states the fetch mechanism reports over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PullState {
    Idle,
    Downloading,
    Extracting,
    Complete,
    Failure,
}

impl PullState {
    /// `Complete` ends a job for good; `Failure` only resets it.
    pub fn is_terminal(self) -> bool {
        self == PullState::Complete
    }
}

impl fmt::Display for PullState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PullState::Idle => "Idle",
            PullState::Downloading => "Downloading",
            PullState::Extracting => "Extracting",
            PullState::Complete => "Complete",
            PullState::Failure => "Failure",
        };
        f.write_str(name)
    }
}

impl FromStr for PullState {
    type Err = PullError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Idle" => Ok(PullState::Idle),
            "Downloading" => Ok(PullState::Downloading),
            "Extracting" => Ok(PullState::Extracting),
            "Complete" => Ok(PullState::Complete),
            "Failure" => Ok(PullState::Failure),
            other => Err(PullError::MalformedSignal(other.to_string())),
        }
    }
}

/// Raw progress signal as reported by the fetch mechanism: `"State:percent"`.
///
/// Percent values above 100 are clamped; anything that does not parse is a
/// [`PullError::MalformedSignal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSignal {
    pub state: PullState,
    pub percent: u8,
}

impl FromStr for RawSignal {
    type Err = PullError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (state, percent) = s
            .split_once(':')
            .ok_or_else(|| PullError::MalformedSignal(s.to_string()))?;
        let state: PullState = state.parse()?;
        let percent: u64 = percent
            .trim()
            .parse()
            .map_err(|_| PullError::MalformedSignal(s.to_string()))?;
        Ok(RawSignal {
            state,
            percent: percent.min(100) as u8,
        })
    }
}

/// Immutable progress update published to observers at each state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub job_id: String,
    pub state: PullState,
    pub percent: u8,
}

/// Opaque tag grouping the observers that care about a job
/// (e.g. `ivi`, `cluster`, `cockpit`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Category(pub String);

impl Category {
    pub fn new(tag: impl Into<String>) -> Self {
        Category(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Point-in-time view of an active job, for status queries and listings.
#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    pub job_id: String,
    pub category: Category,
    pub state: PullState,
    pub percent: u8,
}

#[derive(Debug, Error)]
pub enum PullError {
    #[error("malformed progress signal: {0:?}")]
    MalformedSignal(String),
    #[error("manifest I/O error: {0}")]
    ManifestIo(#[from] std::io::Error),
    #[error("manifest encoding error: {0}")]
    ManifestEncoding(#[from] serde_json::Error),
}
