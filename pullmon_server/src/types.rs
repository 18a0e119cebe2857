use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Inbound: request payloads
// ---------------------------------------------------------------------------

/// Query parameters accepted by GET /pull/:job_id.
#[derive(Debug, Deserialize)]
pub struct PullQuery {
    /// Observer group the job belongs to. Defaults to `"default"` when the
    /// caller does not scope the request.
    pub category: Option<String>,
}

// ---------------------------------------------------------------------------
// Outbound: response payloads
// ---------------------------------------------------------------------------

/// Response to a job-start request.
#[derive(Debug, Serialize)]
pub struct PullResponse {
    pub state: String,
}
