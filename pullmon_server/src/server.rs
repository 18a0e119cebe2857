use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::Method;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};

use pullmon_core::job::registry::JobRegistry;
use pullmon_core::progress::channel::Subscription;
use pullmon_core::types::types::{Category, JobSnapshot};

use crate::sse_stream::progress_sse;
use crate::types::{PullQuery, PullResponse};

// ---------------------------------------------------------------------------
// Shared application state
// ---------------------------------------------------------------------------

pub struct AppState {
    pub registry: Arc<JobRegistry>,
}

impl AppState {
    pub fn new(registry: Arc<JobRegistry>) -> Arc<Self> {
        Arc::new(Self { registry })
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router(state: Arc<AppState>) -> Router {
    // Observers may attach from any origin (and localhost for dev).
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .allow_origin(Any);

    Router::new()
        // ── Observer-facing endpoints ────────────────────────────────────────
        .route("/pull/{job_id}", get(pull_handler))
        .route("/events/{job_id}", get(events_handler))
        .route("/status/{job_id}", get(status_handler))
        .route("/jobs", get(jobs_handler))
        // ── Fetch-mechanism-facing endpoint ──────────────────────────────────
        .route("/signal/{job_id}", post(signal_handler))
        .layer(cors)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Observer-facing handlers
// ---------------------------------------------------------------------------

/// GET /pull/:job_id?category=ivi
/// Begin tracking a pull. Idempotent: a request for an already-active job
/// coalesces into it. The caller is expected to have triggered the real
/// fetch through its own transport; this endpoint only starts tracking.
async fn pull_handler(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
    Query(query): Query<PullQuery>,
) -> Json<PullResponse> {
    let category = Category::new(query.category.as_deref().unwrap_or("default"));
    let handle = state.registry.start_job(&job_id, category).await;
    log::info!("[pull] tracking {} ({})", handle.job_id(), handle.category());

    Json(PullResponse {
        state: "accepted".to_string(),
    })
}

/// GET /events/:job_id
/// SSE stream of this job's progress events, ending when the job is
/// retired. An unknown job yields an immediately-ended stream (nothing to
/// show, not an error).
async fn events_handler(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> axum::response::sse::Sse<impl futures::Stream<Item = Result<axum::response::sse::Event, std::convert::Infallible>>>
{
    let subscription = match state.registry.lookup(&job_id).await {
        Some(handle) => handle.subscribe(),
        None => {
            log::debug!("[events] stream requested for unknown job {}", job_id);
            Subscription::closed()
        }
    };
    progress_sse(subscription)
}

/// GET /status/:job_id
async fn status_handler(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Json<serde_json::Value> {
    match state.registry.lookup(&job_id).await {
        Some(handle) => {
            let snapshot = handle.snapshot().await;
            Json(serde_json::json!({
                "job_id":   snapshot.job_id,
                "category": snapshot.category,
                "state":    snapshot.state,
                "percent":  snapshot.percent,
            }))
        }
        None => Json(serde_json::json!({ "job_id": job_id, "status": "not_found" })),
    }
}

/// GET /jobs
async fn jobs_handler(State(state): State<Arc<AppState>>) -> Json<Vec<JobSnapshot>> {
    Json(state.registry.snapshots().await)
}

// ---------------------------------------------------------------------------
// Fetch-mechanism-facing handler
// ---------------------------------------------------------------------------

/// POST /signal/:job_id
/// Raw progress report from the fetch mechanism; plain-text body of the
/// form `State:percent`. Malformed bodies and reports for unknown jobs are
/// logged and dropped; the source is at-least-once and fire-and-forget, so
/// the response is "ok" either way.
async fn signal_handler(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
    body: String,
) -> Json<serde_json::Value> {
    log::debug!("[signal] {} <- {:?}", job_id, body.trim());
    state.registry.deliver_signal(&job_id, body.trim()).await;
    Json(serde_json::json!({ "status": "ok" }))
}
