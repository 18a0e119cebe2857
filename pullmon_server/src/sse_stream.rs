use std::convert::Infallible;

use async_stream::stream;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;

use pullmon_core::progress::channel::Subscription;

/// Adapt a job subscription into an SSE response.
///
/// Each progress event becomes one SSE `progress` message carrying the
/// JSON-encoded event; the HTTP stream ends when the job's channel closes,
/// so clients observe retirement as a clean end-of-stream.
pub fn progress_sse(
    mut subscription: Subscription,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = stream! {
        while let Some(event) = subscription.next().await {
            match Event::default().event("progress").json_data(&event) {
                Ok(sse_event) => yield Ok(sse_event),
                Err(e) => log::warn!("[events] could not encode event: {}", e),
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}
