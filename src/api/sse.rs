//! Server-Sent Events support

use crate::runtime::TurnStream;
use crate::transcript::TranscriptEvent;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::StreamExt;

/// Convert a response's transcript events to an SSE stream
pub fn sse_stream(turn: TurnStream) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events = turn.map(|event| Ok::<_, Infallible>(transcript_event_to_axum(&event)));

    Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn transcript_event_to_axum(event: &TranscriptEvent) -> Event {
    let data = serde_json::to_string(event).unwrap_or_else(|e| {
        tracing::error!(error = %e, kind = event.kind(), "Failed to encode event");
        String::from("{}")
    });
    Event::default().event(event.kind()).data(data)
}
