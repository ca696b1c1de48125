//! Server-Sent Events support

use crate::session::SessionSnapshot;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tokio_stream::StreamExt;

/// Stream the current snapshot, then every later one
///
/// Intermediate snapshots may be skipped when the client is slow; the
/// latest one is always delivered.
pub fn sse_stream(
    snapshots: watch::Receiver<SessionSnapshot>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = WatchStream::new(snapshots).map(|snapshot| Ok(snapshot_event(&snapshot)));

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn snapshot_event(snapshot: &SessionSnapshot) -> Event {
    let data = json!({
        "type": "snapshot",
        "snapshot": snapshot,
    });
    Event::default().event("snapshot").data(data.to_string())
}
