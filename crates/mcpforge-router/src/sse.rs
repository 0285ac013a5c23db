// SPDX-License-Identifier: MIT OR Apache-2.0
//! SSE fan-out handle bridging [`mcpforge_core::session::SseConnection`] to
//! an axum [`Sse`] response (spec §4.8, §4.9).
//!
//! The 15 s keep-alive comment is axum's own `KeepAlive` timer, not a
//! hand-rolled one — the session's connection cap and close semantics are
//! this crate's job, the framing is axum's.

use axum::response::sse::{Event, KeepAlive, Sse};
use mcpforge_core::session::SseConnection;
use std::convert::Infallible;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::{Stream, StreamExt};

/// Default keep-alive cadence (spec §4.8: "every 15 s").
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(15);

type EventStream = Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>>;

/// One open SSE stream. `send` enqueues a data frame; `close` drops the
/// sending half so the stream ends even without the client disconnecting.
pub struct SseHandle {
    sender: Mutex<Option<mpsc::UnboundedSender<String>>>,
    closed: AtomicBool,
}

impl SseHandle {
    /// Build a handle plus the axum [`Sse`] response it feeds.
    #[must_use]
    pub fn pair() -> (Arc<Self>, Sse<EventStream>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = Arc::new(Self { sender: Mutex::new(Some(tx)), closed: AtomicBool::new(false) });
        let stream: EventStream = Box::pin(UnboundedReceiverStream::new(rx).map(|frame| Ok(Event::default().data(frame))));
        let sse = Sse::new(stream).keep_alive(KeepAlive::new().interval(KEEPALIVE_INTERVAL).text("keep-alive"));
        (handle, sse)
    }
}

impl SseConnection for SseHandle {
    fn send(&self, payload: &str) {
        if let Some(sender) = self.sender.lock().expect("sse handle lock poisoned").as_ref() {
            let _ = sender.send(payload.to_string());
        }
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.sender.lock().expect("sse handle lock poisoned").take();
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
