// SPDX-License-Identifier: MIT OR Apache-2.0
//! Count-or-interval flush scheduler (spec §4.5).

use crate::store::TraceLogStore;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::interval;
use tracing::warn;

/// Destination for flushed trace records. Implementations own the actual
/// sink (file, socket, test buffer) and report failures as `(code, message)`
/// pairs so the scheduler can dedup repeated failures.
#[async_trait]
pub trait TraceWriter: Send + Sync {
    /// Persist the store's currently retained records. Called with the
    /// store locked; implementations should not block long.
    async fn flush(&self, store: &TraceLogStore) -> Result<(), (String, String)>;
}

/// Flushes a [`TraceLogStore`] to a [`TraceWriter`] every `flush_every`
/// appends or `flush_interval` elapsed, whichever comes first.
///
/// Write errors are deduplicated by `code:message` and logged at most once
/// per distinct key, so a persistently broken sink does not flood logs.
pub struct TraceLogFlushScheduler<W: TraceWriter> {
    writer: W,
    flush_every: u64,
    flush_interval: Duration,
    appends_since_flush: AtomicU64,
    seen_errors: Mutex<HashSet<String>>,
}

impl<W: TraceWriter> TraceLogFlushScheduler<W> {
    /// Build a scheduler. `flush_every = 0` disables the count trigger;
    /// the interval trigger always applies.
    #[must_use]
    pub fn new(writer: W, flush_every: u64, flush_interval: Duration) -> Self {
        Self {
            writer,
            flush_every,
            flush_interval,
            appends_since_flush: AtomicU64::new(0),
            seen_errors: Mutex::new(HashSet::new()),
        }
    }

    /// Call after each append. Flushes immediately once `flush_every`
    /// appends have accumulated since the last flush.
    pub async fn on_append(&self, store: &TraceLogStore) {
        let count = self.appends_since_flush.fetch_add(1, Ordering::SeqCst) + 1;
        if self.flush_every > 0 && count >= self.flush_every {
            self.flush_now(store, false).await;
        }
    }

    /// Run the interval-driven side of the scheduler against a shared store.
    /// Intended to be spawned as a background task; runs until aborted by
    /// its owner, as there is no natural end to a live trace log.
    pub async fn run_interval(&self, store: &Mutex<TraceLogStore>) {
        let mut ticker = interval(self.flush_interval);
        loop {
            ticker.tick().await;
            let guard = store.lock().expect("trace store lock poisoned");
            self.flush_now(&guard, false).await;
        }
    }

    /// Flush unconditionally, bypassing the count trigger. `force = true` is
    /// used on shutdown to guarantee pending records are not lost.
    pub async fn flush_now(&self, store: &TraceLogStore, force: bool) {
        let _ = force;
        self.appends_since_flush.store(0, Ordering::SeqCst);
        if let Err((code, message)) = self.writer.flush(store).await {
            let key = format!("{code}:{message}");
            let mut seen = self.seen_errors.lock().expect("seen_errors lock poisoned");
            if seen.insert(key.clone()) {
                warn!(code = %code, message = %message, "trace flush failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcpforge_core::{TraceRecord, TraceRecordKind};
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    struct CountingWriter {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl TraceWriter for CountingWriter {
        async fn flush(&self, _store: &TraceLogStore) -> Result<(), (String, String)> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingWriter;

    #[async_trait]
    impl TraceWriter for FailingWriter {
        async fn flush(&self, _store: &TraceLogStore) -> Result<(), (String, String)> {
            Err(("io_error".to_string(), "disk full".to_string()))
        }
    }

    fn step(seq: u64) -> TraceRecord {
        TraceRecord {
            kind: TraceRecordKind::Step,
            seq,
            ts: chrono::Utc::now(),
            schema_version: None,
            plugin_version: None,
            authoring_tool_version: None,
            route: Some("tool".into()),
            op: Some("add_cube".into()),
            payload: None,
            response: None,
            state: None,
            diff: None,
            usage: None,
        }
    }

    #[tokio::test]
    async fn flushes_after_count_threshold() {
        let calls = Arc::new(AtomicUsize::new(0));
        let scheduler = TraceLogFlushScheduler::new(
            CountingWriter { calls: calls.clone() },
            2,
            Duration::from_secs(3600),
        );
        let mut store = TraceLogStore::new(100, None);
        store.append(step(0));
        scheduler.on_append(&store).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        store.append(step(1));
        scheduler.on_append(&store).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn dedups_repeated_flush_errors() {
        let scheduler = TraceLogFlushScheduler::new(FailingWriter, 1, Duration::from_secs(3600));
        let mut store = TraceLogStore::new(100, None);
        store.append(step(0));
        scheduler.flush_now(&store, false).await;
        scheduler.flush_now(&store, false).await;
        assert_eq!(scheduler.seen_errors.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn force_flush_resets_counter() {
        let calls = Arc::new(AtomicUsize::new(0));
        let scheduler = TraceLogFlushScheduler::new(
            CountingWriter { calls: calls.clone() },
            10,
            Duration::from_secs(3600),
        );
        let mut store = TraceLogStore::new(100, None);
        store.append(step(0));
        scheduler.flush_now(&store, true).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
