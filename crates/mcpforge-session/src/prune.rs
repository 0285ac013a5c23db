// SPDX-License-Identifier: MIT OR Apache-2.0
//! Background expiry sweep, mirroring `mcpforge-trace`'s
//! `TraceLogFlushScheduler::run_interval` idiom.

use crate::store::SessionStore;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// Ticks every `prune_interval_secs` and removes sessions idle past their
/// TTL (spec §4.8: a 60-second pruning tick).
pub struct SessionPruner {
    store: Arc<SessionStore>,
    interval: Duration,
}

impl SessionPruner {
    /// Build a pruner over `store`, ticking every `prune_interval_secs`.
    #[must_use]
    pub fn new(store: Arc<SessionStore>, prune_interval_secs: u64) -> Self {
        Self { store, interval: Duration::from_secs(prune_interval_secs) }
    }

    /// Run the prune loop until cancelled. Intended to be spawned as its
    /// own background task for the lifetime of the daemon.
    pub async fn run_interval(&self) {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            let removed = self.store.prune_expired(Utc::now()).await;
            if !removed.is_empty() {
                tracing::debug!(count = removed.len(), "pruned expired sessions");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn run_interval_prunes_on_each_tick() {
        let store = Arc::new(SessionStore::new(1));
        let session = store.create(None, Utc::now()).await;
        let pruner = SessionPruner::new(store.clone(), 1);

        let handle = tokio::spawn(async move { pruner.run_interval().await });
        tokio::time::advance(Duration::from_secs(3)).await;
        tokio::task::yield_now().await;

        assert!(store.get(&session.id).await.is_none());
        handle.abort();
    }
}
