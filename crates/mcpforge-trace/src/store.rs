// SPDX-License-Identifier: MIT OR Apache-2.0
//! Bounded ring buffer of [`TraceRecord`]s (spec §4.5).

use mcpforge_core::TraceRecord;
use std::collections::VecDeque;

/// Default entry cap.
pub const DEFAULT_MAX_ENTRIES: usize = 2_000;

/// Append-only-in-spirit, bounded-in-practice trace log.
///
/// On append, the oldest entries are dropped until both `max_entries` and
/// (if set) `max_bytes` hold. Byte accounting uses each record's canonical
/// JSON length, recomputed lazily only when a byte cap is configured.
pub struct TraceLogStore {
    max_entries: usize,
    max_bytes: Option<usize>,
    entries: VecDeque<TraceRecord>,
    sizes: VecDeque<usize>,
    total_bytes: usize,
}

impl TraceLogStore {
    /// Construct a store with the given caps. `max_bytes = None` means no
    /// byte-size cap, only the entry-count cap applies.
    #[must_use]
    pub fn new(max_entries: usize, max_bytes: Option<usize>) -> Self {
        Self {
            max_entries: max_entries.max(1),
            max_bytes,
            entries: VecDeque::new(),
            sizes: VecDeque::new(),
            total_bytes: 0,
        }
    }

    /// Append a record, evicting the oldest entries until both caps hold.
    pub fn append(&mut self, record: TraceRecord) {
        let size = self.max_bytes.map(|_| record_size(&record)).unwrap_or(0);
        self.entries.push_back(record);
        self.sizes.push_back(size);
        self.total_bytes += size;
        self.evict();
    }

    fn evict(&mut self) {
        while self.entries.len() > self.max_entries {
            self.pop_oldest();
        }
        if let Some(max_bytes) = self.max_bytes {
            while self.total_bytes > max_bytes && self.entries.len() > 1 {
                self.pop_oldest();
            }
        }
    }

    fn pop_oldest(&mut self) {
        self.entries.pop_front();
        if let Some(size) = self.sizes.pop_front() {
            self.total_bytes -= size;
        }
    }

    /// All currently retained records, oldest first.
    #[must_use]
    pub fn entries(&self) -> &VecDeque<TraceRecord> {
        &self.entries
    }

    /// Number of retained records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn record_size(record: &TraceRecord) -> usize {
    serde_json::to_vec(record).map(|v| v.len()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mcpforge_core::TraceRecordKind;

    fn step(seq: u64) -> TraceRecord {
        TraceRecord {
            kind: TraceRecordKind::Step,
            seq,
            ts: Utc::now(),
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

    #[test]
    fn evicts_past_max_entries() {
        let mut store = TraceLogStore::new(2, None);
        for i in 0..3 {
            store.append(step(i));
        }
        assert_eq!(store.len(), 2);
        assert_eq!(store.entries().front().unwrap().seq, 1);
    }

    #[test]
    fn evicts_past_max_bytes() {
        let mut store = TraceLogStore::new(100, Some(1));
        for i in 0..5 {
            store.append(step(i));
        }
        // At least one entry always remains even if a single entry exceeds
        // the byte cap, but older entries are evicted first.
        assert!(store.len() < 5);
        assert!(!store.is_empty());
    }
}
