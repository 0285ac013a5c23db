// SPDX-License-Identifier: MIT OR Apache-2.0
//! Trace recorder (spec §4.5).

use crate::store::TraceLogStore;
use chrono::Utc;
use mcpforge_core::{TraceRecord, TraceRecordKind};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Context attached to a step record when the dispatcher's state-attachment
/// policy (spec §4.6 step 7) is active for a call.
#[derive(Debug, Clone, Default)]
pub struct TraceContext {
    /// Current project state, when `includeState` is truthy.
    pub state: Option<Value>,
    /// Diff-since-last-revision, when `includeDiff` is truthy.
    pub diff: Option<Value>,
    /// Optional usage/cost accounting.
    pub usage: Option<Value>,
}

/// Records tool-call steps into a [`TraceLogStore`], assigning
/// monotonically increasing sequence numbers.
pub struct TraceRecorder {
    store: Mutex<TraceLogStore>,
    next_seq: AtomicU64,
}

impl TraceRecorder {
    /// Create a recorder and immediately emit its header record.
    #[must_use]
    pub fn start(store: TraceLogStore, plugin_version: &str, authoring_tool_version: Option<&str>) -> Self {
        let recorder = Self {
            store: Mutex::new(store),
            next_seq: AtomicU64::new(0),
        };
        let header = TraceRecord {
            kind: TraceRecordKind::Header,
            seq: recorder.next_seq.fetch_add(1, Ordering::SeqCst),
            ts: Utc::now(),
            schema_version: Some(1),
            plugin_version: Some(plugin_version.to_string()),
            authoring_tool_version: authoring_tool_version.map(str::to_string),
            route: None,
            op: None,
            payload: None,
            response: None,
            state: None,
            diff: None,
            usage: None,
        };
        recorder.store.lock().expect("trace store lock poisoned").append(header);
        recorder
    }

    /// Record one tool-call step, optionally augmented with state/diff/usage.
    pub fn record(&self, op: &str, payload: Option<Value>, response: Value, ctx: TraceContext) -> u64 {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let record = TraceRecord {
            kind: TraceRecordKind::Step,
            seq,
            ts: Utc::now(),
            schema_version: None,
            plugin_version: None,
            authoring_tool_version: None,
            route: Some("tool".to_string()),
            op: Some(op.to_string()),
            payload,
            response: Some(response),
            state: ctx.state,
            diff: ctx.diff,
            usage: ctx.usage,
        };
        self.store.lock().expect("trace store lock poisoned").append(record);
        seq
    }

    /// Snapshot the currently retained records as NDJSON lines.
    ///
    /// # Panics
    ///
    /// Panics if a record somehow fails to serialize; every [`TraceRecord`]
    /// is built from plain serializable fields so this cannot happen in
    /// practice.
    #[must_use]
    pub fn to_ndjson(&self) -> String {
        let store = self.store.lock().expect("trace store lock poisoned");
        let mut out = String::new();
        for record in store.entries() {
            out.push_str(&serde_json::to_string(record).expect("trace record always serializes"));
            out.push('\n');
        }
        out
    }

    /// The backing store, for a [`crate::flush::TraceLogFlushScheduler`]
    /// that needs to flush the exact records this recorder appends to.
    #[must_use]
    pub fn store(&self) -> &Mutex<TraceLogStore> {
        &self.store
    }

    /// Number of records currently retained (post-eviction).
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.lock().expect("trace store lock poisoned").len()
    }

    /// `true` if no records are retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.lock().expect("trace store lock poisoned").is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn header_is_first_record() {
        let recorder = TraceRecorder::start(TraceLogStore::new(10, None), "1.0.0", None);
        assert_eq!(recorder.len(), 1);
        let ndjson = recorder.to_ndjson();
        assert!(ndjson.contains("\"kind\":\"header\""));
    }

    #[test]
    fn steps_get_increasing_sequence_numbers() {
        let recorder = TraceRecorder::start(TraceLogStore::new(10, None), "1.0.0", None);
        let s1 = recorder.record("add_cube", Some(json!({})), json!({"ok": true}), TraceContext::default());
        let s2 = recorder.record("add_cube", Some(json!({})), json!({"ok": true}), TraceContext::default());
        assert!(s2 > s1);
    }
}
