// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
//! Revision store (spec §4.1).
//!
//! Computes the content-hash revision of a [`ProjectSnapshot`] and keeps a
//! small FIFO cache of recent `(revision -> snapshot)` pairs so the diff
//! engine can find a base snapshot for a given revision without the caller
//! threading the old snapshot through by hand.
//!
//! Single-threaded access is assumed, matching spec §5's "logically
//! single-threaded per workspace" model — the dispatcher serializes calls
//! into a given workspace's services, and this store lives behind that
//! serialization rather than behind its own lock.

use mcpforge_core::model::{ProjectSnapshot, Revision};
use std::collections::VecDeque;

/// Default number of past snapshots retained for diff-base lookup.
pub const DEFAULT_CAPACITY: usize = 5;

/// Computes and caches [`Revision`]s for [`ProjectSnapshot`]s.
pub struct RevisionStore {
    capacity: usize,
    entries: VecDeque<(Revision, ProjectSnapshot)>,
}

impl RevisionStore {
    /// Create a store retaining at most `capacity` past snapshots.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: VecDeque::new(),
        }
    }

    /// Canonical content hash of `snapshot`. Stable under field order and
    /// serializer whitespace (spec §4.1): the snapshot's own `revision`
    /// field is excluded from the hashed content so the hash only reflects
    /// logical model data, not a previously stamped revision.
    #[must_use]
    pub fn hash(snapshot: &ProjectSnapshot) -> Revision {
        let mut unrevisioned = snapshot.clone();
        unrevisioned.revision = String::new();
        mcpforge_core::sha256_hex(&unrevisioned).expect("ProjectSnapshot always serializes")
    }

    /// Compute `snapshot`'s revision and insert it into the cache if not
    /// already the most recently tracked entry. Returns the revision.
    pub fn track(&mut self, snapshot: &ProjectSnapshot) -> Revision {
        let revision = Self::hash(snapshot);
        if self.entries.back().map(|(r, _)| r) == Some(&revision) {
            return revision;
        }
        self.remember(snapshot.clone(), revision.clone());
        revision
    }

    /// Look up a previously tracked snapshot by revision.
    #[must_use]
    pub fn get(&self, revision: &str) -> Option<&ProjectSnapshot> {
        self.entries
            .iter()
            .find(|(r, _)| r == revision)
            .map(|(_, s)| s)
    }

    /// Force an entry into the cache without recomputing the hash,
    /// evicting the oldest entry (FIFO) if at capacity.
    pub fn remember(&mut self, mut snapshot: ProjectSnapshot, revision: Revision) {
        snapshot.revision = revision.clone();
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back((revision, snapshot));
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if no entries are cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for RevisionStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcpforge_core::model::{Bone, ProjectSnapshot};

    fn snapshot(name: &str) -> ProjectSnapshot {
        ProjectSnapshot {
            id: "p1".into(),
            name: name.into(),
            format_id: "generic".into(),
            ..Default::default()
        }
    }

    #[test]
    fn hash_is_deterministic() {
        let a = snapshot("demo");
        let b = snapshot("demo");
        assert_eq!(RevisionStore::hash(&a), RevisionStore::hash(&b));
    }

    #[test]
    fn hash_changes_with_content() {
        let a = snapshot("demo");
        let b = snapshot("other");
        assert_ne!(RevisionStore::hash(&a), RevisionStore::hash(&b));
    }

    #[test]
    fn hash_ignores_stale_revision_field() {
        let mut a = snapshot("demo");
        a.revision = "stale".into();
        let mut b = snapshot("demo");
        b.revision = "different-stale".into();
        assert_eq!(RevisionStore::hash(&a), RevisionStore::hash(&b));
    }

    #[test]
    fn track_caches_and_get_roundtrips() {
        let mut store = RevisionStore::new(5);
        let snap = snapshot("demo");
        let rev = store.track(&snap);
        let cached = store.get(&rev).expect("cached");
        assert_eq!(cached.name, "demo");
        assert_eq!(cached.revision, rev);
    }

    #[test]
    fn fifo_eviction_past_capacity() {
        let mut store = RevisionStore::new(2);
        let mut revs = Vec::new();
        for i in 0..3 {
            let snap = snapshot(&format!("v{i}"));
            revs.push(store.track(&snap));
        }
        assert_eq!(store.len(), 2);
        assert!(store.get(&revs[0]).is_none(), "oldest entry evicted");
        assert!(store.get(&revs[1]).is_some());
        assert!(store.get(&revs[2]).is_some());
    }

    #[test]
    fn tracking_same_content_twice_is_noop() {
        let mut store = RevisionStore::new(5);
        let snap = snapshot("demo");
        let r1 = store.track(&snap);
        let r2 = store.track(&snap);
        assert_eq!(r1, r2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn remember_forces_entry_without_recompute() {
        let mut store = RevisionStore::new(5);
        let snap = snapshot("demo");
        store.remember(snap.clone(), "forced-rev".into());
        let cached = store.get("forced-rev").expect("cached");
        assert_eq!(cached.name, "demo");
    }
}
