// SPDX-License-Identifier: MIT OR Apache-2.0
//! In-memory `Persistence` adapter for local/single-process operation — the
//! role `abp-backend-mock` plays for the teacher's real sidecar backends.
//! A real deployment would back this with a database; this repo ships only
//! the in-process default, same as the teacher ships `abp-backend-mock`
//! alongside integration points it cannot include.

use async_trait::async_trait;
use mcpforge_core::pipeline::{PersistedRecord, Scope};
use mcpforge_core::ports::Persistence;
use std::collections::BTreeMap;
use tokio::sync::Mutex;

/// Single-process, non-durable `Persistence` backend. Fully honors the
/// `save_if_revision` CAS contract, so it is a faithful stand-in for
/// exercising the lock/store logic without an external database.
pub struct InMemoryPersistence {
    records: Mutex<BTreeMap<Scope, PersistedRecord>>,
}

impl InMemoryPersistence {
    /// Start with no stored documents.
    #[must_use]
    pub fn new() -> Self {
        Self { records: Mutex::new(BTreeMap::new()) }
    }
}

impl Default for InMemoryPersistence {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Persistence for InMemoryPersistence {
    async fn read(&self, scope: &Scope) -> Result<Option<PersistedRecord>, String> {
        Ok(self.records.lock().await.get(scope).cloned())
    }

    async fn save_if_revision(&self, record: PersistedRecord, expected: Option<&str>) -> Result<bool, String> {
        let mut records = self.records.lock().await;
        let current = records.get(&record.scope).map(|r| r.revision.as_str());
        if current != expected {
            return Ok(false);
        }
        records.insert(record.scope.clone(), record);
        Ok(true)
    }

    fn supports_cas(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn record(scope: Scope, revision: &str) -> PersistedRecord {
        let now = Utc::now();
        PersistedRecord { scope, revision: revision.to_string(), state: json!({}), created_at: now, updated_at: now }
    }

    #[tokio::test]
    async fn save_if_revision_rejects_a_stale_expectation() {
        let store = InMemoryPersistence::new();
        let scope = Scope { tenant_id: "t".into(), project_id: "p".into() };
        assert!(store.save_if_revision(record(scope.clone(), "r1"), None).await.unwrap());
        let lost = store.save_if_revision(record(scope.clone(), "r2"), None).await.unwrap();
        assert!(!lost, "second write without the current revision should lose the race");
        let won = store.save_if_revision(record(scope, "r2"), Some("r1")).await.unwrap();
        assert!(won);
    }
}
