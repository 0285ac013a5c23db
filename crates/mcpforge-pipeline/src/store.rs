// SPDX-License-Identifier: MIT OR Apache-2.0
//! `PipelineStore` — the per-workspace persisted document plus the
//! lock-read-mutate-write cycle every mutation runs through (spec §4.10).

use crate::error::PipelineError;
use crate::lock::{self, default_lock_ttl};
use chrono::{Duration as ChronoDuration, Utc};
use mcpforge_core::pipeline::{PersistedRecord, Scope, WorkspacePipelineState};
use mcpforge_core::ports::Persistence;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

fn state_scope(tenant_id: &str, workspace_id: &str, version: &str) -> Scope {
    Scope { tenant_id: tenant_id.to_string(), project_id: format!("pipeline-state-{version}:{workspace_id}") }
}

/// Per-workspace pipeline store: cross-process lock plus a
/// revision-memoized view of the persisted `WorkspacePipelineState`
/// document.
pub struct PipelineStore {
    persistence: Arc<dyn Persistence>,
    tenant_id: String,
    lock_ttl: ChronoDuration,
    /// `revision -> state` memo so a read that matches the persisted
    /// revision skips deserialization (spec §4.10: "cache-assisted").
    memo: Mutex<BTreeMap<String, WorkspacePipelineState>>,
}

impl PipelineStore {
    /// Build a store scoped to one tenant, backed by `persistence`.
    #[must_use]
    pub fn new(persistence: Arc<dyn Persistence>, tenant_id: impl Into<String>) -> Self {
        Self { persistence, tenant_id: tenant_id.into(), lock_ttl: default_lock_ttl(), memo: Mutex::new(BTreeMap::new()) }
    }

    /// Read the current state for `workspace_id` without holding the lock,
    /// migrating a legacy v2/v1 document forward on first read if no v3
    /// document exists yet.
    pub async fn read(&self, workspace_id: &str) -> Result<WorkspacePipelineState, PipelineError> {
        let scope = state_scope(&self.tenant_id, workspace_id, "v3");
        if let Some(record) = self.persistence.read(&scope).await.map_err(PipelineError::Io)? {
            return self.deserialize_cached(&record).await;
        }
        self.migrate_legacy(workspace_id).await
    }

    /// Acquire the workspace lock, re-read the current state, apply `mutate`,
    /// and write the result back via `save_if_revision`. On a lost CAS race
    /// the memo is invalidated and `PipelineError::Conflict` is returned —
    /// the caller may retry.
    pub async fn mutate<F>(&self, workspace_id: &str, mutate: F) -> Result<WorkspacePipelineState, PipelineError>
    where
        F: FnOnce(&mut WorkspacePipelineState),
    {
        let owner = uuid::Uuid::new_v4().to_string();
        let held_revision = lock::acquire(&*self.persistence, &self.tenant_id, workspace_id, &owner, self.lock_ttl)
            .await
            .map_err(|_| PipelineError::LockTimeout)?;

        let result = self.mutate_while_locked(workspace_id, mutate).await;

        let _ = lock::release(&*self.persistence, &self.tenant_id, workspace_id, &held_revision).await;
        result
    }

    async fn mutate_while_locked<F>(&self, workspace_id: &str, mutate: F) -> Result<WorkspacePipelineState, PipelineError>
    where
        F: FnOnce(&mut WorkspacePipelineState),
    {
        let scope = state_scope(&self.tenant_id, workspace_id, "v3");
        let existing = self.persistence.read(&scope).await.map_err(PipelineError::Io)?;
        let expected_revision = existing.as_ref().map(|r| r.revision.clone());
        let mut state = match &existing {
            Some(record) => self.deserialize_cached(record).await?,
            None => self.migrate_legacy(workspace_id).await?,
        };

        mutate(&mut state);

        let now = Utc::now();
        let new_revision = mcpforge_core::sha256_hex(&state).map_err(|e| PipelineError::Io(e.to_string()))?;
        let record = PersistedRecord {
            scope,
            revision: new_revision.clone(),
            state: serde_json::to_value(&state).map_err(|e| PipelineError::Io(e.to_string()))?,
            created_at: existing.as_ref().map_or(now, |r| r.created_at),
            updated_at: now,
        };

        let won = self
            .persistence
            .save_if_revision(record, expected_revision.as_deref())
            .await
            .map_err(PipelineError::Io)?;
        if !won {
            self.memo.lock().await.remove(&new_revision);
            return Err(PipelineError::Conflict);
        }

        self.memo.lock().await.insert(new_revision, state.clone());
        Ok(state)
    }

    async fn deserialize_cached(&self, record: &PersistedRecord) -> Result<WorkspacePipelineState, PipelineError> {
        if let Some(cached) = self.memo.lock().await.get(&record.revision) {
            return Ok(cached.clone());
        }
        let state: WorkspacePipelineState = serde_json::from_value(record.state.clone()).map_err(|e| PipelineError::Io(e.to_string()))?;
        self.memo.lock().await.insert(record.revision.clone(), state.clone());
        Ok(state)
    }

    /// Read a legacy `v2` then `v1` document for `workspace_id`, if either
    /// still exists, and write it forward under the `v3` key. Absent any
    /// legacy document, seeds a fresh empty state (not persisted until the
    /// next `mutate`).
    async fn migrate_legacy(&self, workspace_id: &str) -> Result<WorkspacePipelineState, PipelineError> {
        for version in ["v2", "v1"] {
            let legacy_scope = state_scope(&self.tenant_id, workspace_id, version);
            if let Some(record) = self.persistence.read(&legacy_scope).await.map_err(PipelineError::Io)? {
                let state: WorkspacePipelineState =
                    serde_json::from_value(record.state.clone()).map_err(|e| PipelineError::Io(e.to_string()))?;
                tracing::info!(workspace_id, from = version, "migrating legacy pipeline state forward to v3");
                let forward_scope = state_scope(&self.tenant_id, workspace_id, "v3");
                let now = Utc::now();
                let forward_revision = mcpforge_core::sha256_hex(&state).map_err(|e| PipelineError::Io(e.to_string()))?;
                let forward_record = PersistedRecord {
                    scope: forward_scope,
                    revision: forward_revision,
                    state: record.state.clone(),
                    created_at: record.created_at,
                    updated_at: now,
                };
                // Best-effort: if another writer already migrated this
                // workspace forward, its v3 document wins and this write
                // simply loses the race.
                let _ = self.persistence.save_if_revision(forward_record, None).await;
                return Ok(state);
            }
        }
        Ok(WorkspacePipelineState::default())
    }
}
