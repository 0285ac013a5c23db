// SPDX-License-Identifier: MIT OR Apache-2.0
//! Persistent pipeline state shapes (spec §3, §4.10).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::job::NativeJob;

/// A cross-process advisory lock on a single project within a workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lock {
    /// Agent id that holds the lock.
    pub owner_agent_id: String,
    /// Session id that acquired the lock, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_session_id: Option<String>,
    /// When the lock was acquired.
    pub acquired_at: DateTime<Utc>,
    /// When the lock expires absent renewal.
    pub expires_at: DateTime<Utc>,
}

impl Lock {
    /// `true` if `now` is at or past `expires_at`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// A single entry in a project's append-only event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineEvent {
    /// Monotonically increasing sequence number within the project.
    pub seq: u64,
    /// Event kind, e.g. `"project_snapshot"`.
    pub kind: String,
    /// Event timestamp.
    pub ts: DateTime<Utc>,
    /// Event-kind-specific payload.
    pub payload: Value,
}

/// Minimal project record tracked by the pipeline store (distinct from the
/// richer authoring-time [`crate::model::ProjectSnapshot`] — this is just
/// enough bookkeeping for the persistence/job layer).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PipelineProject {
    /// Project id.
    pub id: String,
    /// Current revision of the project's authoritative snapshot.
    #[serde(default)]
    pub revision: String,
    /// Event log, ordered by `seq`.
    #[serde(default)]
    pub events: Vec<PipelineEvent>,
}

/// Per-workspace persisted pipeline state (spec §3, §4.10).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WorkspacePipelineState {
    /// Projects in this workspace, keyed by project id.
    pub projects: BTreeMap<String, PipelineProject>,
    /// Folder bookkeeping, opaque to the core model (collaborator-owned
    /// workspace-admin concern, kept here only as pass-through storage).
    #[serde(default)]
    pub folders: BTreeMap<String, Value>,
    /// Active locks, keyed by project id.
    #[serde(default)]
    pub locks: BTreeMap<String, Lock>,
    /// Jobs, keyed by job id.
    #[serde(default)]
    pub jobs: BTreeMap<String, NativeJob>,
}

/// A scope key for a [`PersistedRecord`]: tenant plus project.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Scope {
    /// Tenant id.
    pub tenant_id: String,
    /// Project (or document) id within the tenant.
    pub project_id: String,
}

/// A single persisted document (spec §3, §6 "Persistence document layout").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedRecord {
    /// Scope this record is stored under.
    pub scope: Scope,
    /// Content-hash revision of `state`.
    pub revision: String,
    /// Serialized document body.
    pub state: Value,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last-update timestamp.
    pub updated_at: DateTime<Utc>,
}
