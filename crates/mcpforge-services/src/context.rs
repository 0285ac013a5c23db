// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shared collaborators every use-case service is built against.

use mcpforge_core::{Editor, ErrorCode, Limits, ProjectSnapshot, SnapshotPort, ToolError};
use mcpforge_revision::RevisionStore;
use std::sync::Arc;
use tokio::sync::Mutex;

/// The port bundle plus local bookkeeping shared by every service. One
/// `ServiceContext` exists per active project; the dispatcher serializes
/// calls into a given workspace, so the interior `Mutex` on the revision
/// store only guards against accidental concurrent use, not contention.
pub struct ServiceContext {
    /// Mutates the authoritative model.
    pub editor: Arc<dyn Editor>,
    /// Reads the current snapshot.
    pub snapshot_port: Arc<dyn SnapshotPort>,
    /// Content-hash cache for diff-base lookups.
    pub revisions: Mutex<RevisionStore>,
    /// Configured ceilings for cube count, texture size, animation length.
    pub limits: Limits,
}

impl ServiceContext {
    /// Build a context over the given ports with the given limits.
    #[must_use]
    pub fn new(editor: Arc<dyn Editor>, snapshot_port: Arc<dyn SnapshotPort>, limits: Limits) -> Self {
        Self {
            editor,
            snapshot_port,
            revisions: Mutex::new(RevisionStore::default()),
            limits,
        }
    }

    /// Read the current snapshot through the port, mapping adapter failures
    /// to `io_error`.
    pub async fn read_snapshot(&self) -> Result<ProjectSnapshot, ToolError> {
        self.snapshot_port
            .snapshot()
            .await
            .map_err(|message| ToolError::simple(ErrorCode::IoError, message))
    }

    /// Apply a structured mutation through the port, mapping adapter
    /// failures to `invalid_state`.
    pub async fn apply(&self, op: &str, params: serde_json::Value) -> Result<(), ToolError> {
        self.editor
            .apply(op, params)
            .await
            .map_err(|message| ToolError::simple(ErrorCode::InvalidState, message))
    }

    /// Apply a mutation, then re-read and re-hash the snapshot. Returns the
    /// pre-mutation snapshot (for diffing), the post-mutation snapshot, and
    /// its freshly tracked revision — the shape every mutating service
    /// operation needs (spec §4.7).
    pub async fn mutate(
        &self,
        op: &str,
        params: serde_json::Value,
    ) -> Result<(ProjectSnapshot, ProjectSnapshot, String), ToolError> {
        let before = self.read_snapshot().await?;
        self.apply(op, params).await?;
        let after = self.read_snapshot().await?;
        let revision = self.revisions.lock().await.track(&after);
        Ok((before, after, revision))
    }
}
