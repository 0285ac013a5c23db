// SPDX-License-Identifier: MIT OR Apache-2.0
//! `WorkspacePipeline` — the entry point a router/daemon reaches for,
//! wrapping [`PipelineStore`]'s lock-read-mutate-write cycle around the job
//! queue and event log operations (spec §4.10, §4.10.1).

use crate::error::PipelineError;
use crate::{events, queue};
use chrono::Utc;
use mcpforge_core::job::NativeJob;
use mcpforge_core::pipeline::{PipelineEvent, WorkspacePipelineState};
use mcpforge_core::ports::Persistence;
use serde_json::Value;
use std::sync::Arc;

use crate::store::PipelineStore;

/// Facade over one tenant's workspace pipelines.
pub struct WorkspacePipeline {
    store: PipelineStore,
}

impl WorkspacePipeline {
    /// Build a facade backed by `persistence`, scoped to `tenant_id`.
    #[must_use]
    pub fn new(persistence: Arc<dyn Persistence>, tenant_id: impl Into<String>) -> Self {
        Self { store: PipelineStore::new(persistence, tenant_id) }
    }

    /// Current persisted state for `workspace_id`, without taking the lock.
    pub async fn state(&self, workspace_id: &str) -> Result<WorkspacePipelineState, PipelineError> {
        self.store.read(workspace_id).await
    }

    /// Submit a job, clamping `max_attempts`/`lease_ms` per spec §3.
    #[allow(clippy::too_many_arguments)]
    pub async fn submit_job(
        &self,
        workspace_id: &str,
        id: String,
        project_id: String,
        kind: String,
        payload: Option<Value>,
        max_attempts: Option<u32>,
        lease_ms: Option<u64>,
    ) -> Result<NativeJob, PipelineError> {
        let id_for_lookup = id.clone();
        let state = self
            .store
            .mutate(workspace_id, |state| {
                queue::submit(state, id, project_id, workspace_id.to_string(), kind, payload, max_attempts, lease_ms, Utc::now());
            })
            .await?;
        state.jobs.get(&id_for_lookup).cloned().ok_or(PipelineError::JobNotFound(id_for_lookup))
    }

    /// Claim the oldest eligible queued job for `worker_id`, reclaiming any
    /// expired leases first. `None` if nothing is eligible right now.
    pub async fn claim_next_job(&self, workspace_id: &str, worker_id: &str) -> Result<Option<NativeJob>, PipelineError> {
        let claimed = std::cell::RefCell::new(None);
        self.store
            .mutate(workspace_id, |state| {
                *claimed.borrow_mut() = queue::claim_next(state, worker_id, Utc::now());
            })
            .await?;
        Ok(claimed.into_inner())
    }

    /// Mark `job_id` completed with `result`.
    pub async fn complete_job(&self, workspace_id: &str, job_id: &str, result: Option<Value>) -> Result<NativeJob, PipelineError> {
        let outcome = std::cell::RefCell::new(None);
        self.store
            .mutate(workspace_id, |state| {
                *outcome.borrow_mut() = Some(queue::complete(state, job_id, result, Utc::now()));
            })
            .await?;
        outcome.into_inner().unwrap()
    }

    /// Fail `job_id` with `error`, retrying with backoff or dead-lettering
    /// per spec §4.10.1.
    pub async fn fail_job(&self, workspace_id: &str, job_id: &str, error: String) -> Result<NativeJob, PipelineError> {
        let outcome = std::cell::RefCell::new(None);
        self.store
            .mutate(workspace_id, |state| {
                *outcome.borrow_mut() = Some(queue::fail(state, job_id, error, Utc::now()));
            })
            .await?;
        outcome.into_inner().unwrap()
    }

    /// Events for `project_id` with `seq > last_seq`, in order.
    pub async fn project_events_since(&self, workspace_id: &str, project_id: &str, last_seq: u64) -> Result<Vec<PipelineEvent>, PipelineError> {
        let state = self.store.read(workspace_id).await?;
        Ok(events::since(&state, project_id, last_seq))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryPersistence;
    use serde_json::json;

    fn pipeline() -> WorkspacePipeline {
        WorkspacePipeline::new(Arc::new(InMemoryPersistence::new()), "tenant")
    }

    #[tokio::test]
    async fn submit_claim_complete_round_trip() {
        let pipeline = pipeline();
        let job = pipeline
            .submit_job("ws", "job-1".into(), "proj".into(), "export".into(), None, None, None)
            .await
            .unwrap();
        assert_eq!(job.status, mcpforge_core::job::JobStatus::Queued);

        let claimed = pipeline.claim_next_job("ws", "worker-1").await.unwrap().unwrap();
        assert_eq!(claimed.id, "job-1");
        assert_eq!(claimed.attempt_count, 1);

        let done = pipeline.complete_job("ws", "job-1", Some(json!({"artifact": "a.gltf"}))).await.unwrap();
        assert_eq!(done.status, mcpforge_core::job::JobStatus::Completed);
    }

    #[tokio::test]
    async fn fail_job_dead_letters_after_exhausting_attempts() {
        let pipeline = pipeline();
        pipeline
            .submit_job("ws", "job-1".into(), "proj".into(), "export".into(), None, Some(1), None)
            .await
            .unwrap();
        pipeline.claim_next_job("ws", "worker-1").await.unwrap().unwrap();
        let failed = pipeline.fail_job("ws", "job-1", "boom".into()).await.unwrap();
        assert!(failed.dead_letter);
    }

    #[tokio::test]
    async fn project_events_since_reflects_job_lifecycle() {
        let pipeline = pipeline();
        pipeline
            .submit_job("ws", "job-1".into(), "proj".into(), "export".into(), None, None, None)
            .await
            .unwrap();
        pipeline.claim_next_job("ws", "worker-1").await.unwrap();

        let events = pipeline.project_events_since("ws", "proj", 0).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].seq, 1);
        assert_eq!(events[1].seq, 2);
    }
}
