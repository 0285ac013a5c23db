// SPDX-License-Identifier: MIT OR Apache-2.0
//! Job queue lifecycle: `submitJob`/`claimNextJob`/`completeJob`/`failJob`,
//! lease expiry reclaim, exponential backoff, dead-letter (spec §4.10.1).
//!
//! Every function here is a pure transform over a `WorkspacePipelineState`
//! already held under the cross-process lock — none of it touches
//! persistence directly, matching `abp-queue::RunQueue`'s in-memory,
//! caller-synchronizes-access shape.

use crate::error::PipelineError;
use crate::events;
use chrono::{DateTime, Utc};
use mcpforge_core::job::{JobStatus, NativeJob};
use mcpforge_core::pipeline::WorkspacePipelineState;
use serde_json::{json, Value};

/// Insert a new job in `queued` state, clamping `maxAttempts`/`leaseMs` to
/// their spec-mandated ranges.
#[allow(clippy::too_many_arguments)]
pub fn submit(
    state: &mut WorkspacePipelineState,
    id: String,
    project_id: String,
    workspace_id: String,
    kind: String,
    payload: Option<Value>,
    max_attempts: Option<u32>,
    lease_ms: Option<u64>,
    now: DateTime<Utc>,
) -> NativeJob {
    let job = NativeJob {
        id: id.clone(),
        project_id: project_id.clone(),
        workspace_id,
        kind: kind.clone(),
        queued_at: now,
        payload,
        status: JobStatus::Queued,
        attempt_count: 0,
        max_attempts: NativeJob::clamp_max_attempts(max_attempts),
        lease_ms: NativeJob::clamp_lease_ms(lease_ms),
        lease_expires_at: None,
        worker_id: None,
        next_retry_at: None,
        error: None,
        result: None,
        dead_letter: false,
    };
    state.jobs.insert(id.clone(), job.clone());
    events::append(state, &project_id, "project_snapshot", json!({"job": id, "status": "queued", "kind": kind}), now);
    job
}

/// Return every `running` job whose lease has expired back to `queued`,
/// preserving `attempt_count` (spec §4.10.1: "on any read/write"). Returns
/// the reclaimed job ids.
pub fn reclaim_expired_leases(state: &mut WorkspacePipelineState, now: DateTime<Utc>) -> Vec<String> {
    let mut reclaimed = Vec::new();
    for job in state.jobs.values_mut() {
        if job.status == JobStatus::Running && job.lease_expires_at.is_some_and(|exp| exp < now) {
            job.status = JobStatus::Queued;
            job.lease_expires_at = None;
            job.worker_id = None;
            reclaimed.push(job.id.clone());
        }
    }
    reclaimed
}

/// Elect and claim the oldest eligible `queued` job for `worker_id`.
/// Eligible: `status == queued` and (`next_retry_at` absent or `<= now`).
/// Reclaims expired leases first, per spec §4.10.1.
pub fn claim_next(state: &mut WorkspacePipelineState, worker_id: &str, now: DateTime<Utc>) -> Option<NativeJob> {
    reclaim_expired_leases(state, now);

    let next_id = state
        .jobs
        .values()
        .filter(|j| j.status == JobStatus::Queued && j.next_retry_at.is_none_or(|retry| retry <= now))
        .min_by_key(|j| j.queued_at)
        .map(|j| j.id.clone())?;

    let job = state.jobs.get_mut(&next_id)?;
    job.status = JobStatus::Running;
    job.worker_id = Some(worker_id.to_string());
    job.attempt_count += 1;
    job.lease_expires_at = Some(now + chrono::Duration::milliseconds(job.lease_ms as i64));
    let claimed = job.clone();

    events::append(
        state,
        &claimed.project_id,
        "project_snapshot",
        json!({"job": claimed.id, "status": "running", "attemptCount": claimed.attempt_count, "worker": worker_id}),
        now,
    );
    Some(claimed)
}

/// Mark a running job `completed`, storing `result`.
pub fn complete(state: &mut WorkspacePipelineState, job_id: &str, result: Option<Value>, now: DateTime<Utc>) -> Result<NativeJob, PipelineError> {
    let job = state.jobs.get_mut(job_id).ok_or_else(|| PipelineError::JobNotFound(job_id.to_string()))?;
    if job.status != JobStatus::Running {
        return Err(PipelineError::JobNotRunning(job_id.to_string()));
    }
    job.status = JobStatus::Completed;
    job.result = result;
    job.lease_expires_at = None;
    job.worker_id = None;
    let completed = job.clone();

    events::append(state, &completed.project_id, "project_snapshot", json!({"job": completed.id, "status": "completed"}), now);
    Ok(completed)
}

/// Fail a running job. Returns it to `queued` with a backoff-delayed
/// `next_retry_at` if attempts remain, otherwise marks it `failed` and
/// `dead_letter` (spec §4.10.1).
pub fn fail(state: &mut WorkspacePipelineState, job_id: &str, error: String, now: DateTime<Utc>) -> Result<NativeJob, PipelineError> {
    let job = state.jobs.get_mut(job_id).ok_or_else(|| PipelineError::JobNotFound(job_id.to_string()))?;
    if job.status != JobStatus::Running {
        return Err(PipelineError::JobNotRunning(job_id.to_string()));
    }

    job.error = Some(error);
    job.lease_expires_at = None;
    job.worker_id = None;
    if job.attempt_count < job.max_attempts {
        job.status = JobStatus::Queued;
        job.next_retry_at = Some(now + NativeJob::backoff(job.attempt_count));
    } else {
        job.status = JobStatus::Failed;
        job.dead_letter = true;
    }
    let failed = job.clone();

    events::append(
        state,
        &failed.project_id,
        "project_snapshot",
        json!({"job": failed.id, "status": failed.status, "deadLetter": failed.dead_letter}),
        now,
    );
    Ok(failed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> WorkspacePipelineState {
        WorkspacePipelineState::default()
    }

    #[test]
    fn claim_next_elects_the_oldest_queued_job() {
        let mut state = state();
        let t0 = Utc::now();
        submit(&mut state, "a".into(), "p".into(), "ws".into(), "export".into(), None, None, None, t0);
        submit(&mut state, "b".into(), "p".into(), "ws".into(), "export".into(), None, None, None, t0 + chrono::Duration::seconds(1));

        let claimed = claim_next(&mut state, "worker-1", t0 + chrono::Duration::seconds(2)).unwrap();
        assert_eq!(claimed.id, "a");
    }

    #[test]
    fn fail_retries_with_backoff_then_dead_letters() {
        let mut state = state();
        let t0 = Utc::now();
        submit(&mut state, "job-1".into(), "p".into(), "ws".into(), "export".into(), None, Some(2), Some(5_000), t0);

        claim_next(&mut state, "worker-1", t0).unwrap();
        let failed_once = fail(&mut state, "job-1", "temporary".into(), t0).unwrap();
        assert_eq!(failed_once.status, JobStatus::Queued);
        assert!(!failed_once.dead_letter);
        assert!(failed_once.next_retry_at.unwrap() > t0);

        // Before next_retry_at, claim_next must skip it.
        assert!(claim_next(&mut state, "worker-1", t0).is_none());

        let after_backoff = t0 + chrono::Duration::milliseconds(200);
        claim_next(&mut state, "worker-1", after_backoff).unwrap();
        let failed_twice = fail(&mut state, "job-1", "temporary again".into(), after_backoff).unwrap();
        assert_eq!(failed_twice.status, JobStatus::Failed);
        assert!(failed_twice.dead_letter);
    }

    #[test]
    fn expired_lease_is_reclaimed_preserving_attempt_count() {
        let mut state = state();
        let t0 = Utc::now();
        submit(&mut state, "job-1".into(), "p".into(), "ws".into(), "export".into(), None, None, Some(5_000), t0);
        claim_next(&mut state, "worker-1", t0).unwrap();

        let much_later = t0 + chrono::Duration::seconds(10);
        let reclaimed = reclaim_expired_leases(&mut state, much_later);
        assert_eq!(reclaimed, vec!["job-1".to_string()]);
        assert_eq!(state.jobs["job-1"].status, JobStatus::Queued);
        assert_eq!(state.jobs["job-1"].attempt_count, 1);
    }

    #[test]
    fn complete_stores_result() {
        let mut state = state();
        let t0 = Utc::now();
        submit(&mut state, "job-1".into(), "p".into(), "ws".into(), "export".into(), None, None, None, t0);
        claim_next(&mut state, "worker-1", t0).unwrap();
        let done = complete(&mut state, "job-1", Some(json!({"ok": true})), t0).unwrap();
        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.result.unwrap()["ok"], true);
    }
}
