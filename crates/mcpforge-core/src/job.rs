// SPDX-License-Identifier: MIT OR Apache-2.0
//! Native background job model (spec §3, §4.10.1).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle state of a [`NativeJob`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting to be claimed.
    Queued,
    /// Claimed by a worker, lease outstanding.
    Running,
    /// Finished successfully.
    Completed,
    /// Finished unsuccessfully (terminally, if `dead_letter`).
    Failed,
}

/// Default minimum lease duration in milliseconds (spec §3: "leaseMs (min 5,000)").
pub const MIN_LEASE_MS: u64 = 5_000;
/// Inclusive bounds on `max_attempts` (spec §3: "maxAttempts (1..10)").
pub const MAX_ATTEMPTS_RANGE: std::ops::RangeInclusive<u32> = 1..=10;

/// A queued unit of native (non-adapter) work: export rendering, batch
/// texture bakes, and similar CPU-bound jobs the dispatcher hands off to a
/// worker pool instead of running inline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NativeJob {
    /// Unique job id.
    pub id: String,
    /// Owning project.
    pub project_id: String,
    /// Owning workspace.
    pub workspace_id: String,
    /// Job kind, e.g. `"export"`, `"render_preview"`.
    pub kind: String,
    /// Time the job was submitted. Breaks ties between same-priority
    /// queued jobs so `claimNextJob` elects the oldest one.
    pub queued_at: DateTime<Utc>,
    /// Job-kind-specific payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    /// Current lifecycle state.
    pub status: JobStatus,
    /// Number of claim attempts so far.
    pub attempt_count: u32,
    /// Maximum attempts before dead-lettering, clamped to `1..=10`.
    pub max_attempts: u32,
    /// Lease duration in milliseconds, clamped to `>= 5000`.
    pub lease_ms: u64,
    /// Wall-clock time the current lease expires, if running.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lease_expires_at: Option<DateTime<Utc>>,
    /// Worker holding the current lease, if running.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_id: Option<String>,
    /// Earliest time the job may be reclaimed after a failure (backoff).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_retry_at: Option<DateTime<Utc>>,
    /// Last failure message, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Success result payload, once completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// `true` once the job has exhausted its retries.
    #[serde(default)]
    pub dead_letter: bool,
}

impl NativeJob {
    /// Clamp a requested `max_attempts` into `1..=10`.
    #[must_use]
    pub fn clamp_max_attempts(requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(3)
            .clamp(*MAX_ATTEMPTS_RANGE.start(), *MAX_ATTEMPTS_RANGE.end())
    }

    /// Clamp a requested `lease_ms` to at least [`MIN_LEASE_MS`].
    #[must_use]
    pub fn clamp_lease_ms(requested: Option<u64>) -> u64 {
        requested.unwrap_or(MIN_LEASE_MS).max(MIN_LEASE_MS)
    }

    /// Exponential backoff with a 30s ceiling (spec §4.10.1):
    /// `min(30s, 2^(n-1) * 100ms)`.
    #[must_use]
    pub fn backoff(attempt_count: u32) -> chrono::Duration {
        let n = attempt_count.max(1) - 1;
        let millis = 100u64.saturating_mul(1u64.checked_shl(n).unwrap_or(u64::MAX));
        chrono::Duration::milliseconds(millis.min(30_000) as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_until_ceiling() {
        assert_eq!(NativeJob::backoff(1).num_milliseconds(), 100);
        assert_eq!(NativeJob::backoff(2).num_milliseconds(), 200);
        assert_eq!(NativeJob::backoff(3).num_milliseconds(), 400);
        assert_eq!(NativeJob::backoff(20).num_milliseconds(), 30_000);
    }

    #[test]
    fn max_attempts_clamped() {
        assert_eq!(NativeJob::clamp_max_attempts(Some(0)), 1);
        assert_eq!(NativeJob::clamp_max_attempts(Some(50)), 10);
        assert_eq!(NativeJob::clamp_max_attempts(Some(5)), 5);
    }

    #[test]
    fn lease_clamped_to_minimum() {
        assert_eq!(NativeJob::clamp_lease_ms(Some(100)), MIN_LEASE_MS);
        assert_eq!(NativeJob::clamp_lease_ms(Some(9_000)), 9_000);
    }
}
