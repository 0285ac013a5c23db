// SPDX-License-Identifier: MIT OR Apache-2.0
//! Errors raised by the pipeline store, mapped onto the shared
//! `mcpforge-core::ErrorCode` catalog (spec §7).

use mcpforge_core::ErrorCode;

/// Failures raised by [`crate::PipelineStore`] operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PipelineError {
    /// Lock acquisition did not succeed within the configured timeout.
    #[error("lock acquisition timed out")]
    LockTimeout,
    /// The state document's revision changed between read and write.
    #[error("concurrent writer won the revision race")]
    Conflict,
    /// No job exists with the given id.
    #[error("job not found: {0}")]
    JobNotFound(String),
    /// `completeJob`/`failJob` was called on a job that is not `running`.
    #[error("job {0} is not running")]
    JobNotRunning(String),
    /// The persistence backend reported a failure.
    #[error("persistence error: {0}")]
    Io(String),
}

impl PipelineError {
    /// Map to the shared error-code catalog (spec §7).
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::LockTimeout => ErrorCode::PersistentLockTimeout,
            Self::Conflict => ErrorCode::PersistentConflict,
            Self::JobNotFound(_) | Self::JobNotRunning(_) => ErrorCode::InvalidState,
            Self::Io(_) => ErrorCode::IoError,
        }
    }
}
