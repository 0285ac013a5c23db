// SPDX-License-Identifier: MIT OR Apache-2.0
//! Cross-process advisory lock on a workspace's pipeline state (spec §4.10).
//!
//! Built against the `Persistence` port's `save_if_revision` CAS primitive
//! rather than a dedicated lock backend: the lock document is just another
//! `PersistedRecord`, and winning the write race *is* winning the lock.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use mcpforge_core::pipeline::{Lock, PersistedRecord, Scope};
use mcpforge_core::ports::Persistence;
use mcpforge_core::ErrorCode;
use std::time::Duration;

/// Default lock TTL (spec §4.10: "TTL (default 2 s)").
#[must_use]
pub fn default_lock_ttl() -> ChronoDuration {
    ChronoDuration::seconds(2)
}
/// Retry cadence while waiting for a contended lock.
pub const RETRY_INTERVAL: Duration = Duration::from_millis(30);
/// Overall deadline for a single `acquire` call.
pub const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

fn lock_scope(tenant_id: &str, workspace_id: &str) -> Scope {
    Scope { tenant_id: tenant_id.to_string(), project_id: format!("pipeline-lock-v3:{workspace_id}") }
}

/// Attempt to win the workspace lock, retrying every [`RETRY_INTERVAL`] for
/// up to [`ACQUIRE_TIMEOUT`]. Returns the winning [`Lock`] record's revision
/// so the caller can release it later with the same CAS guarantee.
pub async fn acquire(
    persistence: &dyn Persistence,
    tenant_id: &str,
    workspace_id: &str,
    owner: &str,
    ttl: ChronoDuration,
) -> Result<String, ErrorCode> {
    let scope = lock_scope(tenant_id, workspace_id);
    let deadline = tokio::time::Instant::now() + ACQUIRE_TIMEOUT;

    loop {
        let now = Utc::now();
        let existing = persistence.read(&scope).await.map_err(|_| ErrorCode::IoError)?;

        let (expected, live_owner) = match &existing {
            Some(record) => {
                let lock: Option<Lock> = serde_json::from_value(record.state.clone()).ok();
                match lock {
                    Some(lock) if !lock.is_expired(now) && lock.owner_agent_id != owner => {
                        (Some(record.revision.clone()), true)
                    }
                    _ => (Some(record.revision.clone()), false),
                }
            }
            None => (None, false),
        };

        if !live_owner {
            let lock = Lock {
                owner_agent_id: owner.to_string(),
                owner_session_id: None,
                acquired_at: now,
                expires_at: now + ttl,
            };
            let record = PersistedRecord {
                scope: scope.clone(),
                revision: mcpforge_core::sha256_hex(&lock).map_err(|_| ErrorCode::IoError)?,
                state: serde_json::to_value(&lock).map_err(|_| ErrorCode::IoError)?,
                created_at: now,
                updated_at: now,
            };
            let won = persistence
                .save_if_revision(record.clone(), expected.as_deref())
                .await
                .map_err(|_| ErrorCode::IoError)?;
            if won {
                return Ok(record.revision);
            }
        }

        if tokio::time::Instant::now() >= deadline {
            return Err(ErrorCode::PersistentLockTimeout);
        }
        tokio::time::sleep(RETRY_INTERVAL).await;
    }
}

/// Release a held lock by writing an expired marker, CAS-guarded on the
/// revision returned from [`acquire`] so a lock already stolen by a timed-out
/// caller's successor is left alone.
pub async fn release(
    persistence: &dyn Persistence,
    tenant_id: &str,
    workspace_id: &str,
    held_revision: &str,
) -> Result<(), ErrorCode> {
    let scope = lock_scope(tenant_id, workspace_id);
    let now = Utc::now();
    let released = Lock {
        owner_agent_id: String::new(),
        owner_session_id: None,
        acquired_at: now,
        expires_at: now,
    };
    let record = PersistedRecord {
        scope,
        revision: mcpforge_core::sha256_hex(&released).map_err(|_| ErrorCode::IoError)?,
        state: serde_json::to_value(&released).map_err(|_| ErrorCode::IoError)?,
        created_at: now,
        updated_at: now,
    };
    persistence
        .save_if_revision(record, Some(held_revision))
        .await
        .map_err(|_| ErrorCode::IoError)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryPersistence;

    #[tokio::test]
    async fn second_acquirer_blocks_until_first_releases() {
        let persistence = InMemoryPersistence::new();
        let revision = acquire(&persistence, "tenant", "ws", "agent-a", default_lock_ttl()).await.unwrap();

        let persistence2 = &persistence;
        let contender = tokio::time::timeout(
            Duration::from_millis(200),
            acquire(persistence2, "tenant", "ws", "agent-b", default_lock_ttl()),
        )
        .await;
        assert!(contender.is_err(), "lock should still be held");

        release(&persistence, "tenant", "ws", &revision).await.unwrap();
        let second = acquire(&persistence, "tenant", "ws", "agent-b", default_lock_ttl()).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn expired_lock_is_reclaimed() {
        let persistence = InMemoryPersistence::new();
        acquire(&persistence, "tenant", "ws", "agent-a", ChronoDuration::milliseconds(10)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        let second = acquire(&persistence, "tenant", "ws", "agent-b", default_lock_ttl()).await;
        assert!(second.is_ok());
    }
}
