// SPDX-License-Identifier: MIT OR Apache-2.0
//! Session lifecycle, protocol negotiation, and bounded SSE fan-out
//! (spec §4.8).

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use mcpforge_core::session::{Session, SseConnection, MAX_SSE_CONNECTIONS};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Preferred-order protocol versions this gateway negotiates (spec §4.8).
/// `initialize` fixes a session's `protocolVersion` to the first of these
/// also offered by the client.
pub const SUPPORTED_PROTOCOL_VERSIONS: [&str; 3] = ["2025-11-25", "2025-06-18", "2024-11-05"];

/// Failures raised by [`SessionStore`] operations, each mapping to a
/// reserved MCP error token (spec §4.8, §6).
#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    /// No session exists with the given id (or it has since been pruned).
    #[error("session not found")]
    NotFound,
    /// None of the client's offered protocol versions are supported.
    #[error("no shared protocol version")]
    NoSharedProtocolVersion,
    /// A message's `Mcp-Protocol-Version` does not match the session's
    /// negotiated version (`MCP_PROTOCOL_VERSION_MISMATCH`).
    #[error("protocol version mismatch: negotiated {negotiated}, got {got}")]
    ProtocolVersionMismatch {
        /// The session's negotiated version.
        negotiated: String,
        /// The version the request actually carried.
        got: String,
    },
    /// A fourth SSE connection was attempted on a session already at the
    /// cap (`MCP_TOO_MANY_SSE`).
    #[error("too many SSE connections for this session")]
    TooManySse,
}

struct Entry {
    session: Session,
    handles: BTreeMap<String, Arc<dyn SseConnection>>,
}

/// In-memory session store. One instance is shared (behind an `Arc`)
/// across every connection the router serves.
pub struct SessionStore {
    entries: RwLock<HashMap<String, Entry>>,
    ttl: ChronoDuration,
}

impl SessionStore {
    /// Build a store with the given idle TTL.
    #[must_use]
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl: ChronoDuration::seconds(ttl_secs),
        }
    }

    /// Create a session, minting a fresh 128-bit random hex id if `id` is
    /// `None` (the implicit-session-creation path, spec §4.8).
    pub async fn create(&self, id: Option<String>, now: DateTime<Utc>) -> Session {
        let id = id.unwrap_or_else(new_session_id);
        let session = Session::new(id.clone(), now);
        self.entries.write().await.insert(
            id,
            Entry {
                session: session.clone(),
                handles: BTreeMap::new(),
            },
        );
        session
    }

    /// Fetch a session by id, without updating `lastSeenAt`.
    pub async fn get(&self, id: &str) -> Option<Session> {
        self.entries.read().await.get(id).map(|e| e.session.clone())
    }

    /// Update `lastSeenAt` to `now`.
    pub async fn touch(&self, id: &str, now: DateTime<Utc>) -> Result<(), SessionError> {
        let mut entries = self.entries.write().await;
        let entry = entries.get_mut(id).ok_or(SessionError::NotFound)?;
        entry.session.last_seen_at = now;
        Ok(())
    }

    /// Remove a session, closing every open SSE connection it held.
    pub async fn delete(&self, id: &str) -> Option<Session> {
        let entry = self.entries.write().await.remove(id)?;
        for handle in entry.handles.values() {
            handle.close();
        }
        Some(entry.session)
    }

    /// Remove every session whose idle time has reached the configured
    /// TTL, closing their SSE connections. Returns the removed ids.
    pub async fn prune_expired(&self, now: DateTime<Utc>) -> Vec<String> {
        let expired: Vec<String> = {
            let entries = self.entries.read().await;
            entries
                .iter()
                .filter(|(_, e)| e.session.is_expired(now, self.ttl))
                .map(|(id, _)| id.clone())
                .collect()
        };
        for id in &expired {
            self.delete(id).await;
        }
        expired
    }

    /// Fix `id`'s `protocolVersion` to the highest-priority version also
    /// present in `offered`. Idempotent: a session that has already
    /// negotiated returns its existing version unchanged as long as
    /// `offered` still contains it.
    pub async fn negotiate_protocol(&self, id: &str, offered: &[String]) -> Result<String, SessionError> {
        let mut entries = self.entries.write().await;
        let entry = entries.get_mut(id).ok_or(SessionError::NotFound)?;
        if let Some(existing) = &entry.session.protocol_version {
            if offered.iter().any(|v| v == existing) {
                return Ok(existing.clone());
            }
        }
        let negotiated = SUPPORTED_PROTOCOL_VERSIONS
            .iter()
            .find(|preferred| offered.iter().any(|o| o == *preferred))
            .ok_or(SessionError::NoSharedProtocolVersion)?;
        entry.session.protocol_version = Some((*negotiated).to_string());
        Ok((*negotiated).to_string())
    }

    /// Verify a request's `Mcp-Protocol-Version` header against `id`'s
    /// negotiated version.
    pub async fn check_protocol_version(&self, id: &str, got: &str) -> Result<(), SessionError> {
        let entries = self.entries.read().await;
        let entry = entries.get(id).ok_or(SessionError::NotFound)?;
        match &entry.session.protocol_version {
            Some(negotiated) if negotiated == got => Ok(()),
            Some(negotiated) => Err(SessionError::ProtocolVersionMismatch {
                negotiated: negotiated.clone(),
                got: got.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Register a new SSE connection on `id`, rejecting a fourth with
    /// [`SessionError::TooManySse`] and leaving the existing three
    /// untouched. Returns the new connection's id.
    pub async fn open_sse(&self, id: &str, handle: Arc<dyn SseConnection>) -> Result<String, SessionError> {
        let mut entries = self.entries.write().await;
        let entry = entries.get_mut(id).ok_or(SessionError::NotFound)?;
        if entry.handles.len() >= MAX_SSE_CONNECTIONS {
            return Err(SessionError::TooManySse);
        }
        let conn_id = Uuid::new_v4().simple().to_string();
        entry.session.sse_connections.insert(conn_id.clone());
        entry.handles.insert(conn_id.clone(), handle);
        Ok(conn_id)
    }

    /// Close and forget one SSE connection.
    pub async fn close_sse(&self, id: &str, conn_id: &str) {
        if let Some(entry) = self.entries.write().await.get_mut(id) {
            if let Some(handle) = entry.handles.remove(conn_id) {
                handle.close();
            }
            entry.session.sse_connections.remove(conn_id);
        }
    }

    /// Close every open SSE connection across every session, without
    /// removing the sessions themselves (spec §5: `shutdown` "closes all
    /// SSE connections").
    pub async fn close_all_sse(&self) {
        let mut entries = self.entries.write().await;
        for entry in entries.values_mut() {
            for handle in entry.handles.values() {
                handle.close();
            }
            entry.handles.clear();
            entry.session.sse_connections.clear();
        }
    }

    /// Number of currently tracked sessions.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// `true` if no sessions are tracked.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

fn new_session_id() -> String {
    Uuid::new_v4().simple().to_string()
}
