// SPDX-License-Identifier: MIT OR Apache-2.0
//! Session and SSE-connection types (spec §3, §4.8).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A named MCP session. `protocolVersion` is fixed on `initialize` and
/// subsequent messages must match it (spec §4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// 128-bit random hex id.
    pub id: String,
    /// Negotiated protocol version, or `None` before `initialize`.
    pub protocol_version: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last-activity timestamp, updated by `touch`.
    pub last_seen_at: DateTime<Utc>,
    /// Open SSE connection ids. Bounded at 3 (spec §4.8).
    pub sse_connections: BTreeSet<String>,
}

/// Maximum simultaneous SSE connections per session.
pub const MAX_SSE_CONNECTIONS: usize = 3;

impl Session {
    /// Construct a freshly created session with no connections yet.
    #[must_use]
    pub fn new(id: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            protocol_version: None,
            created_at: now,
            last_seen_at: now,
            sse_connections: BTreeSet::new(),
        }
    }

    /// `true` if `now - last_seen_at >= ttl`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        now - self.last_seen_at >= ttl
    }
}

/// A polymorphic handle over a single SSE stream (spec §3, §9).
///
/// The keep-alive timer is owned by the transport, not by the connection
/// object — this trait only exposes the three operations a session needs to
/// fan out to every open stream.
pub trait SseConnection: Send + Sync {
    /// Push `payload` (a pre-formatted SSE frame body) to the client.
    fn send(&self, payload: &str);
    /// Close the underlying stream.
    fn close(&self);
    /// `true` once the stream has been closed (by either side).
    fn is_closed(&self) -> bool;
}
