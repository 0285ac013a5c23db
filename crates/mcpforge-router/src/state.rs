// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shared router state (spec §4.9), the `AppState` equivalent of the
//! teacher's `abp-daemon::AppState`.

use async_trait::async_trait;
use mcpforge_dispatcher::Dispatcher;
use mcpforge_session::SessionStore;
use std::sync::Arc;

/// A hook the `shutdown` RPC calls to flush whatever trace-log writer the
/// binary wired up, without this crate needing to know its concrete type
/// (file, NDJSON socket, test buffer).
#[async_trait]
pub trait TraceFlushHandle: Send + Sync {
    /// Flush pending trace records immediately.
    async fn flush(&self);
}

/// Everything a request handler needs: the fixed tool dispatcher for the
/// one active project, the session store, and an optional shutdown hook
/// for the trace log.
#[derive(Clone)]
pub struct AppState {
    /// Runs the tool-dispatch pipeline (spec §4.6) for the one project
    /// this gateway instance serves.
    pub dispatcher: Arc<Dispatcher>,
    /// Session lifecycle, protocol negotiation, SSE fan-out (spec §4.8).
    pub sessions: Arc<SessionStore>,
    /// Flushed by the `shutdown` RPC, if the binary wired one up.
    pub trace_flush: Option<Arc<dyn TraceFlushHandle>>,
    /// MCP server name/version surfaced in `initialize`'s result.
    pub server_name: String,
    /// MCP server version surfaced in `initialize`'s result.
    pub server_version: String,
}

impl AppState {
    /// Build router state around a dispatcher and session store.
    #[must_use]
    pub fn new(dispatcher: Arc<Dispatcher>, sessions: Arc<SessionStore>) -> Self {
        Self {
            dispatcher,
            sessions,
            trace_flush: None,
            server_name: "mcpforge".to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Attach a trace-flush hook for the `shutdown` RPC.
    #[must_use]
    pub fn with_trace_flush(mut self, hook: Arc<dyn TraceFlushHandle>) -> Self {
        self.trace_flush = Some(hook);
        self
    }
}
