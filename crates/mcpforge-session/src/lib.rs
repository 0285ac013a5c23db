// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
//! mcpforge-session
//!
//! MCP session lifecycle (spec §4.8): creation (implicit or via
//! `initialize`), protocol-version negotiation, bounded SSE fan-out (three
//! connections per session), idle-TTL expiry via a periodic prune sweep.

mod prune;
mod store;

pub use prune::SessionPruner;
pub use store::{SessionError, SessionStore, SUPPORTED_PROTOCOL_VERSIONS};
