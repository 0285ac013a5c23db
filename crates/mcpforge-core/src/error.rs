// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tool-envelope error catalog.
//!
//! Every tool call ends in a [`ToolResponse`]. On failure, [`ToolError`]
//! carries a stable [`ErrorCode`] plus a `details` map whose `reason` key is
//! always populated (defaulted to the code itself when the raiser omits
//! it) — see spec §7.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Stable error codes used across the tool envelope and JSON-RPC layer.
///
/// `persistent_conflict` and `persistent_lock_timeout` are raised only by
/// the pipeline store (§4.10) and are never returned directly from a tool
/// call; the dispatcher's auto-retry (§4.6.1) does not cover them (see
/// DESIGN.md, Open Question resolution).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Payload failed schema validation.
    InvalidPayload,
    /// The tool name is not present in the registry.
    UnknownTool,
    /// The service rejected a mutation for a reason other than revision.
    InvalidState,
    /// A stateful-with-retry tool call required `ifRevision` and it was absent.
    InvalidStateRevisionMissing,
    /// `ifRevision` did not match the current revision.
    InvalidStateRevisionMismatch,
    /// The requested export/codec combination is not supported.
    UnsupportedFormat,
    /// The adapter acknowledges the request but cannot fulfill it yet.
    NotImplemented,
    /// An adapter I/O operation failed.
    IoError,
    /// The mutation was a no-op; no new revision was produced.
    NoChange,
    /// The pipeline store detected a concurrent writer (revision CAS lost).
    PersistentConflict,
    /// Lock acquisition did not succeed within the configured timeout.
    PersistentLockTimeout,
    /// Catch-all for conditions not otherwise classified.
    Unknown,
}

impl ErrorCode {
    /// The wire token for this code, identical to its `serde` rename.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidPayload => "invalid_payload",
            Self::UnknownTool => "unknown_tool",
            Self::InvalidState => "invalid_state",
            Self::InvalidStateRevisionMissing => "invalid_state_revision_missing",
            Self::InvalidStateRevisionMismatch => "invalid_state_revision_mismatch",
            Self::UnsupportedFormat => "unsupported_format",
            Self::NotImplemented => "not_implemented",
            Self::IoError => "io_error",
            Self::NoChange => "no_change",
            Self::PersistentConflict => "persistent_conflict",
            Self::PersistentLockTimeout => "persistent_lock_timeout",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed tool call: stable code, human message, and a `details` bag that
/// always contains a non-empty `reason`.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ToolError {
    /// Stable machine-readable code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// Structured details. Always has a `reason` key after [`ToolError::new`].
    pub details: BTreeMap<String, Value>,
}

impl ToolError {
    /// Construct an error, defaulting `details.reason` to `code` if absent.
    pub fn new(code: ErrorCode, message: impl Into<String>, mut details: BTreeMap<String, Value>) -> Self {
        details
            .entry("reason".to_string())
            .or_insert_with(|| Value::String(code.as_str().to_string()));
        Self {
            code,
            message: message.into(),
            details,
        }
    }

    /// Construct an error with no extra details beyond the defaulted reason.
    pub fn simple(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(code, message, BTreeMap::new())
    }

    /// Revision mismatch helper: populates `expected`/`current` in details.
    pub fn revision_mismatch(expected: &str, current: &str) -> Self {
        let mut details = BTreeMap::new();
        details.insert("expected".to_string(), Value::String(expected.to_string()));
        details.insert("current".to_string(), Value::String(current.to_string()));
        Self::new(
            ErrorCode::InvalidStateRevisionMismatch,
            "ifRevision does not match the current revision",
            details,
        )
    }
}

/// The tool envelope's result type (spec §6, "Tool envelope").
///
/// `Ok` carries `data` plus optional MCP content/structured-content/
/// next-action decoration; `Err` carries a [`ToolError`] with the same
/// optional decoration fields. Serialization matches the wire shape:
/// `{ok, data, content?, structuredContent?, nextActions?}` or
/// `{ok, error, content?, structuredContent?, nextActions?}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolResponse<T> {
    /// Successful call.
    Ok {
        /// `ok: true` marker, always serialized.
        ok: True,
        /// Use-case result payload.
        data: T,
        /// MCP content blocks attached by response decoration.
        #[serde(skip_serializing_if = "Option::is_none")]
        content: Option<Vec<Value>>,
        /// Structured-content mirror of `data`/decoration output.
        #[serde(rename = "structuredContent", skip_serializing_if = "Option::is_none")]
        structured_content: Option<Value>,
        /// Heuristic next-action hints (§4.6.2).
        #[serde(rename = "nextActions", skip_serializing_if = "Option::is_none")]
        next_actions: Option<Vec<Value>>,
    },
    /// Failed call.
    Err {
        /// `ok: false` marker, always serialized.
        ok: False,
        /// The error that occurred.
        error: ToolError,
        /// MCP content blocks attached by response decoration.
        #[serde(skip_serializing_if = "Option::is_none")]
        content: Option<Vec<Value>>,
        /// Structured-content mirror of the error.
        #[serde(rename = "structuredContent", skip_serializing_if = "Option::is_none")]
        structured_content: Option<Value>,
        /// Heuristic next-action hints (§4.6.2).
        #[serde(rename = "nextActions", skip_serializing_if = "Option::is_none")]
        next_actions: Option<Vec<Value>>,
    },
}

impl<T> ToolResponse<T> {
    /// Build a plain success response with no decoration.
    pub fn ok(data: T) -> Self {
        Self::Ok {
            ok: True,
            data,
            content: None,
            structured_content: None,
            next_actions: None,
        }
    }

    /// Build a plain failure response with no decoration.
    pub fn err(error: ToolError) -> Self {
        Self::Err {
            ok: False,
            error,
            content: None,
            structured_content: None,
            next_actions: None,
        }
    }

    /// `true` for `Ok` responses. The `ok` field is the single source of
    /// truth for call outcome; HTTP/transport status never overrides it
    /// (spec §9, Open Question resolution).
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }
}

/// Zero-sized marker that always serializes as JSON `true`.
#[derive(Debug, Clone, Copy, Default)]
pub struct True;
/// Zero-sized marker that always serializes as JSON `false`.
#[derive(Debug, Clone, Copy, Default)]
pub struct False;

impl Serialize for True {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_bool(true)
    }
}
impl<'de> Deserialize<'de> for True {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let b = bool::deserialize(d)?;
        if b {
            Ok(True)
        } else {
            Err(serde::de::Error::custom("expected `true`"))
        }
    }
}
impl Serialize for False {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_bool(false)
    }
}
impl<'de> Deserialize<'de> for False {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let b = bool::deserialize(d)?;
        if b {
            Err(serde::de::Error::custom("expected `false`"))
        } else {
            Ok(False)
        }
    }
}
