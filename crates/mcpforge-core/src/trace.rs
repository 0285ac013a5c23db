// SPDX-License-Identifier: MIT OR Apache-2.0
//! Trace record shape (spec §3, §6 "Trace log format (NDJSON)").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Discriminator for [`TraceRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceRecordKind {
    /// Emitted once at recorder start.
    Header,
    /// Emitted for each tool call.
    Step,
}

/// One line of the NDJSON trace log.
///
/// `Header` records only populate `schema_version`/`plugin_version`/
/// `blockbench_version`/`started_at`; `Step` records populate the
/// remaining fields. Kept as a single flattened struct (rather than an
/// enum) so the NDJSON encoder can serialize every record the same way,
/// matching the wire shape in spec §6.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceRecord {
    /// `header` or `step`.
    pub kind: TraceRecordKind,
    /// Monotonically increasing sequence number within a recorder instance.
    pub seq: u64,
    /// Record timestamp.
    pub ts: DateTime<Utc>,
    /// Schema version, header records only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<u32>,
    /// Plugin/build version, header records only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_version: Option<String>,
    /// Host authoring-tool version, header records only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authoring_tool_version: Option<String>,
    /// Fixed `"tool"` for step records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    /// Tool name, step records only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op: Option<String>,
    /// Tool call payload, step records only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    /// Tool call response, step records only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    /// Attached project state, when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<Value>,
    /// Attached diff-since-last-revision, when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<Value>,
    /// Optional usage/cost accounting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Value>,
}
