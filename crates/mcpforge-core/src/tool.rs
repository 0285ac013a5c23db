// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tool definitions (spec §3, `ToolDefinition`).

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A named operation with a JSON-schema input and a structured result.
///
/// The registry is immutable at startup (spec §4.4); `input_schema` is a
/// `serde_json::Value` tree understood by `mcpforge-schema`'s validator
/// rather than a full JSON-Schema document, since only the subset in spec
/// §4.3 is supported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ToolDefinition {
    /// Unique tool name, e.g. `"add_cube"`.
    pub name: String,
    /// Human-facing title.
    pub title: String,
    /// Optional longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Input schema, validated by `mcpforge-schema`.
    pub input_schema: Value,
}
