// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
//! Tool registry (spec §4.4).
//!
//! A fixed, immutable-at-startup table of [`ToolDefinition`]s split into
//! high-level (project/preview/export/validate) and low-level
//! (add_bone/add_cube/...) groups, each paired with the policy metadata
//! the dispatcher (spec §4.6) needs to classify and decorate a call
//! without re-deriving it from the tool name at call time.

use mcpforge_core::ToolDefinition;
use serde_json::json;

/// How the dispatcher should classify a tool call (spec §4.6 step 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolClass {
    /// Never mutates project state; no revision guard, no retry.
    ReadOnly,
    /// Mutates state; may require a revision guard, never auto-retried.
    Stateful,
    /// Mutates state, requires a revision guard, and is eligible for the
    /// auto-retry-on-mismatch policy (spec §4.6.1).
    StatefulWithRetry,
}

/// Which response-decoration family a tool belongs to (spec §4.6.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecorationFamily {
    /// No special decoration beyond standard state attachment.
    None,
    /// Convert result frames to MCP `image` content blocks.
    RenderPreview,
    /// Same image-block treatment, for a single texture read.
    ReadTexture,
    /// Append heuristic next-action hints.
    NextActionHint,
    /// `ensure_project`'s three-step dialog-injection hint sequence.
    EnsureProjectDialog,
}

/// Per-tool dispatcher policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolPolicy {
    /// Read-only / stateful / stateful-with-retry classification.
    pub class: ToolClass,
    /// `true` if a stateful call without `ifRevision` must fail
    /// `invalid_state_revision_missing`.
    pub requires_revision: bool,
    /// Response decoration family.
    pub decoration: DecorationFamily,
    /// `true` if `includeState`/`includeDiff` default to `true` when the
    /// payload omits them (policy default, spec §4.6 step 7).
    pub attach_state_by_default: bool,
}

impl ToolPolicy {
    const fn read_only() -> Self {
        Self {
            class: ToolClass::ReadOnly,
            requires_revision: false,
            decoration: DecorationFamily::None,
            attach_state_by_default: false,
        }
    }

    const fn stateful(requires_revision: bool) -> Self {
        Self {
            class: ToolClass::Stateful,
            requires_revision,
            decoration: DecorationFamily::None,
            attach_state_by_default: true,
        }
    }

    const fn stateful_with_retry() -> Self {
        Self {
            class: ToolClass::StatefulWithRetry,
            requires_revision: true,
            decoration: DecorationFamily::None,
            attach_state_by_default: true,
        }
    }

    const fn with_decoration(mut self, decoration: DecorationFamily) -> Self {
        self.decoration = decoration;
        self
    }
}

/// A tool definition paired with its dispatcher policy.
#[derive(Debug, Clone)]
pub struct RegisteredTool {
    /// The wire-visible definition (name/title/description/inputSchema).
    pub definition: ToolDefinition,
    /// Dispatcher classification and decoration policy.
    pub policy: ToolPolicy,
}

/// The immutable-at-startup tool table.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    hash: String,
}

impl ToolRegistry {
    /// Build the fixed registry. There is exactly one registry shape per
    /// build of this crate; it does not vary at runtime.
    #[must_use]
    pub fn build() -> Self {
        let tools = high_level_tools()
            .into_iter()
            .chain(low_level_tools())
            .collect::<Vec<_>>();
        let hash = compute_hash(&tools);
        Self { tools, hash }
    }

    /// Look up a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.tools.iter().find(|t| t.definition.name == name)
    }

    /// All registered tools, in declaration order.
    #[must_use]
    pub fn all(&self) -> &[RegisteredTool] {
        &self.tools
    }

    /// Number of registered tools.
    #[must_use]
    pub fn count(&self) -> usize {
        self.tools.len()
    }

    /// Hex SHA-256 over the canonical `[{name, inputSchema}, …]` array, in
    /// declaration order (spec §4.4). Exposed through capabilities for
    /// agent-side caching.
    #[must_use]
    pub fn hash(&self) -> &str {
        &self.hash
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::build()
    }
}

fn compute_hash(tools: &[RegisteredTool]) -> String {
    #[derive(serde::Serialize)]
    struct HashEntry<'a> {
        name: &'a str,
        input_schema: &'a serde_json::Value,
    }
    let entries: Vec<HashEntry> = tools
        .iter()
        .map(|t| HashEntry {
            name: &t.definition.name,
            input_schema: &t.definition.input_schema,
        })
        .collect();
    mcpforge_core::sha256_hex(&entries).expect("registry entries always serialize")
}

fn tool(name: &str, title: &str, input_schema: serde_json::Value, policy: ToolPolicy) -> RegisteredTool {
    RegisteredTool {
        definition: ToolDefinition {
            name: name.to_string(),
            title: title.to_string(),
            description: None,
            input_schema,
        },
        policy,
    }
}

fn high_level_tools() -> Vec<RegisteredTool> {
    vec![
        tool(
            "get_project_state",
            "Get project state",
            json!({
                "type": "object",
                "properties": {"detail": {"type": "string", "enum": ["summary", "full"]}},
                "additionalProperties": false
            }),
            ToolPolicy::read_only(),
        ),
        tool(
            "ensure_project",
            "Ensure project exists",
            json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string"},
                    "formatId": {"type": "string"}
                },
                "required": ["name", "formatId"],
                "additionalProperties": false
            }),
            ToolPolicy::stateful(false).with_decoration(DecorationFamily::EnsureProjectDialog),
        ),
        tool(
            "render_preview",
            "Render a preview image",
            json!({
                "type": "object",
                "properties": {"width": {"type": "number"}, "height": {"type": "number"}},
                "additionalProperties": false
            }),
            ToolPolicy::read_only().with_decoration(DecorationFamily::RenderPreview),
        ),
        tool(
            "read_texture",
            "Read a texture's pixels",
            json!({
                "type": "object",
                "properties": {"textureId": {"type": "string"}},
                "required": ["textureId"],
                "additionalProperties": false
            }),
            ToolPolicy::read_only().with_decoration(DecorationFamily::ReadTexture),
        ),
        tool(
            "preflight_texture",
            "Check a texture before binding it",
            json!({
                "type": "object",
                "properties": {"width": {"type": "number"}, "height": {"type": "number"}},
                "required": ["width", "height"],
                "additionalProperties": false
            }),
            ToolPolicy::read_only().with_decoration(DecorationFamily::NextActionHint),
        ),
        tool(
            "export_project",
            "Export the project",
            json!({
                "type": "object",
                "properties": {
                    "format": {"type": "string"},
                    "codecId": {"type": "string"},
                    "policy": {"type": "string", "enum": ["strict", "best_effort"]}
                },
                "required": ["format"],
                "additionalProperties": false
            }),
            ToolPolicy::read_only(),
        ),
        tool(
            "validate_project",
            "Validate the project's invariants",
            json!({"type": "object", "additionalProperties": false}),
            ToolPolicy::read_only(),
        ),
    ]
}

fn low_level_tools() -> Vec<RegisteredTool> {
    vec![
        tool(
            "add_bone",
            "Add a bone",
            json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string"},
                    "parent": {"type": "string"},
                    "ifRevision": {"type": "string"}
                },
                "required": ["name"],
                "additionalProperties": false
            }),
            ToolPolicy::stateful_with_retry(),
        ),
        tool(
            "update_bone",
            "Update a bone",
            json!({
                "type": "object",
                "properties": {
                    "id": {"type": "string"},
                    "parent": {"type": "string"},
                    "ifRevision": {"type": "string"}
                },
                "required": ["id"],
                "additionalProperties": false
            }),
            ToolPolicy::stateful_with_retry(),
        ),
        tool(
            "remove_bone",
            "Remove a bone",
            json!({
                "type": "object",
                "properties": {"id": {"type": "string"}, "ifRevision": {"type": "string"}},
                "required": ["id"],
                "additionalProperties": false
            }),
            ToolPolicy::stateful_with_retry(),
        ),
        tool(
            "add_cube",
            "Add a cube",
            json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string"},
                    "boneId": {"type": "string"},
                    "origin": {"type": "array", "minItems": 3, "maxItems": 3},
                    "size": {"type": "array", "minItems": 3, "maxItems": 3},
                    "ifRevision": {"type": "string"}
                },
                "required": ["name"],
                "additionalProperties": false
            }),
            ToolPolicy::stateful_with_retry(),
        ),
        tool(
            "update_cube",
            "Update a cube",
            json!({
                "type": "object",
                "properties": {
                    "id": {"type": "string"},
                    "name": {"type": "string"},
                    "ifRevision": {"type": "string"}
                },
                "required": ["id"],
                "additionalProperties": false
            }),
            ToolPolicy::stateful_with_retry(),
        ),
        tool(
            "remove_cube",
            "Remove a cube",
            json!({
                "type": "object",
                "properties": {"id": {"type": "string"}, "ifRevision": {"type": "string"}},
                "required": ["id"],
                "additionalProperties": false
            }),
            ToolPolicy::stateful_with_retry(),
        ),
        tool(
            "add_mesh",
            "Add a mesh",
            json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string"},
                    "boneId": {"type": "string"},
                    "ifRevision": {"type": "string"}
                },
                "required": ["name"],
                "additionalProperties": false
            }),
            ToolPolicy::stateful_with_retry(),
        ),
        tool(
            "add_texture",
            "Add a texture",
            json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string"},
                    "width": {"type": "number"},
                    "height": {"type": "number"},
                    "ifRevision": {"type": "string"}
                },
                "required": ["name", "width", "height"],
                "additionalProperties": false
            }),
            ToolPolicy::stateful_with_retry(),
        ),
        tool(
            "assign_texture",
            "Assign a texture to a cube face",
            json!({
                "type": "object",
                "properties": {
                    "cubeId": {"type": "string"},
                    "face": {"type": "string", "enum": ["north", "east", "south", "west", "up", "down"]},
                    "textureId": {"type": "string"},
                    "ifRevision": {"type": "string"}
                },
                "required": ["cubeId", "face", "textureId"],
                "additionalProperties": false
            }),
            ToolPolicy::stateful_with_retry(),
        ),
        tool(
            "set_face_uv",
            "Set a cube face's UV rectangle",
            json!({
                "type": "object",
                "properties": {
                    "cubeId": {"type": "string"},
                    "face": {"type": "string", "enum": ["north", "east", "south", "west", "up", "down"]},
                    "uv": {"type": "array", "minItems": 4, "maxItems": 4},
                    "ifRevision": {"type": "string"}
                },
                "required": ["cubeId", "face", "uv"],
                "additionalProperties": false
            }),
            ToolPolicy::stateful_with_retry().with_decoration(DecorationFamily::NextActionHint),
        ),
        tool(
            "paint_faces",
            "Paint pixels onto one or more cube faces",
            json!({
                "type": "object",
                "properties": {
                    "cubeId": {"type": "string"},
                    "faces": {"type": "array", "items": {"type": "string"}},
                    "ifRevision": {"type": "string"}
                },
                "required": ["cubeId", "faces"],
                "additionalProperties": false
            }),
            ToolPolicy::stateful_with_retry(),
        ),
        tool(
            "add_animation",
            "Add an animation clip",
            json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string"},
                    "length": {"type": "number"},
                    "ifRevision": {"type": "string"}
                },
                "required": ["name", "length"],
                "additionalProperties": false
            }),
            ToolPolicy::stateful_with_retry(),
        ),
        tool(
            "set_animation_keyframe",
            "Set a keyframe on an animation channel",
            json!({
                "type": "object",
                "properties": {
                    "animationId": {"type": "string"},
                    "boneId": {"type": "string"},
                    "time": {"type": "number"},
                    "value": {"type": "array", "minItems": 3, "maxItems": 3},
                    "ifRevision": {"type": "string"}
                },
                "required": ["animationId", "boneId", "time", "value"],
                "additionalProperties": false
            }),
            ToolPolicy::stateful_with_retry(),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_hash_is_deterministic_across_builds() {
        let a = ToolRegistry::build();
        let b = ToolRegistry::build();
        assert_eq!(a.hash(), b.hash());
    }

    #[test]
    fn every_tool_is_findable_by_name() {
        let registry = ToolRegistry::build();
        for t in registry.all() {
            assert!(registry.get(&t.definition.name).is_some());
        }
    }

    #[test]
    fn unknown_tool_is_absent() {
        let registry = ToolRegistry::build();
        assert!(registry.get("does_not_exist").is_none());
    }

    #[test]
    fn stateful_with_retry_tools_require_revision() {
        let registry = ToolRegistry::build();
        let add_cube = registry.get("add_cube").unwrap();
        assert_eq!(add_cube.policy.class, ToolClass::StatefulWithRetry);
        assert!(add_cube.policy.requires_revision);
    }

    #[test]
    fn read_only_tools_never_require_revision() {
        let registry = ToolRegistry::build();
        for t in registry.all() {
            if t.policy.class == ToolClass::ReadOnly {
                assert!(!t.policy.requires_revision, "{} should not require a revision", t.definition.name);
            }
        }
    }
}
