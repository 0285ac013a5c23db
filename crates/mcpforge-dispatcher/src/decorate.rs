// SPDX-License-Identifier: MIT OR Apache-2.0
//! Response decoration (spec §4.6 step 6, §4.6.2).
//!
//! Each [`DecorationFamily`] augments an already-produced [`ToolResponse`]
//! with MCP `content` blocks and/or `nextActions` hints. None of this
//! mutates `data` — callers that only look at `data` see the same shape
//! whether or not decoration ran.

use mcpforge_registry::DecorationFamily;
use serde_json::{json, Value};

/// The reason code a real adapter raises when `ensure_project` needs the
/// authoring tool's own "new project" dialog confirmed by a human before it
/// can proceed (spec §4.6.2).
const ADAPTER_PROJECT_DIALOG_INPUT_REQUIRED: &str = "adapter_project_dialog_input_required";

/// Apply `family`'s decoration to `response`, given the original wire
/// payload for context.
pub fn decorate(family: DecorationFamily, payload: &Value, response: mcpforge_core::ToolResponse<Value>) -> mcpforge_core::ToolResponse<Value> {
    match family {
        DecorationFamily::None => response,
        DecorationFamily::RenderPreview => decorate_render_preview(response),
        DecorationFamily::ReadTexture => decorate_read_texture(response),
        DecorationFamily::NextActionHint => decorate_next_action_hint(payload, response),
        DecorationFamily::EnsureProjectDialog => decorate_ensure_project_dialog(payload, response),
    }
}

fn image_block(data_uri: &str) -> Value {
    json!({ "type": "image", "data": data_uri, "mimeType": "image/png" })
}

fn decorate_render_preview(response: mcpforge_core::ToolResponse<Value>) -> mcpforge_core::ToolResponse<Value> {
    let mcpforge_core::ToolResponse::Ok { ok, data, structured_content, next_actions, .. } = response else {
        return response;
    };
    let blocks: Vec<Value> = data
        .get("frames")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|frame| frame.get("dataUri").and_then(Value::as_str).map(image_block))
        .collect();
    mcpforge_core::ToolResponse::Ok {
        ok,
        structured_content: structured_content.or_else(|| Some(data.clone())),
        content: if blocks.is_empty() { None } else { Some(blocks) },
        next_actions,
        data,
    }
}

fn decorate_read_texture(response: mcpforge_core::ToolResponse<Value>) -> mcpforge_core::ToolResponse<Value> {
    let mcpforge_core::ToolResponse::Ok { ok, data, structured_content, next_actions, .. } = response else {
        return response;
    };
    let block = data.get("dataUri").and_then(Value::as_str).map(image_block);
    mcpforge_core::ToolResponse::Ok {
        ok,
        structured_content: structured_content.or_else(|| Some(data.clone())),
        content: block.map(|b| vec![b]),
        next_actions,
        data,
    }
}

/// Heuristic next-action hints for `preflight_texture` and `set_face_uv`.
/// Neither hint is required for correctness — both tools already fully
/// report their own result — they only save the caller a round trip of
/// guessing the natural next tool to call.
fn decorate_next_action_hint(payload: &Value, response: mcpforge_core::ToolResponse<Value>) -> mcpforge_core::ToolResponse<Value> {
    match response {
        mcpforge_core::ToolResponse::Ok { ok, data, content, structured_content, .. } => {
            let hints = next_action_hints(payload, &data);
            mcpforge_core::ToolResponse::Ok {
                ok,
                content,
                structured_content,
                next_actions: if hints.is_empty() { None } else { Some(hints) },
                data,
            }
        }
        err => err,
    }
}

fn next_action_hints(payload: &Value, data: &Value) -> Vec<Value> {
    // preflight_texture: {valid, issues}
    if let Some(valid) = data.get("valid").and_then(Value::as_bool) {
        return if valid {
            vec![json!({ "tool": "add_texture", "reason": "dimensions passed preflight" })]
        } else {
            vec![json!({
                "tool": "preflight_texture",
                "reason": "adjust width/height and re-check before calling add_texture",
            })]
        };
    }
    // set_face_uv: {revision}
    if data.get("revision").is_some() && payload.get("cubeId").is_some() && payload.get("uv").is_some() {
        return vec![json!({
            "tool": "assign_texture",
            "reason": "bind a texture to the face whose UV rectangle was just set",
        })];
    }
    Vec::new()
}

/// A placeholder telling the caller to inject a value at retry time rather
/// than trusting whatever was captured when this hint was built: `"tool"`
/// values come from re-fetching state (step 1), `"user"` values come from
/// the dialog the human just confirmed (step 2).
fn dollar_ref(kind: &str, step: u8, field: &str) -> Value {
    json!({ "$ref": { "kind": kind, "step": step, "field": field } })
}

/// `ensure_project`'s three-step hint sequence (spec §4.6.2): a real adapter
/// that can't silently create a project surfaces
/// `adapter_project_dialog_input_required` instead of succeeding outright,
/// and the agent is expected to re-fetch the project's revision, walk the
/// human through confirming the tool's own dialog, then retry — not with
/// the stale payload captured before the dialog, but with the freshly
/// fetched revision and the human's answers spliced in.
fn decorate_ensure_project_dialog(payload: &Value, response: mcpforge_core::ToolResponse<Value>) -> mcpforge_core::ToolResponse<Value> {
    let mcpforge_core::ToolResponse::Err { ok, error, content, structured_content, .. } = response else {
        return response;
    };
    if error.details.get("reason").and_then(Value::as_str) != Some(ADAPTER_PROJECT_DIALOG_INPUT_REQUIRED) {
        return mcpforge_core::ToolResponse::Err { ok, error, content, structured_content, next_actions: None };
    }

    let mut retry_payload = payload.clone();
    if let Some(obj) = retry_payload.as_object_mut() {
        obj.insert("revision".to_string(), dollar_ref("tool", 1, "revision"));
        for field in ["name", "template"] {
            if obj.contains_key(field) {
                obj.insert(field.to_string(), dollar_ref("user", 2, field));
            }
        }
    }

    let hints = vec![
        json!({
            "step": 1,
            "action": "call_tool",
            "tool": "get_project_state",
            "payload": { "detail": "summary" },
            "reason": "refresh the project revision before retrying, in case the project changed while the dialog was open",
        }),
        json!({
            "step": 2,
            "action": "ask_user",
            "reason": "the authoring tool opened its own new-project dialog and is waiting on human confirmation of its fields",
        }),
        json!({ "step": 3, "action": "retry_tool", "tool": "ensure_project", "payload": retry_payload }),
    ];
    mcpforge_core::ToolResponse::Err {
        ok,
        error,
        content,
        structured_content,
        next_actions: Some(hints),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcpforge_core::{ErrorCode, ToolError, ToolResponse};
    use std::collections::BTreeMap;

    fn dialog_error() -> ToolResponse<Value> {
        let mut details = BTreeMap::new();
        details.insert("reason".to_string(), json!(ADAPTER_PROJECT_DIALOG_INPUT_REQUIRED));
        ToolResponse::err(ToolError::new(ErrorCode::InvalidState, "dialog confirmation required", details))
    }

    #[test]
    fn ensure_project_dialog_hints_fetch_then_ask_then_retry_with_refs() {
        let payload = json!({"projectId": "p1", "name": "Demo", "template": "blank"});
        let decorated = decorate(DecorationFamily::EnsureProjectDialog, &payload, dialog_error());
        let ToolResponse::Err { next_actions, .. } = decorated else {
            panic!("expected an error response");
        };
        let hints = next_actions.expect("ensure_project dialog failures carry next-action hints");
        assert_eq!(hints.len(), 3);
        assert_eq!(hints[0]["action"], "call_tool");
        assert_eq!(hints[0]["tool"], "get_project_state");
        assert_eq!(hints[1]["action"], "ask_user");
        assert_eq!(hints[2]["action"], "retry_tool");
        assert_eq!(hints[2]["payload"]["revision"]["$ref"]["kind"], "tool");
        assert_eq!(hints[2]["payload"]["name"]["$ref"]["kind"], "user");
        assert_eq!(hints[2]["payload"]["template"]["$ref"]["kind"], "user");
        assert_eq!(hints[2]["payload"]["projectId"], "p1");
    }

    #[test]
    fn other_ensure_project_errors_get_no_hints() {
        let payload = json!({"projectId": "p1"});
        let mut details = BTreeMap::new();
        details.insert("reason".to_string(), json!("some_other_reason"));
        let response = ToolResponse::err(ToolError::new(ErrorCode::InvalidPayload, "nope", details));
        let decorated = decorate(DecorationFamily::EnsureProjectDialog, &payload, response);
        let ToolResponse::Err { next_actions, .. } = decorated else {
            panic!("expected an error response");
        };
        assert!(next_actions.is_none());
    }
}
