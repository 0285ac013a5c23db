// SPDX-License-Identifier: MIT OR Apache-2.0
//! `resources/list`, `resources/read`, `resources/templates/list` (spec
//! §4.9). The spec names these three methods without detailing a resource
//! catalog; this router exposes exactly one resource — the live project
//! snapshot — since that is the one piece of read-only state a tool-call
//! client would otherwise have to reconstruct from `get_project_state`
//! responses (see DESIGN.md, Open Question).

use crate::rpc::{RpcError, INVALID_PARAMS};
use mcpforge_dispatcher::Dispatcher;
use serde_json::{json, Value};

/// Fixed URI of the one resource this router exposes.
pub const PROJECT_STATE_URI: &str = "mcpforge://project/state";

/// `resources/list` result: the one static resource this router exposes.
pub fn list() -> Value {
    json!({
        "resources": [
            {
                "uri": PROJECT_STATE_URI,
                "name": "Project state",
                "description": "The current project snapshot, as returned by get_project_state.",
                "mimeType": "application/json",
            }
        ]
    })
}

/// `resources/templates/list` result. No templated (variable) resources
/// are exposed; the list is empty.
pub fn templates() -> Value {
    json!({"resourceTemplates": []})
}

/// `resources/read` result for a known `uri`, or `Err` for anything else.
pub async fn read(dispatcher: &Dispatcher, params: &Value) -> Result<Value, RpcError> {
    let uri = params
        .get("uri")
        .and_then(Value::as_str)
        .ok_or_else(|| RpcError::new(INVALID_PARAMS, "params.uri is required"))?;

    if uri != PROJECT_STATE_URI {
        return Err(RpcError::with_data(INVALID_PARAMS, "unknown resource uri", json!({"uri": uri})));
    }

    let snapshot = dispatcher
        .services()
        .ctx
        .read_snapshot()
        .await
        .map_err(|e| RpcError::with_data(INVALID_PARAMS, e.to_string(), json!({"code": e.code})))?;

    Ok(json!({
        "contents": [
            {
                "uri": PROJECT_STATE_URI,
                "mimeType": "application/json",
                "text": serde_json::to_string(&snapshot).unwrap_or_default(),
            }
        ]
    }))
}
