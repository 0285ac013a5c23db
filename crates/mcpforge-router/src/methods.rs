// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-method JSON-RPC business logic (spec §4.9, §6). Session resolution
//! (implicit creation, protocol negotiation) happens one layer up, in
//! [`crate::handlers`]; this module only needs an already-resolved session
//! id plus `params`.

use crate::resources;
use crate::rpc::{RpcError, INVALID_PARAMS, METHOD_NOT_FOUND};
use crate::state::AppState;
use mcpforge_core::{ErrorCode, ToolResponse};
use serde_json::{json, Value};

/// Methods implicitly eligible for session creation (spec §4.9:
/// "`tools/*`, `resources/*`, `ping`"). `initialize` is handled the same
/// way — see DESIGN.md, Open Question (there is no other call that could
/// ever create the session `initialize` negotiates against).
pub fn is_implicit_session_method(method: &str) -> bool {
    method == "ping" || method == "initialize" || method.starts_with("tools/") || method.starts_with("resources/")
}

/// Dispatch one already-session-resolved method call.
pub async fn handle(state: &AppState, method: &str, params: &Value, session_id: &str) -> Result<Value, RpcError> {
    match method {
        "initialize" => initialize(state, session_id, params).await,
        "tools/list" => Ok(tools_list(state)),
        "tools/call" => Ok(tools_call(state, params).await),
        "resources/list" => Ok(resources::list()),
        "resources/templates/list" => Ok(resources::templates()),
        "resources/read" => resources::read(&state.dispatcher, params).await,
        "ping" => Ok(json!({})),
        "shutdown" => Ok(shutdown(state).await),
        other => Err(RpcError::new(METHOD_NOT_FOUND, format!("unknown method '{other}'"))),
    }
}

async fn initialize(state: &AppState, session_id: &str, params: &Value) -> Result<Value, RpcError> {
    let offered = params
        .get("protocolVersion")
        .and_then(Value::as_str)
        .map(|v| vec![v.to_string()])
        .ok_or_else(|| RpcError::new(INVALID_PARAMS, "params.protocolVersion is required"))?;

    let negotiated = state
        .sessions
        .negotiate_protocol(session_id, &offered)
        .await
        .map_err(|e| RpcError::with_data(INVALID_PARAMS, e.to_string(), json!({"offered": offered})))?;

    Ok(json!({
        "protocolVersion": negotiated,
        "capabilities": {
            "tools": {"listChanged": false},
            "resources": {"listChanged": false, "subscribe": false},
        },
        "serverInfo": {
            "name": state.server_name,
            "version": state.server_version,
        },
    }))
}

fn tools_list(state: &AppState) -> Value {
    let registry = state.dispatcher.registry();
    let tools: Vec<Value> = registry
        .all()
        .iter()
        .map(|t| {
            json!({
                "name": t.definition.name,
                "title": t.definition.title,
                "description": t.definition.description,
                "inputSchema": t.definition.input_schema,
            })
        })
        .collect();
    json!({"tools": tools, "_meta": {"registryHash": registry.hash()}})
}

/// Dispatch a `tools/call` and wrap it in the MCP wire shape (spec §6):
/// `{content, structuredContent, _meta:{nextActions}}` on success,
/// `{isError:true, content, structuredContent:error}` on failure. This is
/// distinct from the tool envelope's own `{ok, data, ...}` shape, which
/// stays internal to the dispatcher.
async fn tools_call(state: &AppState, params: &Value) -> Value {
    let Some(name) = params.get("name").and_then(Value::as_str) else {
        return wire_error(ErrorCode::InvalidPayload, "params.name is required", None);
    };
    let arguments = params.get("arguments").cloned().unwrap_or(json!({}));

    match state.dispatcher.dispatch(name, arguments).await {
        ToolResponse::Ok { data, content, structured_content, next_actions, .. } => json!({
            "content": content.unwrap_or_default(),
            "structuredContent": structured_content.unwrap_or(data),
            "_meta": {"nextActions": next_actions.unwrap_or_default()},
        }),
        ToolResponse::Err { error, content, .. } => wire_error(error.code, &error.message, Some(content.unwrap_or_default())),
    }
}

fn wire_error(code: ErrorCode, message: &str, content: Option<Vec<Value>>) -> Value {
    json!({
        "isError": true,
        "content": content.unwrap_or_else(|| vec![json!({"type": "text", "text": message})]),
        "structuredContent": {"code": code, "message": message},
    })
}

async fn shutdown(state: &AppState) -> Value {
    if let Some(hook) = &state.trace_flush {
        hook.flush().await;
    }
    state.sessions.close_all_sse().await;
    json!({"shutdown": true})
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn implicit_session_methods_match_spec_set() {
        assert!(is_implicit_session_method("tools/call"));
        assert!(is_implicit_session_method("tools/list"));
        assert!(is_implicit_session_method("resources/read"));
        assert!(is_implicit_session_method("ping"));
        assert!(is_implicit_session_method("initialize"));
        assert!(!is_implicit_session_method("shutdown"));
    }
}
