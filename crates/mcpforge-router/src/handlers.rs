// SPDX-License-Identifier: MIT OR Apache-2.0
//! `/mcp` endpoint handlers: POST (JSON-RPC envelope), GET (SSE upgrade),
//! DELETE (session teardown) — spec §4.9, §6.

use crate::error::ApiError;
use crate::methods;
use crate::rpc::{RpcPayload, RpcReply, RpcRequest, RpcResponse};
use crate::sse::SseHandle;
use crate::state::AppState;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use mcpforge_session::SessionError;
use serde_json::{json, Value};

const SESSION_ID_HEADER: &str = "mcp-session-id";
const PROTOCOL_VERSION_HEADER: &str = "mcp-protocol-version";

/// Resolve the session a POST applies to, and check `Mcp-Protocol-Version`
/// if the client sent one. `implicit` gates whether an absent or unknown
/// `Mcp-Session-Id` is allowed to materialize a fresh session: spec §4.9
/// only grants that to `IMPLICIT_SESSION_METHODS` (`tools/*`, `resources/*`,
/// `ping`, and `initialize` — see DESIGN.md). Anything else, `shutdown`
/// above all, must fail with `missing_session_id` instead of silently
/// spinning one up just to discard it.
async fn resolve_session(state: &AppState, headers: &HeaderMap, implicit: bool) -> Result<String, ApiError> {
    let given = headers.get(SESSION_ID_HEADER).and_then(|v| v.to_str().ok()).map(str::to_string);
    let now = Utc::now();

    let id = match given {
        Some(id) => {
            if state.sessions.get(&id).await.is_none() {
                if !implicit {
                    return Err(ApiError::missing_session_id());
                }
                // Revive: `create` accepts a caller-supplied id, and
                // nothing else could ever materialize the session this
                // POST's `Mcp-Session-Id` header names (see DESIGN.md).
                state.sessions.create(Some(id.clone()), now).await;
            } else {
                let _ = state.sessions.touch(&id, now).await;
            }
            id
        }
        None => {
            if !implicit {
                return Err(ApiError::missing_session_id());
            }
            state.sessions.create(None, now).await.id
        }
    };

    if let Some(got) = headers.get(PROTOCOL_VERSION_HEADER).and_then(|v| v.to_str().ok()) {
        if let Err(SessionError::ProtocolVersionMismatch { negotiated, got }) = state.sessions.check_protocol_version(&id, got).await {
            return Err(ApiError::protocol_version_mismatch(&negotiated, &got));
        }
    }

    Ok(id)
}

/// The method a session-implicitness decision is made against. Batches are
/// one HTTP POST carrying several JSON-RPC calls under one session, so the
/// decision is made against the first call — a batch that opens with an
/// implicit method establishes the session the rest of the batch then runs
/// under.
fn leading_method(payload: &RpcPayload) -> &str {
    match payload {
        RpcPayload::Single(req) => &req.method,
        RpcPayload::Batch(reqs) => reqs.first().map(|r| r.method.as_str()).unwrap_or(""),
    }
}

async fn dispatch_one(state: &AppState, req: RpcRequest, session_id: &str) -> Option<RpcResponse> {
    let id = req.id.clone()?;
    let result = methods::handle(state, &req.method, &req.params, session_id).await;
    Some(match result {
        Ok(value) => RpcResponse::ok(id, value),
        Err(error) => RpcResponse::err(id, error),
    })
}

/// `POST /mcp` — single or batched JSON-RPC request.
pub async fn post_mcp(State(state): State<AppState>, headers: HeaderMap, body: axum::body::Bytes) -> Response {
    let payload: RpcPayload = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => return ApiError::malformed_request(e.to_string()).into_response(),
    };

    if let RpcPayload::Batch(reqs) = &payload {
        if reqs.is_empty() {
            return ApiError::malformed_request("batch must not be empty").into_response();
        }
    }

    let implicit = methods::is_implicit_session_method(leading_method(&payload));
    let session_id = match resolve_session(&state, &headers, implicit).await {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    let reply = match payload {
        RpcPayload::Single(req) => match dispatch_one(&state, req, &session_id).await {
            Some(resp) => RpcReply::Single(resp),
            None => RpcReply::Empty,
        },
        RpcPayload::Batch(reqs) => {
            let mut responses = Vec::with_capacity(reqs.len());
            for req in reqs {
                if let Some(resp) = dispatch_one(&state, req, &session_id).await {
                    responses.push(resp);
                }
            }
            RpcReply::Batch(responses)
        }
    };

    let mut response = Json(reply).into_response();
    insert_session_header(&mut response, &session_id);
    response
}

/// `GET /mcp` with `Accept: text/event-stream` — opens an SSE stream on an
/// existing session (spec §4.8, §4.9).
pub async fn get_mcp(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let accept_ok = headers.get(axum::http::header::ACCEPT).and_then(|v| v.to_str().ok()).is_some_and(|v| v.contains("text/event-stream"));
    if !accept_ok {
        return ApiError::missing_sse_accept().into_response();
    }

    let Some(session_id) = headers.get(SESSION_ID_HEADER).and_then(|v| v.to_str().ok()).map(str::to_string) else {
        return ApiError::missing_session_id().into_response();
    };

    if state.sessions.get(&session_id).await.is_none() {
        return ApiError::unknown_session().into_response();
    }

    let (handle, sse) = SseHandle::pair();
    match state.sessions.open_sse(&session_id, handle).await {
        Ok(_conn_id) => sse.into_response(),
        Err(SessionError::TooManySse) => ApiError::too_many_sse().into_response(),
        Err(_) => ApiError::unknown_session().into_response(),
    }
}

/// `DELETE /mcp` — tears down a session and closes its SSE connections.
pub async fn delete_mcp(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(session_id) = headers.get(SESSION_ID_HEADER).and_then(|v| v.to_str().ok()).map(str::to_string) else {
        return ApiError::missing_session_id().into_response();
    };

    match state.sessions.delete(&session_id).await {
        Some(_) => Json(json!({"deleted": true})).into_response(),
        None => ApiError::unknown_session().into_response(),
    }
}

fn insert_session_header(response: &mut Response, session_id: &str) {
    if let Ok(value) = HeaderValue::from_str(session_id) {
        response.headers_mut().insert(HeaderName::from_static("mcp-session-id"), value);
    }
}

/// A 404 fallback for anything other than `/mcp` — axum's default is a
/// bare empty body, the spec wants the same `{error:{...}}` shape as every
/// other transport error.
pub async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({"error": {"code": "MCP_NOT_FOUND", "message": "no such route"}}))).into_response()
}
