// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
//! mcpforge-router
//!
//! The MCP transport surface (spec §4.9): JSON-RPC envelope handling over
//! HTTP POST (single or batch), SSE upgrade via GET, session teardown via
//! DELETE, and implicit session establishment for `tools/*`/`resources/*`/
//! `ping`. Built on `axum` following the teacher's `Router`/`State`/`Sse`
//! idiom (`abp-daemon/src/lib.rs`).

mod error;
mod handlers;
mod methods;
mod middleware;
mod resources;
mod rpc;
mod sse;
mod state;

pub use error::ApiError;
pub use methods::is_implicit_session_method;
pub use rpc::{RpcError, RpcPayload, RpcReply, RpcRequest, RpcResponse, INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND};
pub use state::{AppState, TraceFlushHandle};

use axum::routing::{get, post};
use axum::Router;

/// Default path the MCP endpoint is served under (spec §6).
pub const DEFAULT_MCP_PATH: &str = "/mcp";

/// Build the router, mounting the MCP endpoint at `path` and a `/health`
/// liveness probe, with request-id/logging middleware layered over every
/// route (mirrors `abp-daemon::build_app`).
#[must_use]
pub fn build_app(path: &str, state: AppState) -> Router {
    Router::new()
        .route(path, post(handlers::post_mcp).get(handlers::get_mcp).delete(handlers::delete_mcp))
        .route("/health", get(health))
        .fallback(handlers::not_found)
        .layer(axum::middleware::from_fn(middleware::request_logger))
        .layer(axum::middleware::from_fn(middleware::request_id))
        .with_state(state)
}

async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({"status": "ok"}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;
    use axum::body::Body;
    use axum::http::{Request as HttpRequest, StatusCode};
    use mcpforge_core::Limits;
    use mcpforge_dispatcher::{Dispatcher, Services};
    use mcpforge_registry::ToolRegistry;
    use mcpforge_services::{MockEngine, MockExporter, MockFormats, ServiceContext};
    use mcpforge_session::SessionStore;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        let engine = Arc::new(MockEngine::new());
        let ctx = Arc::new(ServiceContext::new(engine.clone(), engine, Limits::default()));
        let services = Arc::new(Services::new(ctx, Arc::new(MockFormats), Arc::new(MockExporter)));
        let dispatcher = Arc::new(Dispatcher::new(Arc::new(ToolRegistry::build()), services, None));
        let sessions = Arc::new(SessionStore::new(1_800));
        AppState::new(dispatcher, sessions)
    }

    async fn post_body(app: &Router, body: Value) -> (StatusCode, Value, axum::http::HeaderMap) {
        let request = HttpRequest::post(DEFAULT_MCP_PATH)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let parsed: Value = serde_json::from_slice(&bytes).unwrap();
        (status, parsed, headers)
    }

    #[tokio::test]
    async fn initialize_creates_an_implicit_session_and_echoes_its_id() {
        let app = build_app(DEFAULT_MCP_PATH, test_state());
        let (status, body, headers) = post_body(
            &app,
            json!({"jsonrpc": "2.0", "method": "initialize", "params": {"protocolVersion": "2025-06-18"}, "id": 1}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"]["protocolVersion"], "2025-06-18");
        assert!(headers.contains_key("mcp-session-id"));
    }

    #[tokio::test]
    async fn tools_list_is_implicit_session_and_returns_registry() {
        let app = build_app(DEFAULT_MCP_PATH, test_state());
        let (status, body, _headers) = post_body(&app, json!({"jsonrpc": "2.0", "method": "tools/list", "id": 2})).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["result"]["tools"].as_array().unwrap().len() > 10);
    }

    #[tokio::test]
    async fn unknown_method_is_method_not_found() {
        let app = build_app(DEFAULT_MCP_PATH, test_state());
        let (status, body, _headers) = post_body(&app, json!({"jsonrpc": "2.0", "method": "nope", "id": 3})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["error"]["code"], METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn batch_requests_each_get_a_response_in_order() {
        let app = build_app(DEFAULT_MCP_PATH, test_state());
        let (status, body, _headers) = post_body(
            &app,
            json!([
                {"jsonrpc": "2.0", "method": "ping", "id": "a"},
                {"jsonrpc": "2.0", "method": "ping", "id": "b"},
            ]),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let array = body.as_array().unwrap();
        assert_eq!(array.len(), 2);
        assert_eq!(array[0]["id"], "a");
        assert_eq!(array[1]["id"], "b");
    }

    #[tokio::test]
    async fn tools_call_wraps_success_in_mcp_wire_shape() {
        let app = build_app(DEFAULT_MCP_PATH, test_state());
        let (status, body, _headers) = post_body(
            &app,
            json!({"jsonrpc": "2.0", "method": "tools/call", "params": {"name": "get_project_state", "arguments": {}}, "id": 4}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["result"]["structuredContent"].is_object());
        assert!(body["result"]["_meta"]["nextActions"].is_array());
    }

    #[tokio::test]
    async fn tools_call_wraps_failure_with_is_error() {
        let app = build_app(DEFAULT_MCP_PATH, test_state());
        let (status, body, _headers) = post_body(
            &app,
            json!({"jsonrpc": "2.0", "method": "tools/call", "params": {"name": "does_not_exist", "arguments": {}}, "id": 5}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"]["isError"], true);
    }

    #[tokio::test]
    async fn shutdown_without_a_session_is_400() {
        let app = build_app(DEFAULT_MCP_PATH, test_state());
        let (status, body, _headers) = post_body(&app, json!({"jsonrpc": "2.0", "method": "shutdown", "id": 6})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "MCP_MISSING_SESSION_ID");
    }

    #[tokio::test]
    async fn shutdown_with_an_existing_session_succeeds() {
        let app = build_app(DEFAULT_MCP_PATH, test_state());
        let (_status, _body, headers) = post_body(&app, json!({"jsonrpc": "2.0", "method": "ping", "id": 1})).await;
        let session_id = headers.get("mcp-session-id").unwrap().to_str().unwrap().to_string();

        let request = HttpRequest::post(DEFAULT_MCP_PATH)
            .header("content-type", "application/json")
            .header("mcp-session-id", &session_id)
            .body(Body::from(serde_json::to_vec(&json!({"jsonrpc": "2.0", "method": "shutdown", "id": 7})).unwrap()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn get_without_accept_header_is_406() {
        let app = build_app(DEFAULT_MCP_PATH, test_state());
        let request = HttpRequest::get(DEFAULT_MCP_PATH).body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_ACCEPTABLE);
    }

    #[tokio::test]
    async fn get_without_session_id_is_400() {
        let app = build_app(DEFAULT_MCP_PATH, test_state());
        let request = HttpRequest::get(DEFAULT_MCP_PATH).header("accept", "text/event-stream").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn delete_without_session_id_is_400() {
        let app = build_app(DEFAULT_MCP_PATH, test_state());
        let request = HttpRequest::delete(DEFAULT_MCP_PATH).body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn fourth_sse_stream_on_a_session_is_429() {
        let app = build_app(DEFAULT_MCP_PATH, test_state());
        let (_status, _body, headers) = post_body(&app, json!({"jsonrpc": "2.0", "method": "ping", "id": 1})).await;
        let session_id = headers.get("mcp-session-id").unwrap().to_str().unwrap().to_string();

        for _ in 0..3 {
            let request = HttpRequest::get(DEFAULT_MCP_PATH)
                .header("accept", "text/event-stream")
                .header("mcp-session-id", &session_id)
                .body(Body::empty())
                .unwrap();
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let request = HttpRequest::get(DEFAULT_MCP_PATH)
            .header("accept", "text/event-stream")
            .header("mcp-session-id", &session_id)
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
