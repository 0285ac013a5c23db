// SPDX-License-Identifier: MIT OR Apache-2.0
//! Transport-level HTTP errors for the `/mcp` endpoint (spec §6).
//!
//! These sit above the JSON-RPC envelope: they cover the cases the spec
//! ties to a specific HTTP status rather than a JSON-RPC error object —
//! missing session id, missing SSE `Accept` header, SSE cap, unknown
//! resource.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// An HTTP-level failure on the `/mcp` endpoint, carrying the status code
/// the spec requires (§6: 400/404/406/429) and a short machine token.
#[derive(Debug, Clone)]
pub struct ApiError {
    status: StatusCode,
    token: &'static str,
    message: String,
}

impl ApiError {
    /// Build an error with an explicit status, stable token, and message.
    #[must_use]
    pub fn new(status: StatusCode, token: &'static str, message: impl Into<String>) -> Self {
        Self { status, token, message: message.into() }
    }

    /// 400: malformed JSON-RPC body or missing `Mcp-Session-Id`.
    #[must_use]
    pub fn missing_session_id() -> Self {
        Self::new(StatusCode::BAD_REQUEST, "MCP_MISSING_SESSION_ID", "Mcp-Session-Id header is required")
    }

    /// 400: the POST body was not valid JSON-RPC.
    #[must_use]
    pub fn malformed_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "MCP_MALFORMED_REQUEST", detail)
    }

    /// 404: session id does not name a live session.
    #[must_use]
    pub fn unknown_session() -> Self {
        Self::new(StatusCode::NOT_FOUND, "MCP_UNKNOWN_SESSION", "no session with that id")
    }

    /// 406: an SSE GET arrived without `Accept: text/event-stream`.
    #[must_use]
    pub fn missing_sse_accept() -> Self {
        Self::new(StatusCode::NOT_ACCEPTABLE, "MCP_SSE_ACCEPT_REQUIRED", "Accept: text/event-stream is required")
    }

    /// 429: a session already has [`mcpforge_core::session::MAX_SSE_CONNECTIONS`] open streams.
    #[must_use]
    pub fn too_many_sse() -> Self {
        Self::new(StatusCode::TOO_MANY_REQUESTS, "MCP_TOO_MANY_SSE", "MCP_TOO_MANY_SSE")
    }

    /// 400: the request's `Mcp-Protocol-Version` does not match the
    /// session's negotiated version.
    #[must_use]
    pub fn protocol_version_mismatch(negotiated: &str, got: &str) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "MCP_PROTOCOL_VERSION_MISMATCH",
            format!("negotiated {negotiated}, got {got}"),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({"error": {"code": self.token, "message": self.message}}));
        (self.status, body).into_response()
    }
}
