// SPDX-License-Identifier: MIT OR Apache-2.0
//! JSON-RPC 2.0 envelope (spec §6): single or batched requests, reserved
//! error codes, and the untagged single-or-batch wire shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Invalid JSON-RPC request shape.
pub const INVALID_REQUEST: i64 = -32600;
/// `method` does not name a method this router implements.
pub const METHOD_NOT_FOUND: i64 = -32601;
/// `params` failed validation for the named method.
pub const INVALID_PARAMS: i64 = -32602;
/// Unclassified internal failure.
pub const INTERNAL_ERROR: i64 = -32603;

/// One JSON-RPC request object.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcRequest {
    /// Always `"2.0"`; not validated strictly, mirrored back on responses.
    #[serde(default)]
    pub jsonrpc: String,
    /// The method name, e.g. `"tools/call"`.
    pub method: String,
    /// Method parameters, defaulting to `null` when omitted.
    #[serde(default)]
    pub params: Value,
    /// Request id. Absent (or `null`) marks a notification: no response is
    /// sent for it, per JSON-RPC 2.0.
    #[serde(default)]
    pub id: Option<Value>,
}

/// A POST body: either one request or a batch of them.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RpcPayload {
    /// A batch of requests, dispatched independently.
    Batch(Vec<RpcRequest>),
    /// A single request.
    Single(RpcRequest),
}

/// A JSON-RPC error object.
#[derive(Debug, Clone, Serialize)]
pub struct RpcError {
    /// Reserved or positive domain error code.
    pub code: i64,
    /// Human-readable message.
    pub message: String,
    /// Optional structured detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    /// Build an error with no extra `data`.
    #[must_use]
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), data: None }
    }

    /// Build an error carrying structured `data`.
    #[must_use]
    pub fn with_data(code: i64, message: impl Into<String>, data: Value) -> Self {
        Self { code, message: message.into(), data: Some(data) }
    }
}

/// One JSON-RPC response object. `result` and `error` are mutually
/// exclusive; exactly one is `Some`.
#[derive(Debug, Clone, Serialize)]
pub struct RpcResponse {
    /// Always `"2.0"`.
    pub jsonrpc: &'static str,
    /// Present on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Present on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
    /// Echoes the request's id.
    pub id: Value,
}

impl RpcResponse {
    /// Build a successful response.
    #[must_use]
    pub fn ok(id: Value, result: Value) -> Self {
        Self { jsonrpc: "2.0", result: Some(result), error: None, id }
    }

    /// Build a failed response.
    #[must_use]
    pub fn err(id: Value, error: RpcError) -> Self {
        Self { jsonrpc: "2.0", result: None, error: Some(error), id }
    }
}

/// Reply shape for a POST: one response object, or a batch of them. A
/// batch where every request was a notification serializes to an empty
/// array.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum RpcReply {
    /// Reply to a single-request POST.
    Single(RpcResponse),
    /// Reply to a batched POST.
    Batch(Vec<RpcResponse>),
    /// Every request in the payload was a notification; nothing to send.
    Empty,
}
