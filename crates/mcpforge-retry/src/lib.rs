// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
//! Auto-retry on revision mismatch, modeled as a composable higher-order
//! wrapper around a handler rather than a method on a service (spec §4.6.1,
//! §9 "Revision retry as a decorator").

use async_trait::async_trait;
use mcpforge_core::{ErrorCode, ToolResponse};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use tracing::debug;

/// A boxed, cloneable-by-reuse tool handler: payload in, tool response out.
pub type BoxedHandler<'a> =
    dyn Fn(Value) -> Pin<Box<dyn Future<Output = ToolResponse<Value>> + Send + 'a>> + Send + Sync + 'a;

/// Source of the authoritative current revision, queried only after a
/// mismatch, mirroring `getProjectState({detail:'summary'})` in spec §4.6.1.
#[async_trait]
pub trait CurrentRevision: Send + Sync {
    /// The project's current revision.
    async fn current_revision(&self) -> String;
}

/// Wrap `handler` with the auto-retry policy.
///
/// Invokes `handler` once. If it fails with
/// `invalid_state_revision_mismatch`, reads the current revision; if that
/// equals the client's `ifRevision` there is no new revision to retry
/// against and the original error is returned. Otherwise the handler is
/// invoked exactly one more time with `ifRevision` rewritten to the current
/// revision, and whatever it returns (success or failure) is final — this
/// retries at most once, never loops.
pub async fn with_revision_retry<'a>(
    handler: &'a BoxedHandler<'a>,
    revisions: &dyn CurrentRevision,
    payload: Value,
) -> ToolResponse<Value> {
    let first = handler(payload.clone()).await;

    let mismatch = match &first {
        ToolResponse::Err { error, .. } => error.code == ErrorCode::InvalidStateRevisionMismatch,
        ToolResponse::Ok { .. } => false,
    };
    if !mismatch {
        return first;
    }

    let client_if_revision = payload.get("ifRevision").and_then(Value::as_str).map(str::to_string);
    let current = revisions.current_revision().await;
    if client_if_revision.as_deref() == Some(current.as_str()) {
        debug!("revision mismatch but no new revision available, skipping retry");
        return first;
    }

    let mut retried_payload = payload;
    if let Value::Object(ref mut map) = retried_payload {
        map.insert("ifRevision".to_string(), Value::String(current));
    }
    handler(retried_payload).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcpforge_core::ToolError;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FixedRevision(&'static str);

    #[async_trait]
    impl CurrentRevision for FixedRevision {
        async fn current_revision(&self) -> String {
            self.0.to_string()
        }
    }

    fn mismatch_error() -> ToolResponse<Value> {
        ToolResponse::err(ToolError::revision_mismatch("r1", "r2"))
    }

    #[tokio::test]
    async fn retries_once_when_new_revision_exists() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let handler: Box<BoxedHandler<'_>> = Box::new(move |payload: Value| {
            let calls = calls_clone.clone();
            Box::pin(async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n == 1 {
                    mismatch_error()
                } else {
                    assert_eq!(payload["ifRevision"], json!("r2"));
                    ToolResponse::ok(json!({"revision": "r3"}))
                }
            })
        });
        let revisions = FixedRevision("r2");
        let result = with_revision_retry(&*handler, &revisions, json!({"ifRevision": "r1"})).await;
        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn skips_retry_when_current_equals_client_revision() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let handler: Box<BoxedHandler<'_>> = Box::new(move |_payload: Value| {
            let calls = calls_clone.clone();
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                mismatch_error()
            })
        });
        let revisions = FixedRevision("r1");
        let result = with_revision_retry(&*handler, &revisions, json!({"ifRevision": "r1"})).await;
        assert!(!result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn non_mismatch_errors_are_not_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let handler: Box<BoxedHandler<'_>> = Box::new(move |_payload: Value| {
            let calls = calls_clone.clone();
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                ToolResponse::err(ToolError::simple(ErrorCode::InvalidState, "nope"))
            })
        });
        let revisions = FixedRevision("r2");
        let result = with_revision_retry(&*handler, &revisions, json!({"ifRevision": "r1"})).await;
        assert!(!result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn second_failure_is_returned_verbatim() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let handler: Box<BoxedHandler<'_>> = Box::new(move |_payload: Value| {
            let calls = calls_clone.clone();
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                mismatch_error()
            })
        });
        let revisions = FixedRevision("r2");
        let result = with_revision_retry(&*handler, &revisions, json!({"ifRevision": "r1"})).await;
        assert!(!result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
