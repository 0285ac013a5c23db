// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
//! mcpforge-dispatcher
//!
//! The tool-call dispatch pipeline (spec §4.6): resolve the tool from the
//! registry, validate its payload, classify it, guard its revision, execute
//! it (auto-retrying once on a stale revision for retry-eligible tools),
//! decorate its response, attach project state/diff, and record the call to
//! the trace log. One [`Dispatcher`] is built around exactly one project's
//! [`Services`] bundle, matching `ServiceContext`'s "one per active
//! project" contract.

mod decorate;
mod services;
mod translate;

pub use services::Services;

use async_trait::async_trait;
use mcpforge_core::{ErrorCode, ToolError, ToolResponse};
use mcpforge_registry::{ToolClass, ToolRegistry};
use mcpforge_retry::{with_revision_retry, BoxedHandler, CurrentRevision};
use mcpforge_trace::TraceRecorder;
use serde_json::Value;
use std::sync::Arc;

/// Dispatches tool calls against one project's services and tool registry.
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    services: Arc<Services>,
    trace: Option<Arc<TraceRecorder>>,
}

struct RevisionSource(Arc<Services>);

#[async_trait]
impl CurrentRevision for RevisionSource {
    async fn current_revision(&self) -> String {
        match self.0.ctx.read_snapshot().await {
            Ok(snapshot) => self.0.ctx.revisions.lock().await.track(&snapshot),
            Err(_) => String::new(),
        }
    }
}

impl Dispatcher {
    /// Build a dispatcher over a fixed registry and one project's services.
    /// `trace` is optional: a dispatcher built without one still runs the
    /// full pipeline, it just skips step 9.
    #[must_use]
    pub fn new(registry: Arc<ToolRegistry>, services: Arc<Services>, trace: Option<Arc<TraceRecorder>>) -> Self {
        Self { registry, services, trace }
    }

    /// The project's shared services, for callers that need read access
    /// outside the tool-call pipeline (e.g. the router's `resources/*`
    /// surface reading the current snapshot).
    #[must_use]
    pub fn services(&self) -> &Arc<Services> {
        &self.services
    }

    /// The tool registry this dispatcher was built with.
    #[must_use]
    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Run the full nine-step dispatch pipeline for one tool call.
    pub async fn dispatch(&self, tool_name: &str, payload: Value) -> ToolResponse<Value> {
        // Step 1: resolve.
        let Some(tool) = self.registry.get(tool_name) else {
            let response = ToolResponse::err(ToolError::simple(ErrorCode::UnknownTool, format!("unknown tool '{tool_name}'")));
            self.record(tool_name, &payload, &response);
            return response;
        };
        let policy = tool.policy;

        // Step 2: validate.
        if let Err(violation) = mcpforge_schema::validate(&tool.definition.input_schema, &payload) {
            let response = ToolResponse::err(ToolError::simple(ErrorCode::InvalidPayload, violation.to_string()));
            self.record(tool_name, &payload, &response);
            return response;
        }

        // Step 3: classify (policy.class, already resolved with the tool).

        // Step 4: revision guard. Presence only — the actual value is
        // checked against the live revision inside `call_service`, so a
        // stale-but-present `ifRevision` reaches step 5 and can be retried.
        if policy.requires_revision && payload.get("ifRevision").and_then(Value::as_str).is_none() {
            let response = ToolResponse::err(ToolError::simple(
                ErrorCode::InvalidStateRevisionMissing,
                "ifRevision is required for this tool",
            ));
            self.record(tool_name, &payload, &response);
            return response;
        }

        // Step 5: execute, auto-retrying once on a revision mismatch for
        // retry-eligible tools (spec §4.6.1).
        let executed = self.execute(tool_name, policy.class, payload.clone()).await;

        // Step 6: decorate.
        let decorated = decorate::decorate(policy.decoration, &payload, executed);

        // Step 7: attach state/diff.
        let attached = self.attach_state(policy.class, policy.attach_state_by_default, &payload, decorated).await;

        // Step 8: normalize. `ToolResponse`'s untagged serialization already
        // guarantees the wire shape; nothing further to do here.

        // Step 9: record.
        self.record(tool_name, &payload, &attached);
        attached
    }

    async fn execute(&self, tool_name: &str, class: ToolClass, payload: Value) -> ToolResponse<Value> {
        if class != ToolClass::StatefulWithRetry {
            return translate::call_service(&self.services, tool_name, payload).await;
        }

        let services = self.services.clone();
        let owned_name = tool_name.to_string();
        let handler: Box<BoxedHandler<'_>> = Box::new(move |p: Value| {
            let services = services.clone();
            let name = owned_name.clone();
            Box::pin(async move { translate::call_service(&services, &name, p).await })
        });
        let revisions = RevisionSource(self.services.clone());
        with_revision_retry(&*handler, &revisions, payload).await
    }

    /// Merge current project state and/or a diff-since-`ifRevision` into a
    /// successful stateful response's `data`, per `includeState`/
    /// `includeDiff` in the payload (defaulting to the tool's policy).
    /// Read-only tools never get anything attached — their `data` already
    /// *is* the requested read.
    async fn attach_state(&self, class: ToolClass, default_attach: bool, payload: &Value, response: ToolResponse<Value>) -> ToolResponse<Value> {
        if class == ToolClass::ReadOnly {
            return response;
        }
        let include_state = payload.get("includeState").and_then(Value::as_bool).unwrap_or(default_attach);
        let include_diff = payload.get("includeDiff").and_then(Value::as_bool).unwrap_or(default_attach);
        if !include_state && !include_diff {
            return response;
        }

        let ToolResponse::Ok { ok, mut data, content, structured_content, next_actions } = response else {
            return response;
        };
        let Ok(current) = self.services.ctx.read_snapshot().await else {
            return ToolResponse::Ok { ok, data, content, structured_content, next_actions };
        };

        if include_state {
            insert(&mut data, "state", serde_json::to_value(&current).unwrap_or(Value::Null));
        }
        if include_diff {
            if let Some(previous) = payload.get("ifRevision").and_then(Value::as_str) {
                let previous_snapshot = self.services.ctx.revisions.lock().await.get(previous).cloned();
                if let Some(previous_snapshot) = previous_snapshot {
                    let diff = mcpforge_diff::diff(&previous_snapshot, &current, true);
                    insert(&mut data, "diff", serde_json::to_value(&diff).unwrap_or(Value::Null));
                }
            }
        }

        ToolResponse::Ok { ok, data, content, structured_content, next_actions }
    }

    fn record(&self, tool_name: &str, payload: &Value, response: &ToolResponse<Value>) {
        let Some(trace) = &self.trace else { return };
        let response_value = serde_json::to_value(response).unwrap_or(Value::Null);
        let ctx = mcpforge_trace::TraceContext {
            state: response_value.get("data").and_then(|d| d.get("state")).cloned(),
            diff: response_value.get("data").and_then(|d| d.get("diff")).cloned(),
            usage: None,
        };
        trace.record(tool_name, Some(payload.clone()), response_value, ctx);
    }
}

fn insert(data: &mut Value, key: &str, value: Value) {
    if let Value::Object(map) = data {
        map.insert(key.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcpforge_services::mock::{MockEngine, MockExporter, MockFormats};
    use mcpforge_services::ServiceContext;
    use mcpforge_core::Limits;
    use serde_json::json;

    fn dispatcher() -> Dispatcher {
        let engine = Arc::new(MockEngine::new());
        let ctx = Arc::new(ServiceContext::new(engine.clone(), engine, Limits::default()));
        let services = Arc::new(Services::new(ctx, Arc::new(MockFormats), Arc::new(MockExporter)));
        Dispatcher::new(Arc::new(ToolRegistry::build()), services, None)
    }

    #[tokio::test]
    async fn unknown_tool_is_rejected() {
        let dispatcher = dispatcher();
        let result = dispatcher.dispatch("does_not_exist", json!({})).await;
        let ToolResponse::Err { error, .. } = result else { panic!("expected error") };
        assert_eq!(error.code, ErrorCode::UnknownTool);
    }

    #[tokio::test]
    async fn schema_violation_is_rejected_before_execution() {
        let dispatcher = dispatcher();
        let result = dispatcher.dispatch("add_texture", json!({"name": "skin"})).await;
        let ToolResponse::Err { error, .. } = result else { panic!("expected error") };
        assert_eq!(error.code, ErrorCode::InvalidPayload);
    }

    #[tokio::test]
    async fn retry_tool_without_if_revision_is_rejected() {
        let dispatcher = dispatcher();
        let result = dispatcher.dispatch("add_bone", json!({"name": "arm"})).await;
        let ToolResponse::Err { error, .. } = result else { panic!("expected error") };
        assert_eq!(error.code, ErrorCode::InvalidStateRevisionMissing);
    }

    #[tokio::test]
    async fn add_bone_with_correct_revision_succeeds_and_attaches_state() {
        let dispatcher = dispatcher();
        let current = dispatcher.dispatch("get_project_state", json!({"detail": "summary"})).await;
        let ToolResponse::Ok { data, .. } = current else { panic!("expected ok") };
        let revision = data["revision"].as_str().unwrap().to_string();

        let result = dispatcher.dispatch("add_bone", json!({"name": "arm", "ifRevision": revision})).await;
        let ToolResponse::Ok { data, .. } = result else { panic!("expected ok") };
        assert!(data.get("state").is_some(), "stateful tools attach state by default");
    }

    #[tokio::test]
    async fn stale_revision_auto_retries_once_and_succeeds() {
        let dispatcher = dispatcher();
        let stale = dispatcher.dispatch("get_project_state", json!({"detail": "summary"})).await;
        let ToolResponse::Ok { data, .. } = stale else { panic!("expected ok") };
        let stale_revision = data["revision"].as_str().unwrap().to_string();

        // Advance the project so `stale_revision` no longer matches current.
        dispatcher.dispatch("add_bone", json!({"name": "first", "ifRevision": stale_revision.clone()})).await;

        // Retried with the stale revision — the dispatcher should rewrite
        // `ifRevision` to current and succeed on the second attempt.
        let result = dispatcher.dispatch("add_bone", json!({"name": "second", "ifRevision": stale_revision})).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn read_only_tools_never_get_state_attached() {
        let dispatcher = dispatcher();
        let result = dispatcher.dispatch("validate_project", json!({})).await;
        let ToolResponse::Ok { data, .. } = result else { panic!("expected ok") };
        assert!(data.get("state").is_none());
    }
}
