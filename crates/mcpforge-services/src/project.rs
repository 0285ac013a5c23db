// SPDX-License-Identifier: MIT OR Apache-2.0
//! Project service: `get_project_state`, `ensure_project` (spec §4.7).

use crate::context::ServiceContext;
use crate::mock::OP_REPLACE_SNAPSHOT;
use crate::template::ProjectTemplateRegistry;
use mcpforge_core::{ErrorCode, ToolError, ToolResponse};
use serde_json::{json, Value};
use std::sync::Arc;

/// Project-level operations: reading current state and first-creation.
pub struct ProjectService {
    ctx: Arc<ServiceContext>,
    templates: ProjectTemplateRegistry,
}

impl ProjectService {
    /// Build a project service over the shared context and the default
    /// (built-in `"blank"`-only) template registry.
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self {
            ctx,
            templates: ProjectTemplateRegistry::default(),
        }
    }

    /// `get_project_state {detail: "summary"|"full"}`.
    ///
    /// `summary` returns only `{revision}`; `full` additionally includes
    /// the serialized snapshot under `state`.
    pub async fn get_project_state(&self, params: Value) -> ToolResponse<Value> {
        let detail = params.get("detail").and_then(Value::as_str).unwrap_or("summary");
        let snapshot = match self.ctx.read_snapshot().await {
            Ok(s) => s,
            Err(e) => return ToolResponse::err(e),
        };
        let revision = self.ctx.revisions.lock().await.track(&snapshot);
        let mut data = json!({ "revision": revision });
        if detail == "full" {
            data["state"] = serde_json::to_value(&snapshot).unwrap_or(Value::Null);
        }
        ToolResponse::ok(data)
    }

    /// `ensure_project {projectId, name, template?}`.
    ///
    /// Idempotent: if a project with `projectId` already exists, returns
    /// its current revision without mutating. Otherwise seeds a fresh
    /// snapshot from the named template (default `"blank"`).
    pub async fn ensure_project(&self, params: Value) -> ToolResponse<Value> {
        let Some(project_id) = params.get("projectId").and_then(Value::as_str) else {
            return ToolResponse::err(ToolError::simple(ErrorCode::InvalidPayload, "projectId is required"));
        };
        let name = params.get("name").and_then(Value::as_str).unwrap_or(project_id);

        let current = match self.ctx.read_snapshot().await {
            Ok(s) => s,
            Err(e) => return ToolResponse::err(e),
        };
        if !current.id.is_empty() && current.id == project_id {
            let revision = self.ctx.revisions.lock().await.track(&current);
            return ToolResponse::ok(json!({ "revision": revision, "created": false }));
        }

        let template_name = params.get("template").and_then(Value::as_str).unwrap_or("blank");
        let template = self.templates.get(template_name).unwrap_or_else(|| self.templates.default_template());
        let seeded = template.seed(project_id, name);
        let seeded_value = serde_json::to_value(&seeded).expect("ProjectSnapshot always serializes");

        if let Err(e) = self.ctx.apply(OP_REPLACE_SNAPSHOT, seeded_value).await {
            return ToolResponse::err(e);
        }
        let after = match self.ctx.read_snapshot().await {
            Ok(s) => s,
            Err(e) => return ToolResponse::err(e),
        };
        let revision = self.ctx.revisions.lock().await.track(&after);
        ToolResponse::ok(json!({ "revision": revision, "created": true }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockEngine;
    use mcpforge_core::Limits;

    fn ctx() -> Arc<ServiceContext> {
        let engine = Arc::new(MockEngine::new());
        Arc::new(ServiceContext::new(engine.clone(), engine, Limits::default()))
    }

    #[tokio::test]
    async fn ensure_project_creates_then_is_idempotent() {
        let service = ProjectService::new(ctx());
        let first = service.ensure_project(json!({"projectId": "p1", "name": "Demo"})).await;
        assert!(first.is_ok());

        let second = service.ensure_project(json!({"projectId": "p1", "name": "Demo"})).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn get_project_state_summary_omits_full_state() {
        let service = ProjectService::new(ctx());
        service.ensure_project(json!({"projectId": "p1", "name": "Demo"})).await;
        let summary = service.get_project_state(json!({"detail": "summary"})).await;
        let ToolResponse::Ok { data, .. } = summary else { panic!("expected ok") };
        assert!(data.get("state").is_none());

        let full = service.get_project_state(json!({"detail": "full"})).await;
        let ToolResponse::Ok { data, .. } = full else { panic!("expected ok") };
        assert!(data.get("state").is_some());
    }
}
