// SPDX-License-Identifier: MIT OR Apache-2.0
//! Validation service: `validate_project` (spec §4.7).

use crate::context::ServiceContext;
use mcpforge_core::ToolResponse;
use serde_json::{json, Value};
use std::sync::Arc;

/// Runs `ProjectSnapshot::validate()` over the current snapshot and reports
/// every violation, not just the first.
pub struct ValidationService {
    ctx: Arc<ServiceContext>,
}

impl ValidationService {
    /// Build a validation service over the shared context.
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    /// `validate_project {}`. Read-only: never mutates state or tracks a new
    /// revision.
    pub async fn validate_project(&self, _params: Value) -> ToolResponse<Value> {
        let snapshot = match self.ctx.read_snapshot().await {
            Ok(s) => s,
            Err(e) => return ToolResponse::err(e),
        };
        let errors = snapshot.validate();
        let reported: Vec<Value> = errors.iter().map(|e| json!({ "message": e.to_string() })).collect();
        ToolResponse::ok(json!({
            "valid": errors.is_empty(),
            "errors": reported,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockEngine;
    use mcpforge_core::{Cube, Limits};
    use std::sync::Arc;

    #[tokio::test]
    async fn clean_snapshot_reports_valid() {
        let engine = Arc::new(MockEngine::new());
        let ctx = Arc::new(ServiceContext::new(engine.clone(), engine, Limits::default()));
        let service = ValidationService::new(ctx);
        let result = service.validate_project(json!({})).await;
        let ToolResponse::Ok { data, .. } = result else { panic!("expected ok") };
        assert_eq!(data["valid"], json!(true));
    }

    #[tokio::test]
    async fn dangling_bone_ref_reported() {
        let engine = Arc::new(MockEngine::seeded(mcpforge_core::ProjectSnapshot {
            cubes: vec![Cube {
                id: "c1".into(),
                name: "c1".into(),
                bone_id: Some("missing".into()),
                origin: [0.0; 3],
                size: [1.0; 3],
                faces: vec![],
            }],
            ..Default::default()
        }));
        let ctx = Arc::new(ServiceContext::new(engine.clone(), engine, Limits::default()));
        let service = ValidationService::new(ctx);
        let result = service.validate_project(json!({})).await;
        let ToolResponse::Ok { data, .. } = result else { panic!("expected ok") };
        assert_eq!(data["valid"], json!(false));
        assert_eq!(data["errors"].as_array().unwrap().len(), 1);
    }
}
