// SPDX-License-Identifier: MIT OR Apache-2.0
//! Model service: bones, cubes, meshes (spec §4.7).

use crate::context::ServiceContext;
use mcpforge_core::{ErrorCode, ProjectSnapshot, ToolError, ToolResponse};
use serde_json::{json, Value};
use std::sync::Arc;

/// Bone/cube/mesh mutation operations.
pub struct ModelService {
    ctx: Arc<ServiceContext>,
}

fn bone_exists(snapshot: &ProjectSnapshot, id: &str) -> bool {
    snapshot.bones.iter().any(|b| b.id == id)
}

fn id_or_invalid_payload(params: &Value, field: &str) -> Result<String, ToolError> {
    params
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ToolError::simple(ErrorCode::InvalidPayload, format!("{field} is required")))
}

impl ModelService {
    /// Build a model service over the shared context.
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    /// `add_bone {id, name?, parent?, pivot?, rotation?}`.
    pub async fn add_bone(&self, params: Value) -> ToolResponse<Value> {
        let id = match id_or_invalid_payload(&params, "id") {
            Ok(id) => id,
            Err(e) => return ToolResponse::err(e),
        };
        let before = match self.ctx.read_snapshot().await {
            Ok(s) => s,
            Err(e) => return ToolResponse::err(e),
        };
        if before.bones.iter().any(|b| b.id == id) {
            return ToolResponse::err(ToolError::simple(ErrorCode::InvalidState, format!("bone '{id}' already exists")));
        }
        if let Some(parent) = params.get("parent").and_then(Value::as_str) {
            if !bone_exists(&before, parent) {
                return ToolResponse::err(ToolError::simple(ErrorCode::InvalidState, format!("unknown parent bone '{parent}'")));
            }
        }
        match self.ctx.mutate("add_bone", params).await {
            Ok((_, _, revision)) => ToolResponse::ok(json!({ "revision": revision })),
            Err(e) => ToolResponse::err(e),
        }
    }

    /// `update_bone {id, name?, parent?, pivot?, rotation?}`.
    ///
    /// Rejects a reparent that would make `id` its own ancestor
    /// (`MODEL_BONE_DESCENDANT_PARENT`, spec §4.7).
    pub async fn update_bone(&self, params: Value) -> ToolResponse<Value> {
        let id = match id_or_invalid_payload(&params, "id") {
            Ok(id) => id,
            Err(e) => return ToolResponse::err(e),
        };
        let before = match self.ctx.read_snapshot().await {
            Ok(s) => s,
            Err(e) => return ToolResponse::err(e),
        };
        if !bone_exists(&before, &id) {
            return ToolResponse::err(ToolError::simple(ErrorCode::InvalidState, format!("unknown bone '{id}'")));
        }
        if let Some(parent) = params.get("parent").and_then(Value::as_str) {
            if !parent.is_empty() && before.would_create_cycle(&id, parent) {
                let mut details = std::collections::BTreeMap::new();
                details.insert("reason".to_string(), Value::String("MODEL_BONE_DESCENDANT_PARENT".to_string()));
                return ToolResponse::err(ToolError::new(
                    ErrorCode::InvalidState,
                    format!("cannot parent '{id}' to its own descendant '{parent}'"),
                    details,
                ));
            }
        }
        match self.ctx.mutate("update_bone", params).await {
            Ok((_, _, revision)) => ToolResponse::ok(json!({ "revision": revision })),
            Err(e) => ToolResponse::err(e),
        }
    }

    /// `remove_bone {id}`. Rejected if any cube still references the bone,
    /// since that would leave a dangling reference (spec §3 invariant).
    pub async fn remove_bone(&self, params: Value) -> ToolResponse<Value> {
        let id = match id_or_invalid_payload(&params, "id") {
            Ok(id) => id,
            Err(e) => return ToolResponse::err(e),
        };
        let before = match self.ctx.read_snapshot().await {
            Ok(s) => s,
            Err(e) => return ToolResponse::err(e),
        };
        if before.cubes.iter().any(|c| c.bone_id.as_deref() == Some(id.as_str())) {
            return ToolResponse::err(ToolError::simple(
                ErrorCode::InvalidState,
                format!("bone '{id}' is still referenced by one or more cubes"),
            ));
        }
        match self.ctx.mutate("remove_bone", params).await {
            Ok((_, _, revision)) => ToolResponse::ok(json!({ "revision": revision })),
            Err(e) => ToolResponse::err(e),
        }
    }

    /// `add_cube {id, name?, boneId?, origin?, size?}`.
    pub async fn add_cube(&self, params: Value) -> ToolResponse<Value> {
        let id = match id_or_invalid_payload(&params, "id") {
            Ok(id) => id,
            Err(e) => return ToolResponse::err(e),
        };
        let before = match self.ctx.read_snapshot().await {
            Ok(s) => s,
            Err(e) => return ToolResponse::err(e),
        };
        if before.cubes.iter().any(|c| c.id == id) {
            return ToolResponse::err(ToolError::simple(ErrorCode::InvalidState, format!("cube '{id}' already exists")));
        }
        if before.cubes.len() as u32 >= self.ctx.limits.max_cubes {
            return ToolResponse::err(ToolError::simple(ErrorCode::InvalidState, "maxCubes limit reached"));
        }
        if let Some(bone_id) = params.get("boneId").and_then(Value::as_str) {
            if !bone_exists(&before, bone_id) {
                return ToolResponse::err(ToolError::simple(ErrorCode::InvalidState, format!("unknown bone '{bone_id}'")));
            }
        }
        match self.ctx.mutate("add_cube", params).await {
            Ok((_, _, revision)) => ToolResponse::ok(json!({ "revision": revision })),
            Err(e) => ToolResponse::err(e),
        }
    }

    /// `update_cube {id, name?, boneId?, origin?, size?}`.
    pub async fn update_cube(&self, params: Value) -> ToolResponse<Value> {
        let id = match id_or_invalid_payload(&params, "id") {
            Ok(id) => id,
            Err(e) => return ToolResponse::err(e),
        };
        let before = match self.ctx.read_snapshot().await {
            Ok(s) => s,
            Err(e) => return ToolResponse::err(e),
        };
        if !before.cubes.iter().any(|c| c.id == id) {
            return ToolResponse::err(ToolError::simple(ErrorCode::InvalidState, format!("unknown cube '{id}'")));
        }
        if let Some(bone_id) = params.get("boneId").and_then(Value::as_str) {
            if !bone_id.is_empty() && !bone_exists(&before, bone_id) {
                return ToolResponse::err(ToolError::simple(ErrorCode::InvalidState, format!("unknown bone '{bone_id}'")));
            }
        }
        match self.ctx.mutate("update_cube", params).await {
            Ok((_, _, revision)) => ToolResponse::ok(json!({ "revision": revision })),
            Err(e) => ToolResponse::err(e),
        }
    }

    /// `remove_cube {id}`.
    pub async fn remove_cube(&self, params: Value) -> ToolResponse<Value> {
        match self.ctx.mutate("remove_cube", params).await {
            Ok((_, _, revision)) => ToolResponse::ok(json!({ "revision": revision })),
            Err(e) => ToolResponse::err(e),
        }
    }

    /// `add_mesh {id, name?, boneId?, vertices?, indices?}`.
    pub async fn add_mesh(&self, params: Value) -> ToolResponse<Value> {
        let before = match self.ctx.read_snapshot().await {
            Ok(s) => s,
            Err(e) => return ToolResponse::err(e),
        };
        if let Some(bone_id) = params.get("boneId").and_then(Value::as_str) {
            if !bone_exists(&before, bone_id) {
                return ToolResponse::err(ToolError::simple(ErrorCode::InvalidState, format!("unknown bone '{bone_id}'")));
            }
        }
        match self.ctx.mutate("add_mesh", params).await {
            Ok((_, _, revision)) => ToolResponse::ok(json!({ "revision": revision })),
            Err(e) => ToolResponse::err(e),
        }
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
    async fn add_bone_then_reparent_cycle_rejected() {
        let service = ModelService::new(ctx());
        service.add_bone(json!({"id": "a"})).await;
        service.add_bone(json!({"id": "b", "parent": "a"})).await;
        let result = service.update_bone(json!({"id": "a", "parent": "b"})).await;
        let ToolResponse::Err { error, .. } = result else { panic!("expected error") };
        assert_eq!(error.details.get("reason").and_then(Value::as_str), Some("MODEL_BONE_DESCENDANT_PARENT"));
    }

    #[tokio::test]
    async fn remove_bone_referenced_by_cube_rejected() {
        let service = ModelService::new(ctx());
        service.add_bone(json!({"id": "a"})).await;
        service.add_cube(json!({"id": "c1", "boneId": "a"})).await;
        let result = service.remove_bone(json!({"id": "a"})).await;
        assert!(!result.is_ok());
    }

    #[tokio::test]
    async fn add_cube_over_limit_rejected() {
        let engine = Arc::new(MockEngine::new());
        let ctx = Arc::new(ServiceContext::new(engine.clone(), engine, Limits { max_cubes: 1, ..Limits::default() }));
        let service = ModelService::new(ctx);
        let first = service.add_cube(json!({"id": "c1"})).await;
        assert!(first.is_ok());
        let second = service.add_cube(json!({"id": "c2"})).await;
        assert!(!second.is_ok());
    }
}
