// SPDX-License-Identifier: MIT OR Apache-2.0
//! Texture service: `add_texture`, `assign_texture`, `set_face_uv`,
//! `paint_faces`, `read_texture`, `preflight_texture` (spec §4.7, §4.6.2).

use crate::context::ServiceContext;
use mcpforge_core::{ErrorCode, ProjectSnapshot, ToolError, ToolResponse};
use serde_json::{json, Value};
use std::sync::Arc;

/// Texture binding and inspection operations.
pub struct TextureService {
    ctx: Arc<ServiceContext>,
}

fn cube_exists(snapshot: &ProjectSnapshot, id: &str) -> bool {
    snapshot.cubes.iter().any(|c| c.id == id)
}

fn texture_exists(snapshot: &ProjectSnapshot, id: &str) -> bool {
    snapshot.textures.iter().any(|t| t.id == id)
}

impl TextureService {
    /// Build a texture service over the shared context.
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    /// `add_texture {id, name?, width?, height?}`.
    ///
    /// Rejects non-positive dimensions, dimensions past
    /// `limits.maxTextureSize`, and duplicate id/name (spec §3 invariant).
    pub async fn add_texture(&self, params: Value) -> ToolResponse<Value> {
        let Some(id) = params.get("id").and_then(Value::as_str) else {
            return ToolResponse::err(ToolError::simple(ErrorCode::InvalidPayload, "id is required"));
        };
        let width = params.get("width").and_then(Value::as_u64).unwrap_or(16);
        let height = params.get("height").and_then(Value::as_u64).unwrap_or(16);
        let max = u64::from(self.ctx.limits.max_texture_size);
        if width == 0 || height == 0 || width > max || height > max {
            return ToolResponse::err(ToolError::simple(
                ErrorCode::InvalidState,
                format!("texture dimensions must be in (0, {max}]"),
            ));
        }
        let before = match self.ctx.read_snapshot().await {
            Ok(s) => s,
            Err(e) => return ToolResponse::err(e),
        };
        let name = params.get("name").and_then(Value::as_str).unwrap_or(id);
        if before.textures.iter().any(|t| t.id == id) {
            return ToolResponse::err(ToolError::simple(ErrorCode::InvalidState, format!("texture id '{id}' already exists")));
        }
        if before.textures.iter().any(|t| t.name == name) {
            return ToolResponse::err(ToolError::simple(ErrorCode::InvalidState, format!("texture name '{name}' already exists")));
        }
        match self.ctx.mutate("add_texture", params).await {
            Ok((_, _, revision)) => ToolResponse::ok(json!({ "revision": revision })),
            Err(e) => ToolResponse::err(e),
        }
    }

    /// `assign_texture {cubeId, direction, textureId}`.
    pub async fn assign_texture(&self, params: Value) -> ToolResponse<Value> {
        if let Some(e) = self.check_face_targets(&params, true).await {
            return ToolResponse::err(e);
        }
        match self.ctx.mutate("assign_texture", params).await {
            Ok((_, _, revision)) => ToolResponse::ok(json!({ "revision": revision })),
            Err(e) => ToolResponse::err(e),
        }
    }

    /// `set_face_uv {cubeId, direction, uv}`. Does not touch the bound
    /// texture, only the UV rectangle.
    pub async fn set_face_uv(&self, params: Value) -> ToolResponse<Value> {
        if let Some(e) = self.check_face_targets(&params, false).await {
            return ToolResponse::err(e);
        }
        match self.ctx.mutate("set_face_uv", params).await {
            Ok((_, _, revision)) => ToolResponse::ok(json!({ "revision": revision })),
            Err(e) => ToolResponse::err(e),
        }
    }

    /// `paint_faces {faces: [{cubeId, direction}], textureId}` — bulk
    /// `assign_texture` over many faces in one call.
    pub async fn paint_faces(&self, params: Value) -> ToolResponse<Value> {
        let before = match self.ctx.read_snapshot().await {
            Ok(s) => s,
            Err(e) => return ToolResponse::err(e),
        };
        let Some(faces) = params.get("faces").and_then(Value::as_array) else {
            return ToolResponse::err(ToolError::simple(ErrorCode::InvalidPayload, "faces is required"));
        };
        for entry in faces {
            let Some(cube_id) = entry.get("cubeId").and_then(Value::as_str) else {
                return ToolResponse::err(ToolError::simple(ErrorCode::InvalidPayload, "faces[].cubeId is required"));
            };
            if !cube_exists(&before, cube_id) {
                return ToolResponse::err(ToolError::simple(ErrorCode::InvalidState, format!("unknown cube '{cube_id}'")));
            }
        }
        if let Some(texture_id) = params.get("textureId").and_then(Value::as_str) {
            if !texture_exists(&before, texture_id) {
                return ToolResponse::err(ToolError::simple(ErrorCode::InvalidState, format!("unknown texture '{texture_id}'")));
            }
        }
        match self.ctx.mutate("paint_faces", params).await {
            Ok((_, _, revision)) => ToolResponse::ok(json!({ "revision": revision })),
            Err(e) => ToolResponse::err(e),
        }
    }

    /// `read_texture {id}`. Returns texture metadata; the dispatcher's
    /// response decoration (spec §4.6.2) converts this into an MCP `image`
    /// content block for real adapters. The mock adapter has no raster
    /// backing store, so `dataUri` is a placeholder.
    pub async fn read_texture(&self, params: Value) -> ToolResponse<Value> {
        let Some(id) = params.get("id").and_then(Value::as_str) else {
            return ToolResponse::err(ToolError::simple(ErrorCode::InvalidPayload, "id is required"));
        };
        let snapshot = match self.ctx.read_snapshot().await {
            Ok(s) => s,
            Err(e) => return ToolResponse::err(e),
        };
        let Some(texture) = snapshot.textures.iter().find(|t| t.id == id) else {
            return ToolResponse::err(ToolError::simple(ErrorCode::InvalidState, format!("unknown texture '{id}'")));
        };
        ToolResponse::ok(json!({
            "id": texture.id,
            "name": texture.name,
            "width": texture.width,
            "height": texture.height,
            "dataUri": "data:image/png;base64,",
        }))
    }

    /// `preflight_texture {width, height}`. Dry-run validity check against
    /// `limits.maxTextureSize`, without mutating state.
    pub async fn preflight_texture(&self, params: Value) -> ToolResponse<Value> {
        let width = params.get("width").and_then(Value::as_u64).unwrap_or(0);
        let height = params.get("height").and_then(Value::as_u64).unwrap_or(0);
        let max = u64::from(self.ctx.limits.max_texture_size);
        let mut issues = Vec::new();
        if width == 0 || height == 0 {
            issues.push("width and height must be positive".to_string());
        }
        if width > max || height > max {
            issues.push(format!("dimensions exceed maxTextureSize ({max})"));
        }
        ToolResponse::ok(json!({ "valid": issues.is_empty(), "issues": issues }))
    }

    async fn check_face_targets(&self, params: &Value, check_texture: bool) -> Option<ToolError> {
        let before = match self.ctx.read_snapshot().await {
            Ok(s) => s,
            Err(e) => return Some(e),
        };
        let Some(cube_id) = params.get("cubeId").and_then(Value::as_str) else {
            return Some(ToolError::simple(ErrorCode::InvalidPayload, "cubeId is required"));
        };
        if !cube_exists(&before, cube_id) {
            return Some(ToolError::simple(ErrorCode::InvalidState, format!("unknown cube '{cube_id}'")));
        }
        if check_texture {
            if let Some(texture_id) = params.get("textureId").and_then(Value::as_str) {
                if !texture_exists(&before, texture_id) {
                    return Some(ToolError::simple(ErrorCode::InvalidState, format!("unknown texture '{texture_id}'")));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockEngine;
    use mcpforge_core::Limits;

    fn ctx(limits: Limits) -> Arc<ServiceContext> {
        let engine = Arc::new(MockEngine::new());
        Arc::new(ServiceContext::new(engine.clone(), engine, limits))
    }

    #[tokio::test]
    async fn add_texture_over_max_size_rejected() {
        let service = TextureService::new(ctx(Limits { max_texture_size: 64, ..Limits::default() }));
        let result = service.add_texture(json!({"id": "t1", "width": 128, "height": 128})).await;
        assert!(!result.is_ok());
    }

    #[tokio::test]
    async fn assign_texture_to_unknown_cube_rejected() {
        let service = TextureService::new(ctx(Limits::default()));
        let result = service.assign_texture(json!({"cubeId": "missing", "direction": "north", "textureId": "t1"})).await;
        assert!(!result.is_ok());
    }

    #[tokio::test]
    async fn preflight_reports_issues_without_mutating() {
        let service = TextureService::new(ctx(Limits { max_texture_size: 32, ..Limits::default() }));
        let result = service.preflight_texture(json!({"width": 64, "height": 64})).await;
        let ToolResponse::Ok { data, .. } = result else { panic!("expected ok") };
        assert_eq!(data["valid"], json!(false));
    }
}
