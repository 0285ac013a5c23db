// SPDX-License-Identifier: MIT OR Apache-2.0
//! Animation service: `add_animation`, `set_animation_keyframe` (spec §4.7).

use crate::context::ServiceContext;
use mcpforge_core::{ErrorCode, ToolError, ToolResponse};
use serde_json::{json, Value};
use std::sync::Arc;

/// Animation clip and keyframe mutation operations.
pub struct AnimationService {
    ctx: Arc<ServiceContext>,
}

impl AnimationService {
    /// Build an animation service over the shared context.
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    /// `add_animation {id, name?, length?}`.
    ///
    /// Rejects a non-positive length or one past
    /// `limits.maxAnimationSeconds`.
    pub async fn add_animation(&self, params: Value) -> ToolResponse<Value> {
        let Some(id) = params.get("id").and_then(Value::as_str) else {
            return ToolResponse::err(ToolError::simple(ErrorCode::InvalidPayload, "id is required"));
        };
        let length = params.get("length").and_then(Value::as_f64).unwrap_or(1.0);
        if length <= 0.0 || length > self.ctx.limits.max_animation_seconds {
            return ToolResponse::err(ToolError::simple(
                ErrorCode::InvalidState,
                format!("animation length must be in (0, {}]", self.ctx.limits.max_animation_seconds),
            ));
        }
        let before = match self.ctx.read_snapshot().await {
            Ok(s) => s,
            Err(e) => return ToolResponse::err(e),
        };
        if before.animations.iter().any(|a| a.id == id) {
            return ToolResponse::err(ToolError::simple(ErrorCode::InvalidState, format!("animation '{id}' already exists")));
        }
        match self.ctx.mutate("add_animation", params).await {
            Ok((_, _, revision)) => ToolResponse::ok(json!({ "revision": revision })),
            Err(e) => ToolResponse::err(e),
        }
    }

    /// `set_animation_keyframe {clipId, boneId, time, value}`.
    ///
    /// Rejects a bone/clip that does not exist, or a time outside
    /// `[0, clip.length]` (spec §3 invariant, enforced pre-edit here rather
    /// than discovered later by `ProjectSnapshot::validate`).
    pub async fn set_animation_keyframe(&self, params: Value) -> ToolResponse<Value> {
        let Some(clip_id) = params.get("clipId").and_then(Value::as_str) else {
            return ToolResponse::err(ToolError::simple(ErrorCode::InvalidPayload, "clipId is required"));
        };
        let Some(bone_id) = params.get("boneId").and_then(Value::as_str) else {
            return ToolResponse::err(ToolError::simple(ErrorCode::InvalidPayload, "boneId is required"));
        };
        let Some(time) = params.get("time").and_then(Value::as_f64) else {
            return ToolResponse::err(ToolError::simple(ErrorCode::InvalidPayload, "time is required"));
        };

        let before = match self.ctx.read_snapshot().await {
            Ok(s) => s,
            Err(e) => return ToolResponse::err(e),
        };
        let Some(clip) = before.animations.iter().find(|c| c.id == clip_id) else {
            return ToolResponse::err(ToolError::simple(ErrorCode::InvalidState, format!("unknown animation clip '{clip_id}'")));
        };
        if time < 0.0 || time > clip.length {
            return ToolResponse::err(ToolError::simple(
                ErrorCode::InvalidState,
                format!("keyframe time {time} outside clip range [0, {}]", clip.length),
            ));
        }
        if !before.bones.iter().any(|b| b.id == bone_id) {
            return ToolResponse::err(ToolError::simple(ErrorCode::InvalidState, format!("unknown bone '{bone_id}'")));
        }

        match self.ctx.mutate("set_animation_keyframe", params).await {
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
    async fn keyframe_out_of_range_rejected() {
        let model_ctx = ctx();
        let animation_service = AnimationService::new(model_ctx.clone());
        animation_service.add_animation(json!({"id": "walk", "length": 1.0})).await;
        model_ctx.apply("add_bone", json!({"id": "a"})).await.unwrap();

        let result = animation_service
            .set_animation_keyframe(json!({"clipId": "walk", "boneId": "a", "time": 5.0, "value": [0.0, 0.0, 0.0]}))
            .await;
        assert!(!result.is_ok());
    }

    #[tokio::test]
    async fn valid_keyframe_accepted() {
        let model_ctx = ctx();
        let animation_service = AnimationService::new(model_ctx.clone());
        animation_service.add_animation(json!({"id": "walk", "length": 1.0})).await;
        model_ctx.apply("add_bone", json!({"id": "a"})).await.unwrap();

        let result = animation_service
            .set_animation_keyframe(json!({"clipId": "walk", "boneId": "a", "time": 0.5, "value": [0.0, 0.0, 0.0]}))
            .await;
        assert!(result.is_ok());
    }
}
