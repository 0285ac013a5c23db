// SPDX-License-Identifier: MIT OR Apache-2.0
//! Reshapes each tool's wire-level payload (registry `inputSchema` field
//! names) into the parameter shape its `mcpforge-services` method expects,
//! then invokes that method.
//!
//! The registry's wire schema never accepts a client-supplied id for a
//! creation call (`add_bone`, `add_cube`, `add_mesh`, `add_texture`,
//! `add_animation`) — only addressing calls (`update_*`, `remove_*`,
//! `assign_texture`, ...) take one. This module mints a fresh id for every
//! creation call before handing the payload to its service.
//!
//! A handful of wire field names also differ from their service
//! counterpart (`face` vs `direction`, `animationId` vs `clipId`) for
//! reasons with no bearing on the service layer — that rename happens here
//! too, once per call.

use crate::services::Services;
use mcpforge_core::{ErrorCode, ToolError, ToolResponse};
use serde_json::{json, Value};
use uuid::Uuid;

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Enforce `ifRevision` against the project's current revision. Neither
/// the mock adapter's `apply` nor any `mcpforge-services` method checks
/// this itself — the tool-call payload's `ifRevision` is purely an
/// optimistic-concurrency token the dispatcher owns end to end.
async fn check_revision(services: &Services, if_revision: &str) -> Result<(), ToolError> {
    let snapshot = services.ctx.read_snapshot().await?;
    let current = services.ctx.revisions.lock().await.track(&snapshot);
    if if_revision == current {
        Ok(())
    } else {
        Err(ToolError::revision_mismatch(if_revision, &current))
    }
}

fn with_id(mut payload: Value, id: String) -> Value {
    if let Value::Object(ref mut map) = payload {
        map.insert("id".to_string(), Value::String(id));
    }
    payload
}

fn rename(mut payload: Value, from: &str, to: &str) -> Value {
    if let Value::Object(ref mut map) = payload {
        if let Some(value) = map.remove(from) {
            map.insert(to.to_string(), value);
        }
    }
    payload
}

/// Translate `assign_texture`/`set_face_uv`'s wire `faces: [direction, ...]`
/// against one `cubeId` into the service's per-face target list.
fn paint_faces_payload(wire: &Value) -> ToolResponse<Value> {
    let Some(cube_id) = wire.get("cubeId").and_then(Value::as_str) else {
        return ToolResponse::err(ToolError::simple(ErrorCode::InvalidPayload, "cubeId is required"));
    };
    let Some(faces) = wire.get("faces").and_then(Value::as_array) else {
        return ToolResponse::err(ToolError::simple(ErrorCode::InvalidPayload, "faces is required"));
    };
    let targets: Vec<Value> = faces
        .iter()
        .map(|direction| json!({ "cubeId": cube_id, "direction": direction }))
        .collect();
    ToolResponse::ok(json!({ "faces": targets }))
}

/// Derive the `ensure_project` service payload `{projectId, name, template}`
/// from the wire payload `{name, formatId}`. Reuses the already-seeded
/// project's id when one exists, so repeated `ensure_project` calls for the
/// same running workspace stay idempotent regardless of what `name` the
/// caller passes.
async fn ensure_project_payload(services: &Services, wire: &Value) -> Result<Value, ToolError> {
    let name = wire.get("name").and_then(Value::as_str).unwrap_or("untitled");
    let format_id = wire.get("formatId").and_then(Value::as_str);
    let current = services.ctx.read_snapshot().await?;
    let project_id = if current.id.is_empty() { new_id() } else { current.id.clone() };
    let mut payload = json!({ "projectId": project_id, "name": name });
    if let Some(format_id) = format_id {
        payload["template"] = Value::String(format_id.to_string());
    }
    Ok(payload)
}

/// Invoke the service method for `tool_name`, translating `wire_payload`
/// into that method's expected shape first.
///
/// This is the sole entry point both the plain and auto-retried execution
/// paths call — the retry wrapper re-invokes it verbatim with a rewritten
/// `ifRevision`, so translation (including fresh id minting for creation
/// calls) reruns on every attempt.
pub async fn call_service(services: &Services, tool_name: &str, wire_payload: Value) -> ToolResponse<Value> {
    if let Some(if_revision) = wire_payload.get("ifRevision").and_then(Value::as_str) {
        if let Err(e) = check_revision(services, if_revision).await {
            return ToolResponse::err(e);
        }
    }
    match tool_name {
        "get_project_state" => services.project.get_project_state(wire_payload).await,
        "ensure_project" => match ensure_project_payload(services, &wire_payload).await {
            Ok(payload) => services.project.ensure_project(payload).await,
            Err(e) => ToolResponse::err(e),
        },
        "render_preview" => services.render.render_preview(wire_payload).await,
        "read_texture" => {
            let translated = rename(wire_payload, "textureId", "id");
            services.texture.read_texture(translated).await
        }
        "preflight_texture" => services.texture.preflight_texture(wire_payload).await,
        "export_project" => services.export.export_project(wire_payload).await,
        "validate_project" => services.validation.validate_project(wire_payload).await,

        "add_bone" => services.model.add_bone(with_id(wire_payload, new_id())).await,
        "update_bone" => services.model.update_bone(wire_payload).await,
        "remove_bone" => services.model.remove_bone(wire_payload).await,

        "add_cube" => services.model.add_cube(with_id(wire_payload, new_id())).await,
        "update_cube" => services.model.update_cube(wire_payload).await,
        "remove_cube" => services.model.remove_cube(wire_payload).await,

        "add_mesh" => services.model.add_mesh(with_id(wire_payload, new_id())).await,

        "add_texture" => services.texture.add_texture(with_id(wire_payload, new_id())).await,
        "assign_texture" => {
            let translated = rename(wire_payload, "face", "direction");
            services.texture.assign_texture(translated).await
        }
        "set_face_uv" => {
            let translated = rename(wire_payload, "face", "direction");
            services.texture.set_face_uv(translated).await
        }
        "paint_faces" => match paint_faces_payload(&wire_payload) {
            ToolResponse::Ok { data, .. } => services.texture.paint_faces(data).await,
            err @ ToolResponse::Err { .. } => err,
        },

        "add_animation" => services.animation.add_animation(with_id(wire_payload, new_id())).await,
        "set_animation_keyframe" => {
            let translated = rename(wire_payload, "animationId", "clipId");
            services.animation.set_animation_keyframe(translated).await
        }

        _ => ToolResponse::err(ToolError::simple(ErrorCode::UnknownTool, format!("unknown tool '{tool_name}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcpforge_services::mock::{MockEngine, MockExporter, MockFormats};
    use mcpforge_services::ServiceContext;
    use mcpforge_core::Limits;
    use std::sync::Arc;

    fn services() -> Services {
        let engine = Arc::new(MockEngine::new());
        let ctx = Arc::new(ServiceContext::new(engine.clone(), engine, Limits::default()));
        Services::new(ctx, Arc::new(MockFormats), Arc::new(MockExporter))
    }

    #[tokio::test]
    async fn add_bone_mints_an_id_not_present_on_the_wire() {
        let services = services();
        let result = call_service(&services, "add_bone", json!({"name": "arm"})).await;
        assert!(result.is_ok());
        let snapshot = services.ctx.read_snapshot().await.unwrap();
        assert_eq!(snapshot.bones.len(), 1);
        assert!(!snapshot.bones[0].id.is_empty());
    }

    #[tokio::test]
    async fn assign_texture_translates_face_to_direction() {
        let services = services();
        call_service(&services, "add_cube", json!({"name": "body"})).await;
        let cube_id = services.ctx.read_snapshot().await.unwrap().cubes[0].id.clone();
        call_service(&services, "add_texture", json!({"name": "skin", "width": 16, "height": 16})).await;
        let texture_id = services.ctx.read_snapshot().await.unwrap().textures[0].id.clone();
        let result = call_service(
            &services,
            "assign_texture",
            json!({"cubeId": cube_id, "face": "north", "textureId": texture_id}),
        )
        .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn paint_faces_fans_a_single_cube_out_to_many_targets() {
        let services = services();
        call_service(&services, "add_cube", json!({"name": "body"})).await;
        let cube_id = services.ctx.read_snapshot().await.unwrap().cubes[0].id.clone();
        let result = call_service(
            &services,
            "paint_faces",
            json!({"cubeId": cube_id, "faces": ["north", "south"]}),
        )
        .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn ensure_project_reuses_existing_id_on_repeat_calls() {
        let services = services();
        let first = call_service(&services, "ensure_project", json!({"name": "demo", "formatId": "generic"})).await;
        assert!(first.is_ok());
        let id_after_first = services.ctx.read_snapshot().await.unwrap().id;

        let second = call_service(&services, "ensure_project", json!({"name": "demo", "formatId": "generic"})).await;
        assert!(second.is_ok());
        let id_after_second = services.ctx.read_snapshot().await.unwrap().id;
        assert_eq!(id_after_first, id_after_second);
    }
}
