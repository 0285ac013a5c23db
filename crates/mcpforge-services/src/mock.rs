// SPDX-License-Identifier: MIT OR Apache-2.0
//! In-memory adapter implementing every port, for local running and tests
//! — the role `abp-backend-mock` plays for the teacher's real sidecar
//! backends.

use async_trait::async_trait;
use mcpforge_core::ports::{Editor, ExportError, Exporter, Formats, SnapshotPort, TmpStore};
use mcpforge_core::{AnimationChannel, AnimationClip, Bone, Cube, Face, FaceDirection, Keyframe, Mesh, ProjectSnapshot, Texture};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Mutex as StdMutex;
use tokio::sync::Mutex;

/// The op name used to seed/replace a project's entire snapshot, used by
/// `ensure_project`'s first-creation path.
pub const OP_REPLACE_SNAPSHOT: &str = "replace_snapshot";

fn str_field(params: &Value, field: &str) -> Option<String> {
    params.get(field).and_then(Value::as_str).map(str::to_string)
}

fn f64_array3(params: &Value, field: &str) -> Option<[f64; 3]> {
    let arr = params.get(field)?.as_array()?;
    if arr.len() != 3 {
        return None;
    }
    Some([arr[0].as_f64()?, arr[1].as_f64()?, arr[2].as_f64()?])
}

/// An in-memory, single-project authoring engine stand-in.
pub struct MockEngine {
    snapshot: Mutex<ProjectSnapshot>,
    tmp: StdMutex<BTreeMap<String, Vec<u8>>>,
}

impl MockEngine {
    /// Start with an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self {
            snapshot: Mutex::new(ProjectSnapshot::default()),
            tmp: StdMutex::new(BTreeMap::new()),
        }
    }

    /// Seed an initial snapshot, e.g. from a [`crate::template::ProjectTemplate`].
    #[must_use]
    pub fn seeded(snapshot: ProjectSnapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
            tmp: StdMutex::new(BTreeMap::new()),
        }
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SnapshotPort for MockEngine {
    async fn snapshot(&self) -> Result<ProjectSnapshot, String> {
        Ok(self.snapshot.lock().await.clone())
    }
}

#[async_trait]
impl Editor for MockEngine {
    async fn apply(&self, op: &str, params: Value) -> Result<(), String> {
        let mut snap = self.snapshot.lock().await;
        match op {
            OP_REPLACE_SNAPSHOT => {
                *snap = serde_json::from_value(params).map_err(|e| e.to_string())?;
            }
            "add_bone" => {
                let id = str_field(&params, "id").ok_or("missing id")?;
                let name = str_field(&params, "name").unwrap_or_else(|| id.clone());
                let parent = str_field(&params, "parent");
                let pivot = f64_array3(&params, "pivot").unwrap_or([0.0; 3]);
                let rotation = f64_array3(&params, "rotation").unwrap_or([0.0; 3]);
                snap.bones.push(Bone { id, name, parent, pivot, rotation });
            }
            "update_bone" => {
                let id = str_field(&params, "id").ok_or("missing id")?;
                let bone = snap.bones.iter_mut().find(|b| b.id == id).ok_or("unknown bone")?;
                if let Some(name) = str_field(&params, "name") {
                    bone.name = name;
                }
                if params.get("parent").is_some() {
                    bone.parent = str_field(&params, "parent");
                }
                if let Some(pivot) = f64_array3(&params, "pivot") {
                    bone.pivot = pivot;
                }
                if let Some(rotation) = f64_array3(&params, "rotation") {
                    bone.rotation = rotation;
                }
            }
            "remove_bone" => {
                let id = str_field(&params, "id").ok_or("missing id")?;
                let before = snap.bones.len();
                snap.bones.retain(|b| b.id != id);
                if snap.bones.len() == before {
                    return Err("unknown bone".to_string());
                }
            }
            "add_cube" => {
                let id = str_field(&params, "id").ok_or("missing id")?;
                let name = str_field(&params, "name").unwrap_or_else(|| id.clone());
                let bone_id = str_field(&params, "boneId");
                let origin = f64_array3(&params, "origin").unwrap_or([0.0; 3]);
                let size = f64_array3(&params, "size").unwrap_or([1.0; 3]);
                snap.cubes.push(Cube { id, name, bone_id, origin, size, faces: Vec::new() });
            }
            "update_cube" => {
                let id = str_field(&params, "id").ok_or("missing id")?;
                let cube = snap.cubes.iter_mut().find(|c| c.id == id).ok_or("unknown cube")?;
                if let Some(name) = str_field(&params, "name") {
                    cube.name = name;
                }
                if params.get("boneId").is_some() {
                    cube.bone_id = str_field(&params, "boneId");
                }
                if let Some(origin) = f64_array3(&params, "origin") {
                    cube.origin = origin;
                }
                if let Some(size) = f64_array3(&params, "size") {
                    cube.size = size;
                }
            }
            "remove_cube" => {
                let id = str_field(&params, "id").ok_or("missing id")?;
                let before = snap.cubes.len();
                snap.cubes.retain(|c| c.id != id);
                if snap.cubes.len() == before {
                    return Err("unknown cube".to_string());
                }
            }
            "add_mesh" => {
                let id = str_field(&params, "id").ok_or("missing id")?;
                let name = str_field(&params, "name").unwrap_or_else(|| id.clone());
                let bone_id = str_field(&params, "boneId");
                let vertices = params
                    .get("vertices")
                    .and_then(Value::as_array)
                    .map(|arr| arr.iter().filter_map(Value::as_f64).collect())
                    .unwrap_or_default();
                let indices = params
                    .get("indices")
                    .and_then(Value::as_array)
                    .map(|arr| arr.iter().filter_map(|v| v.as_u64().map(|n| n as u32)).collect())
                    .unwrap_or_default();
                snap.meshes.push(Mesh { id, name, bone_id, vertices, indices });
            }
            "add_texture" => {
                let id = str_field(&params, "id").ok_or("missing id")?;
                let name = str_field(&params, "name").unwrap_or_else(|| id.clone());
                let width = params.get("width").and_then(Value::as_u64).unwrap_or(16) as u32;
                let height = params.get("height").and_then(Value::as_u64).unwrap_or(16) as u32;
                snap.textures.push(Texture { id, name, width, height });
            }
            "assign_texture" | "set_face_uv" | "paint_faces" => {
                apply_face_edit(&mut snap, op, &params)?;
            }
            "add_animation" => {
                let id = str_field(&params, "id").ok_or("missing id")?;
                let name = str_field(&params, "name").unwrap_or_else(|| id.clone());
                let length = params.get("length").and_then(Value::as_f64).unwrap_or(1.0);
                snap.animations.push(AnimationClip { id, name, length, channels: Vec::new() });
            }
            "set_animation_keyframe" => {
                let clip_id = str_field(&params, "clipId").ok_or("missing clipId")?;
                let bone_id = str_field(&params, "boneId").ok_or("missing boneId")?;
                let time = params.get("time").and_then(Value::as_f64).ok_or("missing time")?;
                let value = f64_array3(&params, "value").unwrap_or([0.0; 3]);
                let clip = snap.animations.iter_mut().find(|c| c.id == clip_id).ok_or("unknown clip")?;
                let channel = match clip.channels.iter_mut().find(|ch| ch.bone_id == bone_id) {
                    Some(ch) => ch,
                    None => {
                        clip.channels.push(AnimationChannel { bone_id: bone_id.clone(), keyframes: Vec::new() });
                        clip.channels.last_mut().expect("just pushed")
                    }
                };
                channel.keyframes.retain(|k| k.time != time);
                channel.keyframes.push(Keyframe { time, value });
                channel.keyframes.sort_by(|a, b| a.time.total_cmp(&b.time));
            }
            other => return Err(format!("unsupported op: {other}")),
        }
        Ok(())
    }
}

fn apply_face_edit(snap: &mut ProjectSnapshot, op: &str, params: &Value) -> Result<(), String> {
    let targets: Vec<(String, FaceDirection)> = if op == "paint_faces" {
        params
            .get("faces")
            .and_then(Value::as_array)
            .ok_or("missing faces")?
            .iter()
            .filter_map(|entry| {
                let cube_id = entry.get("cubeId")?.as_str()?.to_string();
                let direction = parse_direction(entry.get("direction")?.as_str()?)?;
                Some((cube_id, direction))
            })
            .collect()
    } else {
        let cube_id = str_field(params, "cubeId").ok_or("missing cubeId")?;
        let direction = parse_direction(params.get("direction").and_then(Value::as_str).ok_or("missing direction")?)
            .ok_or("invalid direction")?;
        vec![(cube_id, direction)]
    };

    let texture_id = str_field(params, "textureId");
    let uv = params
        .get("uv")
        .and_then(Value::as_array)
        .and_then(|arr| {
            if arr.len() == 4 {
                Some([arr[0].as_f64()?, arr[1].as_f64()?, arr[2].as_f64()?, arr[3].as_f64()?])
            } else {
                None
            }
        });

    for (cube_id, direction) in targets {
        let cube = snap.cubes.iter_mut().find(|c| c.id == cube_id).ok_or("unknown cube")?;
        match cube.faces.iter_mut().find(|(d, _)| *d == direction) {
            Some((_, face)) => {
                if op != "set_face_uv" {
                    face.texture_id = texture_id.clone();
                }
                if let Some(uv) = uv {
                    face.uv = uv;
                }
            }
            None => {
                cube.faces.push((
                    direction,
                    Face {
                        uv: uv.unwrap_or([0.0, 0.0, 16.0, 16.0]),
                        texture_id: texture_id.clone(),
                        rotation: 0,
                    },
                ));
            }
        }
    }
    Ok(())
}

fn parse_direction(value: &str) -> Option<FaceDirection> {
    match value {
        "north" => Some(FaceDirection::North),
        "east" => Some(FaceDirection::East),
        "south" => Some(FaceDirection::South),
        "west" => Some(FaceDirection::West),
        "up" => Some(FaceDirection::Up),
        "down" => Some(FaceDirection::Down),
        _ => None,
    }
}

#[async_trait]
impl TmpStore for MockEngine {
    async fn put(&self, bytes: Vec<u8>) -> Result<String, String> {
        let key = uuid::Uuid::new_v4().to_string();
        self.tmp.lock().expect("tmp store lock poisoned").insert(key.clone(), bytes);
        Ok(key)
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, String> {
        Ok(self.tmp.lock().expect("tmp store lock poisoned").get(key).cloned())
    }
}

/// In-internal-format-only export target resolution: every `format_id` not
/// equal to `"native_codec"` is internal; no codecs are allow-listed by
/// default (callers configure allow-listing separately in production).
pub struct MockFormats;

impl Formats for MockFormats {
    fn is_internal(&self, format_id: &str) -> bool {
        format_id != "native_codec"
    }

    fn is_allow_listed_codec(&self, _codec_id: &str) -> bool {
        false
    }
}

/// Writes export artifacts as in-memory JSON blobs via [`TmpStore`]-style
/// bookkeeping; good enough for tests and local running, not a real glTF
/// writer.
pub struct MockExporter;

#[async_trait]
impl Exporter for MockExporter {
    async fn export(
        &self,
        snapshot: &ProjectSnapshot,
        format_id: &str,
        codec_id: Option<&str>,
    ) -> Result<Vec<String>, ExportError> {
        match format_id {
            "gltf" => Ok(vec![".geo.json".to_string(), ".animation.json".to_string(), ".gltf".to_string()]),
            "native_codec" => match codec_id {
                Some(_) => Err(ExportError::NotImplemented("native codec writer not implemented".to_string())),
                None => Err(ExportError::UnsupportedFormat("native_codec requires codecId".to_string())),
            },
            "generic" => {
                let _ = serde_json::to_vec(snapshot).map_err(|e| ExportError::Io(e.to_string()))?;
                Ok(vec![".geo.json".to_string()])
            }
            other => Err(ExportError::UnsupportedFormat(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn add_bone_then_snapshot_reflects_it() {
        let engine = MockEngine::new();
        engine.apply("add_bone", json!({"id": "b1", "name": "root"})).await.unwrap();
        let snap = engine.snapshot().await.unwrap();
        assert_eq!(snap.bones.len(), 1);
        assert_eq!(snap.bones[0].id, "b1");
    }

    #[tokio::test]
    async fn remove_unknown_bone_errors() {
        let engine = MockEngine::new();
        let err = engine.apply("remove_bone", json!({"id": "missing"})).await.unwrap_err();
        assert_eq!(err, "unknown bone");
    }

    #[tokio::test]
    async fn set_face_uv_creates_face_without_texture() {
        let engine = MockEngine::new();
        engine.apply("add_cube", json!({"id": "c1"})).await.unwrap();
        engine
            .apply("set_face_uv", json!({"cubeId": "c1", "direction": "north", "uv": [0.0, 0.0, 8.0, 8.0]}))
            .await
            .unwrap();
        let snap = engine.snapshot().await.unwrap();
        assert_eq!(snap.cubes[0].faces.len(), 1);
        assert!(snap.cubes[0].faces[0].1.texture_id.is_none());
    }
}
