// SPDX-License-Identifier: MIT OR Apache-2.0
//! Project/model entities: bones, cubes, meshes, textures, animation clips,
//! and the [`ProjectSnapshot`] that holds them together (spec §3).

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Content-hash revision of a [`ProjectSnapshot`]. A hex SHA-256 string.
pub type Revision = String;

/// Bone identifier, stable across edits.
pub type BoneId = String;
/// Cube identifier, stable across edits.
pub type CubeId = String;
/// Mesh identifier, stable across edits.
pub type MeshId = String;
/// Texture identifier, stable across edits.
pub type TextureId = String;
/// Animation clip identifier, stable across edits.
pub type AnimationId = String;

/// A skeletal bone. Bones form a tree via `parent`; the root has
/// `parent: None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Bone {
    /// Stable identifier.
    pub id: BoneId,
    /// Display name, unique within a snapshot is NOT required for bones
    /// (only textures carry that constraint per spec §3).
    pub name: String,
    /// Parent bone id, or `None` for a root bone.
    pub parent: Option<BoneId>,
    /// Pivot point in model space.
    pub pivot: [f64; 3],
    /// Rotation in degrees about each axis.
    pub rotation: [f64; 3],
}

/// One of the six axis-aligned faces of a [`Cube`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FaceDirection {
    /// -Z
    North,
    /// +X
    East,
    /// +Z
    South,
    /// -X
    West,
    /// +Y
    Up,
    /// -Y
    Down,
}

impl FaceDirection {
    /// All six directions, in a fixed canonical order used for iteration.
    pub const ALL: [FaceDirection; 6] = [
        FaceDirection::North,
        FaceDirection::East,
        FaceDirection::South,
        FaceDirection::West,
        FaceDirection::Up,
        FaceDirection::Down,
    ];
}

/// UV-mapped face, optionally bound to a texture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Face {
    /// UV rectangle `[u0, v0, u1, v1]` in texture pixels.
    pub uv: [f64; 4],
    /// Bound texture, if any. Must reference an existing [`Texture`] by id
    /// when present (spec §3 invariant).
    pub texture_id: Option<TextureId>,
    /// Rotation of the UV mapping in multiples of 90 degrees.
    #[serde(default)]
    pub rotation: u16,
}

/// An axis-aligned box element, optionally parented to a [`Bone`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Cube {
    /// Stable identifier.
    pub id: CubeId,
    /// Display name.
    pub name: String,
    /// Owning bone, or `None` if unparented. Must reference an existing
    /// [`Bone`] when present (spec §3 invariant).
    pub bone_id: Option<BoneId>,
    /// Corner origin in model space.
    pub origin: [f64; 3],
    /// Extent along each axis.
    pub size: [f64; 3],
    /// Per-direction face definitions. Absent entries mean "no face".
    pub faces: Vec<(FaceDirection, Face)>,
}

impl Cube {
    /// Iterate the cube's defined faces.
    pub fn faces(&self) -> impl Iterator<Item = &Face> {
        self.faces.iter().map(|(_, f)| f)
    }
}

/// A free-form polygon mesh, distinct from the box-only [`Cube`] element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Mesh {
    /// Stable identifier.
    pub id: MeshId,
    /// Display name.
    pub name: String,
    /// Owning bone, or `None` if unparented.
    pub bone_id: Option<BoneId>,
    /// Flattened vertex positions, 3 floats per vertex.
    pub vertices: Vec<f64>,
    /// Triangle indices into `vertices` (3 per triangle).
    pub indices: Vec<u32>,
}

/// A texture bound to faces by id or name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Texture {
    /// Stable identifier, unique within a snapshot.
    pub id: TextureId,
    /// Display name, unique within a snapshot.
    pub name: String,
    /// Pixel width.
    pub width: u32,
    /// Pixel height.
    pub height: u32,
}

/// A single keyframe on an [`AnimationChannel`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Keyframe {
    /// Time in seconds, within `[0, clip.length]`.
    pub time: f64,
    /// Channel-specific value (position/rotation/scale triple, etc).
    pub value: [f64; 3],
}

/// A single animated property track (e.g. one bone's rotation channel).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnimationChannel {
    /// Target bone.
    pub bone_id: BoneId,
    /// Keyframes, strictly increasing in `time` (spec §3 invariant).
    pub keyframes: Vec<Keyframe>,
}

/// A named animation clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnimationClip {
    /// Stable identifier.
    pub id: AnimationId,
    /// Display name.
    pub name: String,
    /// Clip length in seconds.
    pub length: f64,
    /// Per-bone channels.
    pub channels: Vec<AnimationChannel>,
}

/// The full logical state of a project at a point in time (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct ProjectSnapshot {
    /// Project identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Target export format id (e.g. `"generic"`, `"gltf"`).
    pub format_id: String,
    /// Optional default texture square resolution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texture_resolution: Option<u32>,
    /// Optional UV pixels-per-block scale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uv_pixels_per_block: Option<u32>,
    /// Current content-hash revision. Recomputed by the revision store,
    /// not hand-maintained by callers.
    #[serde(default)]
    pub revision: Revision,
    /// Bones, in insertion order.
    #[serde(default)]
    pub bones: Vec<Bone>,
    /// Cubes, in insertion order.
    #[serde(default)]
    pub cubes: Vec<Cube>,
    /// Meshes, in insertion order.
    #[serde(default)]
    pub meshes: Vec<Mesh>,
    /// Textures, in insertion order.
    #[serde(default)]
    pub textures: Vec<Texture>,
    /// Animation clips, in insertion order.
    #[serde(default)]
    pub animations: Vec<AnimationClip>,
}

/// Invariant violations detected by [`ProjectSnapshot::validate`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    /// A cube references a bone id that does not exist.
    #[error("cube '{cube}' references unknown bone '{bone}'")]
    DanglingBoneRef {
        /// Offending cube id.
        cube: CubeId,
        /// Missing bone id.
        bone: BoneId,
    },
    /// A face references a texture id that does not exist.
    #[error("cube '{cube}' face references unknown texture '{texture}'")]
    DanglingTextureRef {
        /// Offending cube id.
        cube: CubeId,
        /// Missing texture id.
        texture: TextureId,
    },
    /// Two textures share an id.
    #[error("duplicate texture id '{0}'")]
    DuplicateTextureId(TextureId),
    /// Two textures share a name.
    #[error("duplicate texture name '{0}'")]
    DuplicateTextureName(String),
    /// An animation channel's keyframes are not strictly increasing in time,
    /// or fall outside `[0, length]`.
    #[error("animation '{clip}' channel for bone '{bone}' has out-of-order or out-of-range keyframes")]
    InvalidKeyframeOrdering {
        /// Offending clip id.
        clip: AnimationId,
        /// Offending bone id.
        bone: BoneId,
    },
    /// A bone would become its own ancestor if the edit were applied.
    #[error("bone '{bone}' cannot be parented to its own descendant '{new_parent}'")]
    BoneDescendantParent {
        /// Bone being reparented.
        bone: BoneId,
        /// Proposed new parent, which is a descendant of `bone`.
        new_parent: BoneId,
    },
}

impl ProjectSnapshot {
    /// Validate every invariant in spec §3. Returns every violation found,
    /// not just the first, so callers can report completely.
    pub fn validate(&self) -> Vec<ModelError> {
        let mut errors = Vec::new();
        let bone_ids: BTreeSet<&str> = self.bones.iter().map(|b| b.id.as_str()).collect();
        let texture_ids: BTreeSet<&str> = self.textures.iter().map(|t| t.id.as_str()).collect();

        for cube in &self.cubes {
            if let Some(bone_id) = &cube.bone_id {
                if !bone_ids.contains(bone_id.as_str()) {
                    errors.push(ModelError::DanglingBoneRef {
                        cube: cube.id.clone(),
                        bone: bone_id.clone(),
                    });
                }
            }
            for face in cube.faces() {
                if let Some(tex_id) = &face.texture_id {
                    if !texture_ids.contains(tex_id.as_str()) {
                        errors.push(ModelError::DanglingTextureRef {
                            cube: cube.id.clone(),
                            texture: tex_id.clone(),
                        });
                    }
                }
            }
        }

        let mut seen_ids = BTreeSet::new();
        let mut seen_names = BTreeSet::new();
        for tex in &self.textures {
            if !seen_ids.insert(tex.id.as_str()) {
                errors.push(ModelError::DuplicateTextureId(tex.id.clone()));
            }
            if !seen_names.insert(tex.name.as_str()) {
                errors.push(ModelError::DuplicateTextureName(tex.name.clone()));
            }
        }

        for clip in &self.animations {
            for channel in &clip.channels {
                let in_order = channel
                    .keyframes
                    .windows(2)
                    .all(|w| w[0].time < w[1].time);
                let in_range = channel
                    .keyframes
                    .iter()
                    .all(|k| k.time >= 0.0 && k.time <= clip.length);
                if !in_order || !in_range {
                    errors.push(ModelError::InvalidKeyframeOrdering {
                        clip: clip.id.clone(),
                        bone: channel.bone_id.clone(),
                    });
                }
            }
        }

        errors
    }

    /// Would reparenting `bone` to `new_parent` create a cycle (i.e. is
    /// `new_parent` `bone` itself or one of its descendants)? Pre-edit check
    /// per spec §4.7 / §9 (index/id addressed, never by owning pointer).
    #[must_use]
    pub fn would_create_cycle(&self, bone: &str, new_parent: &str) -> bool {
        if bone == new_parent {
            return true;
        }
        // Walk up from `new_parent`; if we hit `bone`, `new_parent` is a
        // descendant of `bone` and reparenting would cycle.
        let mut current = Some(new_parent.to_string());
        let mut guard = 0usize;
        while let Some(id) = current {
            if id == bone {
                return true;
            }
            current = self
                .bones
                .iter()
                .find(|b| b.id == id)
                .and_then(|b| b.parent.clone());
            guard += 1;
            if guard > self.bones.len() + 1 {
                // Already-cyclic input; treat as a cycle rather than loop forever.
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bone(id: &str, parent: Option<&str>) -> Bone {
        Bone {
            id: id.to_string(),
            name: id.to_string(),
            parent: parent.map(str::to_string),
            pivot: [0.0; 3],
            rotation: [0.0; 3],
        }
    }

    #[test]
    fn dangling_bone_ref_detected() {
        let snap = ProjectSnapshot {
            cubes: vec![Cube {
                id: "c1".into(),
                name: "c1".into(),
                bone_id: Some("missing".into()),
                origin: [0.0; 3],
                size: [1.0; 3],
                faces: vec![],
            }],
            ..Default::default()
        };
        assert_eq!(
            snap.validate(),
            vec![ModelError::DanglingBoneRef {
                cube: "c1".into(),
                bone: "missing".into()
            }]
        );
    }

    #[test]
    fn duplicate_texture_id_and_name_detected() {
        let snap = ProjectSnapshot {
            textures: vec![
                Texture { id: "t1".into(), name: "skin".into(), width: 16, height: 16 },
                Texture { id: "t1".into(), name: "skin".into(), width: 16, height: 16 },
            ],
            ..Default::default()
        };
        let errs = snap.validate();
        assert!(errs.contains(&ModelError::DuplicateTextureId("t1".into())));
        assert!(errs.contains(&ModelError::DuplicateTextureName("skin".into())));
    }

    #[test]
    fn cycle_detection_direct_self_parent() {
        let snap = ProjectSnapshot {
            bones: vec![bone("a", None)],
            ..Default::default()
        };
        assert!(snap.would_create_cycle("a", "a"));
    }

    #[test]
    fn cycle_detection_through_descendant() {
        let snap = ProjectSnapshot {
            bones: vec![bone("a", None), bone("b", Some("a")), bone("c", Some("b"))],
            ..Default::default()
        };
        // Reparenting `a` under its grandchild `c` is a cycle.
        assert!(snap.would_create_cycle("a", "c"));
        // Reparenting `c` under `a` (an ancestor, not a descendant) is fine.
        assert!(!snap.would_create_cycle("c", "a"));
    }

    #[test]
    fn keyframes_out_of_order_detected() {
        let snap = ProjectSnapshot {
            animations: vec![AnimationClip {
                id: "walk".into(),
                name: "walk".into(),
                length: 1.0,
                channels: vec![AnimationChannel {
                    bone_id: "a".into(),
                    keyframes: vec![
                        Keyframe { time: 0.5, value: [0.0; 3] },
                        Keyframe { time: 0.2, value: [0.0; 3] },
                    ],
                }],
            }],
            ..Default::default()
        };
        assert_eq!(
            snap.validate(),
            vec![ModelError::InvalidKeyframeOrdering {
                clip: "walk".into(),
                bone: "a".into()
            }]
        );
    }
}
