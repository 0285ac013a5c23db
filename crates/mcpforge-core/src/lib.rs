// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
//! mcpforge-core
//!
//! The stable contract for mcpforge: the project/model data types, the
//! canonical-hashing helpers every other crate builds on, the error catalog,
//! and the narrow ports (traits) the dispatcher and use-case services call
//! through instead of touching a concrete authoring engine directly.
//!
//! If you only take one dependency, take this one.

/// Canonical JSON serialization and content hashing, shared by the revision
/// store, tool registry, and pipeline store.
pub mod canonical;
/// Error catalog and the tool response envelope.
pub mod error;
/// Native background job model (submit/claim/complete/fail lifecycle).
pub mod job;
/// Shared tunables: cube/texture/animation ceilings, schema version stamp.
pub mod limits;
/// Project/model entities (bones, cubes, meshes, textures, animations).
pub mod model;
/// Persistent pipeline state: workspace-scoped jobs, locks, and event log.
pub mod pipeline;
/// Narrow collaborator ports consumed by the dispatcher and services.
pub mod ports;
/// Session and SSE-connection types.
pub mod session;
/// Tool definitions and the registry's content-addressed shape.
pub mod tool;
/// Append-only trace record shape.
pub mod trace;

pub use canonical::{canonical_bytes, sha256_hex};
pub use error::{ErrorCode, ToolError, ToolResponse};
pub use job::{JobStatus, NativeJob};
pub use limits::{Limits, SchemaVersion, SchemaVersionError};
pub use model::{
    AnimationChannel, AnimationClip, Bone, BoneId, Cube, CubeId, Face, FaceDirection, Keyframe,
    Mesh, MeshId, ModelError, ProjectSnapshot, Revision, Texture, TextureId,
};
pub use pipeline::{Lock, PersistedRecord, PipelineEvent, Scope, WorkspacePipelineState};
pub use ports::{Editor, Exporter, Formats, Persistence, SnapshotPort, TmpStore};
pub use session::{Session, SseConnection};
pub use tool::ToolDefinition;
pub use trace::{TraceRecord, TraceRecordKind};

/// Content-hash schema version stamped into every canonical hash. Bumping
/// this invalidates comparisons across versions of this crate.
pub const CONTRACT_VERSION: &str = "mcpforge/v1";
