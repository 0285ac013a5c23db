// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
//! mcpforge-services
//!
//! Use-case services for the authoring engine (spec §4.7): project
//! lifecycle, bone/cube/mesh editing, texture binding, animation keyframes,
//! export, preview rendering, and validation. Every service is built over a
//! shared [`ServiceContext`] and the narrow ports defined in
//! `mcpforge-core::ports` — none of them touch a concrete authoring engine
//! directly.
//!
//! `mock` ships an in-memory adapter implementing every port, for local
//! running and tests, the role the teacher's `abp-backend-mock` plays for
//! its real sidecar backends.

/// Animation clip/keyframe mutation operations.
pub mod animation;
/// Shared collaborators every use-case service is built against.
pub mod context;
/// Export resolution and artifact writing.
pub mod export;
/// Bone/cube/mesh mutation operations.
pub mod model;
/// In-memory port adapter for local running and tests.
pub mod mock;
/// Project-level operations: reading state and first-creation.
pub mod project;
/// Preview rendering.
pub mod render;
/// Default project seeding for first-creation calls.
pub mod template;
/// Texture binding and inspection operations.
pub mod texture;
/// Model invariant validation.
pub mod validation;

pub use animation::AnimationService;
pub use context::ServiceContext;
pub use export::ExportService;
pub use model::ModelService;
pub use mock::{MockEngine, MockExporter, MockFormats, OP_REPLACE_SNAPSHOT};
pub use project::ProjectService;
pub use render::RenderService;
pub use template::{ProjectTemplate, ProjectTemplateRegistry};
pub use texture::TextureService;
pub use validation::ValidationService;
