// SPDX-License-Identifier: MIT OR Apache-2.0
//! Bundles one [`ServiceContext`] with every use-case service built over it.
//!
//! One [`Services`] instance exists per active project/workspace — the
//! dispatcher is constructed around exactly one of these, matching
//! `ServiceContext`'s own "one per active project" contract.

use mcpforge_core::ports::{Exporter, Formats};
use mcpforge_services::{AnimationService, ExportService, ModelService, ProjectService, RenderService, ServiceContext, TextureService, ValidationService};
use std::sync::Arc;

/// Every use-case service, sharing one [`ServiceContext`].
pub struct Services {
    /// Shared collaborators (editor/snapshot-port/revisions/limits).
    pub ctx: Arc<ServiceContext>,
    /// `get_project_state`, `ensure_project`.
    pub project: ProjectService,
    /// Bone/cube/mesh mutation operations.
    pub model: ModelService,
    /// Texture binding and inspection operations.
    pub texture: TextureService,
    /// Animation clip/keyframe operations.
    pub animation: AnimationService,
    /// Export resolution and artifact writing.
    pub export: ExportService,
    /// Preview rendering.
    pub render: RenderService,
    /// Model invariant validation.
    pub validation: ValidationService,
}

impl Services {
    /// Build every service over the given context and export ports.
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>, formats: Arc<dyn Formats>, exporter: Arc<dyn Exporter>) -> Self {
        Self {
            project: ProjectService::new(ctx.clone()),
            model: ModelService::new(ctx.clone()),
            texture: TextureService::new(ctx.clone()),
            animation: AnimationService::new(ctx.clone()),
            export: ExportService::new(ctx.clone(), formats, exporter),
            render: RenderService::new(ctx.clone()),
            validation: ValidationService::new(ctx.clone()),
            ctx,
        }
    }
}
