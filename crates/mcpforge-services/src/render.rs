// SPDX-License-Identifier: MIT OR Apache-2.0
//! Render service: `render_preview` (spec §4.7, §4.6.2).
//!
//! The dispatcher, not this service, turns frame data into MCP `image`
//! content blocks — this returns plain structured data only.

use crate::context::ServiceContext;
use mcpforge_core::{ErrorCode, ToolError, ToolResponse};
use serde_json::{json, Value};
use std::sync::Arc;

const DEFAULT_WIDTH: u32 = 256;
const DEFAULT_HEIGHT: u32 = 256;

/// Renders preview frames of the current project state.
pub struct RenderService {
    ctx: Arc<ServiceContext>,
}

impl RenderService {
    /// Build a render service over the shared context.
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    /// `render_preview {width?, height?, cameraAngle?}`. Read-only: never
    /// mutates state. The mock adapter has no raster backing store, so each
    /// frame's `dataUri` is a placeholder; a real adapter would rasterize
    /// `snapshot` from `cameraAngle`.
    pub async fn render_preview(&self, params: Value) -> ToolResponse<Value> {
        let width = params.get("width").and_then(Value::as_u64).unwrap_or(u64::from(DEFAULT_WIDTH));
        let height = params.get("height").and_then(Value::as_u64).unwrap_or(u64::from(DEFAULT_HEIGHT));
        if width == 0 || height == 0 {
            return ToolResponse::err(ToolError::simple(ErrorCode::InvalidPayload, "width and height must be positive"));
        }
        let camera_angle = params.get("cameraAngle").and_then(Value::as_str).unwrap_or("iso").to_string();

        let snapshot = match self.ctx.read_snapshot().await {
            Ok(s) => s,
            Err(e) => return ToolResponse::err(e),
        };

        ToolResponse::ok(json!({
            "frames": [{
                "cameraAngle": camera_angle,
                "width": width,
                "height": height,
                "dataUri": "data:image/png;base64,",
                "cubeCount": snapshot.cubes.len(),
                "meshCount": snapshot.meshes.len(),
            }],
        }))
    }
}
