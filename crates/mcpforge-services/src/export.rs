// SPDX-License-Identifier: MIT OR Apache-2.0
//! Export service: `export_project` (spec §4.7).

use crate::context::ServiceContext;
use mcpforge_core::ports::{ExportError, Exporter, Formats};
use mcpforge_core::{ErrorCode, ToolError, ToolResponse};
use serde_json::{json, Value};
use std::sync::Arc;

/// The internal format the `best_effort` policy falls back to when a
/// `native_codec` export fails with `not_implemented`/`unsupported_format`.
const INTERNAL_FALLBACK_FORMAT: &str = "generic";

/// Resolves `{format, codecId?}` to an export target and writes artifacts.
pub struct ExportService {
    ctx: Arc<ServiceContext>,
    formats: Arc<dyn Formats>,
    exporter: Arc<dyn Exporter>,
}

impl ExportService {
    /// Build an export service over the shared context and format/exporter
    /// ports.
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>, formats: Arc<dyn Formats>, exporter: Arc<dyn Exporter>) -> Self {
        Self { ctx, formats, exporter }
    }

    /// `export_project {format, codecId?, policy?}`. `policy` defaults to
    /// `"strict"`; `"best_effort"` allows a `native_codec` failure to fall
    /// back to the internal writer with the original error downgraded to a
    /// warning.
    pub async fn export_project(&self, params: Value) -> ToolResponse<Value> {
        let Some(format) = params.get("format").and_then(Value::as_str) else {
            return ToolResponse::err(ToolError::simple(ErrorCode::InvalidPayload, "format is required"));
        };
        let codec_id = params.get("codecId").and_then(Value::as_str);
        let best_effort = params.get("policy").and_then(Value::as_str) == Some("best_effort");

        let snapshot = match self.ctx.read_snapshot().await {
            Ok(s) => s,
            Err(e) => return ToolResponse::err(e),
        };

        if !self.formats.is_internal(format) {
            let Some(codec_id) = codec_id else {
                return ToolResponse::err(ToolError::simple(ErrorCode::UnsupportedFormat, "native_codec requires codecId"));
            };
            if !self.formats.is_allow_listed_codec(codec_id) {
                return ToolResponse::err(ToolError::simple(
                    ErrorCode::UnsupportedFormat,
                    format!("codec '{codec_id}' is not allow-listed"),
                ));
            }
            match self.exporter.export(&snapshot, format, Some(codec_id)).await {
                Ok(artifacts) => return ToolResponse::ok(json!({ "artifacts": artifacts })),
                Err(err @ (ExportError::NotImplemented(_) | ExportError::UnsupportedFormat(_))) if best_effort => {
                    return self.fallback(&snapshot, err).await;
                }
                Err(err) => return ToolResponse::err(export_error_to_tool_error(err)),
            }
        }

        match self.exporter.export(&snapshot, format, None).await {
            Ok(artifacts) => ToolResponse::ok(json!({ "artifacts": artifacts })),
            Err(err) => ToolResponse::err(export_error_to_tool_error(err)),
        }
    }

    async fn fallback(
        &self,
        snapshot: &mcpforge_core::ProjectSnapshot,
        original: ExportError,
    ) -> ToolResponse<Value> {
        match self.exporter.export(snapshot, INTERNAL_FALLBACK_FORMAT, None).await {
            Ok(artifacts) => ToolResponse::ok(json!({
                "artifacts": artifacts,
                "warning": original.to_string(),
            })),
            Err(err) => ToolResponse::err(export_error_to_tool_error(err)),
        }
    }
}

fn export_error_to_tool_error(err: ExportError) -> ToolError {
    match err {
        ExportError::UnsupportedFormat(msg) => ToolError::simple(ErrorCode::UnsupportedFormat, msg),
        ExportError::NotImplemented(msg) => ToolError::simple(ErrorCode::NotImplemented, msg),
        ExportError::Io(msg) => ToolError::simple(ErrorCode::IoError, msg),
    }
}
