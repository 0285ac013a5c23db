// SPDX-License-Identifier: MIT OR Apache-2.0
//! Narrow collaborator ports (spec §1, §6).
//!
//! The core, dispatcher, and use-case services never touch a concrete
//! authoring engine, exporter, or storage backend directly — they call
//! through these traits. Concrete adapters (CubeAdapter, a real glTF
//! writer, a database-backed `Persistence`) are out of scope for this
//! repo; `mcpforge-services` ships an in-memory adapter for tests and
//! local running, the way the teacher ships `abp-backend-mock` alongside
//! its real sidecar backends.

use async_trait::async_trait;
use serde_json::Value;

use crate::model::ProjectSnapshot;
use crate::pipeline::PersistedRecord;

/// Mutates the authoritative model held by the active authoring engine.
#[async_trait]
pub trait Editor: Send + Sync {
    /// Apply a single structured mutation, identified by `op`, with
    /// `params` specific to that operation. Returns an adapter-level error
    /// message on failure; the calling service maps it to a `ToolError`.
    async fn apply(&self, op: &str, params: Value) -> Result<(), String>;
}

/// Reads the current snapshot from the active authoring engine.
#[async_trait]
pub trait SnapshotPort: Send + Sync {
    /// Produce the current snapshot. Adapters may compute this lazily.
    async fn snapshot(&self) -> Result<ProjectSnapshot, String>;
}

/// Enumerates and resolves export format targets.
pub trait Formats: Send + Sync {
    /// `true` if `format_id` is a known internal format.
    fn is_internal(&self, format_id: &str) -> bool;
    /// `true` if `codec_id` is allow-listed for the `native_codec` target.
    fn is_allow_listed_codec(&self, codec_id: &str) -> bool;
}

/// Produces export artifacts for a resolved format/codec target.
#[async_trait]
pub trait Exporter: Send + Sync {
    /// Write export artifacts for `snapshot` using `format_id` (and
    /// `codec_id` when the target is `native_codec`). Returns the list of
    /// artifact paths/suffixes written, e.g. `[".geo.json", ".gltf"]`.
    async fn export(
        &self,
        snapshot: &ProjectSnapshot,
        format_id: &str,
        codec_id: Option<&str>,
    ) -> Result<Vec<String>, ExportError>;
}

/// Failure modes an [`Exporter`] can report; the dispatcher maps these onto
/// `unsupported_format`/`not_implemented`/`io_error` and applies the
/// `best_effort` fallback policy (spec §4.7).
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExportError {
    /// The format/codec combination has no writer at all.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
    /// The writer exists but does not yet implement this path.
    #[error("not implemented: {0}")]
    NotImplemented(String),
    /// The writer failed while producing output.
    #[error("export io error: {0}")]
    Io(String),
}

/// Scratch storage for export/preview artifacts that do not belong in the
/// persisted workspace (spec §1, `TmpStore`).
#[async_trait]
pub trait TmpStore: Send + Sync {
    /// Write `bytes` under a fresh temporary key and return that key.
    async fn put(&self, bytes: Vec<u8>) -> Result<String, String>;
    /// Read back previously written bytes by key.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, String>;
}

/// Optimistic-concurrency document store used by `mcpforge-pipeline`
/// (spec §4.10, §6 "Persistence document layout").
#[async_trait]
pub trait Persistence: Send + Sync {
    /// Read the current record at `scope`, if any.
    async fn read(&self, scope: &crate::pipeline::Scope) -> Result<Option<PersistedRecord>, String>;

    /// Write `record` only if the currently stored revision equals
    /// `expected` (or no record exists and `expected` is `None`). Returns
    /// `Ok(true)` on success, `Ok(false)` on a lost CAS race.
    ///
    /// Backends without compare-and-swap support MAY implement this as a
    /// blind write that always returns `Ok(true)`; callers relying on the
    /// guarantee should check [`Persistence::supports_cas`] at startup and
    /// log the downgrade (spec §9, design note).
    async fn save_if_revision(
        &self,
        record: PersistedRecord,
        expected: Option<&str>,
    ) -> Result<bool, String>;

    /// `true` if this backend actually enforces `save_if_revision`'s CAS
    /// contract rather than silently downgrading to a blind write.
    fn supports_cas(&self) -> bool {
        true
    }
}
