// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
//! mcpforge-pipeline
//!
//! The persistent pipeline store (spec §4.10): a per-workspace document
//! (`WorkspacePipelineState`) mirrored into the `Persistence` port behind a
//! cross-process lock, a lease/backoff/dead-letter job queue built over it,
//! and a per-project append-only event log.

pub mod error;
pub mod events;
mod facade;
pub mod lock;
pub mod memory;
pub mod queue;
pub mod store;

pub use error::PipelineError;
pub use facade::WorkspacePipeline;
pub use memory::InMemoryPersistence;
pub use store::PipelineStore;
