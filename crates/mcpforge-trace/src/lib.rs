// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
//! Bounded NDJSON trace recording: ring-buffered storage, step recording,
//! and a count-or-interval flush scheduler (spec §4.5, §6).

pub mod flush;
pub mod recorder;
pub mod store;

pub use flush::{TraceLogFlushScheduler, TraceWriter};
pub use recorder::{TraceContext, TraceRecorder};
pub use store::{TraceLogStore, DEFAULT_MAX_ENTRIES};
