// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-project append-only event log (spec §4.10, §4.10.1).

use chrono::{DateTime, Utc};
use mcpforge_core::pipeline::{PipelineEvent, WorkspacePipelineState};
use serde_json::Value;

/// Append an event to `project_id`'s log, creating the project's bookkeeping
/// entry if this is its first event. Returns the assigned `seq`.
pub fn append(state: &mut WorkspacePipelineState, project_id: &str, kind: &str, payload: Value, now: DateTime<Utc>) -> u64 {
    let project = state.projects.entry(project_id.to_string()).or_insert_with(|| mcpforge_core::pipeline::PipelineProject {
        id: project_id.to_string(),
        ..Default::default()
    });
    let seq = project.events.last().map_or(1, |e| e.seq + 1);
    project.events.push(PipelineEvent { seq, kind: kind.to_string(), ts: now, payload });
    seq
}

/// Events for `project_id` with `seq > last_seq`, in order. Empty if the
/// project has no recorded events at all.
#[must_use]
pub fn since(state: &WorkspacePipelineState, project_id: &str, last_seq: u64) -> Vec<PipelineEvent> {
    state
        .projects
        .get(project_id)
        .map(|p| p.events.iter().filter(|e| e.seq > last_seq).cloned().collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn seq_is_monotonic_per_project() {
        let mut state = WorkspacePipelineState::default();
        let now = Utc::now();
        let a = append(&mut state, "proj1", "project_snapshot", json!({}), now);
        let b = append(&mut state, "proj1", "project_snapshot", json!({}), now);
        assert_eq!((a, b), (1, 2));
    }

    #[test]
    fn since_filters_by_seq_and_project() {
        let mut state = WorkspacePipelineState::default();
        let now = Utc::now();
        append(&mut state, "proj1", "project_snapshot", json!({"n": 1}), now);
        append(&mut state, "proj1", "project_snapshot", json!({"n": 2}), now);
        append(&mut state, "proj2", "project_snapshot", json!({"n": 99}), now);

        let events = since(&state, "proj1", 1);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].payload["n"], 2);
    }
}
