// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
//! Structural diff engine (spec §4.2).
//!
//! Compares two [`ProjectSnapshot`]s category by category (bones, cubes,
//! meshes, textures, animations). Matching key is `id` when present, else
//! `name`; an item is "changed" when its key matches across both snapshots
//! but its canonical JSON differs. Counts are always returned; the item-id
//! sets are only computed when requested, since callers attaching a diff to
//! every trace step (spec §4.5) usually only need the counts.

use mcpforge_core::model::ProjectSnapshot;
use serde::Serialize;
use serde_json::Value;

/// Added/removed/changed counts for one entity category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryCounts {
    /// Items present in `current` with no matching key in `previous`.
    pub added: usize,
    /// Items present in `previous` with no matching key in `current`.
    pub removed: usize,
    /// Items whose key matches but whose content differs.
    pub changed: usize,
}

/// Item-id sets backing a [`CategoryCounts`], included only when requested.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategorySets {
    /// Keys added.
    pub added: Vec<String>,
    /// Keys removed.
    pub removed: Vec<String>,
    /// Keys changed.
    pub changed: Vec<String>,
}

/// Counts for every entity category in a [`ProjectSnapshot`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffCounts {
    /// Bone counts.
    pub bones: CategoryCounts,
    /// Cube counts.
    pub cubes: CategoryCounts,
    /// Mesh counts.
    pub meshes: CategoryCounts,
    /// Texture counts.
    pub textures: CategoryCounts,
    /// Animation clip counts.
    pub animations: CategoryCounts,
}

/// Item-id sets for every entity category, present only when requested.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffSets {
    /// Bone key sets.
    pub bones: CategorySets,
    /// Cube key sets.
    pub cubes: CategorySets,
    /// Mesh key sets.
    pub meshes: CategorySets,
    /// Texture key sets.
    pub textures: CategorySets,
    /// Animation clip key sets.
    pub animations: CategorySets,
}

/// Result of [`diff`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SnapshotDiff {
    /// Always present.
    pub counts: DiffCounts,
    /// Present only when `include_sets` was `true`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sets: Option<DiffSets>,
}

/// Compare `previous` against `current`, optionally including item-id sets.
///
/// Determinism: within a category, the order of `sets` entries follows the
/// *current* snapshot's insertion order for added/changed items, and the
/// *previous* snapshot's insertion order for removed items (there being no
/// "current order" for something no longer present) — matching spec §4.2's
/// "order of results is the current snapshot's insertion order" for the
/// categories that exist in `current`.
#[must_use]
pub fn diff(previous: &ProjectSnapshot, current: &ProjectSnapshot, include_sets: bool) -> SnapshotDiff {
    let bones = diff_category(
        keyed(&previous.bones, |b| (b.id.as_str(), Some(b.name.as_str()))),
        keyed(&current.bones, |b| (b.id.as_str(), Some(b.name.as_str()))),
    );
    let cubes = diff_category(
        keyed(&previous.cubes, |c| (c.id.as_str(), Some(c.name.as_str()))),
        keyed(&current.cubes, |c| (c.id.as_str(), Some(c.name.as_str()))),
    );
    let meshes = diff_category(
        keyed(&previous.meshes, |m| (m.id.as_str(), Some(m.name.as_str()))),
        keyed(&current.meshes, |m| (m.id.as_str(), Some(m.name.as_str()))),
    );
    let textures = diff_category(
        keyed(&previous.textures, |t| (t.id.as_str(), Some(t.name.as_str()))),
        keyed(&current.textures, |t| (t.id.as_str(), Some(t.name.as_str()))),
    );
    let animations = diff_category(
        keyed(&previous.animations, |a| (a.id.as_str(), Some(a.name.as_str()))),
        keyed(&current.animations, |a| (a.id.as_str(), Some(a.name.as_str()))),
    );

    let counts = DiffCounts {
        bones: bones.0,
        cubes: cubes.0,
        meshes: meshes.0,
        textures: textures.0,
        animations: animations.0,
    };

    let sets = include_sets.then(|| DiffSets {
        bones: bones.1,
        cubes: cubes.1,
        meshes: meshes.1,
        textures: textures.1,
        animations: animations.1,
    });

    SnapshotDiff { counts, sets }
}

/// `(key, canonical_json)` pairs for one category, preserving insertion order.
fn keyed<T: Serialize>(items: &[T], key_of: impl Fn(&T) -> (&str, Option<&str>)) -> Vec<(String, Value)> {
    items
        .iter()
        .map(|item| {
            let (id, name) = key_of(item);
            let key = if !id.is_empty() {
                id.to_string()
            } else {
                name.unwrap_or_default().to_string()
            };
            let json = serde_json::to_value(item).expect("entities always serialize");
            (key, json)
        })
        .collect()
}

fn diff_category(previous: Vec<(String, Value)>, current: Vec<(String, Value)>) -> (CategoryCounts, CategorySets) {
    let mut sets = CategorySets::default();

    for (key, curr_json) in &current {
        match previous.iter().find(|(k, _)| k == key) {
            None => sets.added.push(key.clone()),
            Some((_, prev_json)) if prev_json != curr_json => sets.changed.push(key.clone()),
            Some(_) => {}
        }
    }
    for (key, _) in &previous {
        if !current.iter().any(|(k, _)| k == key) {
            sets.removed.push(key.clone());
        }
    }

    let counts = CategoryCounts {
        added: sets.added.len(),
        removed: sets.removed.len(),
        changed: sets.changed.len(),
    };
    (counts, sets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcpforge_core::model::{Cube, ProjectSnapshot, Texture};

    fn snap(cubes: Vec<Cube>, textures: Vec<Texture>) -> ProjectSnapshot {
        ProjectSnapshot {
            id: "p1".into(),
            name: "demo".into(),
            format_id: "generic".into(),
            cubes,
            textures,
            ..Default::default()
        }
    }

    fn cube(id: &str, size: f64) -> Cube {
        Cube {
            id: id.into(),
            name: id.into(),
            bone_id: None,
            origin: [0.0; 3],
            size: [size; 3],
            faces: vec![],
        }
    }

    #[test]
    fn added_and_removed_counted() {
        let a = snap(vec![cube("c1", 1.0)], vec![]);
        let b = snap(vec![cube("c1", 1.0), cube("c2", 1.0)], vec![]);
        let d = diff(&a, &b, false);
        assert_eq!(d.counts.cubes, CategoryCounts { added: 1, removed: 0, changed: 0 });
    }

    #[test]
    fn changed_detected_on_content_diff() {
        let a = snap(vec![cube("c1", 1.0)], vec![]);
        let b = snap(vec![cube("c1", 2.0)], vec![]);
        let d = diff(&a, &b, true);
        assert_eq!(d.counts.cubes, CategoryCounts { added: 0, removed: 0, changed: 1 });
        assert_eq!(d.sets.unwrap().cubes.changed, vec!["c1".to_string()]);
    }

    #[test]
    fn no_sets_when_not_requested() {
        let a = snap(vec![], vec![]);
        let b = snap(vec![cube("c1", 1.0)], vec![]);
        let d = diff(&a, &b, false);
        assert!(d.sets.is_none());
    }

    #[test]
    fn identical_snapshots_yield_zero_counts() {
        let a = snap(vec![cube("c1", 1.0)], vec![]);
        let d = diff(&a, &a.clone(), false);
        assert_eq!(d.counts, DiffCounts::default());
    }

    #[test]
    fn removed_detected() {
        let a = snap(vec![cube("c1", 1.0), cube("c2", 1.0)], vec![]);
        let b = snap(vec![cube("c1", 1.0)], vec![]);
        let d = diff(&a, &b, true);
        assert_eq!(d.counts.cubes.removed, 1);
        assert_eq!(d.sets.unwrap().cubes.removed, vec!["c2".to_string()]);
    }
}
