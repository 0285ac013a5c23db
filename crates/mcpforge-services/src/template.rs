// SPDX-License-Identifier: MIT OR Apache-2.0
//! Default project seeding for first-creation `ensure_project` calls
//! (ambient supplement, grounded on the teacher's workspace-template
//! system: a named, registrable shape applied to stamp out a fresh
//! project's default fields).

use mcpforge_core::ProjectSnapshot;
use std::collections::BTreeMap;

/// A named default-seeding template for newly created projects.
#[derive(Debug, Clone)]
pub struct ProjectTemplate {
    /// Template name, e.g. `"blank"`, `"humanoid"`.
    pub name: String,
    /// Default export format id stamped onto new projects.
    pub format_id: String,
    /// Default texture resolution, if this template implies one.
    pub texture_resolution: Option<u32>,
    /// Default UV pixels-per-block scale, if this template implies one.
    pub uv_pixels_per_block: Option<u32>,
}

impl ProjectTemplate {
    /// Seed a blank [`ProjectSnapshot`] for `project_id`/`name` using this
    /// template's defaults. The snapshot has no bones/cubes/textures yet;
    /// only the header fields are templated.
    #[must_use]
    pub fn seed(&self, project_id: &str, name: &str) -> ProjectSnapshot {
        ProjectSnapshot {
            id: project_id.to_string(),
            name: name.to_string(),
            format_id: self.format_id.clone(),
            texture_resolution: self.texture_resolution,
            uv_pixels_per_block: self.uv_pixels_per_block,
            revision: String::new(),
            bones: Vec::new(),
            cubes: Vec::new(),
            meshes: Vec::new(),
            textures: Vec::new(),
            animations: Vec::new(),
        }
    }
}

/// Registry of named [`ProjectTemplate`]s, with a built-in `"blank"` entry
/// always present.
#[derive(Debug, Clone)]
pub struct ProjectTemplateRegistry {
    templates: BTreeMap<String, ProjectTemplate>,
}

impl ProjectTemplateRegistry {
    /// Register a template, overwriting any existing entry with the same name.
    pub fn register(&mut self, template: ProjectTemplate) {
        self.templates.insert(template.name.clone(), template);
    }

    /// Look up a template by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ProjectTemplate> {
        self.templates.get(name)
    }

    /// The default template used when `ensure_project` is called without an
    /// explicit template name.
    #[must_use]
    pub fn default_template(&self) -> &ProjectTemplate {
        self.templates.get("blank").expect("blank template always registered")
    }
}

impl Default for ProjectTemplateRegistry {
    fn default() -> Self {
        let mut registry = Self {
            templates: BTreeMap::new(),
        };
        registry.register(ProjectTemplate {
            name: "blank".to_string(),
            format_id: "generic".to_string(),
            texture_resolution: Some(16),
            uv_pixels_per_block: Some(16),
        });
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_template_is_always_registered() {
        let registry = ProjectTemplateRegistry::default();
        assert!(registry.get("blank").is_some());
        assert_eq!(registry.default_template().name, "blank");
    }

    #[test]
    fn seed_stamps_header_fields_only() {
        let template = ProjectTemplateRegistry::default().get("blank").unwrap().clone();
        let snap = template.seed("p1", "My Model");
        assert_eq!(snap.id, "p1");
        assert_eq!(snap.name, "My Model");
        assert_eq!(snap.format_id, "generic");
        assert!(snap.bones.is_empty());
    }
}
