// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shared tunables consulted by both the config loader and the Model/Texture
//! use-case services' pre-edit invariant checks (spec §3, supplemental).

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Configurable ceilings enforced by the Model and Texture services.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Limits {
    /// Maximum number of cubes a project may hold.
    pub max_cubes: u32,
    /// Maximum texture width/height in pixels.
    pub max_texture_size: u32,
    /// Maximum animation clip length, in seconds.
    pub max_animation_seconds: f64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_cubes: 4_096,
            max_texture_size: 4_096,
            max_animation_seconds: 3_600.0,
        }
    }
}

/// `toolSchemaVersion`: a `YYYY-MM-DD` calendar stamp identifying the shape
/// of the tool registry's input schemas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SchemaVersion(String);

impl SchemaVersion {
    /// Parse a `YYYY-MM-DD` string, rejecting anything else.
    pub fn parse(value: impl Into<String>) -> Result<Self, SchemaVersionError> {
        let value = value.into();
        let parts: Vec<&str> = value.split('-').collect();
        let valid = parts.len() == 3
            && parts[0].len() == 4
            && parts[1].len() == 2
            && parts[2].len() == 2
            && parts.iter().all(|p| p.chars().all(|c| c.is_ascii_digit()));
        if !valid {
            return Err(SchemaVersionError::Malformed(value));
        }
        Ok(Self(value))
    }

    /// The underlying `YYYY-MM-DD` string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Error parsing a [`SchemaVersion`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaVersionError {
    /// Input was not a `YYYY-MM-DD` calendar stamp.
    #[error("malformed schema version: '{0}', expected YYYY-MM-DD")]
    Malformed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_date() {
        assert!(SchemaVersion::parse("2026-07-30").is_ok());
    }

    #[test]
    fn rejects_malformed_date() {
        assert!(SchemaVersion::parse("2026-7-30").is_err());
        assert!(SchemaVersion::parse("not-a-date").is_err());
    }

    #[test]
    fn default_limits_are_positive() {
        let limits = Limits::default();
        assert!(limits.max_cubes > 0);
        assert!(limits.max_texture_size > 0);
        assert!(limits.max_animation_seconds > 0.0);
    }
}
