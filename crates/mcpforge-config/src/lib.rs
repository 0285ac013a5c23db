// SPDX-License-Identifier: MIT OR Apache-2.0
//! Configuration loading, validation, and merging for mcpforge.
//!
//! This crate provides [`McpforgeConfig`] — the top-level runtime settings —
//! together with helpers for loading from TOML files, merging overlays, and
//! producing advisory [`ConfigWarning`]s.
#![deny(unsafe_code)]
#![warn(missing_docs)]

use mcpforge_core::Limits;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during configuration loading or validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The requested configuration file was not found.
    #[error("config file not found: {path}")]
    FileNotFound {
        /// Path that was requested.
        path: String,
    },

    /// The file could not be parsed as valid TOML.
    #[error("failed to parse config: {reason}")]
    ParseError {
        /// Human-readable parse error detail.
        reason: String,
    },

    /// Semantic validation failed (one or more problems).
    #[error("config validation failed: {reasons:?}")]
    ValidationError {
        /// Individual validation failure messages.
        reasons: Vec<String>,
    },
}

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

/// Advisory-level issues that do not prevent operation but deserve attention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// A recommended optional field is missing.
    MissingOptionalField {
        /// Name of the missing field.
        field: String,
        /// Why it matters.
        hint: String,
    },
    /// The trace flush interval is unusually large.
    LargeFlushInterval {
        /// Interval value in seconds.
        secs: u64,
    },
    /// The session TTL is shorter than the prune tick, so pruning would run
    /// needlessly often relative to how long sessions live.
    PruneIntervalExceedsSessionTtl {
        /// Configured prune interval, in seconds.
        prune_interval_secs: u64,
        /// Configured session TTL, in seconds.
        session_ttl_secs: u64,
    },
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::MissingOptionalField { field, hint } => {
                write!(f, "missing optional field '{field}': {hint}")
            }
            ConfigWarning::LargeFlushInterval { secs } => {
                write!(f, "trace flush interval is unusually large ({secs}s)")
            }
            ConfigWarning::PruneIntervalExceedsSessionTtl {
                prune_interval_secs,
                session_ttl_secs,
            } => {
                write!(
                    f,
                    "session prune interval ({prune_interval_secs}s) exceeds session TTL ({session_ttl_secs}s)"
                )
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Config types
// ---------------------------------------------------------------------------

/// Top-level runtime configuration for mcpforge.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct McpforgeConfig {
    /// Address the router binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Port the router binds to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Working directory used for the persisted pipeline store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_dir: Option<String>,
    /// Log level override (e.g. `"debug"`, `"info"`, `"warn"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    /// Cube/texture/animation ceilings, threaded into every `ServiceContext`.
    #[serde(default)]
    pub limits: Limits,
    /// Session store tunables.
    #[serde(default)]
    pub session: SessionConfig,
    /// Trace recorder/flush tunables.
    #[serde(default)]
    pub trace: TraceConfig,
    /// Pipeline store cross-process lock tunables.
    #[serde(default)]
    pub pipeline_lock: PipelineLockConfig,
}

fn default_bind_addr() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8008
}

impl Default for McpforgeConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            workspace_dir: None,
            log_level: Some("info".to_string()),
            limits: Limits::default(),
            session: SessionConfig::default(),
            trace: TraceConfig::default(),
            pipeline_lock: PipelineLockConfig::default(),
        }
    }
}

/// Session store tunables (spec §4.8).
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct SessionConfig {
    /// Session idle TTL, in seconds. Default 1800 (30 min).
    #[serde(default = "default_session_ttl_secs")]
    pub ttl_secs: u64,
    /// Interval between `pruneExpired` ticks, in seconds. Default 60.
    #[serde(default = "default_prune_interval_secs")]
    pub prune_interval_secs: u64,
    /// Maximum concurrent SSE connections per session. Default 3.
    #[serde(default = "default_sse_cap")]
    pub sse_cap: u32,
    /// SSE keep-alive comment interval, in seconds. Default 15.
    #[serde(default = "default_keepalive_secs")]
    pub keepalive_secs: u64,
}

fn default_session_ttl_secs() -> u64 {
    1_800
}
fn default_prune_interval_secs() -> u64 {
    60
}
fn default_sse_cap() -> u32 {
    3
}
fn default_keepalive_secs() -> u64 {
    15
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_session_ttl_secs(),
            prune_interval_secs: default_prune_interval_secs(),
            sse_cap: default_sse_cap(),
            keepalive_secs: default_keepalive_secs(),
        }
    }
}

/// Trace recorder/flush tunables (spec §4.5).
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct TraceConfig {
    /// Ring-buffer entry cap.
    #[serde(default = "default_trace_max_entries")]
    pub max_entries: u64,
    /// Optional ring-buffer byte cap.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_bytes: Option<u64>,
    /// Flush after this many appends since the last flush.
    #[serde(default = "default_flush_every")]
    pub flush_every: u64,
    /// Flush on this interval regardless of append count, in seconds.
    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: u64,
}

fn default_trace_max_entries() -> u64 {
    2_000
}
fn default_flush_every() -> u64 {
    50
}
fn default_flush_interval_secs() -> u64 {
    5
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            max_entries: default_trace_max_entries(),
            max_bytes: None,
            flush_every: default_flush_every(),
            flush_interval_secs: default_flush_interval_secs(),
        }
    }
}

/// Pipeline store cross-process lock tunables (spec §4.10).
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct PipelineLockConfig {
    /// Lock lease lifetime, in seconds. Default 2.
    #[serde(default = "default_lock_ttl_secs")]
    pub ttl_secs: u64,
    /// Interval between lock-acquisition retries, in milliseconds. Default 30.
    #[serde(default = "default_lock_retry_interval_ms")]
    pub retry_interval_ms: u64,
    /// Total time to keep retrying before giving up, in seconds. Default 10.
    #[serde(default = "default_lock_retry_timeout_secs")]
    pub retry_timeout_secs: u64,
}

fn default_lock_ttl_secs() -> u64 {
    2
}
fn default_lock_retry_interval_ms() -> u64 {
    30
}
fn default_lock_retry_timeout_secs() -> u64 {
    10
}

impl Default for PipelineLockConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_lock_ttl_secs(),
            retry_interval_ms: default_lock_retry_interval_ms(),
            retry_timeout_secs: default_lock_retry_timeout_secs(),
        }
    }
}

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Threshold above which a trace flush interval generates a warning.
const LARGE_FLUSH_INTERVAL_THRESHOLD_SECS: u64 = 300;

/// Recognised log levels.
const VALID_LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load an [`McpforgeConfig`] from an optional TOML file path.
///
/// * If `path` is `Some`, reads and parses the file.
/// * If `path` is `None`, returns [`McpforgeConfig::default()`].
///
/// Environment variable overrides are applied on top in both cases.
pub fn load_config(path: Option<&Path>) -> Result<McpforgeConfig, ConfigError> {
    let mut config = match path {
        Some(p) => {
            let content = std::fs::read_to_string(p).map_err(|_| ConfigError::FileNotFound {
                path: p.display().to_string(),
            })?;
            parse_toml(&content)?
        }
        None => McpforgeConfig::default(),
    };
    apply_env_overrides(&mut config);
    Ok(config)
}

/// Parse a TOML string into an [`McpforgeConfig`].
pub fn parse_toml(content: &str) -> Result<McpforgeConfig, ConfigError> {
    toml::from_str::<McpforgeConfig>(content).map_err(|e| ConfigError::ParseError { reason: e.to_string() })
}

// ---------------------------------------------------------------------------
// Env overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides.
///
/// Recognised variables:
/// - `MCPFORGE_BIND_ADDR`
/// - `MCPFORGE_PORT`
/// - `MCPFORGE_LOG_LEVEL`
/// - `MCPFORGE_WORKSPACE_DIR`
pub fn apply_env_overrides(config: &mut McpforgeConfig) {
    if let Ok(val) = std::env::var("MCPFORGE_BIND_ADDR") {
        config.bind_addr = val;
    }
    if let Ok(val) = std::env::var("MCPFORGE_PORT") {
        if let Ok(port) = val.parse() {
            config.port = port;
        }
    }
    if let Ok(val) = std::env::var("MCPFORGE_LOG_LEVEL") {
        config.log_level = Some(val);
    }
    if let Ok(val) = std::env::var("MCPFORGE_WORKSPACE_DIR") {
        config.workspace_dir = Some(val);
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a parsed configuration, returning advisory warnings.
///
/// Hard errors (invalid log level, zero SSE cap, zero limits) are returned
/// as a [`ConfigError::ValidationError`]; soft issues come back as warnings.
pub fn validate_config(config: &McpforgeConfig) -> Result<Vec<ConfigWarning>, ConfigError> {
    let mut errors: Vec<String> = Vec::new();
    let mut warnings: Vec<ConfigWarning> = Vec::new();

    if let Some(ref level) = config.log_level {
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            errors.push(format!("invalid log_level '{level}'"));
        }
    }
    if config.session.sse_cap == 0 {
        errors.push("session.sse_cap must be at least 1".to_string());
    }
    if config.limits.max_cubes == 0 {
        errors.push("limits.max_cubes must be at least 1".to_string());
    }
    if config.limits.max_texture_size == 0 {
        errors.push("limits.max_texture_size must be at least 1".to_string());
    }
    if config.limits.max_animation_seconds <= 0.0 {
        errors.push("limits.max_animation_seconds must be positive".to_string());
    }

    if config.trace.flush_interval_secs > LARGE_FLUSH_INTERVAL_THRESHOLD_SECS {
        warnings.push(ConfigWarning::LargeFlushInterval {
            secs: config.trace.flush_interval_secs,
        });
    }
    if config.session.prune_interval_secs > config.session.ttl_secs {
        warnings.push(ConfigWarning::PruneIntervalExceedsSessionTtl {
            prune_interval_secs: config.session.prune_interval_secs,
            session_ttl_secs: config.session.ttl_secs,
        });
    }
    if config.workspace_dir.is_none() {
        warnings.push(ConfigWarning::MissingOptionalField {
            field: "workspace_dir".into(),
            hint: "the pipeline store will keep its persisted record in-memory only".into(),
        });
    }

    if errors.is_empty() {
        Ok(warnings)
    } else {
        Err(ConfigError::ValidationError { reasons: errors })
    }
}

// ---------------------------------------------------------------------------
// Merging
// ---------------------------------------------------------------------------

/// Merge two configurations. Values in `overlay` take precedence over `base`
/// wherever `overlay` differs from the library default.
pub fn merge_configs(base: McpforgeConfig, overlay: McpforgeConfig) -> McpforgeConfig {
    let default = McpforgeConfig::default();
    McpforgeConfig {
        bind_addr: if overlay.bind_addr != default.bind_addr { overlay.bind_addr } else { base.bind_addr },
        port: if overlay.port != default.port { overlay.port } else { base.port },
        workspace_dir: overlay.workspace_dir.or(base.workspace_dir),
        log_level: overlay.log_level.or(base.log_level),
        limits: base.limits, // overlays never override safety ceilings silently
        session: overlay.session,
        trace: overlay.trace,
        pipeline_lock: overlay.pipeline_lock,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let cfg = McpforgeConfig::default();
        let warnings = validate_config(&cfg).expect("default config should be valid");
        assert!(!warnings.is_empty(), "should have advisory warnings");
    }

    #[test]
    fn default_config_has_sensible_defaults() {
        let cfg = McpforgeConfig::default();
        assert_eq!(cfg.log_level.as_deref(), Some("info"));
        assert_eq!(cfg.session.sse_cap, 3);
        assert_eq!(cfg.session.ttl_secs, 1_800);
        assert_eq!(cfg.session.prune_interval_secs, 60);
        assert_eq!(cfg.pipeline_lock.ttl_secs, 2);
        assert_eq!(cfg.pipeline_lock.retry_interval_ms, 30);
        assert_eq!(cfg.pipeline_lock.retry_timeout_secs, 10);
    }

    #[test]
    fn parse_valid_toml_string() {
        let toml_str = r#"
            bind_addr = "0.0.0.0"
            port = 9000
            log_level = "debug"

            [session]
            sse_cap = 5
        "#;
        let cfg = parse_toml(toml_str).unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0");
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.session.sse_cap, 5);
        // Fields omitted within a present [session] table still default.
        assert_eq!(cfg.session.ttl_secs, 1_800);
    }

    #[test]
    fn parse_invalid_toml_gives_parse_error() {
        let bad = "this is [not valid toml =";
        let err = parse_toml(bad).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn validation_catches_invalid_log_level() {
        let cfg = McpforgeConfig {
            log_level: Some("verbose".into()),
            ..Default::default()
        };
        let err = validate_config(&cfg).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }

    #[test]
    fn validation_catches_zero_sse_cap() {
        let mut cfg = McpforgeConfig::default();
        cfg.session.sse_cap = 0;
        let err = validate_config(&cfg).unwrap_err();
        match err {
            ConfigError::ValidationError { reasons } => {
                assert!(reasons.iter().any(|r| r.contains("sse_cap")));
            }
            other => panic!("expected ValidationError, got {other:?}"),
        }
    }

    #[test]
    fn prune_interval_exceeding_ttl_warns() {
        let mut cfg = McpforgeConfig::default();
        cfg.session.prune_interval_secs = 3_600;
        cfg.session.ttl_secs = 60;
        let warnings = validate_config(&cfg).unwrap();
        assert!(warnings.iter().any(|w| matches!(w, ConfigWarning::PruneIntervalExceedsSessionTtl { .. })));
    }

    #[test]
    fn merge_overlay_overrides_base() {
        let base = McpforgeConfig {
            bind_addr: "10.0.0.1".into(),
            ..Default::default()
        };
        let overlay = McpforgeConfig {
            port: 9999,
            ..Default::default()
        };
        let merged = merge_configs(base, overlay);
        assert_eq!(merged.bind_addr, "10.0.0.1");
        assert_eq!(merged.port, 9999);
    }

    #[test]
    fn toml_roundtrip() {
        let cfg = McpforgeConfig::default();
        let serialized = toml::to_string(&cfg).unwrap();
        let deserialized: McpforgeConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(cfg, deserialized);
    }

    #[test]
    fn load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mcpforge.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "bind_addr = \"0.0.0.0\"\nlog_level = \"warn\"").unwrap();
        let cfg = load_config(Some(&path)).unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0");
        assert_eq!(cfg.log_level.as_deref(), Some("warn"));
    }

    #[test]
    fn load_missing_file_gives_file_not_found() {
        let err = load_config(Some(Path::new("/nonexistent/mcpforge.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn load_none_returns_default() {
        let cfg = load_config(None).unwrap();
        assert_eq!(cfg.log_level.as_deref(), Some("info"));
    }
}
