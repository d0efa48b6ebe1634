#![forbid(unsafe_code)]

//! Policy-as-data configuration for the engine.
//!
//! Captures every tunable engine parameter as a single [`EngineConfig`] that
//! can be loaded from TOML or JSON at startup.
//!
//! # Loading
//!
//! ```toml
//! # stepviz.toml
//! [history]
//! max_depth = 50
//!
//! [array]
//! capacity = "growable"
//!
//! [staging]
//! restage = "forbid"
//! default_mode = "immediate"
//! ```
//!
//! ```rust,ignore
//! let config = EngineConfig::from_toml_file("stepviz.toml")?;
//! let config = EngineConfig::from_json_str(json)?;
//! ```
//!
//! # Defaults
//!
//! `EngineConfig::default()` gives a 100-entry history, a fixed 100-cell
//! array, an unbounded stack, rollback on restage and step mode.

#[cfg(feature = "policy-config")]
use std::path::Path;

#[cfg(feature = "policy-config")]
use serde::{Deserialize, Serialize};

use crate::intent::Mode;
use crate::structures::ArrayCapacity;
use crate::structures::array::DEFAULT_FIXED_CAPACITY;
use crate::undo::{HistoryConfig, RestagePolicy};

// ---------------------------------------------------------------------------
// Top-level EngineConfig
// ---------------------------------------------------------------------------

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "policy-config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "policy-config", serde(default))]
pub struct EngineConfig {
    /// Undo history limits.
    pub history: HistoryPolicyConfig,

    /// Array capacity policy.
    pub array: ArrayPolicyConfig,

    /// Stack capacity policy.
    pub stack: StackPolicyConfig,

    /// Staging behavior.
    pub staging: StagingPolicyConfig,
}

impl EngineConfig {
    /// Load from a TOML string.
    #[cfg(feature = "policy-config")]
    pub fn from_toml_str(s: &str) -> Result<Self, PolicyConfigError> {
        toml::from_str(s).map_err(PolicyConfigError::Toml)
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "policy-config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, PolicyConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(PolicyConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    #[cfg(feature = "policy-config")]
    pub fn from_json_str(s: &str) -> Result<Self, PolicyConfigError> {
        serde_json::from_str(s).map_err(PolicyConfigError::Json)
    }

    /// Load from a JSON file on disk.
    #[cfg(feature = "policy-config")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, PolicyConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(PolicyConfigError::Io)?;
        Self::from_json_str(&content)
    }

    /// Load a file, picking the format from its extension (`.json` is JSON,
    /// anything else TOML), and validate the result.
    #[cfg(feature = "policy-config")]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PolicyConfigError> {
        let path = path.as_ref();
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let config = if is_json {
            Self::from_json_file(path)?
        } else {
            Self::from_toml_file(path)?
        };
        let errors = config.validate();
        if !errors.is_empty() {
            return Err(PolicyConfigError::Validation(errors));
        }
        tracing::debug!(target: "stepviz.config", path = %path.display(), "loaded engine config");
        Ok(config)
    }

    /// Validate all parameters are within acceptable ranges.
    ///
    /// Returns a list of validation errors. An empty list means the config
    /// is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.history.max_depth == 0 {
            errors.push("history.max_depth must be > 0".into());
        }
        if self.array.capacity == CapacityMode::Fixed && self.array.fixed_capacity == 0 {
            errors.push("array.fixed_capacity must be > 0 for a fixed array".into());
        }
        if self.stack.capacity == Some(0) {
            errors.push("stack.capacity must be > 0 when set".into());
        }
        errors
    }

    /// Convert to a [`HistoryConfig`].
    #[must_use]
    pub fn to_history_config(&self) -> HistoryConfig {
        HistoryConfig::new(self.history.max_depth)
    }

    /// Capacity policy for new arrays.
    #[must_use]
    pub fn array_capacity(&self) -> ArrayCapacity {
        match self.array.capacity {
            CapacityMode::Fixed => ArrayCapacity::Fixed(self.array.fixed_capacity),
            CapacityMode::Growable => ArrayCapacity::Growable,
        }
    }

    /// Serialize to a single JSONL line for logging.
    #[must_use]
    pub fn to_jsonl(&self) -> String {
        format!(
            r#"{{"schema":"engine-config-v1","history_max_depth":{},"array_capacity":"{}","array_fixed_capacity":{},"stack_capacity":{},"restage":"{}","default_mode":"{}"}}"#,
            self.history.max_depth,
            match self.array.capacity {
                CapacityMode::Fixed => "fixed",
                CapacityMode::Growable => "growable",
            },
            self.array.fixed_capacity,
            self.stack
                .capacity
                .map_or_else(|| "null".to_string(), |c| c.to_string()),
            match self.staging.restage {
                RestagePolicy::Rollback => "rollback",
                RestagePolicy::Forbid => "forbid",
            },
            match self.staging.default_mode {
                Mode::Step => "step",
                Mode::Immediate => "immediate",
            },
        )
    }
}

// ---------------------------------------------------------------------------
// Sub-configs (flat, serde-friendly)
// ---------------------------------------------------------------------------

/// History policy parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "policy-config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "policy-config", serde(default))]
pub struct HistoryPolicyConfig {
    /// Maximum number of composites kept for undo.
    pub max_depth: usize,
}

impl Default for HistoryPolicyConfig {
    fn default() -> Self {
        Self {
            max_depth: HistoryConfig::default().max_depth,
        }
    }
}

/// Whether arrays have a fixed capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "policy-config",
    derive(Serialize, Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum CapacityMode {
    #[default]
    Fixed,
    Growable,
}

/// Array policy parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "policy-config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "policy-config", serde(default))]
pub struct ArrayPolicyConfig {
    pub capacity: CapacityMode,
    /// Cell limit when `capacity` is fixed.
    pub fixed_capacity: usize,
}

impl Default for ArrayPolicyConfig {
    fn default() -> Self {
        Self {
            capacity: CapacityMode::Fixed,
            fixed_capacity: DEFAULT_FIXED_CAPACITY,
        }
    }
}

/// Stack policy parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "policy-config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "policy-config", serde(default))]
pub struct StackPolicyConfig {
    /// Element limit; absent means unbounded.
    pub capacity: Option<usize>,
}

/// Staging policy parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "policy-config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "policy-config", serde(default))]
pub struct StagingPolicyConfig {
    /// What to do with a partially run composite when another is staged.
    pub restage: RestagePolicy,
    /// Run mode for intents that do not name one.
    pub default_mode: Mode,
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can occur when loading an engine configuration.
#[derive(Debug)]
pub enum PolicyConfigError {
    /// I/O error reading a file.
    Io(std::io::Error),
    /// TOML parse error.
    #[cfg(feature = "policy-config")]
    Toml(toml::de::Error),
    /// JSON parse error.
    #[cfg(feature = "policy-config")]
    Json(serde_json::Error),
    /// Validation errors.
    Validation(Vec<String>),
}

impl std::fmt::Display for PolicyConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            #[cfg(feature = "policy-config")]
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            #[cfg(feature = "policy-config")]
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Validation(errors) => {
                write!(f, "validation errors: {}", errors.join("; "))
            }
        }
    }
}

impl std::error::Error for PolicyConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            #[cfg(feature = "policy-config")]
            Self::Toml(e) => Some(e),
            #[cfg(feature = "policy-config")]
            Self::Json(e) => Some(e),
            Self::Validation(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_validates_clean() {
        assert!(EngineConfig::default().validate().is_empty());
    }

    #[test]
    fn default_matches_component_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.to_history_config(), HistoryConfig::default());
        assert_eq!(config.array_capacity(), ArrayCapacity::default());
        assert_eq!(config.stack.capacity, None);
        assert_eq!(config.staging.restage, RestagePolicy::Rollback);
        assert_eq!(config.staging.default_mode, Mode::Step);
    }

    #[test]
    fn multiple_validation_errors_collected() {
        let mut config = EngineConfig::default();
        config.history.max_depth = 0;
        config.array.fixed_capacity = 0;
        config.stack.capacity = Some(0);
        let errors = config.validate();
        assert_eq!(errors.len(), 3, "should catch every error: {errors:?}");
    }

    #[test]
    fn growable_ignores_fixed_capacity() {
        let mut config = EngineConfig::default();
        config.array.capacity = CapacityMode::Growable;
        config.array.fixed_capacity = 0;
        assert!(config.validate().is_empty());
        assert_eq!(config.array_capacity(), ArrayCapacity::Growable);
    }

    #[test]
    fn to_jsonl_produces_flat_line() {
        let jsonl = EngineConfig::default().to_jsonl();
        assert!(jsonl.starts_with('{'));
        assert!(jsonl.ends_with('}'));
        assert!(jsonl.contains("engine-config-v1"));
        assert!(jsonl.contains(r#""stack_capacity":null"#));
    }

    #[cfg(feature = "policy-config")]
    mod loading {
        use super::*;
        use std::io::Write;

        #[test]
        fn partial_toml_preserves_defaults() {
            let config = EngineConfig::from_toml_str(
                r#"
                [staging]
                restage = "forbid"
                "#,
            )
            .unwrap();
            assert_eq!(config.staging.restage, RestagePolicy::Forbid);
            assert_eq!(config.staging.default_mode, Mode::Step);
            assert_eq!(config.history.max_depth, 100);
        }

        #[test]
        fn json_round_trip() {
            let mut config = EngineConfig::default();
            config.stack.capacity = Some(8);
            config.array.capacity = CapacityMode::Growable;
            let json = serde_json::to_string(&config).unwrap();
            assert_eq!(EngineConfig::from_json_str(&json).unwrap(), config);
        }

        #[test]
        fn load_picks_format_and_validates() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("engine.json");
            let mut file = std::fs::File::create(&path).unwrap();
            write!(file, r#"{{"history":{{"max_depth":0}}}}"#).unwrap();
            drop(file);

            match EngineConfig::load(&path) {
                Err(PolicyConfigError::Validation(errors)) => assert_eq!(errors.len(), 1),
                other => panic!("expected validation failure, got {other:?}"),
            }
        }

        #[test]
        fn load_missing_file_is_io_error() {
            let err = EngineConfig::load("/nonexistent/stepviz.toml").unwrap_err();
            assert!(matches!(err, PolicyConfigError::Io(_)));
            assert!(std::error::Error::source(&err).is_some());
        }
    }
}
