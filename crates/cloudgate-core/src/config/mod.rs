//! Gate configuration.
//!
//! [`GateConfig`] carries the thresholds and safety switches the intent gate
//! consults. It can be built in code (every field has a default) or parsed
//! from YAML/JSON. The active policy collection is configured separately; see
//! the settings loader in `cloudgate-gate`.

pub mod region;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::intent::{Confidence, Operation};

pub use region::RegionRequirement;

/// Thresholds and safety switches for the intent gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateConfig {
    /// Minimum confidence for read-type operations.
    #[serde(default = "default_min_confidence_proceed")]
    pub min_confidence_proceed: Confidence,

    /// Minimum confidence for WRITE and DELETE.
    #[serde(default = "default_min_confidence_write")]
    pub min_confidence_write: Confidence,

    /// Require explicit confirmation for DELETE.
    #[serde(default = "default_true")]
    pub require_confirmation_delete: bool,

    /// Require explicit confirmation for WRITE.
    #[serde(default)]
    pub require_confirmation_write: bool,

    /// Batch size above which a warning is raised.
    #[serde(default = "default_max_resource_limit")]
    pub max_resource_limit: u64,

    /// Globs flagging sensitive resources (matched case-insensitively).
    ///
    /// A pattern containing `*` is a glob over the whole value; any other
    /// pattern is a substring match.
    #[serde(default = "default_protected_patterns")]
    pub protected_patterns: Vec<String>,

    /// Whether the policy stage runs at all.
    #[serde(default = "default_true")]
    pub enable_policies: bool,

    /// Confirm WRITE/DELETE that name no resource ids and no tags.
    #[serde(default = "default_true")]
    pub confirm_unscoped_changes: bool,

    /// Confirm DELETE whose estimated batch exceeds `max_resource_limit`.
    #[serde(default = "default_true")]
    pub confirm_large_deletes: bool,

    /// Actions that raise a warning when requested.
    #[serde(default = "default_high_risk_actions")]
    pub high_risk_actions: Vec<String>,

    /// Service/operation pairs that must name a region.
    #[serde(default)]
    pub region_requirements: Vec<RegionRequirement>,

    /// Regions offered when asking the user to pick one.
    #[serde(default = "default_known_regions")]
    pub known_regions: Vec<String>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            min_confidence_proceed: default_min_confidence_proceed(),
            min_confidence_write: default_min_confidence_write(),
            require_confirmation_delete: true,
            require_confirmation_write: false,
            max_resource_limit: default_max_resource_limit(),
            protected_patterns: default_protected_patterns(),
            enable_policies: true,
            confirm_unscoped_changes: true,
            confirm_large_deletes: true,
            high_risk_actions: default_high_risk_actions(),
            region_requirements: Vec::new(),
            known_regions: default_known_regions(),
        }
    }
}

impl GateConfig {
    /// Load configuration from a YAML (or JSON) file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content. JSON is valid YAML.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_confidence_write < self.min_confidence_proceed {
            return Err(ConfigError::Config(format!(
                "min_confidence_write ({}) must not be weaker than min_confidence_proceed ({})",
                self.min_confidence_write, self.min_confidence_proceed
            )));
        }
        if let Some(pattern) = self.protected_patterns.iter().find(|p| p.trim().is_empty()) {
            return Err(ConfigError::Config(format!(
                "protected_patterns contains an empty pattern: {:?}",
                pattern
            )));
        }
        Ok(())
    }

    /// Confidence required for the given operation.
    pub fn required_confidence(&self, operation: Operation) -> Confidence {
        if operation.is_mutating() {
            self.min_confidence_write
        } else {
            self.min_confidence_proceed
        }
    }

    /// Whether a region must be supplied for this service/operation pair.
    pub fn region_required(&self, service: &str, operation: Operation) -> bool {
        self.region_requirements
            .iter()
            .any(|r| r.applies_to(service, operation))
    }

    /// Whether an action is on the high-risk list.
    pub fn is_high_risk_action(&self, action: &str) -> bool {
        self.high_risk_actions
            .iter()
            .any(|a| a.eq_ignore_ascii_case(action.trim()))
    }
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_min_confidence_proceed() -> Confidence {
    Confidence::Medium
}

fn default_min_confidence_write() -> Confidence {
    Confidence::High
}

fn default_max_resource_limit() -> u64 {
    100
}

fn default_protected_patterns() -> Vec<String> {
    ["prod*", "*production*", "*-prod", "*-prod-*"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_high_risk_actions() -> Vec<String> {
    [
        "terminate", "delete", "remove", "destroy", "stop", "restart", "reboot", "modify",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_known_regions() -> Vec<String> {
    [
        "us-east-1",
        "us-east-2",
        "us-west-1",
        "us-west-2",
        "eu-west-1",
        "eu-central-1",
        "ap-southeast-1",
        "ap-northeast-1",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}
