//! Settings file loading.
//!
//! A settings file combines the gate configuration with the policies to
//! enforce, given inline or as template references:
//!
//! ```yaml
//! gate:
//!   require_confirmation_write: true
//!   region_requirements:
//!     - service: ec2
//!       operations: [write, delete]
//! policies:
//!   - template: deny_production_modifications
//!   - template: region_allowlist
//!     regions: [us-east-1, eu-west-1]
//!   - policy:
//!       name: team-guardrails
//!       statements:
//!         - sid: deny-iam
//!           effect: deny
//!           operations: all
//!           conditions:
//!             - key: service
//!               operator: equals
//!               value: iam
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use cloudgate_core::{ConfigError, GateConfig};
use cloudgate_policy::{Policy, PolicyError, PolicySet, PolicyTemplate};

/// Where a policy comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PolicySource {
    /// Reference to a built-in template, by name.
    Template(PolicyTemplate),
    /// A policy written out in full.
    Inline { policy: Policy },
}

impl PolicySource {
    pub fn resolve(&self) -> Result<Policy, PolicyError> {
        match self {
            PolicySource::Template(template) => template.build(),
            PolicySource::Inline { policy } => Ok(policy.clone()),
        }
    }
}

/// Contents of a settings file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GateSettings {
    #[serde(default)]
    pub gate: GateConfig,

    #[serde(default)]
    pub policies: Vec<PolicySource>,
}

impl GateSettings {
    /// Load settings from a YAML (or JSON) file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let settings = Self::from_yaml(&content)?;
        tracing::debug!(
            path = %path.display(),
            policies = settings.policies.len(),
            "Loaded gate settings"
        );
        Ok(settings)
    }

    /// Parse settings from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_yaml::from_str(content)?;
        settings.gate.validate()?;
        Ok(settings)
    }

    /// Resolve every policy source, in file order.
    pub fn policy_set(&self) -> Result<PolicySet, SettingsError> {
        self.policies
            .iter()
            .map(|source| source.resolve().map_err(SettingsError::from))
            .collect::<Result<Vec<_>, _>>()
            .map(PolicySet::new)
    }
}

/// Error type for settings loading.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Policy(#[from] PolicyError),
}
