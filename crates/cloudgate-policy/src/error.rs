//! Error types for loading and instantiating policies.
//!
//! Evaluation itself never fails: malformed conditions surface as warnings on
//! the evaluation result. These errors only occur at the edges, when policies
//! are read from disk or built from templates.

/// Error type for policy loading.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A template was referenced without a required, non-empty parameter.
    #[error("Template '{template}' requires a non-empty '{parameter}' parameter")]
    MissingParameter {
        template: &'static str,
        parameter: &'static str,
    },
}

impl PolicyError {
    pub fn missing_parameter(template: &'static str, parameter: &'static str) -> Self {
        Self::MissingParameter {
            template,
            parameter,
        }
    }
}
