//! Gate decisions and results.

use serde::{Deserialize, Serialize};
use std::fmt;

use cloudgate_policy::PolicyEvaluationResult;

/// Terminal decision of the gate.
///
/// Ordered by restrictiveness, `Proceed < Confirm < Clarify < Reject`, so the
/// most restrictive of several decisions is their maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateDecision {
    /// Clear and safe; hand over to execution.
    Proceed,
    /// Needs an explicit yes from the user first.
    Confirm,
    /// Needs more information from the user.
    Clarify,
    /// Cannot or must not run.
    Reject,
}

impl GateDecision {
    pub fn as_str(self) -> &'static str {
        match self {
            GateDecision::Proceed => "proceed",
            GateDecision::Confirm => "confirm",
            GateDecision::Clarify => "clarify",
            GateDecision::Reject => "reject",
        }
    }
}

impl fmt::Display for GateDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str().to_uppercase())
    }
}

/// Result of a gate evaluation.
///
/// `confirmations_required` is only populated for CONFIRM and
/// `clarifying_questions` only for CLARIFY.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateResult {
    pub decision: GateDecision,

    pub reasoning: String,

    #[serde(default)]
    pub warnings: Vec<String>,

    #[serde(default)]
    pub confirmations_required: Vec<String>,

    #[serde(default)]
    pub clarifying_questions: Vec<String>,

    /// Engine result, when the policy stage ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<PolicyEvaluationResult>,

    /// Per-step results of a multi-step intent, in step order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<GateResult>,
}

impl GateResult {
    fn new(decision: GateDecision, reasoning: impl Into<String>) -> Self {
        Self {
            decision,
            reasoning: reasoning.into(),
            warnings: Vec::new(),
            confirmations_required: Vec::new(),
            clarifying_questions: Vec::new(),
            policy: None,
            steps: Vec::new(),
        }
    }

    pub fn proceed(reasoning: impl Into<String>) -> Self {
        Self::new(GateDecision::Proceed, reasoning)
    }

    pub fn confirm(reasoning: impl Into<String>, confirmations: Vec<String>) -> Self {
        Self {
            confirmations_required: confirmations,
            ..Self::new(GateDecision::Confirm, reasoning)
        }
    }

    pub fn clarify(reasoning: impl Into<String>, questions: Vec<String>) -> Self {
        Self {
            clarifying_questions: questions,
            ..Self::new(GateDecision::Clarify, reasoning)
        }
    }

    pub fn reject(reasoning: impl Into<String>) -> Self {
        Self::new(GateDecision::Reject, reasoning)
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }

    pub fn with_policy(mut self, policy: Option<PolicyEvaluationResult>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_steps(mut self, steps: Vec<GateResult>) -> Self {
        self.steps = steps;
        self
    }

    pub fn is_reject(&self) -> bool {
        self.decision == GateDecision::Reject
    }
}
