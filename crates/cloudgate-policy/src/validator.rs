//! Static checks for policies.
//!
//! The engine tolerates malformed policies at evaluation time. The validator
//! reports the same problems ahead of time so they can be fixed before a
//! policy set is published.

use std::collections::HashSet;
use std::fmt;

use crate::policy::{Effect, Policy, ResourcePattern};

/// Severity of a validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Policy loads and evaluates, but probably not as intended.
    Warning,
    /// Policy contains a rule that can never be evaluated correctly.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "WARN"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// A single validation finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyIssue {
    pub severity: Severity,
    pub policy: String,
    /// Statement the finding refers to, if any.
    pub sid: Option<String>,
    pub message: String,
}

impl PolicyIssue {
    fn error(policy: &str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            policy: policy.to_string(),
            sid: None,
            message: message.into(),
        }
    }

    fn warning(policy: &str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            policy: policy.to_string(),
            sid: None,
            message: message.into(),
        }
    }

    fn with_sid(mut self, sid: impl Into<String>) -> Self {
        self.sid = Some(sid.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for PolicyIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sid {
            Some(sid) => write!(
                f,
                "[{}] {}/{}: {}",
                self.severity, self.policy, sid, self.message
            ),
            None => write!(f, "[{}] {}: {}", self.severity, self.policy, self.message),
        }
    }
}

/// Lints policies.
pub struct PolicyValidator;

impl PolicyValidator {
    pub fn new() -> Self {
        Self
    }

    /// Check a single policy.
    pub fn validate_policy(&self, policy: &Policy) -> Vec<PolicyIssue> {
        let mut issues = Vec::new();
        let mut seen = HashSet::new();

        if policy.statements.is_empty() {
            issues.push(PolicyIssue::warning(
                &policy.name,
                "policy has no statements",
            ));
        }

        for statement in &policy.statements {
            if !seen.insert(statement.sid.as_str()) {
                issues.push(
                    PolicyIssue::error(&policy.name, "duplicate statement id")
                        .with_sid(&statement.sid),
                );
            }

            if statement.operations.is_empty() {
                issues.push(
                    PolicyIssue::warning(
                        &policy.name,
                        "statement lists no operations and can never match",
                    )
                    .with_sid(&statement.sid),
                );
            }

            for condition in &statement.conditions {
                if let Some(reason) = condition.malformation() {
                    issues.push(PolicyIssue::error(&policy.name, reason).with_sid(&statement.sid));
                }
            }

            if statement.effect == Effect::Allow
                && statement.operations.is_all()
                && statement.resource_pattern == ResourcePattern::All
                && statement.conditions.is_empty()
            {
                issues.push(
                    PolicyIssue::warning(
                        &policy.name,
                        "unconditional ALLOW on all operations and resources allows everything",
                    )
                    .with_sid(&statement.sid),
                );
            }
        }

        issues
    }

    /// Check a collection of policies, including duplicate policy names.
    pub fn validate_policies<'a>(
        &self,
        policies: impl IntoIterator<Item = &'a Policy>,
    ) -> Vec<PolicyIssue> {
        let mut issues = Vec::new();
        let mut names = HashSet::new();

        for policy in policies {
            if !names.insert(policy.name.as_str()) {
                issues.push(PolicyIssue::warning(
                    &policy.name,
                    "another policy with this name is already loaded",
                ));
            }
            issues.extend(self.validate_policy(policy));
        }

        tracing::debug!(
            policies = names.len(),
            issues = issues.len(),
            "Validated policies"
        );

        issues
    }
}

impl Default for PolicyValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{PolicyBuilder, StatementBuilder};
    use crate::condition::{Condition, ConditionOperator};
    use crate::templates;

    #[test]
    fn test_templates_are_clean() {
        let validator = PolicyValidator::new();
        let policies = [
            templates::read_only(),
            templates::deny_production_modifications(),
            templates::region_allowlist(["us-east-1"]),
            templates::service_allowlist(["ec2"]),
            templates::service_denylist(["iam"]),
            templates::require_approval_for_critical(),
            templates::specific_resource_denylist("ec2", ["i-1"]),
        ];

        let issues = validator.validate_policies(&policies);
        assert!(issues.is_empty(), "unexpected issues: {:?}", issues);
    }

    #[test]
    fn test_duplicate_sid_is_error() {
        let policy = PolicyBuilder::new("p")
            .statement(StatementBuilder::new("s").deny().all_operations())
            .statement(StatementBuilder::new("s").deny().write_operations())
            .build();

        let issues = PolicyValidator::new().validate_policy(&policy);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].is_error());
        assert_eq!(issues[0].sid.as_deref(), Some("s"));
    }

    #[test]
    fn test_malformed_conditions_are_errors() {
        let policy = PolicyBuilder::new("p")
            .statement(
                StatementBuilder::new("regex")
                    .deny()
                    .all_operations()
                    .condition(Condition::matches("region", "[")),
            )
            .statement(
                StatementBuilder::new("operator")
                    .deny()
                    .all_operations()
                    .when(
                        "region",
                        ConditionOperator::Unsupported("near".to_string()),
                        "us-east-1",
                    ),
            )
            .build();

        let issues = PolicyValidator::new().validate_policy(&policy);
        let errors: Vec<_> = issues.iter().filter(|i| i.is_error()).collect();
        assert_eq!(errors.len(), 2);
        assert!(errors[1].message.contains("near"));
    }

    #[test]
    fn test_allow_everything_and_empty_operations_warn() {
        let policy = PolicyBuilder::new("p")
            .statement(StatementBuilder::new("open").allow().all_operations())
            .statement(StatementBuilder::new("noop").deny())
            .build();

        let issues = PolicyValidator::new().validate_policy(&policy);
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| i.severity == Severity::Warning));
        assert!(issues[0].message.contains("allows everything"));
    }

    #[test]
    fn test_duplicate_policy_names_warn() {
        let issues =
            PolicyValidator::new().validate_policies(&[templates::read_only(), templates::read_only()]);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].to_string().contains("read-only-policy"));
    }
}
