//! `cloudgate check` command implementation.
//!
//! Validates a settings file:
//! - gate configuration parses and is internally consistent
//! - every template reference resolves
//! - every policy passes the policy validator
//! - policy enforcement and the policy list agree

use anyhow::{Context, Result};
use std::path::Path;

use cloudgate_gate::GateSettings;
use cloudgate_policy::{PolicyIssue, PolicyValidator, Severity};

/// A single check finding.
#[derive(Debug, Clone)]
pub struct CheckFinding {
    pub severity: Severity,
    /// Category of the check that produced this finding.
    pub category: String,
    pub message: String,
    /// Location within the settings (e.g. "team-guardrails/deny-iam").
    pub location: Option<String>,
}

impl CheckFinding {
    fn warning(category: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            category: category.into(),
            message: message.into(),
            location: None,
        }
    }

    fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

impl From<PolicyIssue> for CheckFinding {
    fn from(issue: PolicyIssue) -> Self {
        let location = match &issue.sid {
            Some(sid) => format!("{}/{}", issue.policy, sid),
            None => issue.policy.clone(),
        };
        Self {
            severity: issue.severity,
            category: "policy".to_string(),
            message: issue.message,
            location: Some(location),
        }
    }
}

/// Results from running all checks.
#[derive(Debug, Default)]
pub struct CheckResults {
    pub findings: Vec<CheckFinding>,
}

impl CheckResults {
    fn extend(&mut self, findings: impl IntoIterator<Item = CheckFinding>) {
        self.findings.extend(findings);
    }

    pub fn has_errors(&self) -> bool {
        self.findings.iter().any(|f| f.severity == Severity::Error)
    }

    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    fn count(&self, severity: Severity) -> usize {
        self.findings
            .iter()
            .filter(|f| f.severity == severity)
            .count()
    }

    /// Print human-readable summary.
    pub fn print_summary(&self) {
        for (severity, title) in [(Severity::Error, "❌ Errors"), (Severity::Warning, "⚠️  Warnings")] {
            let mut group: Vec<_> = self
                .findings
                .iter()
                .filter(|f| f.severity == severity)
                .collect();
            if group.is_empty() {
                continue;
            }
            group.sort_by(|a, b| a.category.cmp(&b.category));

            println!("\n{} ({}):", title, group.len());
            println!("{}", "─".repeat(60));
            for finding in group {
                print_finding(finding);
            }
        }

        println!();
        println!("{}", "═".repeat(60));
        if self.findings.is_empty() {
            println!("✅ All checks passed!");
        } else {
            println!(
                "Summary: {} error(s), {} warning(s)",
                self.error_count(),
                self.count(Severity::Warning)
            );
        }
    }
}

fn print_finding(finding: &CheckFinding) {
    let icon = match finding.severity {
        Severity::Error => "✗",
        Severity::Warning => "⚠",
    };
    let location = finding
        .location
        .as_ref()
        .map(|l| format!(" [{}]", l))
        .unwrap_or_default();

    println!(
        "  {} [{}]{}: {}",
        icon, finding.category, location, finding.message
    );
}

/// Run all checks on an already parsed settings file.
pub fn check_settings(settings: &GateSettings) -> Result<CheckResults> {
    let mut results = CheckResults::default();

    let policies = settings
        .policy_set()
        .context("Failed to resolve configured policies")?;

    results.extend(
        PolicyValidator::new()
            .validate_policies(policies.policies())
            .into_iter()
            .map(CheckFinding::from),
    );

    if settings.gate.enable_policies && policies.is_empty() {
        results.extend([CheckFinding::warning(
            "gate",
            "enable_policies is set but no policies are configured; the policy stage will be skipped",
        )
        .with_location("gate.enable_policies")]);
    }
    if !settings.gate.enable_policies && !policies.is_empty() {
        results.extend([CheckFinding::warning(
            "gate",
            format!(
                "{} policies are configured but enable_policies is false; none will be enforced",
                policies.len()
            ),
        )
        .with_location("gate.enable_policies")]);
    }

    Ok(results)
}

pub fn run(settings_path: &Path) -> Result<()> {
    println!("🔍 Checking cloudgate settings {:?}...", settings_path);

    let settings = GateSettings::from_file(settings_path)
        .with_context(|| format!("Failed to load settings from {:?}", settings_path))?;

    let results = check_settings(&settings)?;
    results.print_summary();

    if results.has_errors() {
        anyhow::bail!(
            "Settings check failed with {} error(s)",
            results.error_count()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_settings_have_no_findings() {
        let settings = GateSettings::from_yaml(
            "policies:\n  - template: read_only\n  - template: require_approval_for_critical\n",
        )
        .unwrap();

        let results = check_settings(&settings).unwrap();
        assert!(results.findings.is_empty(), "{:?}", results.findings);
    }

    #[test]
    fn test_invalid_regex_is_an_error() {
        let settings = GateSettings::from_yaml(
            r#"
policies:
  - policy:
      name: broken
      statements:
        - sid: bad-regex
          effect: deny
          operations: all
          conditions:
            - key: region
              operator: matches
              value: "(unclosed"
"#,
        )
        .unwrap();

        let results = check_settings(&settings).unwrap();
        assert!(results.has_errors());
        assert_eq!(results.error_count(), 1);
        assert_eq!(
            results.findings[0].location.as_deref(),
            Some("broken/bad-regex")
        );
    }

    #[test]
    fn test_policy_toggle_mismatch_warns() {
        let settings = GateSettings::from_yaml("{}").unwrap();
        let results = check_settings(&settings).unwrap();
        assert_eq!(results.findings.len(), 1);
        assert_eq!(results.findings[0].category, "gate");

        let settings = GateSettings::from_yaml(
            "gate:\n  enable_policies: false\npolicies:\n  - template: read_only\n",
        )
        .unwrap();
        let results = check_settings(&settings).unwrap();
        assert_eq!(results.findings.len(), 1);
        assert!(!results.has_errors());
    }
}
