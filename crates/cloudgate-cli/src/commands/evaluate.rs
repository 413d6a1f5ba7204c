//! `cloudgate evaluate` command implementation.
//!
//! Loads the settings (or defaults), parses the intent, runs the gate and
//! prints the decision. Every decision exits 0; only load failures are
//! errors.

use anyhow::{Context, Result};
use std::path::Path;

use cloudgate_core::ExtractedIntent;
use cloudgate_gate::{GateDecision, GateResult, GateSettings};
use cloudgate_policy::{PolicySet, templates};

use super::read_input;

/// Evaluate an intent file against an optional settings file.
///
/// Without a settings file the default gate config and the built-in
/// default policies apply.
pub fn evaluate_intent(settings_path: Option<&Path>, intent_path: &Path) -> Result<GateResult> {
    let (settings, policies) = match settings_path {
        Some(path) => {
            let settings = GateSettings::from_file(path)
                .with_context(|| format!("Failed to load settings from {:?}", path))?;
            let policies = settings
                .policy_set()
                .context("Failed to resolve configured policies")?;
            (settings, policies)
        }
        None => {
            tracing::debug!("No settings file; using default policies");
            (
                GateSettings::default(),
                PolicySet::new(templates::default_policies()),
            )
        }
    };

    let content = read_input(intent_path)?;
    let intent: ExtractedIntent =
        serde_yaml::from_str(&content).context("Failed to parse intent")?;

    Ok(cloudgate_gate::evaluate(&intent, &settings.gate, Some(&policies)))
}

pub fn run(settings_path: Option<&Path>, intent_path: &Path, json: bool) -> Result<()> {
    let result = evaluate_intent(settings_path, intent_path)?;
    print_result(&result, json)
}

/// Print a gate result, human-readable or as JSON.
pub(crate) fn print_result(result: &GateResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    let icon = match result.decision {
        GateDecision::Proceed => "✅",
        GateDecision::Confirm => "⚠️ ",
        GateDecision::Clarify => "❓",
        GateDecision::Reject => "⛔",
    };

    println!("\n{} Decision: {}", icon, result.decision);
    println!("{}", "─".repeat(60));
    for line in result.reasoning.lines() {
        println!("  {}", line);
    }

    print_list("Confirmations required", &result.confirmations_required);
    print_list("Clarifying questions", &result.clarifying_questions);
    print_list("Warnings", &result.warnings);

    if let Some(policy) = &result.policy {
        println!("\n🔐 Policy: {}", policy.effect);
        for matched in &policy.matched {
            println!("  - {}/{} ({})", matched.policy, matched.sid, matched.effect);
        }
    }

    println!();
    Ok(())
}

fn print_list(title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    println!("\n{} ({}):", title, items.len());
    for item in items {
        println!("  - {}", item);
    }
}
