//! Policy evaluation.
//!
//! Every (policy, statement) pair is checked against the intent. Among the
//! matches, effects are resolved by precedence, not by position:
//!
//! 1. any DENY wins,
//! 2. otherwise any ALLOW,
//! 3. otherwise any REQUIRE_APPROVAL,
//! 4. otherwise the request is denied by default.
//!
//! Within a tier the first match in evaluation order (policies in insertion
//! order, then statements) is cited. Evaluation never fails; malformed
//! conditions are reported as warnings and treated as non-matching.

use serde::{Deserialize, Serialize};

use cloudgate_core::ExtractedIntent;

use crate::condition::ConditionOutcome;
use crate::policy::{Effect, Policy, PolicySet, Statement};

/// Precedence order of effects, strongest first.
const PRECEDENCE: [Effect; 3] = [Effect::Deny, Effect::Allow, Effect::RequireApproval];

/// Identity of a statement that matched during evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementRef {
    pub policy: String,
    pub sid: String,
    pub effect: Effect,
}

/// Outcome of evaluating a policy set against one intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyEvaluationResult {
    pub effect: Effect,

    /// Statement that decided the effect; `None` when the default applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_statement_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_policy_id: Option<String>,

    pub reasoning: String,

    /// Malformed-condition notices, deduplicated.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,

    /// Every matching statement, in evaluation order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matched: Vec<StatementRef>,
}

impl PolicyEvaluationResult {
    pub fn is_allowed(&self) -> bool {
        self.effect == Effect::Allow
    }

    pub fn is_denied(&self) -> bool {
        self.effect == Effect::Deny
    }

    pub fn requires_approval(&self) -> bool {
        self.effect == Effect::RequireApproval
    }

    /// True when no statement matched and the default deny applied.
    pub fn is_default(&self) -> bool {
        self.matched_statement_id.is_none()
    }
}

/// Evaluate `policies` against `intent`.
pub fn evaluate(intent: &ExtractedIntent, policies: &PolicySet) -> PolicyEvaluationResult {
    let mut warnings: Vec<String> = Vec::new();
    let mut matches: Vec<(&Policy, &Statement)> = Vec::new();

    for (policy, statement) in policies.statements() {
        if statement_matches(intent, policy, statement, &mut warnings) {
            tracing::debug!(
                policy = %policy.name,
                sid = %statement.sid,
                effect = %statement.effect,
                "Statement matched"
            );
            matches.push((policy, statement));
        }
    }

    let winner = PRECEDENCE.iter().find_map(|effect| {
        matches
            .iter()
            .find(|(_, statement)| statement.effect == *effect)
            .copied()
    });

    let (effect, matched_policy_id, matched_statement_id, mut reasoning) = match winner {
        Some((policy, statement)) => (
            statement.effect,
            Some(policy.name.clone()),
            Some(statement.sid.clone()),
            explain(policy, statement),
        ),
        None => (
            Effect::Deny,
            None,
            None,
            format!(
                "No policy explicitly allows {} on '{}'; denied by default",
                intent.operation, intent.service
            ),
        ),
    };

    if !warnings.is_empty() {
        reasoning.push_str(&format!(" (warnings: {})", warnings.join("; ")));
    }

    tracing::info!(
        effect = %effect,
        policy = matched_policy_id.as_deref().unwrap_or("-"),
        sid = matched_statement_id.as_deref().unwrap_or("-"),
        matches = matches.len(),
        warnings = warnings.len(),
        "Policy evaluation complete"
    );

    PolicyEvaluationResult {
        effect,
        matched_statement_id,
        matched_policy_id,
        reasoning,
        warnings,
        matched: matches
            .iter()
            .map(|(policy, statement)| StatementRef {
                policy: policy.name.clone(),
                sid: statement.sid.clone(),
                effect: statement.effect,
            })
            .collect(),
    }
}

impl PolicySet {
    /// Evaluate this set against `intent`. See [`evaluate`].
    pub fn evaluate(&self, intent: &ExtractedIntent) -> PolicyEvaluationResult {
        evaluate(intent, self)
    }
}

/// Check operation, resources and conditions of one statement.
///
/// Every condition of an operation- and resource-matched statement is
/// evaluated, so warnings are complete even when an earlier one fails.
fn statement_matches(
    intent: &ExtractedIntent,
    policy: &Policy,
    statement: &Statement,
    warnings: &mut Vec<String>,
) -> bool {
    if !statement.operations.contains(intent.operation) {
        return false;
    }
    if !statement.matches_resources(&intent.resource_ids) {
        return false;
    }

    let mut all_hold = true;
    for condition in &statement.conditions {
        match condition.evaluate(intent) {
            ConditionOutcome::Matched => {}
            ConditionOutcome::NotMatched => all_hold = false,
            ConditionOutcome::Malformed(reason) => {
                tracing::warn!(
                    policy = %policy.name,
                    sid = %statement.sid,
                    reason = %reason,
                    "Malformed condition treated as non-matching"
                );
                let warning = format!(
                    "policy '{}' statement '{}': {}",
                    policy.name, statement.sid, reason
                );
                if !warnings.contains(&warning) {
                    warnings.push(warning);
                }
                all_hold = false;
            }
        }
    }
    all_hold
}

fn explain(policy: &Policy, statement: &Statement) -> String {
    let verb = match statement.effect {
        Effect::Deny => "denies this operation",
        Effect::Allow => "allows this operation",
        Effect::RequireApproval => "requires approval for this operation",
    };
    let mut text = format!(
        "Statement '{}' in policy '{}' {}",
        statement.sid, policy.name, verb
    );
    if let Some(description) = &statement.description {
        text.push_str(": ");
        text.push_str(description);
    }
    text
}
