//! The intent gate pipeline.
//!
//! Stages run in a fixed order; each either leaves the intent under
//! evaluation or ends it with a terminal decision:
//!
//! 0. extraction error  -> REJECT
//! 1. completeness      -> CLARIFY
//! 2. confidence        -> CLARIFY
//! 3. ambiguities       -> CLARIFY for WRITE/DELETE, warnings otherwise
//! 4. policies          -> REJECT on DENY, confirmation on REQUIRE_APPROVAL
//! 5. safety            -> confirmations and warnings
//! 6. resource limits   -> warnings, confirmation for oversized deletes
//! 7. synthesis         -> CONFIRM if anything needs confirming, else PROCEED
//!
//! Multi-step intents run every step through the same pipeline and report the
//! most restrictive step decision.

use cloudgate_core::{ExtractedIntent, GateConfig, IntentKind, Operation};
use cloudgate_policy::{Effect, PolicyEvaluationResult, PolicySet, protected_pattern_matches};

use crate::decision::{GateDecision, GateResult};

/// Evaluate `intent` with the given configuration and optional policies.
pub fn evaluate(
    intent: &ExtractedIntent,
    config: &GateConfig,
    policies: Option<&PolicySet>,
) -> GateResult {
    IntentGate::new(config, policies).evaluate(intent)
}

/// Outcome of a single pipeline stage.
enum Stage {
    Continue,
    Terminal(GateResult),
}

/// Findings accumulated by the non-terminal stages.
#[derive(Default)]
struct Assessment {
    warnings: Vec<String>,
    confirmations: Vec<String>,
    policy: Option<PolicyEvaluationResult>,
}

/// Runs intents through the gate pipeline.
///
/// Holds only borrowed, immutable inputs; one gate can evaluate any number of
/// intents, from any number of threads.
#[derive(Debug, Clone, Copy)]
pub struct IntentGate<'a> {
    config: &'a GateConfig,
    policies: Option<&'a PolicySet>,
}

impl<'a> IntentGate<'a> {
    pub fn new(config: &'a GateConfig, policies: Option<&'a PolicySet>) -> Self {
        Self { config, policies }
    }

    /// Evaluate one intent, single or multi-step.
    pub fn evaluate(&self, intent: &ExtractedIntent) -> GateResult {
        let result = self.dispatch(intent);

        tracing::info!(
            decision = %result.decision,
            operation = %intent.operation,
            service = %intent.service,
            steps = result.steps.len(),
            "Gate decision"
        );

        result
    }

    /// Route an intent, or a step of one, to the matching pipeline.
    fn dispatch(&self, intent: &ExtractedIntent) -> GateResult {
        if intent.kind == IntentKind::Error {
            extraction_failed(intent)
        } else if intent.is_multi_step || !intent.sub_intents.is_empty() {
            self.evaluate_multi_step(intent)
        } else {
            self.evaluate_single(intent)
        }
    }

    fn evaluate_single(&self, intent: &ExtractedIntent) -> GateResult {
        let mut assessment = Assessment::default();

        let stages: [fn(&Self, &ExtractedIntent, &mut Assessment) -> Stage; 6] = [
            Self::check_completeness,
            Self::check_confidence,
            Self::check_ambiguities,
            Self::check_policies,
            Self::check_safety,
            Self::check_resource_constraints,
        ];

        for stage in stages {
            if let Stage::Terminal(result) = stage(self, intent, &mut assessment) {
                tracing::debug!(
                    decision = %result.decision,
                    reasoning = %result.reasoning,
                    "Gate stage ended evaluation"
                );
                return result;
            }
        }

        synthesize(assessment)
    }

    fn evaluate_multi_step(&self, intent: &ExtractedIntent) -> GateResult {
        if intent.sub_intents.is_empty() {
            return GateResult::clarify(
                "Multi-step request has no steps",
                vec!["Could you list the steps you want performed, in order?".to_string()],
            );
        }

        if let Some(problem) = dependency_problem(&intent.sub_intents) {
            return GateResult::clarify(
                format!("Multi-step request has an invalid step order: {}", problem),
                vec!["Could you describe the steps again in the order they should run?".to_string()],
            );
        }

        let mut steps: Vec<GateResult> = Vec::with_capacity(intent.sub_intents.len());
        for (index, step) in intent.sub_intents.iter().enumerate() {
            let result = self.dispatch(step);
            tracing::debug!(step = index + 1, decision = %result.decision, "Evaluated step");
            let stop = result.is_reject();
            steps.push(result);
            if stop {
                break;
            }
        }

        aggregate(steps, intent.sub_intents.len())
    }

    fn check_completeness(&self, intent: &ExtractedIntent, assessment: &mut Assessment) -> Stage {
        let mut questions = Vec::new();

        if !intent.has_resolvable_service() {
            questions.push(
                "Which cloud service would you like to work with? (e.g., ec2, s3, rds)".to_string(),
            );
        }
        if intent.operation == Operation::Unknown {
            questions.push(
                "What would you like to do: read, list, describe, analyze, write or delete?"
                    .to_string(),
            );
        }
        if !questions.is_empty() {
            return Stage::Terminal(GateResult::clarify(
                "Intent is missing critical information",
                questions,
            ));
        }

        if intent.regions.is_empty() && self.config.region_required(&intent.service, intent.operation)
        {
            return Stage::Terminal(GateResult::clarify(
                format!(
                    "A region must be specified for {} operations on '{}'",
                    intent.operation, intent.service
                ),
                vec![format!(
                    "Which region should I target? Known regions: {}",
                    self.config.known_regions.join(", ")
                )],
            ));
        }

        if intent.operation.is_mutating() && intent.action.as_deref().is_none_or(|a| a.trim().is_empty())
        {
            assessment.warnings.push(format!(
                "No specific action named for {} on '{}'",
                intent.operation, intent.service
            ));
        }

        Stage::Continue
    }

    fn check_confidence(&self, intent: &ExtractedIntent, _: &mut Assessment) -> Stage {
        let required = self.config.required_confidence(intent.operation);
        if intent.confidence >= required {
            return Stage::Continue;
        }

        Stage::Terminal(GateResult::clarify(
            format!(
                "Confidence level {} is below required {} for {} operations",
                intent.confidence, required, intent.operation
            ),
            vec![
                format!(
                    "I'm not completely sure I understood. You want to {} {} resources?",
                    intent.describe_action(),
                    intent.service
                ),
                "Could you provide more specific details about what you want to do?".to_string(),
            ],
        ))
    }

    fn check_ambiguities(&self, intent: &ExtractedIntent, assessment: &mut Assessment) -> Stage {
        if intent.ambiguities.is_empty() {
            return Stage::Continue;
        }

        if intent.operation.is_mutating() {
            let questions = intent
                .ambiguities
                .iter()
                .map(|a| ambiguity_question(a, intent))
                .collect();
            return Stage::Terminal(GateResult::clarify(
                format!(
                    "Ambiguities detected for {} operation require clarification",
                    intent.operation
                ),
                questions,
            ));
        }

        assessment
            .warnings
            .extend(intent.ambiguities.iter().map(|a| format!("Ambiguity: {}", a)));
        Stage::Continue
    }

    fn check_policies(&self, intent: &ExtractedIntent, assessment: &mut Assessment) -> Stage {
        let policies = match self.policies {
            Some(set) if self.config.enable_policies && !set.is_empty() => set,
            _ => {
                tracing::debug!("Policy stage skipped; treated as allow");
                return Stage::Continue;
            }
        };

        let result = policies.evaluate(intent);
        assessment.warnings.extend(result.warnings.iter().cloned());

        match result.effect {
            Effect::Deny => {
                let reasoning = format!("Policy denied: {}", result.reasoning);
                Stage::Terminal(
                    GateResult::reject(reasoning)
                        .with_warnings(std::mem::take(&mut assessment.warnings))
                        .with_policy(Some(result)),
                )
            }
            Effect::RequireApproval => {
                assessment
                    .confirmations
                    .push(format!("Policy requires approval: {}", result.reasoning));
                assessment.policy = Some(result);
                Stage::Continue
            }
            Effect::Allow => {
                assessment.policy = Some(result);
                Stage::Continue
            }
        }
    }

    fn check_safety(&self, intent: &ExtractedIntent, assessment: &mut Assessment) -> Stage {
        let config = self.config;

        if intent.operation == Operation::Delete && config.require_confirmation_delete {
            assessment.confirmations.push(
                "This will permanently delete resources. Type 'confirm' to proceed.".to_string(),
            );
        }

        let protected = self.protected_matches(intent);
        if !protected.is_empty() {
            assessment.confirmations.push(format!(
                "This operation targets production resources (matching: {}). Please confirm this is intentional.",
                protected.join(", ")
            ));
        }

        if intent.operation == Operation::Write && config.require_confirmation_write {
            assessment.confirmations.push(format!(
                "This will modify {} resources. Type 'confirm' to proceed.",
                intent.service
            ));
        }

        if intent.operation.is_mutating() && !intent.is_scoped() && config.confirm_unscoped_changes
        {
            assessment.confirmations.push(format!(
                "This will affect ALL {} resources. Are you sure you want to proceed without filters?",
                intent.service
            ));
        }

        if let Some(action) = intent.action.as_deref() {
            if config.is_high_risk_action(action) {
                assessment
                    .warnings
                    .push(format!("High-risk action requested: {}", action));
            }
        }

        Stage::Continue
    }

    fn check_resource_constraints(
        &self,
        intent: &ExtractedIntent,
        assessment: &mut Assessment,
    ) -> Stage {
        let limit = self.config.max_resource_limit;
        let Some(count) = intent.estimated_resource_count.filter(|c| *c > limit) else {
            return Stage::Continue;
        };

        assessment.warnings.push(format!(
            "Estimated {} resources exceeds the configured limit of {}",
            count, limit
        ));

        if intent.operation.is_destructive() && self.config.confirm_large_deletes {
            assessment.confirmations.push(format!(
                "This will delete an estimated {} resources, above the limit of {}. Type 'confirm' to proceed.",
                count, limit
            ));
        }

        Stage::Continue
    }

    /// Protected patterns hit by any resource id or tag value, in config order.
    fn protected_matches(&self, intent: &ExtractedIntent) -> Vec<&'a str> {
        let targets: Vec<&str> = intent
            .resource_ids
            .iter()
            .chain(intent.tags.values())
            .map(String::as_str)
            .collect();

        self.config
            .protected_patterns
            .iter()
            .map(String::as_str)
            .filter(|pattern| targets.iter().any(|t| protected_pattern_matches(pattern, t)))
            .collect()
    }
}

fn extraction_failed(intent: &ExtractedIntent) -> GateResult {
    let detail = if intent.ambiguities.is_empty() {
        "the request could not be understood; try rephrasing it, e.g. 'list my ec2 instances'"
            .to_string()
    } else {
        intent.ambiguities.join("; ")
    };
    GateResult::reject(format!("Intent extraction failed: {}", detail))
}

fn ambiguity_question(ambiguity: &str, intent: &ExtractedIntent) -> String {
    let lower = ambiguity.to_lowercase();
    if lower.contains("region") {
        "Which region should I use? (e.g., us-east-1, eu-west-1)".to_string()
    } else if lower.contains("resource") {
        format!("Could you specify which {} resource?", intent.service)
    } else {
        format!("Could you clarify: {}", ambiguity)
    }
}

fn synthesize(assessment: Assessment) -> GateResult {
    let Assessment {
        warnings,
        confirmations,
        policy,
    } = assessment;

    let result = if confirmations.is_empty() {
        GateResult::proceed("All validation checks passed. Intent is clear and safe to execute.")
    } else {
        GateResult::confirm("Operation requires explicit confirmation", confirmations)
    };

    result.with_warnings(warnings).with_policy(policy)
}

/// Find a `depends_on` entry that does not point at an earlier step.
fn dependency_problem(steps: &[ExtractedIntent]) -> Option<String> {
    steps.iter().enumerate().find_map(|(index, step)| {
        step.depends_on
            .iter()
            .find(|dep| **dep >= index)
            .map(|dep| {
                format!(
                    "step {} depends on step {}, which does not run before it",
                    index + 1,
                    dep + 1
                )
            })
    })
}

/// Combine per-step results into one decision.
fn aggregate(steps: Vec<GateResult>, total: usize) -> GateResult {
    let decision = steps
        .iter()
        .map(|s| s.decision)
        .max()
        .unwrap_or(GateDecision::Clarify);

    let mut reasoning: Vec<String> = steps
        .iter()
        .enumerate()
        .map(|(i, s)| format!("Step {} [{}]: {}", i + 1, s.decision, s.reasoning))
        .collect();
    if steps.len() < total {
        reasoning.push(format!(
            "Steps {}-{} not evaluated after rejection",
            steps.len() + 1,
            total
        ));
    }

    let tagged = |select: fn(&GateResult) -> &Vec<String>| -> Vec<String> {
        steps
            .iter()
            .enumerate()
            .flat_map(|(i, s)| select(s).iter().map(move |m| format!("Step {}: {}", i + 1, m)))
            .collect()
    };

    let warnings = tagged(|s| &s.warnings);
    let mut result = match decision {
        GateDecision::Proceed => GateResult::proceed(String::new()),
        GateDecision::Confirm => GateResult::confirm(String::new(), tagged(|s| &s.confirmations_required)),
        GateDecision::Clarify => GateResult::clarify(String::new(), tagged(|s| &s.clarifying_questions)),
        GateDecision::Reject => GateResult::reject(String::new()),
    };
    result.reasoning = reasoning.join("\n");

    result.with_warnings(warnings).with_steps(steps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudgate_core::{Confidence, RegionRequirement};
    use cloudgate_policy::{PolicyBuilder, StatementBuilder, templates};

    fn config() -> GateConfig {
        GateConfig::default()
    }

    fn read(service: &str) -> ExtractedIntent {
        ExtractedIntent::new(Operation::Read, service, Confidence::High)
    }

    #[test]
    fn test_unknown_service_clarifies() {
        let result = evaluate(&read("unknown"), &config(), None);
        assert_eq!(result.decision, GateDecision::Clarify);
        assert_eq!(result.clarifying_questions.len(), 1);
    }

    #[test]
    fn test_unknown_operation_clarifies() {
        let intent = ExtractedIntent::new(Operation::Unknown, "ec2", Confidence::High);
        let result = evaluate(&intent, &config(), None);
        assert_eq!(result.decision, GateDecision::Clarify);
    }

    #[test]
    fn test_extraction_error_rejects() {
        let intent = read("ec2")
            .with_kind(IntentKind::Error)
            .with_ambiguity("model returned invalid JSON");
        let result = evaluate(&intent, &config(), None);
        assert_eq!(result.decision, GateDecision::Reject);
        assert!(result.reasoning.contains("invalid JSON"));
    }

    #[test]
    fn test_low_confidence_read_clarifies() {
        let intent = ExtractedIntent::new(Operation::Read, "s3", Confidence::Low);
        let result = evaluate(&intent, &config(), None);
        assert_eq!(result.decision, GateDecision::Clarify);
        assert!(result.reasoning.contains("below required MEDIUM"));
    }

    #[test]
    fn test_medium_confidence_write_clarifies() {
        let intent = ExtractedIntent::new(Operation::Write, "ec2", Confidence::Medium)
            .with_resource_ids(["i-1"]);
        let result = evaluate(&intent, &config(), None);
        assert_eq!(result.decision, GateDecision::Clarify);
    }

    #[test]
    fn test_ambiguities_block_writes_but_warn_on_reads() {
        let write = ExtractedIntent::new(Operation::Write, "ec2", Confidence::High)
            .with_action("stop")
            .with_resource_ids(["i-1"])
            .with_ambiguity("which region");
        let result = evaluate(&write, &config(), None);
        assert_eq!(result.decision, GateDecision::Clarify);
        assert!(result.clarifying_questions[0].contains("region"));

        let list = ExtractedIntent::new(Operation::List, "ec2", Confidence::High)
            .with_ambiguity("which resource");
        let result = evaluate(&list, &config(), None);
        assert_eq!(result.decision, GateDecision::Proceed);
        assert_eq!(result.warnings, vec!["Ambiguity: which resource".to_string()]);
    }

    #[test]
    fn test_region_requirement_lists_known_regions() {
        let mut config = config();
        config.region_requirements = vec![RegionRequirement::new("*", vec![Operation::Delete])];
        config.known_regions = vec!["us-east-1".to_string(), "eu-west-1".to_string()];

        let intent = ExtractedIntent::new(Operation::Delete, "s3", Confidence::High)
            .with_resource_ids(["bucket-1"]);
        let result = evaluate(&intent, &config, None);
        assert_eq!(result.decision, GateDecision::Clarify);
        assert!(result.clarifying_questions[0].contains("us-east-1, eu-west-1"));

        let intent = intent.with_regions(["us-east-1"]);
        assert_eq!(evaluate(&intent, &config, None).decision, GateDecision::Confirm);
    }

    #[test]
    fn test_delete_requires_confirmation() {
        let intent = ExtractedIntent::new(Operation::Delete, "s3", Confidence::High)
            .with_action("delete")
            .with_resource_ids(["logs-bucket"]);
        let result = evaluate(&intent, &config(), None);
        assert_eq!(result.decision, GateDecision::Confirm);
        assert_eq!(
            result.confirmations_required,
            vec!["This will permanently delete resources. Type 'confirm' to proceed.".to_string()]
        );
        assert!(result.warnings.iter().any(|w| w.contains("High-risk action")));
    }

    #[test]
    fn test_protected_resources_confirm_even_for_reads() {
        let intent = read("rds").with_resource_ids(["prod-db-1"]);
        let result = evaluate(&intent, &config(), None);
        assert_eq!(result.decision, GateDecision::Confirm);
        assert!(result.confirmations_required[0].contains("prod*"));
    }

    #[test]
    fn test_protected_tag_value_confirms() {
        let intent = read("ec2").with_tag("Environment", "production");
        let result = evaluate(&intent, &config(), None);
        assert_eq!(result.decision, GateDecision::Confirm);
        assert!(result.confirmations_required[0].contains("*production*"));
    }

    #[test]
    fn test_unscoped_write_confirms() {
        let intent = ExtractedIntent::new(Operation::Write, "ec2", Confidence::High).with_action("stop");
        let result = evaluate(&intent, &config(), None);
        assert_eq!(result.decision, GateDecision::Confirm);
        assert!(result.confirmations_required[0].contains("ALL ec2 resources"));

        let mut relaxed = config();
        relaxed.confirm_unscoped_changes = false;
        assert_eq!(evaluate(&intent, &relaxed, None).decision, GateDecision::Proceed);
    }

    #[test]
    fn test_resource_limit_warns_and_confirms_large_deletes() {
        let mut config = config();
        config.require_confirmation_delete = false;

        let list = ExtractedIntent::new(Operation::List, "ec2", Confidence::High)
            .with_estimated_resource_count(500);
        let result = evaluate(&list, &config, None);
        assert_eq!(result.decision, GateDecision::Proceed);
        assert!(result.warnings[0].contains("500"));
        assert!(result.warnings[0].contains("100"));

        let delete = ExtractedIntent::new(Operation::Delete, "ec2", Confidence::High)
            .with_action("terminate")
            .with_resource_ids(["i-*"])
            .with_estimated_resource_count(500);
        let result = evaluate(&delete, &config, None);
        assert_eq!(result.decision, GateDecision::Confirm);
        assert_eq!(result.confirmations_required.len(), 1);
    }

    #[test]
    fn test_policy_require_approval_forces_confirm() {
        let policies = PolicySet::new(vec![
            templates::require_approval_for_critical(),
        ]);
        let intent = read("ec2").with_tag("Critical", "true");

        let result = evaluate(&intent, &config(), Some(&policies));
        assert_eq!(result.decision, GateDecision::Confirm);
        assert!(result.confirmations_required[0].starts_with("Policy requires approval"));
        assert!(result.policy.is_some());
    }

    #[test]
    fn test_disabled_policies_are_skipped() {
        let policies = PolicySet::new(vec![templates::read_only()]);
        let mut config = config();
        config.enable_policies = false;
        config.require_confirmation_write = false;

        let intent = ExtractedIntent::new(Operation::Write, "ec2", Confidence::High)
            .with_action("stop")
            .with_resource_ids(["i-1"]);
        let result = evaluate(&intent, &config, Some(&policies));
        assert_eq!(result.decision, GateDecision::Proceed);
        assert!(result.policy.is_none());
    }

    #[test]
    fn test_policy_default_deny_rejects() {
        let policies = PolicySet::new(vec![
            PolicyBuilder::new("reads")
                .statement(StatementBuilder::new("allow-reads").allow().read_operations())
                .build(),
        ]);
        let intent = ExtractedIntent::new(Operation::Write, "ec2", Confidence::High)
            .with_action("stop")
            .with_resource_ids(["i-1"]);

        let result = evaluate(&intent, &config(), Some(&policies));
        assert_eq!(result.decision, GateDecision::Reject);
        assert!(result.reasoning.contains("denied by default"));
    }

    #[test]
    fn test_multi_step_takes_most_restrictive() {
        let steps = vec![
            read("ec2"),
            ExtractedIntent::new(Operation::Delete, "ec2", Confidence::High)
                .with_action("terminate")
                .with_resource_ids(["i-1"])
                .depending_on([0]),
            ExtractedIntent::new(Operation::List, "s3", Confidence::Low),
        ];
        let intent = ExtractedIntent::multi_step("ec2", Confidence::High, steps);

        let result = evaluate(&intent, &config(), None);
        assert_eq!(result.decision, GateDecision::Clarify);
        assert_eq!(result.steps.len(), 3);
        assert_eq!(result.steps[1].decision, GateDecision::Confirm);
        assert!(result.reasoning.contains("Step 3 [CLARIFY]"));
        assert!(result.clarifying_questions.iter().all(|q| q.starts_with("Step 3:")));
    }

    #[test]
    fn test_multi_step_reject_stops_later_steps() {
        let policies = PolicySet::new(vec![templates::deny_production_modifications()]);
        let steps = vec![
            ExtractedIntent::new(Operation::Delete, "rds", Confidence::High)
                .with_resource_ids(["db-production-1"]),
            ExtractedIntent::new(Operation::Unknown, "rds", Confidence::High),
        ];
        let intent = ExtractedIntent::multi_step("rds", Confidence::High, steps);

        let result = evaluate(&intent, &config(), Some(&policies));
        assert_eq!(result.decision, GateDecision::Reject);
        assert_eq!(result.steps.len(), 1);
        assert!(result.reasoning.contains("not evaluated"));
    }

    #[test]
    fn test_multi_step_without_steps_clarifies() {
        let mut intent = read("ec2");
        intent.is_multi_step = true;
        let result = evaluate(&intent, &config(), None);
        assert_eq!(result.decision, GateDecision::Clarify);
    }

    #[test]
    fn test_multi_step_forward_dependency_clarifies() {
        let steps = vec![read("ec2").depending_on([1]), read("ec2")];
        let intent = ExtractedIntent::multi_step("ec2", Confidence::High, steps);

        let result = evaluate(&intent, &config(), None);
        assert_eq!(result.decision, GateDecision::Clarify);
        assert!(result.steps.is_empty());
        assert!(result.reasoning.contains("step 1 depends on step 2"));
    }

    #[test]
    fn test_evaluation_does_not_mutate_intent() {
        let intent = ExtractedIntent::new(Operation::Delete, "ec2", Confidence::High)
            .with_resource_ids(["i-1"]);
        let before = intent.clone();
        let _ = evaluate(&intent, &config(), None);
        assert_eq!(intent, before);
    }
}
