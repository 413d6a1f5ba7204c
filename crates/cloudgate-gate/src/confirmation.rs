//! Interpreting the user's reply to a CONFIRM decision.

use crate::decision::{GateDecision, GateResult};

/// Phrases that cancel the pending operation. Checked first.
const REJECTION_PHRASES: &[&str] = &["no", "cancel", "abort", "stop", "nevermind"];

/// Phrases that approve the pending operation.
const CONFIRMATION_PHRASES: &[&str] = &["confirm", "yes", "proceed", "continue", "go ahead"];

/// Apply a free-text reply to a CONFIRM result.
///
/// Results other than CONFIRM are returned unchanged. Phrases match whole
/// words, case-insensitively; a reply containing both a rejection and a
/// confirmation phrase is a rejection.
pub fn process_confirmation(result: &GateResult, reply: &str) -> GateResult {
    if result.decision != GateDecision::Confirm {
        return result.clone();
    }

    let words = words(reply);

    if let Some(phrase) = find_phrase(&words, REJECTION_PHRASES) {
        tracing::info!(phrase, "User declined confirmation");
        return GateResult::reject("User declined to confirm the operation")
            .with_policy(result.policy.clone())
            .with_steps(result.steps.clone());
    }

    if let Some(phrase) = find_phrase(&words, CONFIRMATION_PHRASES) {
        tracing::info!(phrase, "User confirmed operation");
        return GateResult::proceed("User explicitly confirmed the operation")
            .with_warnings(result.warnings.clone())
            .with_policy(result.policy.clone())
            .with_steps(result.steps.clone());
    }

    tracing::debug!("Confirmation reply not understood");
    GateResult::confirm(
        "Confirmation response not clear",
        vec!["Please respond with 'confirm' to proceed or 'cancel' to abort.".to_string()],
    )
    .with_warnings(result.warnings.clone())
    .with_policy(result.policy.clone())
    .with_steps(result.steps.clone())
}

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn find_phrase(words: &[String], phrases: &[&'static str]) -> Option<&'static str> {
    phrases.iter().copied().find(|phrase| {
        let parts: Vec<&str> = phrase.split_whitespace().collect();
        words
            .windows(parts.len())
            .any(|window| window.iter().zip(&parts).all(|(w, p)| w == p))
    })
}
