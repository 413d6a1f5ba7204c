//! Statement conditions.
//!
//! A [`Condition`] compares one attribute of the intent against a literal
//! value. Attributes are looked up by key:
//!
//! | key                              | attribute                        |
//! |----------------------------------|----------------------------------|
//! | `region`, `regions`              | target regions (collection)      |
//! | `resource_id`, `resource_ids`    | target resource ids (collection) |
//! | `service`                        | service identifier               |
//! | `operation`                      | operation, lowercase             |
//! | `resource_type`, `action`        | optional extraction fields       |
//! | `tag:<Name>` or a bare `<Name>`  | tag value                        |
//!
//! An absent attribute (unset tag, empty region list) makes the condition
//! false whatever the operator.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use cloudgate_core::ExtractedIntent;

/// Comparison operator.
///
/// Parsed case-insensitively. Unrecognised names become
/// [`ConditionOperator::Unsupported`], which never matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    In,
    NotIn,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    /// Regex search; anchor with `^...$` for a full match.
    Matches,
    Unsupported(String),
}

impl ConditionOperator {
    pub fn as_str(&self) -> &str {
        match self {
            ConditionOperator::Equals => "equals",
            ConditionOperator::NotEquals => "not_equals",
            ConditionOperator::In => "in",
            ConditionOperator::NotIn => "not_in",
            ConditionOperator::Contains => "contains",
            ConditionOperator::NotContains => "not_contains",
            ConditionOperator::StartsWith => "starts_with",
            ConditionOperator::EndsWith => "ends_with",
            ConditionOperator::Matches => "matches",
            ConditionOperator::Unsupported(name) => name,
        }
    }

    /// Operators that compare against a set of values.
    fn takes_set(&self) -> bool {
        matches!(self, ConditionOperator::In | ConditionOperator::NotIn)
    }
}

impl From<String> for ConditionOperator {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "equals" => ConditionOperator::Equals,
            "not_equals" => ConditionOperator::NotEquals,
            "in" => ConditionOperator::In,
            "not_in" => ConditionOperator::NotIn,
            "contains" => ConditionOperator::Contains,
            "not_contains" => ConditionOperator::NotContains,
            "starts_with" => ConditionOperator::StartsWith,
            "ends_with" => ConditionOperator::EndsWith,
            "matches" => ConditionOperator::Matches,
            _ => ConditionOperator::Unsupported(value),
        }
    }
}

impl From<ConditionOperator> for String {
    fn from(value: ConditionOperator) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ConditionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str().to_uppercase())
    }
}

/// Literal operand: a single string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionValue {
    One(String),
    Many(Vec<String>),
}

impl ConditionValue {
    fn as_slice(&self) -> &[String] {
        match self {
            ConditionValue::One(value) => std::slice::from_ref(value),
            ConditionValue::Many(values) => values,
        }
    }
}

impl From<&str> for ConditionValue {
    fn from(value: &str) -> Self {
        ConditionValue::One(value.to_string())
    }
}

impl From<String> for ConditionValue {
    fn from(value: String) -> Self {
        ConditionValue::One(value)
    }
}

impl From<Vec<String>> for ConditionValue {
    fn from(values: Vec<String>) -> Self {
        ConditionValue::Many(values)
    }
}

impl From<Vec<&str>> for ConditionValue {
    fn from(values: Vec<&str>) -> Self {
        ConditionValue::Many(values.into_iter().map(String::from).collect())
    }
}

impl fmt::Display for ConditionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionValue::One(value) => write!(f, "'{}'", value),
            ConditionValue::Many(values) => write!(f, "[{}]", values.join(", ")),
        }
    }
}

/// Result of checking one condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionOutcome {
    Matched,
    NotMatched,
    /// The condition cannot be evaluated; it counts as not matched.
    Malformed(String),
}

impl ConditionOutcome {
    pub fn is_match(&self) -> bool {
        matches!(self, ConditionOutcome::Matched)
    }
}

impl From<bool> for ConditionOutcome {
    fn from(matched: bool) -> Self {
        if matched {
            ConditionOutcome::Matched
        } else {
            ConditionOutcome::NotMatched
        }
    }
}

/// A `(key, operator, value)` predicate over the intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub key: String,
    pub operator: ConditionOperator,
    pub value: ConditionValue,
}

/// Attribute value resolved from the intent.
enum Attribute<'a> {
    Scalar(&'a str),
    Collection(Vec<&'a str>),
}

impl<'a> Attribute<'a> {
    fn values(&self) -> Vec<&'a str> {
        match self {
            Attribute::Scalar(value) => vec![*value],
            Attribute::Collection(values) => values.clone(),
        }
    }
}

impl Condition {
    pub fn new(
        key: impl Into<String>,
        operator: ConditionOperator,
        value: impl Into<ConditionValue>,
    ) -> Self {
        Self {
            key: key.into(),
            operator,
            value: value.into(),
        }
    }

    pub fn equals(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(key, ConditionOperator::Equals, value.into())
    }

    pub fn one_of<I, S>(key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        Self::new(key, ConditionOperator::In, values)
    }

    pub fn not_in<I, S>(key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        Self::new(key, ConditionOperator::NotIn, values)
    }

    pub fn matches(key: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::new(key, ConditionOperator::Matches, pattern.into())
    }

    /// Describe why this condition can never be evaluated, if it can't.
    pub fn malformation(&self) -> Option<String> {
        self.prepare().err()
    }

    /// Check the condition against an intent.
    pub fn evaluate(&self, intent: &ExtractedIntent) -> ConditionOutcome {
        let regex = match self.prepare() {
            Ok(regex) => regex,
            Err(reason) => return ConditionOutcome::Malformed(reason),
        };

        let Some(attribute) = self.resolve(intent) else {
            return ConditionOutcome::NotMatched;
        };

        let expected = self.value.as_slice();
        let values = attribute.values();

        let matched = match &self.operator {
            ConditionOperator::Equals => values.iter().any(|v| *v == expected[0]),
            ConditionOperator::NotEquals => values.iter().all(|v| *v != expected[0]),
            ConditionOperator::In => values.iter().any(|v| expected.iter().any(|e| e == v)),
            ConditionOperator::NotIn => values.iter().all(|v| expected.iter().all(|e| e != v)),
            ConditionOperator::Contains => contains(&attribute, &expected[0]),
            ConditionOperator::NotContains => !contains(&attribute, &expected[0]),
            ConditionOperator::StartsWith => {
                values.iter().any(|v| v.starts_with(expected[0].as_str()))
            }
            ConditionOperator::EndsWith => {
                values.iter().any(|v| v.ends_with(expected[0].as_str()))
            }
            ConditionOperator::Matches => match &regex {
                Some(re) => values.iter().any(|v| re.is_match(v)),
                None => false,
            },
            ConditionOperator::Unsupported(_) => false,
        };

        matched.into()
    }

    /// Validate operator and operand shape; compile the regex for MATCHES.
    fn prepare(&self) -> Result<Option<Regex>, String> {
        if let ConditionOperator::Unsupported(name) = &self.operator {
            return Err(format!(
                "condition on '{}' uses unsupported operator '{}'",
                self.key, name
            ));
        }

        if !self.operator.takes_set() && matches!(self.value, ConditionValue::Many(_)) {
            return Err(format!(
                "condition on '{}' with operator {} expects a single value",
                self.key, self.operator
            ));
        }

        if self.value.as_slice().iter().all(|v| v.is_empty()) {
            return Err(format!("condition on '{}' has no value", self.key));
        }

        if self.operator == ConditionOperator::Matches {
            let pattern = &self.value.as_slice()[0];
            return Regex::new(pattern).map(Some).map_err(|e| {
                format!(
                    "condition on '{}' has invalid regex '{}': {}",
                    self.key, pattern, e
                )
            });
        }

        Ok(None)
    }

    fn resolve<'a>(&self, intent: &'a ExtractedIntent) -> Option<Attribute<'a>> {
        let collection = |items: &'a [String]| {
            if items.is_empty() {
                None
            } else {
                Some(Attribute::Collection(
                    items.iter().map(String::as_str).collect(),
                ))
            }
        };

        match self.key.as_str() {
            "region" | "regions" => collection(intent.regions.as_slice()),
            "resource_id" | "resource_ids" => collection(intent.resource_ids.as_slice()),
            "service" => Some(intent.service.as_str())
                .filter(|s| !s.is_empty())
                .map(Attribute::Scalar),
            "operation" => Some(Attribute::Scalar(intent.operation.as_str())),
            "resource_type" => intent.resource_type.as_deref().map(Attribute::Scalar),
            "action" => intent.action.as_deref().map(Attribute::Scalar),
            key => {
                let tag = key.strip_prefix("tag:").unwrap_or(key);
                intent.tag(tag).map(Attribute::Scalar)
            }
        }
    }
}

fn contains(attribute: &Attribute<'_>, needle: &str) -> bool {
    match attribute {
        Attribute::Scalar(value) => value.contains(needle),
        Attribute::Collection(values) => values.iter().any(|v| *v == needle),
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.key, self.operator, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudgate_core::{Confidence, Operation};
    use serde_json::json;

    fn intent() -> ExtractedIntent {
        ExtractedIntent::new(Operation::Write, "ec2", Confidence::High)
            .with_resource_ids(["i-123", "i-456"])
            .with_regions(["us-east-1", "eu-west-1"])
            .with_tag("Environment", "production")
            .with_action("stop")
    }

    #[test]
    fn test_parse_condition_json() {
        let condition: Condition = serde_json::from_value(json!({
            "key": "tag:Environment",
            "operator": "IN",
            "value": ["production", "prod"]
        }))
        .unwrap();

        assert_eq!(condition.operator, ConditionOperator::In);
        assert!(condition.evaluate(&intent()).is_match());
    }

    #[test]
    fn test_unknown_operator_is_unsupported() {
        let condition: Condition = serde_json::from_value(json!({
            "key": "region",
            "operator": "roughly",
            "value": "us-east-1"
        }))
        .unwrap();

        assert_eq!(
            condition.operator,
            ConditionOperator::Unsupported("roughly".to_string())
        );
        assert!(matches!(
            condition.evaluate(&intent()),
            ConditionOutcome::Malformed(_)
        ));
    }

    #[test]
    fn test_equals_is_case_sensitive() {
        assert!(Condition::equals("Environment", "production")
            .evaluate(&intent())
            .is_match());
        assert!(!Condition::equals("tag:Environment", "Production")
            .evaluate(&intent())
            .is_match());
    }

    #[test]
    fn test_collection_any_semantics() {
        let c = Condition::new("region", ConditionOperator::StartsWith, "eu-");
        assert!(c.evaluate(&intent()).is_match());

        let c = Condition::one_of("resource_id", ["i-456"]);
        assert!(c.evaluate(&intent()).is_match());
    }

    #[test]
    fn test_collection_negations_require_every_element() {
        let c = Condition::not_in("region", ["us-east-1"]);
        assert!(!c.evaluate(&intent()).is_match());

        let c = Condition::not_in("region", ["ap-south-1"]);
        assert!(c.evaluate(&intent()).is_match());

        let c = Condition::new("region", ConditionOperator::NotEquals, "us-east-1");
        assert!(!c.evaluate(&intent()).is_match());
    }

    #[test]
    fn test_contains_on_scalar_and_collection() {
        let c = Condition::new("tag:Environment", ConditionOperator::Contains, "prod");
        assert!(c.evaluate(&intent()).is_match());

        // Collection CONTAINS is element membership, not substring.
        let c = Condition::new("resource_id", ConditionOperator::Contains, "i-1");
        assert!(!c.evaluate(&intent()).is_match());
        let c = Condition::new("resource_id", ConditionOperator::Contains, "i-123");
        assert!(c.evaluate(&intent()).is_match());
    }

    #[test]
    fn test_missing_attribute_is_false_for_every_operator() {
        let bare = ExtractedIntent::new(Operation::Read, "ec2", Confidence::High);
        let conditions = [
            Condition::equals("tag:Owner", "alice"),
            Condition::not_in("region", ["us-east-1"]),
            Condition::new("tag:Owner", ConditionOperator::NotEquals, "bob"),
            Condition::new("action", ConditionOperator::NotContains, "x"),
            Condition::matches("resource_id", ".*"),
        ];

        for c in conditions {
            assert_eq!(c.evaluate(&bare), ConditionOutcome::NotMatched, "{}", c);
        }
    }

    #[test]
    fn test_matches_is_a_search() {
        let c = Condition::matches("action", "to");
        assert!(c.evaluate(&intent()).is_match());

        let c = Condition::matches("action", "^to$");
        assert!(!c.evaluate(&intent()).is_match());
    }

    #[test]
    fn test_invalid_regex_is_malformed() {
        let c = Condition::matches("region", "([unclosed");
        assert!(c.malformation().is_some());
        match c.evaluate(&intent()) {
            ConditionOutcome::Malformed(reason) => assert!(reason.contains("invalid regex")),
            other => panic!("expected malformed, got {:?}", other),
        }
    }

    #[test]
    fn test_list_value_for_scalar_operator_is_malformed() {
        let c = Condition::new("service", ConditionOperator::Equals, vec!["ec2", "s3"]);
        assert!(c.malformation().is_some());
    }

    #[test]
    fn test_empty_value_is_malformed() {
        for operator in [
            ConditionOperator::StartsWith,
            ConditionOperator::EndsWith,
            ConditionOperator::Contains,
            ConditionOperator::Equals,
        ] {
            let c = Condition::new("tag:Environment", operator, "");
            assert!(c.malformation().is_some(), "{}", c);
            assert!(!c.evaluate(&intent()).is_match());
        }

        let c = Condition::new("region", ConditionOperator::NotIn, Vec::<String>::new());
        assert!(matches!(
            c.evaluate(&intent()),
            ConditionOutcome::Malformed(_)
        ));
    }

    #[test]
    fn test_operation_and_service_keys() {
        assert!(Condition::equals("operation", "write")
            .evaluate(&intent())
            .is_match());
        assert!(Condition::one_of("service", ["ec2", "rds"])
            .evaluate(&intent())
            .is_match());
    }
}
