//! Policy model.
//!
//! A [`Policy`] is a named, versioned collection of [`Statement`]s. Statements
//! are evaluated as a set: conflicts are resolved by effect precedence in the
//! engine, never by position.
//!
//! # Example (YAML)
//!
//! ```yaml
//! name: deny-production-mods
//! version: "1.0"
//! statements:
//!   - sid: deny-prod-write
//!     effect: deny
//!     operations: [write, delete]
//!     resource: "*"
//!     conditions:
//!       - key: tag:Environment
//!         operator: in
//!         value: [production, prod]
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

use cloudgate_core::Operation;

use crate::condition::Condition;
use crate::error::PolicyError;
use crate::pattern::glob_matches;

/// Effect of a policy statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    Allow,
    Deny,
    /// Forces confirmation even when nothing else would.
    RequireApproval,
}

impl Effect {
    pub fn as_str(self) -> &'static str {
        match self {
            Effect::Allow => "allow",
            Effect::Deny => "deny",
            Effect::RequireApproval => "require_approval",
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str().to_uppercase())
    }
}

/// Operation categories a statement applies to.
///
/// Serialized as `all` (or `*`) for every operation, otherwise as a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "OperationSetRepr", into = "OperationSetRepr")]
pub enum OperationSet {
    All,
    Only(Vec<Operation>),
}

impl OperationSet {
    pub fn contains(&self, operation: Operation) -> bool {
        match self {
            // Unresolvable operations never match a blanket statement.
            OperationSet::All => operation != Operation::Unknown,
            OperationSet::Only(ops) => ops.contains(&operation),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, OperationSet::Only(ops) if ops.is_empty())
    }

    pub fn is_all(&self) -> bool {
        matches!(self, OperationSet::All)
    }
}

impl Default for OperationSet {
    fn default() -> Self {
        OperationSet::Only(Vec::new())
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum OperationSetRepr {
    Keyword(String),
    List(Vec<Operation>),
}

impl TryFrom<OperationSetRepr> for OperationSet {
    type Error = String;

    fn try_from(repr: OperationSetRepr) -> Result<Self, Self::Error> {
        match repr {
            OperationSetRepr::Keyword(word) if word == "*" || word.eq_ignore_ascii_case("all") => {
                Ok(OperationSet::All)
            }
            OperationSetRepr::Keyword(word) => Err(format!(
                "operations must be 'all' or a list of operations, got '{}'",
                word
            )),
            OperationSetRepr::List(ops) => Ok(OperationSet::Only(ops)),
        }
    }
}

impl From<OperationSet> for OperationSetRepr {
    fn from(set: OperationSet) -> Self {
        match set {
            OperationSet::All => OperationSetRepr::Keyword("all".to_string()),
            OperationSet::Only(ops) => OperationSetRepr::List(ops),
        }
    }
}

/// Matcher over resource identifiers.
///
/// Parsed from a string: `*` or `all` is [`ResourcePattern::All`], a string
/// containing `*` is a [`ResourcePattern::Wildcard`], anything else is an
/// [`ResourcePattern::Exact`] identifier. An exact identifier the string form
/// would misread (e.g. one containing `*`) is written as `{exact: <id>}`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "ResourcePatternRepr", into = "ResourcePatternRepr")]
pub enum ResourcePattern {
    #[default]
    All,
    Exact(String),
    Wildcard(String),
}

impl ResourcePattern {
    pub fn parse(pattern: &str) -> Self {
        let pattern = pattern.trim();
        if pattern == "*" || pattern.eq_ignore_ascii_case("all") {
            ResourcePattern::All
        } else if pattern.contains('*') {
            ResourcePattern::Wildcard(pattern.to_string())
        } else {
            ResourcePattern::Exact(pattern.to_string())
        }
    }

    /// Check a single identifier.
    pub fn matches_id(&self, id: &str) -> bool {
        match self {
            ResourcePattern::All => true,
            ResourcePattern::Exact(expected) => expected == id,
            ResourcePattern::Wildcard(glob) => glob_matches(glob, id, false),
        }
    }

    /// True when every targeted id satisfies the pattern.
    ///
    /// An empty target set only satisfies [`ResourcePattern::All`]: a narrow
    /// pattern never vouches for an unscoped request.
    pub fn matches_all(&self, ids: &[String]) -> bool {
        match self {
            ResourcePattern::All => true,
            _ => !ids.is_empty() && ids.iter().all(|id| self.matches_id(id)),
        }
    }

    /// True when at least one targeted id satisfies the pattern.
    pub fn matches_any(&self, ids: &[String]) -> bool {
        match self {
            ResourcePattern::All => true,
            _ => ids.iter().any(|id| self.matches_id(id)),
        }
    }
}

impl From<String> for ResourcePattern {
    fn from(value: String) -> Self {
        ResourcePattern::parse(&value)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ResourcePatternRepr {
    Text(String),
    Exact { exact: String },
}

impl From<ResourcePatternRepr> for ResourcePattern {
    fn from(repr: ResourcePatternRepr) -> Self {
        match repr {
            ResourcePatternRepr::Text(text) => ResourcePattern::parse(&text),
            ResourcePatternRepr::Exact { exact } => ResourcePattern::Exact(exact),
        }
    }
}

impl From<ResourcePattern> for ResourcePatternRepr {
    fn from(pattern: ResourcePattern) -> Self {
        match pattern {
            ResourcePattern::All => ResourcePatternRepr::Text("*".to_string()),
            ResourcePattern::Wildcard(glob) => ResourcePatternRepr::Text(glob),
            ResourcePattern::Exact(id) => {
                if ResourcePattern::parse(&id) == ResourcePattern::Exact(id.clone()) {
                    ResourcePatternRepr::Text(id)
                } else {
                    ResourcePatternRepr::Exact { exact: id }
                }
            }
        }
    }
}

impl fmt::Display for ResourcePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourcePattern::All => write!(f, "*"),
            ResourcePattern::Exact(id) => write!(f, "{}", id),
            ResourcePattern::Wildcard(glob) => write!(f, "{}", glob),
        }
    }
}

/// A single rule within a policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    /// Statement identifier, unique within its policy.
    pub sid: String,

    pub effect: Effect,

    #[serde(default)]
    pub operations: OperationSet,

    #[serde(default, rename = "resource")]
    pub resource_pattern: ResourcePattern,

    /// All conditions must hold (logical AND).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Statement {
    /// Check the resource pattern against the targeted ids.
    ///
    /// DENY fails closed on partial overlap and fires when ANY id matches;
    /// ALLOW and REQUIRE_APPROVAL need ALL ids to match.
    pub fn matches_resources(&self, ids: &[String]) -> bool {
        match self.effect {
            Effect::Deny => self.resource_pattern.matches_any(ids),
            Effect::Allow | Effect::RequireApproval => self.resource_pattern.matches_all(ids),
        }
    }
}

/// A named, versioned collection of statements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub name: String,

    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub statements: Vec<Statement>,
}

impl Policy {
    /// Start building a policy.
    pub fn builder(name: impl Into<String>) -> crate::builder::PolicyBuilder {
        crate::builder::PolicyBuilder::new(name)
    }

    /// Load a policy from a YAML (or JSON) file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse a policy from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, PolicyError> {
        serde_yaml::from_str(content).map_err(PolicyError::from)
    }

    /// Look up a statement by id.
    pub fn statement(&self, sid: &str) -> Option<&Statement> {
        self.statements.iter().find(|s| s.sid == sid)
    }
}

fn default_version() -> String {
    "1.0".to_string()
}

/// An ordered, immutable collection of policies.
///
/// Order matters only for tie-breaking within an effect tier: policies in
/// insertion order, then statements within each policy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicySet {
    policies: Vec<Policy>,
}

impl PolicySet {
    pub fn new(policies: Vec<Policy>) -> Self {
        Self { policies }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn policies(&self) -> &[Policy] {
        &self.policies
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    /// Every (policy, statement) pair in evaluation order.
    pub fn statements(&self) -> impl Iterator<Item = (&Policy, &Statement)> {
        self.policies
            .iter()
            .flat_map(|p| p.statements.iter().map(move |s| (p, s)))
    }

    pub fn get(&self, name: &str) -> Option<&Policy> {
        self.policies.iter().find(|p| p.name == name)
    }
}

impl From<Vec<Policy>> for PolicySet {
    fn from(policies: Vec<Policy>) -> Self {
        Self::new(policies)
    }
}

impl FromIterator<Policy> for PolicySet {
    fn from_iter<I: IntoIterator<Item = Policy>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::StatementBuilder;
    use crate::condition::ConditionOperator;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_parse_resource_patterns() {
        assert_eq!(ResourcePattern::parse("*"), ResourcePattern::All);
        assert_eq!(ResourcePattern::parse("ALL"), ResourcePattern::All);
        assert_eq!(
            ResourcePattern::parse("i-123"),
            ResourcePattern::Exact("i-123".to_string())
        );
        assert_eq!(
            ResourcePattern::parse("db-*"),
            ResourcePattern::Wildcard("db-*".to_string())
        );
    }

    #[test]
    fn test_exact_id_with_star_survives_yaml() {
        let statement = StatementBuilder::new("deny-odd")
            .deny()
            .all_operations()
            .resource_id("weird*name")
            .build();

        let yaml = serde_yaml::to_string(&statement).unwrap();
        let restored: Statement = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(
            restored.resource_pattern,
            ResourcePattern::Exact("weird*name".to_string())
        );
        assert!(!restored.resource_pattern.matches_id("weird-other-name"));

        let plain: ResourcePattern = serde_yaml::from_str("\"i-123\"").unwrap();
        assert_eq!(serde_yaml::to_string(&plain).unwrap().trim(), "i-123");
    }

    #[test]
    fn test_empty_targets_only_match_all() {
        let none: Vec<String> = Vec::new();
        assert!(ResourcePattern::All.matches_all(&none));
        assert!(ResourcePattern::All.matches_any(&none));
        assert!(!ResourcePattern::parse("i-1").matches_all(&none));
        assert!(!ResourcePattern::parse("i-*").matches_all(&none));
        assert!(!ResourcePattern::parse("i-*").matches_any(&none));
    }

    #[test]
    fn test_exact_pattern_requires_singleton() {
        let pattern = ResourcePattern::parse("i-1");
        assert!(pattern.matches_all(&ids(&["i-1"])));
        assert!(!pattern.matches_all(&ids(&["i-1", "i-2"])));
        assert!(pattern.matches_any(&ids(&["i-1", "i-2"])));
    }

    #[test]
    fn test_deny_matches_partial_overlap_allow_does_not() {
        let targets = ids(&["db-production-1", "db-staging-1"]);
        let mut statement = Statement {
            sid: "s".to_string(),
            effect: Effect::Deny,
            operations: OperationSet::All,
            resource_pattern: ResourcePattern::parse("*production*"),
            conditions: Vec::new(),
            description: None,
        };
        assert!(statement.matches_resources(&targets));

        statement.effect = Effect::Allow;
        assert!(!statement.matches_resources(&targets));

        statement.effect = Effect::RequireApproval;
        assert!(!statement.matches_resources(&targets));
    }

    #[test]
    fn test_operation_set_all_excludes_unknown() {
        assert!(OperationSet::All.contains(Operation::Delete));
        assert!(!OperationSet::All.contains(Operation::Unknown));
        assert!(!OperationSet::default().contains(Operation::Read));
        assert!(OperationSet::default().is_empty());
    }

    #[test]
    fn test_parse_policy_yaml() {
        let yaml = r#"
name: deny-production-mods
description: Prevent modifications to production resources
statements:
  - sid: deny-prod-write
    effect: deny
    operations: [write, delete]
    resource: "*"
    conditions:
      - key: tag:Environment
        operator: in
        value: [production, prod]
  - sid: allow-everything-else
    effect: allow
    operations: all
"#;

        let policy = Policy::from_yaml(yaml).unwrap();
        assert_eq!(policy.name, "deny-production-mods");
        assert_eq!(policy.version, "1.0");
        assert_eq!(policy.statements.len(), 2);

        let deny = policy.statement("deny-prod-write").unwrap();
        assert_eq!(deny.effect, Effect::Deny);
        assert_eq!(
            deny.operations,
            OperationSet::Only(vec![Operation::Write, Operation::Delete])
        );
        assert_eq!(deny.resource_pattern, ResourcePattern::All);
        assert_eq!(deny.conditions[0].operator, ConditionOperator::In);

        let allow = policy.statement("allow-everything-else").unwrap();
        assert!(allow.operations.is_all());
    }

    #[test]
    fn test_invalid_operations_keyword_is_rejected() {
        let yaml = r#"
name: broken
statements:
  - sid: s1
    effect: allow
    operations: everything
"#;
        assert!(Policy::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_policy_set_statement_order() {
        let first = Policy::builder("first")
            .statement(crate::builder::StatementBuilder::new("a").allow().all_operations())
            .statement(crate::builder::StatementBuilder::new("b").deny().all_operations())
            .build();
        let second = Policy::builder("second")
            .statement(crate::builder::StatementBuilder::new("c").allow().all_operations())
            .build();

        let set = PolicySet::new(vec![first, second]);
        let order: Vec<_> = set
            .statements()
            .map(|(p, s)| format!("{}/{}", p.name, s.sid))
            .collect();
        assert_eq!(order, vec!["first/a", "first/b", "second/c"]);
        assert!(set.get("second").is_some());
    }
}
