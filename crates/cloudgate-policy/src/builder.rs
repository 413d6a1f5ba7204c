//! Fluent construction of policies.
//!
//! ```
//! use cloudgate_policy::{Policy, StatementBuilder};
//!
//! let policy = Policy::builder("deny-prod")
//!     .description("Block changes to production")
//!     .statement(
//!         StatementBuilder::new("deny-prod-write")
//!             .deny()
//!             .write_operations()
//!             .when_tag("Environment", "production"),
//!     )
//!     .build();
//!
//! assert_eq!(policy.statements.len(), 1);
//! ```

use cloudgate_core::Operation;

use crate::condition::{Condition, ConditionOperator, ConditionValue};
use crate::policy::{Effect, OperationSet, Policy, ResourcePattern, Statement};

/// Builder for [`Policy`].
#[derive(Debug, Clone)]
pub struct PolicyBuilder {
    name: String,
    version: String,
    description: Option<String>,
    statements: Vec<Statement>,
}

impl PolicyBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: "1.0".to_string(),
            description: None,
            statements: Vec::new(),
        }
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn statement(mut self, statement: StatementBuilder) -> Self {
        self.statements.push(statement.build());
        self
    }

    pub fn build(self) -> Policy {
        Policy {
            name: self.name,
            version: self.version,
            description: self.description,
            statements: self.statements,
        }
    }
}

/// Builder for [`Statement`].
///
/// Defaults to DENY over no operations and all resources; a statement built
/// without choosing operations matches nothing.
#[derive(Debug, Clone)]
pub struct StatementBuilder {
    sid: String,
    effect: Effect,
    operations: OperationSet,
    resource_pattern: ResourcePattern,
    conditions: Vec<Condition>,
    description: Option<String>,
}

impl StatementBuilder {
    pub fn new(sid: impl Into<String>) -> Self {
        Self {
            sid: sid.into(),
            effect: Effect::Deny,
            operations: OperationSet::default(),
            resource_pattern: ResourcePattern::All,
            conditions: Vec::new(),
            description: None,
        }
    }

    pub fn effect(mut self, effect: Effect) -> Self {
        self.effect = effect;
        self
    }

    pub fn allow(self) -> Self {
        self.effect(Effect::Allow)
    }

    pub fn deny(self) -> Self {
        self.effect(Effect::Deny)
    }

    pub fn require_approval(self) -> Self {
        self.effect(Effect::RequireApproval)
    }

    pub fn operations(mut self, operations: impl IntoIterator<Item = Operation>) -> Self {
        self.operations = OperationSet::Only(operations.into_iter().collect());
        self
    }

    /// Add one operation to the set.
    pub fn operation(mut self, operation: Operation) -> Self {
        match &mut self.operations {
            OperationSet::All => {}
            OperationSet::Only(ops) => {
                if !ops.contains(&operation) {
                    ops.push(operation);
                }
            }
        }
        self
    }

    pub fn all_operations(mut self) -> Self {
        self.operations = OperationSet::All;
        self
    }

    /// READ, LIST, DESCRIBE and ANALYZE.
    pub fn read_operations(self) -> Self {
        self.operations(Operation::ALL.into_iter().filter(|op| op.is_read_type()))
    }

    /// WRITE and DELETE.
    pub fn write_operations(self) -> Self {
        self.operations([Operation::Write, Operation::Delete])
    }

    pub fn delete_operations(self) -> Self {
        self.operations([Operation::Delete])
    }

    pub fn resource(mut self, pattern: impl AsRef<str>) -> Self {
        self.resource_pattern = ResourcePattern::parse(pattern.as_ref());
        self
    }

    pub fn all_resources(mut self) -> Self {
        self.resource_pattern = ResourcePattern::All;
        self
    }

    /// Match one exact identifier, even if it contains `*`.
    pub fn resource_id(mut self, id: impl Into<String>) -> Self {
        self.resource_pattern = ResourcePattern::Exact(id.into());
        self
    }

    pub fn condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn when(
        self,
        key: impl Into<String>,
        operator: ConditionOperator,
        value: impl Into<ConditionValue>,
    ) -> Self {
        self.condition(Condition::new(key, operator, value))
    }

    pub fn when_tag(self, tag: &str, value: impl Into<String>) -> Self {
        self.condition(Condition::equals(format!("tag:{}", tag), value))
    }

    pub fn when_region_in<I, S>(self, regions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.condition(Condition::one_of("region", regions))
    }

    pub fn when_service_in<I, S>(self, services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.condition(Condition::one_of("service", services))
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn build(self) -> Statement {
        Statement {
            sid: self.sid,
            effect: self.effect,
            operations: self.operations,
            resource_pattern: self.resource_pattern,
            conditions: self.conditions,
            description: self.description,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_policy() {
        let policy = PolicyBuilder::new("ops")
            .version("2.1")
            .description("ops guardrails")
            .statement(
                StatementBuilder::new("allow-reads")
                    .allow()
                    .read_operations()
                    .description("reads are fine"),
            )
            .statement(
                StatementBuilder::new("approve-deletes")
                    .require_approval()
                    .delete_operations()
                    .resource("db-*")
                    .when_region_in(["us-east-1"]),
            )
            .build();

        assert_eq!(policy.version, "2.1");
        assert_eq!(policy.statements.len(), 2);

        let reads = &policy.statements[0];
        assert_eq!(reads.effect, Effect::Allow);
        assert!(reads.operations.contains(Operation::Describe));
        assert!(!reads.operations.contains(Operation::Write));

        let deletes = &policy.statements[1];
        assert_eq!(deletes.effect, Effect::RequireApproval);
        assert_eq!(
            deletes.resource_pattern,
            ResourcePattern::Wildcard("db-*".to_string())
        );
        assert_eq!(deletes.conditions.len(), 1);
    }

    #[test]
    fn test_statement_defaults_match_nothing() {
        let statement = StatementBuilder::new("empty").build();
        assert_eq!(statement.effect, Effect::Deny);
        assert!(statement.operations.is_empty());
        assert_eq!(statement.resource_pattern, ResourcePattern::All);
    }

    #[test]
    fn test_operation_accumulates_without_duplicates() {
        let statement = StatementBuilder::new("s")
            .operation(Operation::Write)
            .operation(Operation::Write)
            .operation(Operation::Delete)
            .build();
        assert_eq!(
            statement.operations,
            OperationSet::Only(vec![Operation::Write, Operation::Delete])
        );
    }

    #[test]
    fn test_resource_id_keeps_literal_star() {
        let statement = StatementBuilder::new("s").resource_id("weird*name").build();
        assert_eq!(
            statement.resource_pattern,
            ResourcePattern::Exact("weird*name".to_string())
        );
    }
}
