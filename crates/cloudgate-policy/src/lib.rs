//! Cloudgate policies
//!
//! IAM-style declarative policies over extracted intents: statements with an
//! effect, an operation set, a resource pattern and conditions, grouped into
//! named policies. The [`engine`] resolves a [`PolicySet`] against an intent
//! with DENY > ALLOW > REQUIRE_APPROVAL precedence and a default deny.

pub mod builder;
pub mod condition;
pub mod engine;
pub mod error;
pub mod pattern;
pub mod policy;
pub mod store;
pub mod templates;
pub mod validator;

pub use builder::{PolicyBuilder, StatementBuilder};
pub use condition::{Condition, ConditionOperator, ConditionOutcome, ConditionValue};
pub use engine::{PolicyEvaluationResult, StatementRef, evaluate};
pub use error::PolicyError;
pub use pattern::{glob_matches, protected_pattern_matches};
pub use policy::{Effect, OperationSet, Policy, PolicySet, ResourcePattern, Statement};
pub use store::PolicyStore;
pub use templates::PolicyTemplate;
pub use validator::{PolicyIssue, PolicyValidator, Severity};
