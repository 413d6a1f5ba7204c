//! Structured intent produced by the extraction layer.
//!
//! An [`ExtractedIntent`] is the sole input contract of the gate. It is created
//! once per user query and treated as read-only afterwards; every evaluator
//! borrows it and never mutates it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// High-level operation category.
///
/// Deserialization is case-insensitive. Values outside the known set become
/// [`Operation::Unknown`], which the gate treats as unresolvable.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(from = "String", into = "String")]
pub enum Operation {
    /// Fetch a specific resource or its data.
    Read,
    /// Create, update or modify resources.
    Write,
    /// Delete, terminate or remove resources.
    Delete,
    /// Enumerate resources.
    List,
    /// Describe resource configuration.
    Describe,
    /// Analyze, report, find issues.
    Analyze,
    /// Anything the extractor could not classify.
    #[default]
    Unknown,
}

impl Operation {
    /// Every resolvable operation, in declaration order.
    pub const ALL: [Operation; 6] = [
        Operation::Read,
        Operation::Write,
        Operation::Delete,
        Operation::List,
        Operation::Describe,
        Operation::Analyze,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Read => "read",
            Operation::Write => "write",
            Operation::Delete => "delete",
            Operation::List => "list",
            Operation::Describe => "describe",
            Operation::Analyze => "analyze",
            Operation::Unknown => "unknown",
        }
    }

    /// Operations that only observe state.
    pub fn is_read_type(self) -> bool {
        matches!(
            self,
            Operation::Read | Operation::List | Operation::Describe | Operation::Analyze
        )
    }

    /// Operations that change state (WRITE and DELETE).
    pub fn is_mutating(self) -> bool {
        matches!(self, Operation::Write | Operation::Delete)
    }

    /// Operations that irreversibly destroy state.
    pub fn is_destructive(self) -> bool {
        self == Operation::Delete
    }
}

impl From<String> for Operation {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "read" | "get" => Operation::Read,
            "write" => Operation::Write,
            "delete" => Operation::Delete,
            "list" => Operation::List,
            "describe" => Operation::Describe,
            "analyze" => Operation::Analyze,
            _ => Operation::Unknown,
        }
    }
}

impl From<Operation> for String {
    fn from(value: Operation) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str().to_uppercase())
    }
}

/// Extraction certainty.
///
/// Ordered `Low < Medium < High` so thresholds compare directly. An
/// unrecognised value is read as `Low`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(from = "String", into = "String")]
pub enum Confidence {
    #[default]
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn as_str(self) -> &'static str {
        match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        }
    }
}

impl From<String> for Confidence {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "high" => Confidence::High,
            "medium" => Confidence::Medium,
            _ => Confidence::Low,
        }
    }
}

impl From<Confidence> for String {
    fn from(value: Confidence) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str().to_uppercase())
    }
}

/// Classification the extractor assigned to the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    #[default]
    Simple,
    Complex,
    MultiStep,
    Ambiguous,
    /// Extraction failed; the remaining fields are unreliable.
    Error,
}

/// The complete structured intent.
///
/// Missing `operation`, `service` or `confidence` fields parse as
/// `Unknown`, `""` and `Low`, leaving the gate to ask for them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedIntent {
    /// Action category.
    #[serde(default)]
    pub operation: Operation,

    /// Target service identifier (e.g. "ec2", "s3").
    #[serde(default)]
    pub service: String,

    /// Extraction certainty.
    #[serde(default)]
    pub confidence: Confidence,

    #[serde(default)]
    pub kind: IntentKind,

    /// Concrete verb the user asked for ("terminate", "stop").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    /// Resource type within the service ("instance", "bucket").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,

    /// Target resource identifiers. Empty means "all" or "unspecified".
    #[serde(default)]
    pub resource_ids: Vec<String>,

    /// Target regions.
    #[serde(default)]
    pub regions: Vec<String>,

    /// Tags describing the targeted resources.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,

    /// Estimated number of resources affected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_resource_count: Option<u64>,

    /// Things the extractor flagged as unclear.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ambiguities: Vec<String>,

    #[serde(default)]
    pub is_multi_step: bool,

    /// Ordered steps of a multi-step request.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_intents: Vec<ExtractedIntent>,

    /// Zero-based indices of earlier sibling steps this step depends on.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_query: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl ExtractedIntent {
    /// Create a single-step intent with no resources, regions or tags.
    pub fn new(operation: Operation, service: impl Into<String>, confidence: Confidence) -> Self {
        Self {
            operation,
            service: service.into(),
            confidence,
            kind: IntentKind::Simple,
            action: None,
            resource_type: None,
            resource_ids: Vec::new(),
            regions: Vec::new(),
            tags: BTreeMap::new(),
            estimated_resource_count: None,
            ambiguities: Vec::new(),
            is_multi_step: false,
            sub_intents: Vec::new(),
            depends_on: Vec::new(),
            original_query: None,
            extracted_at: None,
        }
    }

    /// Create a multi-step intent from ordered steps.
    pub fn multi_step(
        service: impl Into<String>,
        confidence: Confidence,
        steps: Vec<ExtractedIntent>,
    ) -> Self {
        let operation = steps
            .iter()
            .map(|s| s.operation)
            .find(|op| op.is_mutating())
            .or_else(|| steps.first().map(|s| s.operation))
            .unwrap_or(Operation::Unknown);

        Self {
            kind: IntentKind::MultiStep,
            is_multi_step: true,
            sub_intents: steps,
            ..Self::new(operation, service, confidence)
        }
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn with_resource_type(mut self, resource_type: impl Into<String>) -> Self {
        self.resource_type = Some(resource_type.into());
        self
    }

    pub fn with_resource_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resource_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_regions<I, S>(mut self, regions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.regions = regions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_estimated_resource_count(mut self, count: u64) -> Self {
        self.estimated_resource_count = Some(count);
        self
    }

    pub fn with_ambiguity(mut self, ambiguity: impl Into<String>) -> Self {
        self.ambiguities.push(ambiguity.into());
        self
    }

    pub fn with_kind(mut self, kind: IntentKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn depending_on<I: IntoIterator<Item = usize>>(mut self, steps: I) -> Self {
        self.depends_on = steps.into_iter().collect();
        self
    }

    /// Look up a tag value by key.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// True when the intent names a usable service.
    pub fn has_resolvable_service(&self) -> bool {
        let service = self.service.trim();
        !service.is_empty() && !service.eq_ignore_ascii_case("unknown")
    }

    /// True when the intent narrows its target by ids or tags.
    pub fn is_scoped(&self) -> bool {
        !self.resource_ids.is_empty() || !self.tags.is_empty()
    }

    /// Human-readable verb for messages ("terminate" or the operation name).
    pub fn describe_action(&self) -> String {
        self.action
            .as_deref()
            .filter(|a| !a.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.operation.as_str().to_string())
    }
}
