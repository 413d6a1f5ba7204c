//! Region requirements.

use serde::{Deserialize, Serialize};

use crate::intent::Operation;

/// A service/operation pair that must name a target region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionRequirement {
    /// Service identifier, or `*` for every service.
    pub service: String,

    /// Operations the requirement covers. Empty covers all operations.
    #[serde(default)]
    pub operations: Vec<Operation>,
}

impl RegionRequirement {
    pub fn new(service: impl Into<String>, operations: Vec<Operation>) -> Self {
        Self {
            service: service.into(),
            operations,
        }
    }

    /// Check whether this requirement covers the given pair.
    pub fn applies_to(&self, service: &str, operation: Operation) -> bool {
        let service_matches = self.service == "*" || self.service.eq_ignore_ascii_case(service);
        let operation_matches = self.operations.is_empty() || self.operations.contains(&operation);
        service_matches && operation_matches
    }
}
