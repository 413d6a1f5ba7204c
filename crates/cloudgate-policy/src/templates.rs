//! Ready-made policies for common guardrails.
//!
//! Each template is available as a plain function and, for configuration
//! files, as a [`PolicyTemplate`] variant selected by its snake_case name:
//!
//! ```yaml
//! - template: region_allowlist
//!   regions: [us-east-1, eu-west-1]
//! ```

use serde::{Deserialize, Serialize};

use cloudgate_core::Operation;

use crate::builder::{PolicyBuilder, StatementBuilder};
use crate::condition::Condition;
use crate::error::PolicyError;
use crate::policy::Policy;

/// Tag values treated as production. Tag comparison is case-sensitive, so
/// the common spellings are listed explicitly.
const PRODUCTION_TAG_VALUES: &[&str] = &[
    "production",
    "Production",
    "PRODUCTION",
    "prod",
    "Prod",
    "PROD",
    "prd",
];

/// Allow read-type operations; deny WRITE and DELETE everywhere.
pub fn read_only() -> Policy {
    PolicyBuilder::new("read-only-policy")
        .description("Allow only read operations, deny all modifications")
        .statement(
            StatementBuilder::new("allow-reads")
                .allow()
                .read_operations()
                .all_resources(),
        )
        .statement(
            StatementBuilder::new("deny-writes")
                .deny()
                .operations([Operation::Write])
                .all_resources(),
        )
        .statement(
            StatementBuilder::new("deny-deletes")
                .deny()
                .delete_operations()
                .all_resources(),
        )
        .build()
}

/// Deny WRITE and DELETE on resources tagged or named as production.
pub fn deny_production_modifications() -> Policy {
    PolicyBuilder::new("deny-production-mods")
        .description("Prevent modifications to production resources")
        .statement(
            StatementBuilder::new("deny-prod-write")
                .deny()
                .write_operations()
                .all_resources()
                .condition(Condition::one_of(
                    "tag:Environment",
                    PRODUCTION_TAG_VALUES.iter().copied(),
                ))
                .description("Resources tagged Environment=production are read-only"),
        )
        .statement(
            StatementBuilder::new("deny-prod-named-resources")
                .deny()
                .write_operations()
                .resource("*production*")
                .description("Resources named as production are read-only"),
        )
        .build()
}

/// Deny any operation that targets a region outside the allowlist.
///
/// Requests that name no region are not affected; pair with a region
/// requirement in the gate configuration to force one.
pub fn region_allowlist<I, S>(regions: I) -> Policy
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let regions: Vec<String> = regions.into_iter().map(Into::into).collect();
    PolicyBuilder::new("region-restrictions")
        .description(format!("Allow operations only in: {}", regions.join(", ")))
        .statement(
            StatementBuilder::new("deny-other-regions")
                .deny()
                .all_operations()
                .all_resources()
                .condition(Condition::not_in("region", regions)),
        )
        .build()
}

/// Allow every operation on the listed services only.
///
/// Other services fall through to the engine's default deny.
pub fn service_allowlist<I, S>(services: I) -> Policy
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let services: Vec<String> = services.into_iter().map(Into::into).collect();
    PolicyBuilder::new("service-restrictions")
        .description(format!("Allow access only to: {}", services.join(", ")))
        .statement(
            StatementBuilder::new("allow-listed-services")
                .allow()
                .all_operations()
                .all_resources()
                .when_service_in(services),
        )
        .build()
}

/// Deny every operation on the listed services.
pub fn service_denylist<I, S>(services: I) -> Policy
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let services: Vec<String> = services.into_iter().map(Into::into).collect();
    PolicyBuilder::new("service-denylist")
        .description(format!("Deny access to: {}", services.join(", ")))
        .statement(
            StatementBuilder::new("deny-listed-services")
                .deny()
                .all_operations()
                .all_resources()
                .when_service_in(services),
        )
        .build()
}

/// Require approval for any operation on resources tagged `Critical=true`.
pub fn require_approval_for_critical() -> Policy {
    PolicyBuilder::new("critical-resource-approval")
        .description("Require approval for critical resources")
        .statement(
            StatementBuilder::new("approval-for-critical")
                .require_approval()
                .all_operations()
                .all_resources()
                .condition(Condition::one_of(
                    "tag:Critical",
                    ["true", "True", "TRUE"],
                )),
        )
        .build()
}

/// Deny every operation touching one of the given resource ids of a service.
pub fn specific_resource_denylist<I, S>(service: &str, resource_ids: I) -> Policy
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    resource_ids
        .into_iter()
        .map(Into::into)
        .fold(
            PolicyBuilder::new("specific-resource-deny")
                .description(format!("Deny operations on specific {} resources", service)),
            |policy, id: String| {
                policy.statement(
                    StatementBuilder::new(format!("deny-{}", id))
                        .deny()
                        .all_operations()
                        .resource_id(id)
                        .condition(Condition::equals("service", service)),
                )
            },
        )
        .build()
}

/// Baseline guardrails: allow reads, require approval for WRITE, deny DELETE.
pub fn default_guardrails() -> Policy {
    PolicyBuilder::new("default-policies")
        .description("Allow reads, require approval for writes, deny deletes")
        .statement(
            StatementBuilder::new("allow-reads")
                .allow()
                .read_operations()
                .all_resources(),
        )
        .statement(
            StatementBuilder::new("approval-for-writes")
                .require_approval()
                .write_operations()
                .all_resources(),
        )
        .statement(
            StatementBuilder::new("deny-delete")
                .deny()
                .delete_operations()
                .all_resources(),
        )
        .build()
}

/// Policies applied when no policies are configured at all.
pub fn default_policies() -> Vec<Policy> {
    vec![deny_production_modifications(), default_guardrails()]
}

/// A template reference as it appears in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "template", rename_all = "snake_case")]
pub enum PolicyTemplate {
    ReadOnly,
    DenyProductionModifications,
    DefaultGuardrails,
    RegionAllowlist {
        #[serde(default)]
        regions: Vec<String>,
    },
    ServiceAllowlist {
        #[serde(default)]
        services: Vec<String>,
    },
    ServiceDenylist {
        #[serde(default)]
        services: Vec<String>,
    },
    RequireApprovalForCritical,
    SpecificResourceDenylist {
        #[serde(default)]
        service: String,
        #[serde(default)]
        resource_ids: Vec<String>,
    },
}

impl PolicyTemplate {
    /// Names and one-line descriptions of every template.
    pub const CATALOG: &'static [(&'static str, &'static str)] = &[
        ("read_only", "Allow read-type operations, deny WRITE and DELETE"),
        (
            "deny_production_modifications",
            "Deny WRITE/DELETE on resources tagged or named as production",
        ),
        (
            "default_guardrails",
            "Allow reads, require approval for WRITE, deny DELETE",
        ),
        (
            "region_allowlist",
            "Deny operations targeting regions outside `regions`",
        ),
        (
            "service_allowlist",
            "Allow every operation on `services`, nothing else",
        ),
        ("service_denylist", "Deny every operation on `services`"),
        (
            "require_approval_for_critical",
            "Require approval for resources tagged Critical=true",
        ),
        (
            "specific_resource_denylist",
            "Deny operations on `resource_ids` of `service`",
        ),
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PolicyTemplate::ReadOnly => "read_only",
            PolicyTemplate::DenyProductionModifications => "deny_production_modifications",
            PolicyTemplate::DefaultGuardrails => "default_guardrails",
            PolicyTemplate::RegionAllowlist { .. } => "region_allowlist",
            PolicyTemplate::ServiceAllowlist { .. } => "service_allowlist",
            PolicyTemplate::ServiceDenylist { .. } => "service_denylist",
            PolicyTemplate::RequireApprovalForCritical => "require_approval_for_critical",
            PolicyTemplate::SpecificResourceDenylist { .. } => "specific_resource_denylist",
        }
    }

    /// Instantiate the template.
    pub fn build(&self) -> Result<Policy, PolicyError> {
        let require = |values: &[String], parameter| {
            if values.iter().all(|v| v.trim().is_empty()) {
                Err(PolicyError::missing_parameter(self.name(), parameter))
            } else {
                Ok(())
            }
        };

        let policy = match self {
            PolicyTemplate::ReadOnly => read_only(),
            PolicyTemplate::DenyProductionModifications => deny_production_modifications(),
            PolicyTemplate::DefaultGuardrails => default_guardrails(),
            PolicyTemplate::RegionAllowlist { regions } => {
                require(regions.as_slice(), "regions")?;
                region_allowlist(regions.iter().cloned())
            }
            PolicyTemplate::ServiceAllowlist { services } => {
                require(services.as_slice(), "services")?;
                service_allowlist(services.iter().cloned())
            }
            PolicyTemplate::ServiceDenylist { services } => {
                require(services.as_slice(), "services")?;
                service_denylist(services.iter().cloned())
            }
            PolicyTemplate::RequireApprovalForCritical => require_approval_for_critical(),
            PolicyTemplate::SpecificResourceDenylist {
                service,
                resource_ids,
            } => {
                require(std::slice::from_ref(service), "service")?;
                require(resource_ids.as_slice(), "resource_ids")?;
                specific_resource_denylist(service, resource_ids.iter().cloned())
            }
        };

        tracing::debug!(
            template = self.name(),
            policy = %policy.name,
            statements = policy.statements.len(),
            "Instantiated policy template"
        );

        Ok(policy)
    }
}
