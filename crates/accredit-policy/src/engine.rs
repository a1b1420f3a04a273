//! TOML-driven access policy.
//!
//! Evaluation algorithm:
//!
//! 1. Iterate rules in declaration order.
//! 2. For the first rule whose actions and resource match:
//!    a. A `deny` rule denies with its reason.
//!    b. An `allow` rule that requires authentication denies an
//!       unauthenticated caller.
//!    c. An `allow` rule that lists roles denies a caller holding none of
//!       them.
//!    d. Otherwise allow.
//! 3. If no rule matched, deny.

use std::path::Path;

use tracing::{debug, warn};

use accredit_contracts::{
    access::{AccessContext, AccessVerdict},
    error::{AccreditError, AccreditResult},
};
use accredit_core::traits::AccessPolicy;

use crate::rule::{PolicyFile, RuleVerdict};

/// The policy shipped with the tracker, used when no file is configured.
pub const DEFAULT_POLICY: &str = include_str!("../policies/default.toml");

/// An `AccessPolicy` that reads its rules from a TOML document.
///
/// ```rust,ignore
/// use accredit_policy::TomlAccessPolicy;
///
/// let policy = TomlAccessPolicy::from_file(Path::new("policies/strict.toml"))?;
/// ```
#[derive(Debug)]
pub struct TomlAccessPolicy {
    file: PolicyFile,
}

impl TomlAccessPolicy {
    /// Parse `s` as a policy file.
    ///
    /// Returns `AccreditError::Config` if the TOML is malformed or does not
    /// match the `PolicyFile` schema.
    pub fn from_toml_str(s: &str) -> AccreditResult<Self> {
        let file: PolicyFile = toml::from_str(s).map_err(|e| AccreditError::Config {
            reason: format!("failed to parse policy TOML: {}", e),
        })?;
        Ok(Self { file })
    }

    pub fn from_file(path: &Path) -> AccreditResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| AccreditError::Config {
            reason: format!("failed to read policy file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// The embedded default policy.
    pub fn embedded() -> AccreditResult<Self> {
        Self::from_toml_str(DEFAULT_POLICY)
    }

    pub fn rule_count(&self) -> usize {
        self.file.rules.len()
    }
}

impl AccessPolicy for TomlAccessPolicy {
    fn evaluate(&self, ctx: &AccessContext) -> AccreditResult<AccessVerdict> {
        let actor = ctx.actor_id.as_deref().unwrap_or("-");

        for rule in &self.file.rules {
            if !rule.matches(&ctx.action, &ctx.resource) {
                continue;
            }

            debug!(
                rule_id = %rule.id,
                action = %ctx.action,
                resource = %ctx.resource,
                actor = %actor,
                "rule matched"
            );

            if rule.verdict == RuleVerdict::Deny {
                return Ok(AccessVerdict::Deny {
                    reason: rule
                        .deny_reason
                        .clone()
                        .unwrap_or_else(|| format!("denied by rule '{}'", rule.id)),
                });
            }

            if rule.requires_authentication() && !ctx.authenticated {
                return Ok(AccessVerdict::Deny {
                    reason: format!("rule '{}' requires an authenticated user", rule.id),
                });
            }

            if !rule.admits_roles(&ctx.roles) {
                return Ok(AccessVerdict::Deny {
                    reason: format!(
                        "rule '{}' requires one of the roles [{}]",
                        rule.id,
                        rule.roles.join(", ")
                    ),
                });
            }

            return Ok(AccessVerdict::Allow);
        }

        warn!(
            action = %ctx.action,
            resource = %ctx.resource,
            actor = %actor,
            "no access rule matched; denying by default"
        );

        Ok(AccessVerdict::Deny {
            reason: format!(
                "denied by default: no access rule matched action '{}' on resource '{}'",
                ctx.action, ctx.resource
            ),
        })
    }
}
