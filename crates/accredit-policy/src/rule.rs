//! Access rule types and the policy file schema.
//!
//! A `PolicyFile` is deserialized from TOML and holds an ordered list of
//! `AccessRule`s. Rules are evaluated in declaration order and the first
//! matching rule wins. If no rule matches, the engine denies by default.

use serde::{Deserialize, Serialize};

/// What a matching rule decides, written as a lowercase string in TOML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleVerdict {
    Allow,
    Deny,
}

/// A single access rule loaded from TOML.
///
/// `actions` and `resource` both accept the wildcard `"*"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessRule {
    /// Stable identifier used in log lines and denial reasons.
    pub id: String,

    #[serde(default)]
    pub description: String,

    /// Operations this rule covers, e.g. `["create", "update"]`.
    pub actions: Vec<String>,

    /// Resource this rule covers, e.g. `"attestation"`.
    pub resource: String,

    /// Capability roles admitted by an `allow` rule. Empty admits any role,
    /// including none.
    #[serde(default)]
    pub roles: Vec<String>,

    /// Whether the caller must be authenticated. Defaults to `true` when
    /// `roles` is non-empty and `false` otherwise.
    #[serde(default)]
    pub authenticated: Option<bool>,

    pub verdict: RuleVerdict,

    /// Reported when `verdict = "deny"`.
    #[serde(default)]
    pub deny_reason: Option<String>,
}

impl AccessRule {
    pub fn matches(&self, action: &str, resource: &str) -> bool {
        let action_matches = self.actions.iter().any(|a| a == "*" || a == action);
        let resource_matches = self.resource == "*" || self.resource == resource;
        action_matches && resource_matches
    }

    pub fn requires_authentication(&self) -> bool {
        self.authenticated.unwrap_or(!self.roles.is_empty())
    }

    /// True when no roles are listed or `held` contains one of them.
    pub fn admits_roles(&self, held: &[String]) -> bool {
        self.roles.is_empty() || self.roles.iter().any(|r| held.contains(r))
    }
}

/// The top-level structure of a policy file.
///
/// ```toml
/// [[rules]]
/// id = "read-evidence"
/// actions = ["read", "download"]
/// resource = "evidence"
/// roles = ["admin", "contributor", "reviewer"]
/// verdict = "allow"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyFile {
    /// Ordered list of rules. First match wins.
    pub rules: Vec<AccessRule>,
}
