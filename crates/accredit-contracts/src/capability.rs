//! Capability types resolved once per request by the identity collaborator.
//!
//! The core never looks up group membership. It receives a `CapabilitySet`
//! already resolved for the caller and passes its role names to the access
//! policy.

use serde::{Deserialize, Serialize};

/// The three roles the tracker distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Reviewer,
    Contributor,
}

impl Role {
    /// Lowercase role name as used in policy rules.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Reviewer => "reviewer",
            Role::Contributor => "contributor",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The boolean capability record for one request.
///
/// Capabilities are fixed for the lifetime of the request; nothing in the
/// core elevates them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet {
    pub is_admin: bool,
    pub is_reviewer: bool,
    pub is_contributor: bool,
}

impl CapabilitySet {
    /// No capabilities at all (anonymous or unprivileged callers).
    pub fn none() -> Self {
        Self::default()
    }

    pub fn admin() -> Self {
        Self {
            is_admin: true,
            ..Self::default()
        }
    }

    pub fn reviewer() -> Self {
        Self {
            is_reviewer: true,
            ..Self::default()
        }
    }

    pub fn contributor() -> Self {
        Self {
            is_contributor: true,
            ..Self::default()
        }
    }

    /// Return true if the set holds `role`.
    pub fn has(&self, role: Role) -> bool {
        match role {
            Role::Admin => self.is_admin,
            Role::Reviewer => self.is_reviewer,
            Role::Contributor => self.is_contributor,
        }
    }

    /// Every role held, in a stable order.
    pub fn roles(&self) -> Vec<Role> {
        [Role::Admin, Role::Reviewer, Role::Contributor]
            .into_iter()
            .filter(|role| self.has(*role))
            .collect()
    }
}
