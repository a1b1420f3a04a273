//! Access policy context and verdict.
//!
//! The service builds an `AccessContext` from the request principal and the
//! operation it is about to run. The policy engine answers with an
//! `AccessVerdict`; anything but `Allow` stops the operation before it reads
//! mutable state or writes an audit entry.

use serde::{Deserialize, Serialize};

use crate::actor::Principal;

/// The decision for one `(action, resource)` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessVerdict {
    Allow,
    Deny { reason: String },
}

/// Everything the policy engine looks at.
///
/// Plain strings so policy rules can be written without the data model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessContext {
    /// e.g. `"create"`, `"revoke"`, `"export"`.
    pub action: String,
    /// e.g. `"indicator"`, `"attestation"`, `"audit_log"`.
    pub resource: String,
    pub actor_id: Option<String>,
    pub authenticated: bool,
    /// Lowercase role names held by the caller.
    pub roles: Vec<String>,
}

impl AccessContext {
    pub fn new(principal: &Principal, action: &str, resource: &str) -> Self {
        Self {
            action: action.to_string(),
            resource: resource.to_string(),
            actor_id: principal.actor_id().map(str::to_string),
            authenticated: principal.is_authenticated(),
            roles: principal
                .capabilities
                .roles()
                .into_iter()
                .map(|r| r.as_str().to_string())
                .collect(),
        }
    }
}
