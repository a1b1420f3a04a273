//! Actor identity and request context.
//!
//! These are supplied by the identity collaborator on every call. The core
//! treats them as opaque facts: who is acting, what they may do, and where
//! the request came from.

use serde::{Deserialize, Serialize};

use crate::capability::CapabilitySet;

/// A resolved user performing an operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    /// Stable user identifier from the identity collaborator.
    pub id: String,
    /// Name shown in audit listings and exports.
    pub display_name: String,
}

impl Actor {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

/// Transport facts about the incoming request, used only for audit metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    /// Raw value of the forwarded-for header, possibly a comma-separated chain.
    pub forwarded_for: Option<String>,
    /// Address of the direct peer.
    pub remote_addr: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestContext {
    /// The requester IP: the first forwarded-for hop when present and
    /// non-empty, otherwise the direct connection address.
    pub fn client_ip(&self) -> Option<String> {
        let forwarded = self
            .forwarded_for
            .as_deref()
            .and_then(|chain| chain.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty());

        match forwarded {
            Some(ip) => Some(ip.to_string()),
            None => self
                .remote_addr
                .as_deref()
                .map(str::trim)
                .filter(|ip| !ip.is_empty())
                .map(str::to_string),
        }
    }
}

/// Everything the core knows about the caller of one operation.
///
/// `actor` is `None` for anonymous callers and system-initiated work; audit
/// entries written for such calls carry no actor. `system` marks the latter,
/// which counts as authenticated even without an actor.
#[derive(Debug, Clone, Default)]
pub struct Principal {
    pub actor: Option<Actor>,
    pub capabilities: CapabilitySet,
    pub request: Option<RequestContext>,
    pub system: bool,
}

impl Principal {
    /// An authenticated user with the given capabilities.
    pub fn user(actor: Actor, capabilities: CapabilitySet) -> Self {
        Self {
            actor: Some(actor),
            capabilities,
            request: None,
            system: false,
        }
    }

    /// An unauthenticated caller.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// System-initiated work: no actor, full administrative capability.
    pub fn system() -> Self {
        Self {
            actor: None,
            capabilities: CapabilitySet::admin(),
            request: None,
            system: true,
        }
    }

    /// Attach the transport context of the current request.
    pub fn with_request(mut self, request: RequestContext) -> Self {
        self.request = Some(request);
        self
    }

    pub fn actor_id(&self) -> Option<&str> {
        self.actor.as_ref().map(|a| a.id.as_str())
    }

    /// True for a known user or for system-initiated work.
    pub fn is_authenticated(&self) -> bool {
        self.system || self.actor.is_some()
    }
}
