//! The compliance service: the audited mutation orchestrator.
//!
//! Every operation runs in the same order:
//!
//!   Access policy → Validate → Mutate (atomic) → Audit
//!
//! The access check comes first and is the only thing that runs for a
//! denied caller: no state is read and no audit entry is written. The audit
//! entry is written only after the mutation has committed, and exactly one
//! entry is written per logical operation. If the audit write itself fails
//! the mutation stands and the failure comes back as
//! `AuditOutcome::Failed` on the `Audited` result.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use accredit_contracts::{
    access::{AccessContext, AccessVerdict},
    actor::Principal,
    audit::{AuditDraft, AuditOutcome, Audited},
    config::AppConfig,
    error::{AccreditError, AccreditResult},
    ids::IndicatorId,
    indicator::Indicator,
};

use crate::{
    clock::{Clock, SystemClock},
    due::DueStatusEngine,
    traits::{AccessPolicy, AuditSink, BlobStore, InputValidator, Repository},
};

mod attestations;
mod evidence;
mod indicators;
mod projects;
mod reports;

pub use reports::{RoleChange, SessionEvent, StatusSummary, SummaryPeriod};

/// Resource names used in access rules.
pub mod resource {
    pub const INDICATOR: &str = "indicator";
    pub const ATTESTATION: &str = "attestation";
    pub const EVIDENCE: &str = "evidence";
    pub const PROJECT: &str = "project";
    pub const AUDIT_LOG: &str = "audit_log";
    pub const SNAPSHOT: &str = "snapshot";
    pub const SESSION: &str = "session";
    pub const ROLE: &str = "role";
    pub const HEALTH: &str = "health";
}

/// Entity type names written to the audit trail.
pub mod entity {
    pub const INDICATOR: &str = "Indicator";
    pub const ATTESTATION: &str = "ComplianceRecord";
    pub const EVIDENCE: &str = "EvidenceItem";
    pub const PROJECT: &str = "Project";
    pub const SNAPSHOT: &str = "Snapshot";
    pub const AUDIT_LOG: &str = "AuditLog";
    pub const USER: &str = "User";
}

/// Liveness answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub checked_at: DateTime<Utc>,
}

pub struct ComplianceService {
    repo: Arc<dyn Repository>,
    blobs: Arc<dyn BlobStore>,
    audit: Arc<dyn AuditSink>,
    policy: Arc<dyn AccessPolicy>,
    validator: Arc<dyn InputValidator>,
    clock: Arc<dyn Clock>,
    engine: DueStatusEngine,
    config: AppConfig,
}

impl ComplianceService {
    pub fn new(
        repo: Arc<dyn Repository>,
        blobs: Arc<dyn BlobStore>,
        audit: Arc<dyn AuditSink>,
        policy: Arc<dyn AccessPolicy>,
        validator: Arc<dyn InputValidator>,
        config: AppConfig,
    ) -> Self {
        Self {
            repo,
            blobs,
            audit,
            policy,
            validator,
            clock: Arc::new(SystemClock),
            engine: DueStatusEngine::new(config.due_soon.clone()),
            config,
        }
    }

    /// Replace the server clock, e.g. with a `FixedClock` in tests.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn engine(&self) -> &DueStatusEngine {
        &self.engine
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Always-available liveness probe.
    pub fn health(&self, principal: &Principal) -> AccreditResult<HealthStatus> {
        self.authorize(principal, "read", resource::HEALTH)?;
        Ok(HealthStatus {
            status: "ok".to_string(),
            checked_at: self.clock.now(),
        })
    }

    // ── Shared steps ─────────────────────────────────────────────────────────

    /// Ask the access policy about `(action, resource)`.
    ///
    /// A denial becomes `PermissionDenied` and nothing else happens.
    pub(crate) fn authorize(
        &self,
        principal: &Principal,
        action: &str,
        resource: &str,
    ) -> AccreditResult<()> {
        let ctx = AccessContext::new(principal, action, resource);
        match self.policy.evaluate(&ctx)? {
            AccessVerdict::Allow => {
                debug!(
                    actor = principal.actor_id().unwrap_or("-"),
                    action = %action,
                    resource = %resource,
                    "access allowed"
                );
                Ok(())
            }
            AccessVerdict::Deny { reason } => {
                warn!(
                    actor = principal.actor_id().unwrap_or("-"),
                    action = %action,
                    resource = %resource,
                    reason = %reason,
                    "access denied"
                );
                Err(AccreditError::PermissionDenied {
                    action: action.to_string(),
                    resource: resource.to_string(),
                    reason,
                })
            }
        }
    }

    /// Write the audit entry for a committed operation.
    ///
    /// Never fails: an audit error is logged and returned as
    /// `AuditOutcome::Failed` so the caller can report degraded success.
    pub(crate) fn emit(&self, draft: AuditDraft) -> AuditOutcome {
        let action = draft.action;
        let entity_type = draft.entity_type.clone();
        let entity_id = draft.entity_id.clone();

        match self.audit.record(draft) {
            Ok(entry) => {
                debug!(
                    action = %action,
                    entity_type = %entity_type,
                    entity_id = %entity_id,
                    sequence = entry.sequence,
                    "audit entry recorded"
                );
                AuditOutcome::Recorded {
                    entry_id: entry.id,
                    sequence: entry.sequence,
                }
            }
            Err(e) => {
                warn!(
                    action = %action,
                    entity_type = %entity_type,
                    entity_id = %entity_id,
                    error = %e,
                    "audit write failed after committed mutation"
                );
                AuditOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    pub(crate) fn audited<T>(&self, value: T, draft: AuditDraft) -> Audited<T> {
        let audit = self.emit(draft);
        Audited { value, audit }
    }

    pub(crate) fn require_indicator(&self, id: IndicatorId) -> AccreditResult<Indicator> {
        self.repo
            .get_indicator(id)?
            .ok_or_else(|| AccreditError::not_found(entity::INDICATOR, id))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod tests;
