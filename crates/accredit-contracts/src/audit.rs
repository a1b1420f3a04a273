//! Audit trail types: actions, drafts, stored entries, queries and the
//! degraded-success wrapper returned by mutating operations.
//!
//! An `AuditDraft` is what the orchestrator hands to the sink. It carries raw
//! `Payload`s and no timestamp; the sink sanitizes the payloads and stamps
//! the write time. An `AuditLogEntry` is what comes back, and it is never
//! mutated afterwards.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    actor::{Actor, Principal, RequestContext},
    ids::AuditEntryId,
    payload::{AuditProjection, Payload, SanitizedPayload},
};

/// Placeholder shown in listings and exports when an entry has no actor.
pub const SYSTEM_ACTOR_LABEL: &str = "System";

// ── Actions ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    Revoke,
    Import,
    ExportSnapshot,
    ExportLogs,
    Login,
    Logout,
    AssignRole,
    RemoveRole,
    DownloadEvidence,
}

impl AuditAction {
    pub const ALL: [AuditAction; 12] = [
        AuditAction::Create,
        AuditAction::Update,
        AuditAction::Delete,
        AuditAction::Revoke,
        AuditAction::Import,
        AuditAction::ExportSnapshot,
        AuditAction::ExportLogs,
        AuditAction::Login,
        AuditAction::Logout,
        AuditAction::AssignRole,
        AuditAction::RemoveRole,
        AuditAction::DownloadEvidence,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "CREATE",
            AuditAction::Update => "UPDATE",
            AuditAction::Delete => "DELETE",
            AuditAction::Revoke => "REVOKE",
            AuditAction::Import => "IMPORT",
            AuditAction::ExportSnapshot => "EXPORT_SNAPSHOT",
            AuditAction::ExportLogs => "EXPORT_LOGS",
            AuditAction::Login => "LOGIN",
            AuditAction::Logout => "LOGOUT",
            AuditAction::AssignRole => "ASSIGN_ROLE",
            AuditAction::RemoveRole => "REMOVE_ROLE",
            AuditAction::DownloadEvidence => "DOWNLOAD_EVIDENCE",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase();
        AuditAction::ALL
            .into_iter()
            .find(|a| a.as_str() == normalized)
            .ok_or_else(|| format!("unknown audit action '{}'", s.trim()))
    }
}

// ── Draft ────────────────────────────────────────────────────────────────────

/// An audit entry as requested by the caller, before sanitization.
///
/// There is deliberately no timestamp field: the sink assigns it.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditDraft {
    pub actor: Option<Actor>,
    pub action: AuditAction,
    pub entity_type: String,
    pub entity_id: String,
    pub summary: String,
    pub before: Option<Payload>,
    pub after: Option<Payload>,
    pub metadata: Option<Payload>,
    pub request: Option<RequestContext>,
}

impl AuditDraft {
    pub fn new(
        action: AuditAction,
        entity_type: impl Into<String>,
        entity_id: impl ToString,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            actor: None,
            action,
            entity_type: entity_type.into(),
            entity_id: entity_id.to_string(),
            summary: summary.into(),
            before: None,
            after: None,
            metadata: None,
            request: None,
        }
    }

    /// Attribute the entry to `principal` and attach its request context.
    pub fn by(mut self, principal: &Principal) -> Self {
        self.actor = principal.actor.clone();
        self.request = principal.request.clone();
        self
    }

    pub fn before(mut self, value: &impl AuditProjection) -> Self {
        self.before = Some(value.audit_projection());
        self
    }

    pub fn after(mut self, value: &impl AuditProjection) -> Self {
        self.after = Some(value.audit_projection());
        self
    }

    pub fn metadata(mut self, metadata: Payload) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

// ── Stored entry ─────────────────────────────────────────────────────────────

/// An immutable, sanitized, hash-chained audit fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: AuditEntryId,
    /// Position in the chain, starting at 0.
    pub sequence: u64,
    /// Server-assigned write time.
    pub timestamp: DateTime<Utc>,
    pub actor_id: Option<String>,
    pub actor_name: Option<String>,
    pub action: AuditAction,
    pub entity_type: String,
    pub entity_id: String,
    pub summary: String,
    pub before: Option<SanitizedPayload>,
    pub after: Option<SanitizedPayload>,
    /// Always present; an empty mapping when the caller supplied none.
    pub metadata: SanitizedPayload,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub prev_hash: String,
    pub this_hash: String,
}

impl AuditLogEntry {
    /// The actor display name, or `SYSTEM_ACTOR_LABEL` for system entries.
    pub fn actor_label(&self) -> &str {
        self.actor_name.as_deref().unwrap_or(SYSTEM_ACTOR_LABEL)
    }

    /// `"<entity_type> (<entity_id>)"`, as shown in exports.
    pub fn entity_label(&self) -> String {
        format!("{} ({})", self.entity_type, self.entity_id)
    }
}

// ── Query ────────────────────────────────────────────────────────────────────

/// Conjunctive audit filter. Every `None` field matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditFilter {
    /// Matches the actor id or display name, case-insensitively.
    pub actor: Option<String>,
    pub action: Option<AuditAction>,
    /// Case-insensitive equality.
    pub entity_type: Option<String>,
    /// Case-insensitive substring of the summary.
    pub text: Option<String>,
    /// Inclusive lower bound.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound.
    pub to: Option<DateTime<Utc>>,
}

impl AuditFilter {
    pub fn action(action: AuditAction) -> Self {
        Self {
            action: Some(action),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl AuditProjection for AuditFilter {
    fn audit_projection(&self) -> Payload {
        Payload::object([
            ("actor", self.actor.clone().into()),
            ("action", self.action.map(|a| a.as_str()).into()),
            ("entity_type", self.entity_type.clone().into()),
            ("q", self.text.clone().into()),
            ("from", self.from.into()),
            ("to", self.to.into()),
        ])
    }
}

/// A 1-based page request. Out-of-range values are clamped by the sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

impl PageRequest {
    pub fn new(page: usize, per_page: usize) -> Self {
        Self {
            page: Some(page),
            per_page: Some(per_page),
        }
    }

    pub fn page(&self) -> usize {
        self.page.unwrap_or(1).max(1)
    }

    /// Page size, defaulted and clamped to `1..=max`.
    pub fn per_page(&self, default: usize, max: usize) -> usize {
        self.per_page.unwrap_or(default).clamp(1, max.max(1))
    }

    pub fn offset(&self, default: usize, max: usize) -> usize {
        (self.page() - 1).saturating_mul(self.per_page(default, max))
    }
}

/// One page of entries, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditPage {
    pub entries: Vec<AuditLogEntry>,
    /// Number of entries matching the filter across all pages.
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
}

/// A CSV export and the number of entry rows it holds, taken from one read
/// of the trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditExport {
    pub rows: usize,
    pub csv: Vec<u8>,
}

// ── Degraded success ─────────────────────────────────────────────────────────

/// Whether the audit entry for a committed operation was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditOutcome {
    Recorded {
        entry_id: AuditEntryId,
        sequence: u64,
    },
    /// The operation took effect but its audit entry could not be written.
    Failed { reason: String },
}

/// The result of an audited operation.
///
/// `value` is always the committed result. Callers must inspect `audit` to
/// tell a full success from a degraded one.
#[derive(Debug, Clone, PartialEq)]
pub struct Audited<T> {
    pub value: T,
    pub audit: AuditOutcome,
}

impl<T> Audited<T> {
    pub fn is_recorded(&self) -> bool {
        matches!(self.audit, AuditOutcome::Recorded { .. })
    }

    pub fn into_inner(self) -> T {
        self.value
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Audited<U> {
        Audited {
            value: f(self.value),
            audit: self.audit,
        }
    }
}
