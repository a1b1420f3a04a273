//! Read-side reports: audit log access, snapshots, the status summary, and
//! the session and role events the identity collaborator reports.
//!
//! Exports are self-auditing. Each writes its `EXPORT_*` entry after the
//! export has been produced, referencing the filters used.

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::info;

use accredit_contracts::{
    actor::{Actor, Principal},
    audit::{
        AuditAction, AuditDraft, AuditExport, AuditFilter, AuditOutcome, AuditPage, Audited,
        PageRequest,
    },
    capability::Role,
    error::{AccreditError, AccreditResult},
    payload::{AuditProjection, Payload},
};

use crate::snapshot::{snapshot_csv, Snapshot, SnapshotBuilder, SnapshotFilter, StatusCounts};

use super::{entity, resource, ComplianceService};

const SNAPSHOT_ENTITY_ID: &str = "snapshot";
const AUDIT_EXPORT_ENTITY_ID: &str = "export";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryPeriod {
    Month,
    Quarter,
}

impl SummaryPeriod {
    pub fn days(&self) -> u64 {
        match self {
            SummaryPeriod::Month => 31,
            SummaryPeriod::Quarter => 92,
        }
    }
}

/// Due-status counts over every active indicator, with the reporting window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub period: SummaryPeriod,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub counts: StatusCounts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Login,
    Logout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleChange {
    Assign,
    Remove,
}

impl ComplianceService {
    // ── Audit log ────────────────────────────────────────────────────────────

    /// A page of audit entries, newest first. Reading is not itself audited.
    pub fn audit_logs(
        &self,
        principal: &Principal,
        filter: &AuditFilter,
        page: PageRequest,
    ) -> AccreditResult<AuditPage> {
        self.authorize(principal, "read", resource::AUDIT_LOG)?;
        self.audit.query(filter, page)
    }

    /// Every matching entry as CSV, followed by an `EXPORT_LOGS` entry.
    pub fn export_audit_logs(
        &self,
        principal: &Principal,
        filter: &AuditFilter,
    ) -> AccreditResult<Audited<Vec<u8>>> {
        self.authorize(principal, "export", resource::AUDIT_LOG)?;
        let AuditExport { rows, csv } = self.audit.export_csv(filter)?;
        info!(rows, "audit logs exported");

        let audit = AuditDraft::new(
            AuditAction::ExportLogs,
            entity::AUDIT_LOG,
            AUDIT_EXPORT_ENTITY_ID,
            format!("Exported {} audit log entries", rows),
        )
        .by(principal)
        .metadata(Payload::object([
            ("filters", filter.audit_projection()),
            ("rows", Payload::from(rows)),
        ]));
        Ok(self.audited(csv, audit))
    }

    // ── Snapshot ─────────────────────────────────────────────────────────────

    /// Build and return a snapshot. Viewing is audited as `EXPORT_SNAPSHOT`
    /// with format `view`.
    pub fn snapshot(
        &self,
        principal: &Principal,
        filter: &SnapshotFilter,
    ) -> AccreditResult<Audited<Snapshot>> {
        self.authorize(principal, "read", resource::SNAPSHOT)?;
        let snapshot = self.build_snapshot(filter)?;
        let audit = self.snapshot_audit(principal, filter, &snapshot, "view");
        Ok(self.audited(snapshot, audit))
    }

    /// Re-run the builder and render the rows as CSV. Audited separately from
    /// any view, with format `csv`.
    pub fn export_snapshot(
        &self,
        principal: &Principal,
        filter: &SnapshotFilter,
    ) -> AccreditResult<Audited<Vec<u8>>> {
        self.authorize(principal, "export", resource::SNAPSHOT)?;
        let snapshot = self.build_snapshot(filter)?;
        let csv = snapshot_csv(&snapshot)?;
        let audit = self.snapshot_audit(principal, filter, &snapshot, "csv");
        Ok(self.audited(csv, audit))
    }

    fn build_snapshot(&self, filter: &SnapshotFilter) -> AccreditResult<Snapshot> {
        let indicators = self.repo.list_indicators()?;
        let attestations = self.repo.list_attestations(None)?;
        let evidence = self.repo.list_evidence(None)?;
        let builder = SnapshotBuilder::new(&self.engine, self.config.snapshot.recent_limit);
        let snapshot = builder.build(&indicators, &attestations, &evidence, filter, self.clock.now());
        info!(
            indicators = snapshot.summary.total,
            overdue = snapshot.summary.overdue,
            due_soon = snapshot.summary.due_soon,
            "snapshot built"
        );
        Ok(snapshot)
    }

    fn snapshot_audit(
        &self,
        principal: &Principal,
        filter: &SnapshotFilter,
        snapshot: &Snapshot,
        format: &str,
    ) -> AuditDraft {
        AuditDraft::new(
            AuditAction::ExportSnapshot,
            entity::SNAPSHOT,
            SNAPSHOT_ENTITY_ID,
            format!("Generated compliance snapshot ({})", format),
        )
        .by(principal)
        .metadata(Payload::object([
            ("format", Payload::from(format)),
            ("filters", filter.audit_projection()),
            ("indicator_count", Payload::from(snapshot.indicators.len())),
        ]))
    }

    // ── Summary ──────────────────────────────────────────────────────────────

    /// Counts per due status over active indicators. `start` defaults to the
    /// first day of the current month. Not audited.
    pub fn status_summary(
        &self,
        principal: &Principal,
        period: SummaryPeriod,
        start: Option<NaiveDate>,
    ) -> AccreditResult<StatusSummary> {
        self.authorize(principal, "read", resource::SNAPSHOT)?;

        let today = self.clock.today();
        let start = match start {
            Some(start) => start,
            None => today.with_day(1).unwrap_or(today),
        };
        let end = start
            .checked_add_days(Days::new(period.days()))
            .unwrap_or(NaiveDate::MAX);

        let history = self.repo.list_attestations(None)?;
        let counts = self
            .repo
            .list_indicators()?
            .iter()
            .filter(|i| i.is_active)
            .map(|i| self.engine.status(i, &history, today).due_status)
            .collect();

        Ok(StatusSummary {
            period,
            start,
            end,
            counts,
        })
    }

    // ── Identity events ──────────────────────────────────────────────────────

    /// Put a login or logout in the audit trail.
    pub fn record_session(
        &self,
        principal: &Principal,
        event: SessionEvent,
    ) -> AccreditResult<AuditOutcome> {
        self.authorize(principal, "record", resource::SESSION)?;
        let actor = principal.actor.as_ref().ok_or_else(|| {
            AccreditError::validation("session events require an identified actor")
        })?;

        let (action, verb) = match event {
            SessionEvent::Login => (AuditAction::Login, "logged in"),
            SessionEvent::Logout => (AuditAction::Logout, "logged out"),
        };
        let audit = AuditDraft::new(
            action,
            entity::USER,
            &actor.id,
            format!("User {} {}", actor.display_name, verb),
        )
        .by(principal);
        Ok(self.emit(audit))
    }

    /// Put a role assignment or removal for `subject` in the audit trail.
    pub fn record_role_change(
        &self,
        principal: &Principal,
        subject: &Actor,
        role: Role,
        change: RoleChange,
    ) -> AccreditResult<AuditOutcome> {
        let (access_action, action, summary) = match change {
            RoleChange::Assign => (
                "assign",
                AuditAction::AssignRole,
                format!("Assigned role {} to {}", role, subject.display_name),
            ),
            RoleChange::Remove => (
                "remove",
                AuditAction::RemoveRole,
                format!("Removed role {} from {}", role, subject.display_name),
            ),
        };
        self.authorize(principal, access_action, resource::ROLE)?;

        let audit = AuditDraft::new(action, entity::USER, &subject.id, summary)
            .by(principal)
            .metadata(Payload::object([("role", Payload::from(role.as_str()))]));
        Ok(self.emit(audit))
    }
}
