//! Point-in-time compliance snapshot.
//!
//! The builder filters active indicators on stored fields, derives each due
//! state, then applies the status filter (status is not stored, so it can
//! only be filtered after derivation). Counts cover the final filtered set.
//! The recent-activity lists are global and capped.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use accredit_contracts::{
    attestation::AttestationRecord,
    error::{AccreditError, AccreditResult},
    evidence::EvidenceItem,
    indicator::{DueStatus, Indicator, IndicatorView},
    payload::{AuditProjection, Payload},
};

use crate::due::DueStatusEngine;

/// Placeholder written for absent dates in the CSV export.
pub const NOT_APPLICABLE: &str = "N/A";

pub const SNAPSHOT_CSV_HEADERS: [&str; 6] = [
    "Section",
    "Standard",
    "Indicator",
    "Status",
    "Last Compliant",
    "Next Due",
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotFilter {
    pub text: Option<String>,
    pub section: Option<String>,
    pub standard: Option<String>,
    pub status: Option<DueStatus>,
}

impl SnapshotFilter {
    fn matches_stored(&self, indicator: &Indicator) -> bool {
        indicator.is_active
            && self.text.as_deref().map_or(true, |q| indicator.matches_text(q))
            && self
                .section
                .as_deref()
                .map_or(true, |s| indicator.section == s)
            && self
                .standard
                .as_deref()
                .map_or(true, |s| indicator.standard == s)
    }
}

impl AuditProjection for SnapshotFilter {
    fn audit_projection(&self) -> Payload {
        Payload::object([
            ("q", self.text.clone().into()),
            ("section", self.section.clone().into()),
            ("standard", self.standard.clone().into()),
            ("status", self.status.map(|s| s.as_str()).into()),
        ])
    }
}

/// Count of indicators per due status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub total: usize,
    pub not_started: usize,
    pub compliant: usize,
    pub due_soon: usize,
    pub overdue: usize,
}

impl StatusCounts {
    pub fn add(&mut self, status: DueStatus) {
        self.total += 1;
        match status {
            DueStatus::NotStarted => self.not_started += 1,
            DueStatus::Compliant => self.compliant += 1,
            DueStatus::DueSoon => self.due_soon += 1,
            DueStatus::Overdue => self.overdue += 1,
        }
    }

    pub fn get(&self, status: DueStatus) -> usize {
        match status {
            DueStatus::NotStarted => self.not_started,
            DueStatus::Compliant => self.compliant,
            DueStatus::DueSoon => self.due_soon,
            DueStatus::Overdue => self.overdue,
        }
    }
}

impl FromIterator<DueStatus> for StatusCounts {
    fn from_iter<I: IntoIterator<Item = DueStatus>>(iter: I) -> Self {
        let mut counts = StatusCounts::default();
        for status in iter {
            counts.add(status);
        }
        counts
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub generated_at: DateTime<Utc>,
    pub as_of: NaiveDate,
    pub filter: SnapshotFilter,
    pub summary: StatusCounts,
    /// Ordered by section, then standard.
    pub indicators: Vec<IndicatorView>,
    /// Newest first, across all indicators.
    pub recent_attestations: Vec<AttestationRecord>,
    /// Newest first, across all indicators.
    pub recent_evidence: Vec<EvidenceItem>,
}

pub struct SnapshotBuilder<'a> {
    engine: &'a DueStatusEngine,
    recent_limit: usize,
}

impl<'a> SnapshotBuilder<'a> {
    pub fn new(engine: &'a DueStatusEngine, recent_limit: usize) -> Self {
        Self {
            engine,
            recent_limit,
        }
    }

    /// Build a snapshot from one consistent read of the three collections.
    pub fn build(
        &self,
        indicators: &[Indicator],
        attestations: &[AttestationRecord],
        evidence: &[EvidenceItem],
        filter: &SnapshotFilter,
        now: DateTime<Utc>,
    ) -> Snapshot {
        let today = now.date_naive();

        let mut rows: Vec<IndicatorView> = indicators
            .iter()
            .filter(|i| filter.matches_stored(i))
            .map(|indicator| IndicatorView {
                indicator: indicator.clone(),
                due: self.engine.status(indicator, attestations, today),
            })
            .filter(|view| filter.status.map_or(true, |s| view.due.due_status == s))
            .collect();
        sort_views(&mut rows);

        let summary = rows.iter().map(|v| v.due.due_status).collect();

        let mut recent_attestations = attestations.to_vec();
        recent_attestations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        recent_attestations.truncate(self.recent_limit);

        let mut recent_evidence = evidence.to_vec();
        recent_evidence.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        recent_evidence.truncate(self.recent_limit);

        Snapshot {
            generated_at: now,
            as_of: today,
            filter: filter.clone(),
            summary,
            indicators: rows,
            recent_attestations,
            recent_evidence,
        }
    }
}

/// Section, then standard, then creation time.
pub fn sort_views(views: &mut [IndicatorView]) {
    views.sort_by(|a, b| {
        a.indicator
            .section
            .cmp(&b.indicator.section)
            .then_with(|| a.indicator.standard.cmp(&b.indicator.standard))
            .then_with(|| a.indicator.created_at.cmp(&b.indicator.created_at))
    });
}

/// Render the indicator rows of `snapshot` as CSV.
pub fn snapshot_csv(snapshot: &Snapshot) -> AccreditResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let csv_err = |e: csv::Error| AccreditError::storage(format!("snapshot CSV write failed: {}", e));

    writer.write_record(SNAPSHOT_CSV_HEADERS).map_err(csv_err)?;
    for view in &snapshot.indicators {
        let date = |d: Option<NaiveDate>| {
            d.map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| NOT_APPLICABLE.to_string())
        };
        writer
            .write_record([
                view.indicator.section.clone(),
                view.indicator.standard.clone(),
                view.indicator.indicator_text.clone(),
                view.due.due_status.as_str().to_string(),
                date(view.due.last_compliant_on),
                date(view.due.next_due_on),
            ])
            .map_err(csv_err)?;
    }

    writer
        .into_inner()
        .map_err(|e| AccreditError::storage(format!("snapshot CSV flush failed: {}", e)))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
