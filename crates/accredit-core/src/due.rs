//! The due-status engine.
//!
//! Status is derived on every read from the attestation history and never
//! stored:
//!
//!   no live record              → NOT_STARTED, next due today
//!   latest live record, no end  → COMPLIANT, no next due date
//!   valid_until < today         → OVERDUE
//!   remaining ≤ due-soon window → DUE_SOON
//!   otherwise                   → COMPLIANT
//!
//! "Live" means not revoked. The latest live record is chosen by
//! `compliant_on` descending, then `created_at` descending.

use chrono::NaiveDate;

use accredit_contracts::{
    attestation::AttestationRecord,
    config::DueSoonConfig,
    indicator::{DueState, DueStatus, Indicator},
};

#[derive(Debug, Clone, Default)]
pub struct DueStatusEngine {
    config: DueSoonConfig,
}

impl DueStatusEngine {
    pub fn new(config: DueSoonConfig) -> Self {
        Self { config }
    }

    /// Advance-warning window in days for a validity interval of
    /// `interval_days`: `clamp(round(interval * ratio), min, max)`.
    pub fn due_soon_window(&self, interval_days: i64) -> i64 {
        let scaled = (interval_days as f64 * self.config.ratio).round() as i64;
        // Not `clamp`: a misconfigured min > max must not panic.
        scaled.max(self.config.min_days).min(self.config.max_days)
    }

    /// The record that drives the status, if any.
    pub fn latest_live<'a>(history: &'a [AttestationRecord]) -> Option<&'a AttestationRecord> {
        history
            .iter()
            .filter(|r| !r.is_revoked)
            .max_by(|a, b| {
                a.compliant_on
                    .cmp(&b.compliant_on)
                    .then(a.created_at.cmp(&b.created_at))
            })
    }

    /// Derive the due state of `indicator` on `today`.
    ///
    /// Records belonging to other indicators are ignored, so callers may pass
    /// an unfiltered history.
    pub fn status(
        &self,
        indicator: &Indicator,
        history: &[AttestationRecord],
        today: NaiveDate,
    ) -> DueState {
        let own: Vec<AttestationRecord> = history
            .iter()
            .filter(|r| r.indicator_id == indicator.id)
            .cloned()
            .collect();
        self.status_of(&own, today)
    }

    /// Derive a due state from one indicator's history.
    pub fn status_of(&self, history: &[AttestationRecord], today: NaiveDate) -> DueState {
        let Some(latest) = Self::latest_live(history) else {
            return DueState {
                last_compliant_on: None,
                next_due_on: Some(today),
                due_status: DueStatus::NotStarted,
            };
        };

        let last = Some(latest.compliant_on);
        let Some(valid_until) = latest.valid_until else {
            return DueState {
                last_compliant_on: last,
                next_due_on: None,
                due_status: DueStatus::Compliant,
            };
        };

        let due_status = if valid_until < today {
            DueStatus::Overdue
        } else {
            let remaining = (valid_until - today).num_days();
            let interval = (valid_until - latest.compliant_on).num_days().max(1);
            if remaining <= self.due_soon_window(interval) {
                DueStatus::DueSoon
            } else {
                DueStatus::Compliant
            }
        };

        DueState {
            last_compliant_on: last,
            next_due_on: Some(valid_until),
            due_status,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
