//! Attestation (compliance) records.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    ids::{AttestationId, IndicatorId},
    payload::{AuditProjection, Payload},
};

/// One dated claim that an indicator was satisfied.
///
/// Revoked records keep all their data; they are only excluded from the
/// due-status derivation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationRecord {
    pub id: AttestationId,
    pub indicator_id: IndicatorId,
    pub compliant_on: NaiveDate,
    /// `None` for one-time indicators: the attestation never expires.
    pub valid_until: Option<NaiveDate>,
    pub notes: Option<String>,
    pub is_revoked: bool,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revoked_reason: Option<String>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AuditProjection for AttestationRecord {
    fn audit_projection(&self) -> Payload {
        Payload::object([
            ("id", self.id.into()),
            ("indicator_id", self.indicator_id.into()),
            ("compliant_on", self.compliant_on.into()),
            ("valid_until", self.valid_until.into()),
            ("notes", self.notes.clone().into()),
            ("is_revoked", self.is_revoked.into()),
            ("revoked_at", self.revoked_at.into()),
            ("revoked_reason", self.revoked_reason.clone().into()),
        ])
    }
}

/// Input for creating an attestation record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAttestation {
    pub indicator_id: IndicatorId,
    /// Defaults to today.
    #[serde(default)]
    pub compliant_on: Option<NaiveDate>,
    /// Explicit expiry override; derived from the indicator frequency when absent.
    #[serde(default)]
    pub valid_until: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewAttestation {
    pub fn new(indicator_id: IndicatorId) -> Self {
        Self {
            indicator_id,
            compliant_on: None,
            valid_until: None,
            notes: None,
        }
    }

    pub fn on(mut self, compliant_on: NaiveDate) -> Self {
        self.compliant_on = Some(compliant_on);
        self
    }
}

/// Partial update of an attestation record.
///
/// Setting `is_revoked` to `Some(true)` on a live record revokes it. There is
/// no transition back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationPatch {
    pub compliant_on: Option<NaiveDate>,
    pub valid_until: Option<Option<NaiveDate>>,
    pub notes: Option<Option<String>>,
    pub is_revoked: Option<bool>,
    pub revoked_reason: Option<String>,
}

impl AttestationPatch {
    /// A patch that only revokes.
    pub fn revoke(reason: impl Into<String>) -> Self {
        Self {
            is_revoked: Some(true),
            revoked_reason: Some(reason.into()),
            ..Self::default()
        }
    }
}
