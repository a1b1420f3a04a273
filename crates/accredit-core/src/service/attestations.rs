//! Attestation (compliance record) lifecycle, including revocation.

use tracing::info;

use accredit_contracts::{
    actor::Principal,
    attestation::{AttestationPatch, AttestationRecord, NewAttestation},
    audit::{AuditAction, AuditDraft, Audited},
    error::{AccreditError, AccreditResult},
    ids::{AttestationId, IndicatorId},
    payload::Payload,
};

use crate::{frequency::expiry, traits::Removed};

use super::{entity, resource, ComplianceService};

impl ComplianceService {
    /// Records for one indicator (or all), newest `compliant_on` first.
    pub fn list_attestations(
        &self,
        principal: &Principal,
        indicator: Option<IndicatorId>,
    ) -> AccreditResult<Vec<AttestationRecord>> {
        self.authorize(principal, "read", resource::ATTESTATION)?;
        let mut records = self.repo.list_attestations(indicator)?;
        records.sort_by(|a, b| {
            b.compliant_on
                .cmp(&a.compliant_on)
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(records)
    }

    pub fn get_attestation(
        &self,
        principal: &Principal,
        id: AttestationId,
    ) -> AccreditResult<AttestationRecord> {
        self.authorize(principal, "read", resource::ATTESTATION)?;
        self.require_attestation(id)
    }

    /// Record that an indicator was satisfied.
    ///
    /// `compliant_on` defaults to today; `valid_until` is derived from the
    /// indicator frequency unless given.
    pub fn create_attestation(
        &self,
        principal: &Principal,
        input: NewAttestation,
    ) -> AccreditResult<Audited<AttestationRecord>> {
        self.authorize(principal, "create", resource::ATTESTATION)?;
        let indicator = self.require_indicator(input.indicator_id)?;

        let now = self.clock.now();
        let compliant_on = input.compliant_on.unwrap_or_else(|| self.clock.today());
        let valid_until = match input.valid_until {
            Some(explicit) => Some(explicit),
            None => expiry(indicator.frequency, compliant_on),
        };
        check_validity_window(compliant_on, valid_until)?;

        let record = self.repo.insert_attestation(AttestationRecord {
            id: AttestationId::new(),
            indicator_id: indicator.id,
            compliant_on,
            valid_until,
            notes: input.notes,
            is_revoked: false,
            revoked_at: None,
            revoked_reason: None,
            created_by: principal.actor_id().map(str::to_string),
            created_at: now,
            updated_at: now,
        })?;
        info!(
            attestation_id = %record.id,
            indicator_id = %indicator.id,
            compliant_on = %record.compliant_on,
            "attestation created"
        );

        let audit = AuditDraft::new(
            AuditAction::Create,
            entity::ATTESTATION,
            record.id,
            format!("Created compliance record for {}", indicator.standard),
        )
        .by(principal)
        .after(&record);
        Ok(self.audited(record, audit))
    }

    /// Update notes or dates, or revoke.
    ///
    /// Revocation (`is_revoked: Some(true)` on a live record) is audited as
    /// `REVOKE` and stamps `revoked_at` with the server time. A revoked
    /// record is read-only, so any later update, including a second
    /// revocation, is a validation error.
    pub fn update_attestation(
        &self,
        principal: &Principal,
        id: AttestationId,
        patch: AttestationPatch,
    ) -> AccreditResult<Audited<AttestationRecord>> {
        let revoking = patch.is_revoked == Some(true);
        let access_action = if revoking { "revoke" } else { "update" };
        self.authorize(principal, access_action, resource::ATTESTATION)?;

        let current = self.require_attestation(id)?;
        let indicator = self.require_indicator(current.indicator_id)?;
        if patch.revoked_reason.is_some() && !revoking {
            return Err(AccreditError::validation(
                "revoked_reason is only accepted together with is_revoked",
            ));
        }

        let now = self.clock.now();
        let modified = self
            .repo
            .modify_attestation(id, &mut |record: &mut AttestationRecord| {
                if record.is_revoked {
                    return Err(AccreditError::validation(format!(
                        "compliance record '{}' is revoked and read-only",
                        record.id
                    )));
                }
                if let Some(compliant_on) = patch.compliant_on {
                    record.compliant_on = compliant_on;
                    if patch.valid_until.is_none() {
                        record.valid_until = expiry(indicator.frequency, compliant_on);
                    }
                }
                if let Some(valid_until) = patch.valid_until {
                    record.valid_until = valid_until;
                }
                if let Some(notes) = &patch.notes {
                    record.notes = notes.clone();
                }
                check_validity_window(record.compliant_on, record.valid_until)?;
                if revoking {
                    record.is_revoked = true;
                    record.revoked_at = Some(now);
                    record.revoked_reason = patch.revoked_reason.clone();
                }
                record.updated_at = now;
                Ok(())
            })?;

        let draft = if revoking {
            info!(attestation_id = %id, indicator_id = %indicator.id, "attestation revoked");
            AuditDraft::new(
                AuditAction::Revoke,
                entity::ATTESTATION,
                id,
                format!("Revoked compliance record for {}", indicator.standard),
            )
            .metadata(Payload::object([(
                "reason",
                Payload::from(modified.after.revoked_reason.clone()),
            )]))
        } else {
            info!(attestation_id = %id, "attestation updated");
            AuditDraft::new(
                AuditAction::Update,
                entity::ATTESTATION,
                id,
                format!("Updated compliance record for {}", indicator.standard),
            )
        };
        let audit = draft
            .by(principal)
            .before(&modified.before)
            .after(&modified.after);
        Ok(self.audited(modified.after, audit))
    }

    /// Shorthand for a revoking update.
    pub fn revoke_attestation(
        &self,
        principal: &Principal,
        id: AttestationId,
        reason: impl Into<String>,
    ) -> AccreditResult<Audited<AttestationRecord>> {
        self.update_attestation(principal, id, AttestationPatch::revoke(reason))
    }

    /// Hard delete. Evidence that pointed at the record is kept but unlinked.
    pub fn delete_attestation(
        &self,
        principal: &Principal,
        id: AttestationId,
    ) -> AccreditResult<Audited<AttestationRecord>> {
        self.authorize(principal, "delete", resource::ATTESTATION)?;

        let Removed { row: removed, unlinked } = self
            .repo
            .remove_attestation(id)?
            .ok_or_else(|| AccreditError::not_found(entity::ATTESTATION, id))?;
        info!(attestation_id = %id, evidence_unlinked = unlinked, "attestation deleted");

        let audit = AuditDraft::new(
            AuditAction::Delete,
            entity::ATTESTATION,
            id,
            format!("Deleted compliance record from {}", removed.compliant_on),
        )
        .by(principal)
        .before(&removed)
        .metadata(Payload::object([("evidence_unlinked", Payload::from(unlinked))]));
        Ok(self.audited(removed, audit))
    }

    pub(crate) fn require_attestation(&self, id: AttestationId) -> AccreditResult<AttestationRecord> {
        self.repo
            .get_attestation(id)?
            .ok_or_else(|| AccreditError::not_found(entity::ATTESTATION, id))
    }
}

fn check_validity_window(
    compliant_on: chrono::NaiveDate,
    valid_until: Option<chrono::NaiveDate>,
) -> AccreditResult<()> {
    match valid_until {
        Some(until) if until < compliant_on => Err(AccreditError::validation(format!(
            "valid_until {} is before compliant_on {}",
            until, compliant_on
        ))),
        _ => Ok(()),
    }
}
