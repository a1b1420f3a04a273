//! Evidence items and their files.
//!
//! Physical file removal is a best-effort hook run after the record is gone:
//! its result lands in the `file_deleted` audit metadata and never fails the
//! delete.

use tracing::{info, warn};

use accredit_contracts::{
    actor::Principal,
    audit::{AuditAction, AuditDraft, Audited},
    error::{AccreditError, AccreditResult},
    evidence::{EvidenceDownload, EvidenceDraft, EvidenceItem, StoredFile},
    ids::{EvidenceId, IndicatorId},
    payload::Payload,
};

use super::{entity, resource, ComplianceService};

impl ComplianceService {
    /// Evidence for one indicator (or all), newest first.
    pub fn list_evidence(
        &self,
        principal: &Principal,
        indicator: Option<IndicatorId>,
    ) -> AccreditResult<Vec<EvidenceItem>> {
        self.authorize(principal, "read", resource::EVIDENCE)?;
        let mut items = self.repo.list_evidence(indicator)?;
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    pub fn get_evidence(&self, principal: &Principal, id: EvidenceId) -> AccreditResult<EvidenceItem> {
        self.authorize(principal, "read", resource::EVIDENCE)?;
        self.require_evidence(id)
    }

    /// Attach evidence to an indicator.
    ///
    /// Uploads are checked against the configured size and extension limits
    /// before the blob store is touched.
    pub fn create_evidence(
        &self,
        principal: &Principal,
        draft: EvidenceDraft,
    ) -> AccreditResult<Audited<EvidenceItem>> {
        self.authorize(principal, "create", resource::EVIDENCE)?;
        let indicator = self.require_indicator(draft.indicator_id)?;
        if let Some(attestation_id) = draft.attestation_id {
            let record = self.require_attestation(attestation_id)?;
            if record.indicator_id != indicator.id {
                return Err(AccreditError::validation(format!(
                    "compliance record '{}' belongs to a different indicator",
                    attestation_id
                )));
            }
        }
        self.validator
            .validate_evidence(&draft, &self.config.uploads)?
            .into_result()?;

        let id = EvidenceId::new();
        let file = match (&draft.upload, draft.evidence_type.is_file_backed()) {
            (Some(upload), true) => {
                let handle = self.blobs.put(upload, &self.config.uploads)?;
                Some(StoredFile {
                    handle,
                    original_name: upload.filename.clone(),
                    size: upload.bytes.len() as u64,
                })
            }
            _ => None,
        };

        let item = EvidenceItem {
            id,
            indicator_id: indicator.id,
            attestation_id: draft.attestation_id,
            evidence_type: draft.evidence_type,
            note_text: draft.note_text,
            url: draft.url,
            file,
            created_by: principal.actor_id().map(str::to_string),
            created_at: self.clock.now(),
        };
        let item = match self.repo.insert_evidence(item.clone()) {
            Ok(stored) => stored,
            Err(e) => {
                // The record never existed, so the blob would be an orphan.
                if let Some(file) = &item.file {
                    let _ = self.blobs.delete(&file.handle);
                }
                return Err(e);
            }
        };
        info!(
            evidence_id = %item.id,
            indicator_id = %indicator.id,
            evidence_type = %item.evidence_type,
            "evidence created"
        );

        let audit = AuditDraft::new(
            AuditAction::Create,
            entity::EVIDENCE,
            item.id,
            format!("Added {} evidence to {}", item.evidence_type, indicator.standard),
        )
        .by(principal)
        .after(&item);
        Ok(self.audited(item, audit))
    }

    /// Fetch the file behind an evidence item. Audited as
    /// `DOWNLOAD_EVIDENCE`.
    pub fn download_evidence(
        &self,
        principal: &Principal,
        id: EvidenceId,
    ) -> AccreditResult<Audited<EvidenceDownload>> {
        self.authorize(principal, "download", resource::EVIDENCE)?;
        let item = self.require_evidence(id)?;
        let file = item.file.as_ref().ok_or_else(|| {
            AccreditError::validation(format!("evidence '{}' has no file", id))
        })?;
        let bytes = self
            .blobs
            .get(&file.handle)?
            .ok_or_else(|| AccreditError::not_found("EvidenceFile", &file.handle))?;

        let audit = AuditDraft::new(
            AuditAction::DownloadEvidence,
            entity::EVIDENCE,
            id,
            format!("Downloaded evidence file {}", file.original_name),
        )
        .by(principal)
        .metadata(Payload::object([
            ("filename", Payload::from(file.original_name.as_str())),
            ("size", Payload::from(bytes.len())),
        ]));
        let download = EvidenceDownload {
            filename: file.original_name.clone(),
            bytes,
        };
        Ok(self.audited(download, audit))
    }

    /// Remove the record, then its file on a best-effort basis.
    pub fn delete_evidence(
        &self,
        principal: &Principal,
        id: EvidenceId,
    ) -> AccreditResult<Audited<EvidenceItem>> {
        self.authorize(principal, "delete", resource::EVIDENCE)?;

        let removed = self
            .repo
            .remove_evidence(id)?
            .ok_or_else(|| AccreditError::not_found(entity::EVIDENCE, id))?;

        let file_deleted = match &removed.file {
            None => false,
            Some(file) => match self.blobs.delete(&file.handle) {
                Ok(deleted) => {
                    if !deleted {
                        warn!(evidence_id = %id, handle = %file.handle, "evidence file already absent");
                    }
                    deleted
                }
                Err(e) => {
                    warn!(evidence_id = %id, handle = %file.handle, error = %e, "evidence file deletion failed");
                    false
                }
            },
        };
        info!(evidence_id = %id, file_deleted, "evidence deleted");

        let audit = AuditDraft::new(
            AuditAction::Delete,
            entity::EVIDENCE,
            id,
            format!("Deleted {} evidence", removed.evidence_type),
        )
        .by(principal)
        .before(&removed)
        .metadata(Payload::object([("file_deleted", Payload::from(file_deleted))]));
        Ok(self.audited(removed, audit))
    }

    fn require_evidence(&self, id: EvidenceId) -> AccreditResult<EvidenceItem> {
        self.repo
            .get_evidence(id)?
            .ok_or_else(|| AccreditError::not_found(entity::EVIDENCE, id))
    }
}
