use std::sync::{Arc, Mutex};

use chrono::{Duration, NaiveDate};

use accredit_contracts::{
    access::{AccessContext, AccessVerdict},
    actor::{Actor, Principal, RequestContext},
    attestation::{AttestationPatch, AttestationRecord, NewAttestation},
    audit::{
        AuditAction, AuditDraft, AuditExport, AuditFilter, AuditLogEntry, AuditOutcome, AuditPage,
        PageRequest,
    },
    capability::{CapabilitySet, Role},
    config::{AppConfig, UploadConstraints},
    error::{AccreditError, AccreditResult},
    evidence::{BlobHandle, EvidenceDraft, EvidenceItem, FileUpload},
    ids::{AttestationId, AuditEntryId, EvidenceId, IndicatorId, ProjectId},
    indicator::{DueStatus, Frequency, Indicator, IndicatorDraft, IndicatorFilter, IndicatorPatch},
    payload::{sanitize, sanitize_opt, Payload},
    project::{Project, ProjectDraft},
    validation::ValidationReport,
};

use crate::{
    clock::FixedClock,
    import::{ImportMode, ImportOutcome},
    snapshot::SnapshotFilter,
    traits::{
        AccessPolicy, AttestationRepository, AuditSink, BlobStore, EvidenceRepository,
        IndicatorRepository, InputValidator, Modified, Mutator, ProjectRepository, Removed,
    },
};

use super::{ComplianceService, RoleChange, SessionEvent, SummaryPeriod};

// ── Mock helpers ─────────────────────────────────────────────────────────────

#[derive(Default)]
struct MockRepo {
    indicators: Mutex<Vec<Indicator>>,
    attestations: Mutex<Vec<AttestationRecord>>,
    evidence: Mutex<Vec<EvidenceItem>>,
    projects: Mutex<Vec<Project>>,
}

fn modify_row<T: Clone>(
    rows: &Mutex<Vec<T>>,
    find: impl Fn(&T) -> bool,
    entity: &str,
    id: impl ToString,
    change: Mutator<'_, T>,
) -> AccreditResult<Modified<T>> {
    let mut rows = rows.lock().unwrap();
    let row = rows
        .iter_mut()
        .find(|r| find(r))
        .ok_or_else(|| AccreditError::not_found(entity, id))?;
    let before = row.clone();
    let mut after = row.clone();
    change(&mut after)?;
    *row = after.clone();
    Ok(Modified { before, after })
}

impl IndicatorRepository for MockRepo {
    fn insert_indicator(&self, indicator: Indicator) -> AccreditResult<Indicator> {
        let projects = self.projects.lock().unwrap();
        if let Some(p) = indicator.project_id {
            if !projects.iter().any(|x| x.id == p) {
                return Err(AccreditError::not_found("Project", p));
            }
        }
        self.indicators.lock().unwrap().push(indicator.clone());
        Ok(indicator)
    }

    fn get_indicator(&self, id: IndicatorId) -> AccreditResult<Option<Indicator>> {
        Ok(self.indicators.lock().unwrap().iter().find(|i| i.id == id).cloned())
    }

    fn list_indicators(&self) -> AccreditResult<Vec<Indicator>> {
        Ok(self.indicators.lock().unwrap().clone())
    }

    fn modify_indicator(
        &self,
        id: IndicatorId,
        change: Mutator<'_, Indicator>,
    ) -> AccreditResult<Modified<Indicator>> {
        let projects = self.projects.lock().unwrap();
        modify_row(&self.indicators, |i| i.id == id, "Indicator", id, &mut |i: &mut Indicator| {
            change(i)?;
            match i.project_id {
                Some(p) if !projects.iter().any(|x| x.id == p) => {
                    Err(AccreditError::not_found("Project", p))
                }
                _ => Ok(()),
            }
        })
    }
}

impl AttestationRepository for MockRepo {
    fn insert_attestation(&self, record: AttestationRecord) -> AccreditResult<AttestationRecord> {
        self.attestations.lock().unwrap().push(record.clone());
        Ok(record)
    }

    fn get_attestation(&self, id: AttestationId) -> AccreditResult<Option<AttestationRecord>> {
        Ok(self.attestations.lock().unwrap().iter().find(|a| a.id == id).cloned())
    }

    fn list_attestations(
        &self,
        indicator: Option<IndicatorId>,
    ) -> AccreditResult<Vec<AttestationRecord>> {
        Ok(self
            .attestations
            .lock()
            .unwrap()
            .iter()
            .filter(|a| indicator.map_or(true, |i| a.indicator_id == i))
            .cloned()
            .collect())
    }

    fn modify_attestation(
        &self,
        id: AttestationId,
        change: Mutator<'_, AttestationRecord>,
    ) -> AccreditResult<Modified<AttestationRecord>> {
        modify_row(&self.attestations, |a| a.id == id, "ComplianceRecord", id, change)
    }

    fn remove_attestation(
        &self,
        id: AttestationId,
    ) -> AccreditResult<Option<Removed<AttestationRecord>>> {
        let mut rows = self.attestations.lock().unwrap();
        let mut evidence = self.evidence.lock().unwrap();
        let Some(pos) = rows.iter().position(|a| a.id == id) else {
            return Ok(None);
        };
        let row = rows.remove(pos);
        let mut unlinked = 0;
        for e in evidence.iter_mut().filter(|e| e.attestation_id == Some(id)) {
            e.attestation_id = None;
            unlinked += 1;
        }
        Ok(Some(Removed { row, unlinked }))
    }
}

impl EvidenceRepository for MockRepo {
    fn insert_evidence(&self, item: EvidenceItem) -> AccreditResult<EvidenceItem> {
        let records = self.attestations.lock().unwrap();
        if let Some(a) = item.attestation_id {
            if !records.iter().any(|r| r.id == a) {
                return Err(AccreditError::not_found("ComplianceRecord", a));
            }
        }
        self.evidence.lock().unwrap().push(item.clone());
        Ok(item)
    }

    fn get_evidence(&self, id: EvidenceId) -> AccreditResult<Option<EvidenceItem>> {
        Ok(self.evidence.lock().unwrap().iter().find(|e| e.id == id).cloned())
    }

    fn list_evidence(&self, indicator: Option<IndicatorId>) -> AccreditResult<Vec<EvidenceItem>> {
        Ok(self
            .evidence
            .lock()
            .unwrap()
            .iter()
            .filter(|e| indicator.map_or(true, |i| e.indicator_id == i))
            .cloned()
            .collect())
    }

    fn remove_evidence(&self, id: EvidenceId) -> AccreditResult<Option<EvidenceItem>> {
        let mut rows = self.evidence.lock().unwrap();
        Ok(rows.iter().position(|e| e.id == id).map(|pos| rows.remove(pos)))
    }
}

impl ProjectRepository for MockRepo {
    fn insert_project(&self, project: Project) -> AccreditResult<Project> {
        self.projects.lock().unwrap().push(project.clone());
        Ok(project)
    }

    fn get_project(&self, id: ProjectId) -> AccreditResult<Option<Project>> {
        Ok(self.projects.lock().unwrap().iter().find(|p| p.id == id).cloned())
    }

    fn list_projects(&self) -> AccreditResult<Vec<Project>> {
        Ok(self.projects.lock().unwrap().clone())
    }

    fn modify_project(
        &self,
        id: ProjectId,
        change: Mutator<'_, Project>,
    ) -> AccreditResult<Modified<Project>> {
        modify_row(&self.projects, |p| p.id == id, "Project", id, change)
    }

    fn remove_project(&self, id: ProjectId) -> AccreditResult<Option<Removed<Project>>> {
        let mut rows = self.projects.lock().unwrap();
        let mut indicators = self.indicators.lock().unwrap();
        let Some(pos) = rows.iter().position(|p| p.id == id) else {
            return Ok(None);
        };
        let row = rows.remove(pos);
        let mut unlinked = 0;
        for i in indicators.iter_mut().filter(|i| i.project_id == Some(id)) {
            i.project_id = None;
            unlinked += 1;
        }
        Ok(Some(Removed { row, unlinked }))
    }
}

/// Blob store backed by a shared vector; handles are the file names.
#[derive(Default)]
struct MockBlobs {
    files: Arc<Mutex<Vec<(BlobHandle, Vec<u8>)>>>,
    fail_deletes: bool,
}

impl BlobStore for MockBlobs {
    fn put(&self, upload: &FileUpload, _c: &UploadConstraints) -> AccreditResult<BlobHandle> {
        let handle = BlobHandle(format!("evidence/{}", upload.filename));
        self.files
            .lock()
            .unwrap()
            .push((handle.clone(), upload.bytes.clone()));
        Ok(handle)
    }

    fn get(&self, handle: &BlobHandle) -> AccreditResult<Option<Vec<u8>>> {
        Ok(self
            .files
            .lock()
            .unwrap()
            .iter()
            .find(|(h, _)| h == handle)
            .map(|(_, b)| b.clone()))
    }

    fn delete(&self, handle: &BlobHandle) -> AccreditResult<bool> {
        if self.fail_deletes {
            return Err(AccreditError::storage("permission denied"));
        }
        let mut files = self.files.lock().unwrap();
        let before = files.len();
        files.retain(|(h, _)| h != handle);
        Ok(files.len() < before)
    }
}

/// An audit sink that records every draft, or fails every write.
struct MockAudit {
    drafts: Arc<Mutex<Vec<AuditDraft>>>,
    fail: bool,
}

impl MockAudit {
    fn new() -> Self {
        Self {
            drafts: Arc::new(Mutex::new(vec![])),
            fail: false,
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }
}

impl AuditSink for MockAudit {
    fn record(&self, draft: AuditDraft) -> AccreditResult<AuditLogEntry> {
        if self.fail {
            return Err(AccreditError::AuditWriteFailed {
                reason: "disk full".to_string(),
            });
        }
        let mut drafts = self.drafts.lock().unwrap();
        let entry = AuditLogEntry {
            id: AuditEntryId::new(),
            sequence: drafts.len() as u64,
            timestamp: chrono::Utc::now(),
            actor_id: draft.actor.as_ref().map(|a| a.id.clone()),
            actor_name: draft.actor.as_ref().map(|a| a.display_name.clone()),
            action: draft.action,
            entity_type: draft.entity_type.clone(),
            entity_id: draft.entity_id.clone(),
            summary: draft.summary.clone(),
            before: sanitize_opt(draft.before.as_ref()),
            after: sanitize_opt(draft.after.as_ref()),
            metadata: sanitize(draft.metadata.as_ref().unwrap_or(&Payload::Map(Default::default()))),
            ip_address: draft.request.as_ref().and_then(RequestContext::client_ip),
            user_agent: None,
            prev_hash: String::new(),
            this_hash: String::new(),
        };
        drafts.push(draft);
        Ok(entry)
    }

    fn query(&self, _filter: &AuditFilter, _page: PageRequest) -> AccreditResult<AuditPage> {
        let total = self.drafts.lock().unwrap().len();
        Ok(AuditPage {
            entries: vec![],
            total,
            page: 1,
            per_page: 1,
        })
    }

    fn export_csv(&self, _filter: &AuditFilter) -> AccreditResult<AuditExport> {
        let rows = self.drafts.lock().unwrap().len();
        Ok(AuditExport {
            rows,
            csv: b"Timestamp,Actor,Action,Entity,Summary,IP Address\n".to_vec(),
        })
    }
}

/// A policy that always returns a pre-configured verdict.
struct MockPolicy {
    verdict: AccessVerdict,
}

impl AccessPolicy for MockPolicy {
    fn evaluate(&self, _ctx: &AccessContext) -> AccreditResult<AccessVerdict> {
        Ok(self.verdict.clone())
    }
}

/// Rejects blank indicator text; accepts every evidence draft. Errors
/// outright on `broken_standard`.
#[derive(Default)]
struct MockValidator {
    broken_standard: Option<&'static str>,
}

impl InputValidator for MockValidator {
    fn validate_indicator(&self, draft: &IndicatorDraft) -> AccreditResult<ValidationReport> {
        if self.broken_standard == Some(draft.standard.as_str()) {
            return Err(AccreditError::storage("rule backend unavailable"));
        }
        let mut report = ValidationReport::default();
        if draft.indicator_text.trim().is_empty() {
            report.fail("indicator_text", "is required");
        }
        Ok(report)
    }

    fn validate_evidence(
        &self,
        _draft: &EvidenceDraft,
        _constraints: &UploadConstraints,
    ) -> AccreditResult<ValidationReport> {
        Ok(ValidationReport::default())
    }
}

struct Harness {
    service: ComplianceService,
    repo: Arc<MockRepo>,
    blobs: Arc<Mutex<Vec<(BlobHandle, Vec<u8>)>>>,
    drafts: Arc<Mutex<Vec<AuditDraft>>>,
    clock: Arc<FixedClock>,
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
}

fn harness_with(verdict: AccessVerdict, audit: MockAudit) -> Harness {
    harness_from(verdict, audit, MockBlobs::default(), MockValidator::default())
}

fn harness_from(
    verdict: AccessVerdict,
    audit: MockAudit,
    blobs: MockBlobs,
    validator: MockValidator,
) -> Harness {
    let repo = Arc::new(MockRepo::default());
    let blob_files = Arc::clone(&blobs.files);
    let drafts = Arc::clone(&audit.drafts);
    let clock = Arc::new(FixedClock::at_date(today()));
    let service = ComplianceService::new(
        repo.clone(),
        Arc::new(blobs),
        Arc::new(audit),
        Arc::new(MockPolicy { verdict }),
        Arc::new(validator),
        AppConfig::default(),
    )
    .with_clock(clock.clone());
    Harness {
        service,
        repo,
        blobs: blob_files,
        drafts,
        clock,
    }
}

fn harness() -> Harness {
    harness_with(AccessVerdict::Allow, MockAudit::new())
}

fn admin() -> Principal {
    Principal::user(Actor::new("u-1", "Alice Admin"), CapabilitySet::admin())
}

impl Harness {
    fn actions(&self) -> Vec<AuditAction> {
        self.drafts.lock().unwrap().iter().map(|d| d.action).collect()
    }

    fn last_draft(&self) -> AuditDraft {
        self.drafts.lock().unwrap().last().cloned().unwrap()
    }

    fn indicator(&self, frequency: Frequency) -> Indicator {
        let draft = IndicatorDraft::new("Safety", "S-1", "Fire drill").with_frequency(frequency);
        self.service.create_indicator(&admin(), draft).unwrap().value
    }
}

// ── Access ───────────────────────────────────────────────────────────────────

#[test]
fn denied_operation_touches_nothing() {
    let h = harness_with(
        AccessVerdict::Deny {
            reason: "no matching rule".to_string(),
        },
        MockAudit::new(),
    );

    let err = h
        .service
        .create_indicator(&admin(), IndicatorDraft::new("A", "B", "C"))
        .unwrap_err();

    assert!(matches!(err, AccreditError::PermissionDenied { .. }));
    assert!(h.repo.indicators.lock().unwrap().is_empty());
    assert!(h.drafts.lock().unwrap().is_empty());
}

#[test]
fn denied_snapshot_writes_no_export_entry() {
    let h = harness_with(
        AccessVerdict::Deny {
            reason: "no".to_string(),
        },
        MockAudit::new(),
    );
    assert!(h.service.snapshot(&admin(), &SnapshotFilter::default()).is_err());
    assert!(h.actions().is_empty());
}

#[test]
fn health_reports_ok() {
    let h = harness();
    assert_eq!(h.service.health(&Principal::anonymous()).unwrap().status, "ok");
}

// ── Indicators ───────────────────────────────────────────────────────────────

#[test]
fn create_indicator_records_after_snapshot() {
    let h = harness();
    let indicator = h.indicator(Frequency::Monthly);

    let draft = h.last_draft();
    assert_eq!(draft.action, AuditAction::Create);
    assert_eq!(draft.entity_type, "Indicator");
    assert_eq!(draft.entity_id, indicator.id.to_string());
    assert_eq!(draft.actor.unwrap().id, "u-1");
    assert!(draft.before.is_none());
    assert_eq!(
        draft.after.unwrap().get("standard"),
        Some(&Payload::Text("S-1".to_string()))
    );
}

#[test]
fn invalid_indicator_is_rejected_before_persisting() {
    let h = harness();
    let err = h
        .service
        .create_indicator(&admin(), IndicatorDraft::new("A", "B", "  "))
        .unwrap_err();
    assert!(matches!(err, AccreditError::Validation { .. }));
    assert!(h.repo.indicators.lock().unwrap().is_empty());
    assert!(h.actions().is_empty());
}

#[test]
fn update_indicator_carries_before_and_after() {
    let h = harness();
    let indicator = h.indicator(Frequency::Monthly);

    let patch = IndicatorPatch {
        frequency: Some(Frequency::Weekly),
        ..IndicatorPatch::default()
    };
    let updated = h.service.update_indicator(&admin(), indicator.id, patch).unwrap();
    assert_eq!(updated.value.frequency, Frequency::Weekly);

    let draft = h.last_draft();
    assert_eq!(draft.action, AuditAction::Update);
    assert_eq!(
        draft.before.unwrap().get("frequency"),
        Some(&Payload::Text("MONTHLY".to_string()))
    );
    assert_eq!(
        draft.after.unwrap().get("frequency"),
        Some(&Payload::Text("WEEKLY".to_string()))
    );
}

#[test]
fn delete_indicator_is_soft() {
    let h = harness();
    let indicator = h.indicator(Frequency::Monthly);

    let deleted = h.service.delete_indicator(&admin(), indicator.id).unwrap();
    assert!(!deleted.value.is_active);
    assert_eq!(h.repo.indicators.lock().unwrap().len(), 1);
    assert_eq!(h.last_draft().action, AuditAction::Delete);
}

#[test]
fn listing_derives_due_status_and_filters_on_it() {
    let h = harness();
    let fresh = h.indicator(Frequency::Monthly);
    let stale = h.indicator(Frequency::Weekly);
    h.service
        .create_attestation(&admin(), NewAttestation::new(fresh.id))
        .unwrap();
    h.service
        .create_attestation(
            &admin(),
            NewAttestation::new(stale.id).on(today() - Duration::days(30)),
        )
        .unwrap();

    let overdue = h
        .service
        .list_indicators(
            &admin(),
            &IndicatorFilter {
                due_status: Some(DueStatus::Overdue),
                ..IndicatorFilter::default()
            },
        )
        .unwrap();
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0].indicator.id, stale.id);

    let view = h.service.get_indicator(&admin(), fresh.id).unwrap();
    assert_eq!(view.due.due_status, DueStatus::Compliant);
    assert_eq!(view.due.last_compliant_on, Some(today()));
}

#[test]
fn import_writes_a_single_entry() {
    let h = harness();
    let csv = "Section,Standard,Indicator\nA,A-1,First\nA,A-2,\nB,B-1,Third\n";

    let report = h
        .service
        .import_indicators(&admin(), csv.as_bytes(), ImportMode::Simple)
        .unwrap()
        .value;

    assert_eq!(report.created_count(), 2);
    assert_eq!(report.skipped(), 1);
    assert_eq!(report.outcome, ImportOutcome::Partial);
    assert_eq!(h.actions(), vec![AuditAction::Import]);
    assert!(h
        .last_draft()
        .summary
        .contains("Imported 2 of 3 indicators (1 skipped)"));
}

#[test]
fn validator_error_rejects_the_row_not_the_batch() {
    let validator = MockValidator {
        broken_standard: Some("S2"),
    };
    let h = harness_from(
        AccessVerdict::Allow,
        MockAudit::new(),
        MockBlobs::default(),
        validator,
    );
    let csv = "Section,Standard,Indicator\nA,S1,First\nA,S2,Second\nA,S3,Third\n";

    let imported = h
        .service
        .import_indicators(&admin(), csv.as_bytes(), ImportMode::Simple)
        .unwrap();

    let report = &imported.value;
    assert_eq!(report.created_count(), 2);
    assert_eq!(report.failed_rows.len(), 1);
    assert!(report.failed_rows[0].reasons[0].contains("rule backend unavailable"));
    assert_eq!(report.outcome, ImportOutcome::Partial);
    assert_eq!(h.repo.indicators.lock().unwrap().len(), 2);
    assert_eq!(h.actions(), vec![AuditAction::Import]);
    assert!(imported.is_recorded());
}

#[test]
fn import_into_missing_project_fails_without_audit() {
    let h = harness();
    let err = h
        .service
        .import_indicators(
            &admin(),
            b"Section,Standard,Indicator\n",
            ImportMode::Project(ProjectId::new()),
        )
        .unwrap_err();
    assert!(matches!(err, AccreditError::NotFound { .. }));
    assert!(h.actions().is_empty());
}

#[test]
fn indicator_for_missing_project_is_not_stored() {
    let h = harness();
    let draft = IndicatorDraft {
        project_id: Some(ProjectId::new()),
        ..IndicatorDraft::new("A", "A-1", "Text")
    };
    let err = h.service.create_indicator(&admin(), draft).unwrap_err();
    assert!(matches!(err, AccreditError::NotFound { .. }));

    let indicator = h.indicator(Frequency::Monthly);
    let patch = IndicatorPatch {
        project_id: Some(Some(ProjectId::new())),
        ..IndicatorPatch::default()
    };
    let err = h
        .service
        .update_indicator(&admin(), indicator.id, patch)
        .unwrap_err();
    assert!(matches!(err, AccreditError::NotFound { .. }));

    assert_eq!(h.repo.indicators.lock().unwrap().len(), 1);
    assert_eq!(h.actions(), vec![AuditAction::Create]);
}

// ── Attestations ─────────────────────────────────────────────────────────────

#[test]
fn attestation_expiry_follows_frequency() {
    let h = harness();
    let indicator = h.indicator(Frequency::Weekly);

    let record = h
        .service
        .create_attestation(&admin(), NewAttestation::new(indicator.id))
        .unwrap()
        .value;
    assert_eq!(record.compliant_on, today());
    assert_eq!(record.valid_until, Some(today() + Duration::days(7)));
    assert_eq!(record.created_by.as_deref(), Some("u-1"));
}

#[test]
fn valid_until_before_compliant_on_is_rejected() {
    let h = harness();
    let indicator = h.indicator(Frequency::Monthly);
    let input = NewAttestation {
        valid_until: Some(today() - Duration::days(1)),
        ..NewAttestation::new(indicator.id)
    };
    assert!(matches!(
        h.service.create_attestation(&admin(), input),
        Err(AccreditError::Validation { .. })
    ));
}

#[test]
fn revocation_is_audited_as_revoke() {
    let h = harness();
    let indicator = h.indicator(Frequency::Monthly);
    let record = h
        .service
        .create_attestation(&admin(), NewAttestation::new(indicator.id))
        .unwrap()
        .value;

    h.clock.advance(Duration::hours(2));
    let revoked = h
        .service
        .revoke_attestation(&admin(), record.id, "entered in error")
        .unwrap()
        .value;

    assert!(revoked.is_revoked);
    assert_eq!(revoked.revoked_at, Some(h.clock_now()));
    let draft = h.last_draft();
    assert_eq!(draft.action, AuditAction::Revoke);
    assert_eq!(
        draft.metadata.unwrap().get("reason"),
        Some(&Payload::Text("entered in error".to_string()))
    );
    assert_eq!(
        draft.before.unwrap().get("is_revoked"),
        Some(&Payload::Bool(false))
    );

    let view = h.service.get_indicator(&admin(), indicator.id).unwrap();
    assert_eq!(view.due.due_status, DueStatus::NotStarted);
}

#[test]
fn revoked_record_is_read_only() {
    let h = harness();
    let indicator = h.indicator(Frequency::Monthly);
    let record = h
        .service
        .create_attestation(&admin(), NewAttestation::new(indicator.id))
        .unwrap()
        .value;
    h.service.revoke_attestation(&admin(), record.id, "x").unwrap();

    let again = h.service.revoke_attestation(&admin(), record.id, "y");
    assert!(matches!(again, Err(AccreditError::Validation { .. })));

    let patch = AttestationPatch {
        notes: Some(Some("edit".to_string())),
        ..AttestationPatch::default()
    };
    assert!(h.service.update_attestation(&admin(), record.id, patch).is_err());
    assert_eq!(
        h.actions(),
        vec![AuditAction::Create, AuditAction::Create, AuditAction::Revoke]
    );
}

#[test]
fn revoked_reason_alone_is_rejected() {
    let h = harness();
    let indicator = h.indicator(Frequency::Monthly);
    let record = h
        .service
        .create_attestation(&admin(), NewAttestation::new(indicator.id))
        .unwrap()
        .value;
    let patch = AttestationPatch {
        revoked_reason: Some("why".to_string()),
        ..AttestationPatch::default()
    };
    assert!(matches!(
        h.service.update_attestation(&admin(), record.id, patch),
        Err(AccreditError::Validation { .. })
    ));
}

#[test]
fn deleting_attestation_unlinks_evidence() {
    let h = harness();
    let indicator = h.indicator(Frequency::Monthly);
    let record = h
        .service
        .create_attestation(&admin(), NewAttestation::new(indicator.id))
        .unwrap()
        .value;
    let note = EvidenceDraft::note(indicator.id, "checked").for_attestation(record.id);
    let item = h.service.create_evidence(&admin(), note).unwrap().value;

    h.service.delete_attestation(&admin(), record.id).unwrap();

    let item = h.service.get_evidence(&admin(), item.id).unwrap();
    assert_eq!(item.attestation_id, None);
    assert_eq!(
        h.last_draft().metadata.unwrap().get("evidence_unlinked"),
        Some(&Payload::Int(1))
    );
}

// ── Evidence ─────────────────────────────────────────────────────────────────

#[test]
fn evidence_for_foreign_attestation_is_rejected() {
    let h = harness();
    let a = h.indicator(Frequency::Monthly);
    let b = h.indicator(Frequency::Monthly);
    let record = h
        .service
        .create_attestation(&admin(), NewAttestation::new(a.id))
        .unwrap()
        .value;

    let draft = EvidenceDraft::note(b.id, "wrong").for_attestation(record.id);
    assert!(matches!(
        h.service.create_evidence(&admin(), draft),
        Err(AccreditError::Validation { .. })
    ));
}

#[test]
fn download_is_audited() {
    let h = harness();
    let indicator = h.indicator(Frequency::Monthly);
    let upload = FileUpload::new("drill.pdf", b"%PDF".to_vec());
    let item = h
        .service
        .create_evidence(&admin(), EvidenceDraft::file(indicator.id, upload))
        .unwrap()
        .value;

    let download = h.service.download_evidence(&admin(), item.id).unwrap().value;
    assert_eq!(download.bytes, b"%PDF");
    assert_eq!(h.last_draft().action, AuditAction::DownloadEvidence);
}

#[test]
fn missing_file_does_not_block_evidence_delete() {
    let h = harness();
    let indicator = h.indicator(Frequency::Monthly);
    let upload = FileUpload::new("drill.pdf", b"%PDF".to_vec());
    let item = h
        .service
        .create_evidence(&admin(), EvidenceDraft::file(indicator.id, upload))
        .unwrap()
        .value;
    h.blobs.lock().unwrap().clear();

    let deleted = h.service.delete_evidence(&admin(), item.id).unwrap();
    assert!(deleted.is_recorded());
    assert!(h.repo.evidence.lock().unwrap().is_empty());
    assert_eq!(
        h.last_draft().metadata.unwrap().get("file_deleted"),
        Some(&Payload::Bool(false))
    );
}

#[test]
fn failed_file_removal_does_not_fail_evidence_delete() {
    let blobs = MockBlobs {
        fail_deletes: true,
        ..MockBlobs::default()
    };
    let h = harness_from(
        AccessVerdict::Allow,
        MockAudit::new(),
        blobs,
        MockValidator::default(),
    );
    let indicator = h.indicator(Frequency::Monthly);
    let upload = FileUpload::new("drill.pdf", b"%PDF".to_vec());
    let item = h
        .service
        .create_evidence(&admin(), EvidenceDraft::file(indicator.id, upload))
        .unwrap()
        .value;

    let deleted = h.service.delete_evidence(&admin(), item.id).unwrap();
    assert!(deleted.is_recorded());
    assert!(h.repo.evidence.lock().unwrap().is_empty());
    assert_eq!(h.blobs.lock().unwrap().len(), 1);
    let draft = h.last_draft();
    assert_eq!(draft.action, AuditAction::Delete);
    assert_eq!(
        draft.metadata.unwrap().get("file_deleted"),
        Some(&Payload::Bool(false))
    );
}

#[test]
fn delete_evidence_removes_file() {
    let h = harness();
    let indicator = h.indicator(Frequency::Monthly);
    let upload = FileUpload::new("drill.pdf", b"%PDF".to_vec());
    let item = h
        .service
        .create_evidence(&admin(), EvidenceDraft::file(indicator.id, upload))
        .unwrap()
        .value;

    h.service.delete_evidence(&admin(), item.id).unwrap();
    assert!(h.blobs.lock().unwrap().is_empty());
    assert_eq!(
        h.last_draft().metadata.unwrap().get("file_deleted"),
        Some(&Payload::Bool(true))
    );
}

// ── Projects ─────────────────────────────────────────────────────────────────

#[test]
fn deleting_project_detaches_indicators() {
    let h = harness();
    let project = h
        .service
        .create_project(&admin(), ProjectDraft::new("Survey 2025"))
        .unwrap()
        .value;
    let draft = IndicatorDraft {
        project_id: Some(project.id),
        ..IndicatorDraft::new("A", "A-1", "Text")
    };
    let indicator = h.service.create_indicator(&admin(), draft).unwrap().value;

    h.service.delete_project(&admin(), project.id).unwrap();

    let view = h.service.get_indicator(&admin(), indicator.id).unwrap();
    assert_eq!(view.indicator.project_id, None);
    assert_eq!(
        h.last_draft().metadata.unwrap().get("detached_indicators"),
        Some(&Payload::Int(1))
    );
}

#[test]
fn blank_project_name_is_rejected() {
    let h = harness();
    assert!(matches!(
        h.service.create_project(&admin(), ProjectDraft::new("  ")),
        Err(AccreditError::Validation { .. })
    ));
}

// ── Reports ──────────────────────────────────────────────────────────────────

#[test]
fn snapshot_view_and_export_are_audited_separately() {
    let h = harness();
    h.indicator(Frequency::Monthly);

    let snapshot = h.service.snapshot(&admin(), &SnapshotFilter::default()).unwrap();
    assert_eq!(snapshot.value.summary.total, 1);
    let csv = h
        .service
        .export_snapshot(&admin(), &SnapshotFilter::default())
        .unwrap()
        .value;
    assert!(String::from_utf8(csv).unwrap().starts_with("Section,"));

    let drafts = h.drafts.lock().unwrap();
    let formats: Vec<_> = drafts
        .iter()
        .filter(|d| d.action == AuditAction::ExportSnapshot)
        .map(|d| d.metadata.as_ref().unwrap().get("format").cloned())
        .collect();
    assert_eq!(
        formats,
        vec![
            Some(Payload::Text("view".to_string())),
            Some(Payload::Text("csv".to_string()))
        ]
    );
}

#[test]
fn log_export_is_audited() {
    let h = harness();
    h.service
        .export_audit_logs(&admin(), &AuditFilter::action(AuditAction::Create))
        .unwrap();
    let draft = h.last_draft();
    assert_eq!(draft.action, AuditAction::ExportLogs);
    assert_eq!(draft.entity_type, "AuditLog");
}

#[test]
fn log_export_row_count_comes_from_the_export() {
    let h = harness();
    h.indicator(Frequency::Monthly);
    h.indicator(Frequency::Weekly);

    h.service
        .export_audit_logs(&admin(), &AuditFilter::default())
        .unwrap();
    assert_eq!(
        h.last_draft().metadata.unwrap().get("rows"),
        Some(&Payload::Int(2))
    );
}

#[test]
fn status_summary_counts_active_indicators() {
    let h = harness();
    let active = h.indicator(Frequency::Monthly);
    let retired = h.indicator(Frequency::Monthly);
    h.service.delete_indicator(&admin(), retired.id).unwrap();
    h.service
        .create_attestation(&admin(), NewAttestation::new(active.id))
        .unwrap();

    let summary = h
        .service
        .status_summary(&admin(), SummaryPeriod::Quarter, None)
        .unwrap();
    assert_eq!(summary.start, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
    assert_eq!(summary.end, NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
    assert_eq!(summary.counts.total, 1);
    assert_eq!(summary.counts.compliant, 1);
}

#[test]
fn session_and_role_events_are_recorded() {
    let h = harness();
    h.service.record_session(&admin(), SessionEvent::Login).unwrap();
    let subject = Actor::new("u-2", "Rita Reviewer");
    h.service
        .record_role_change(&admin(), &subject, Role::Reviewer, RoleChange::Assign)
        .unwrap();

    assert_eq!(h.actions(), vec![AuditAction::Login, AuditAction::AssignRole]);
    let draft = h.last_draft();
    assert_eq!(draft.entity_id, "u-2");
    assert_eq!(
        draft.metadata.unwrap().get("role"),
        Some(&Payload::Text("reviewer".to_string()))
    );
}

#[test]
fn anonymous_session_event_is_rejected() {
    let h = harness();
    assert!(h
        .service
        .record_session(&Principal::anonymous(), SessionEvent::Logout)
        .is_err());
}

// ── Degraded success ─────────────────────────────────────────────────────────

#[test]
fn audit_failure_keeps_the_mutation() {
    let h = harness_with(AccessVerdict::Allow, MockAudit::failing());

    let created = h
        .service
        .create_indicator(&admin(), IndicatorDraft::new("A", "A-1", "Text"))
        .unwrap();

    assert!(!created.is_recorded());
    assert!(matches!(created.audit, AuditOutcome::Failed { .. }));
    assert_eq!(h.repo.indicators.lock().unwrap().len(), 1);
}

impl Harness {
    fn clock_now(&self) -> chrono::DateTime<chrono::Utc> {
        use crate::clock::Clock;
        self.clock.now()
    }
}
