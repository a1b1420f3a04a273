//! Indicator listing, CRUD and CSV import.

use tracing::info;
use uuid::Uuid;

use accredit_contracts::{
    actor::Principal,
    audit::{AuditAction, AuditDraft, Audited},
    error::{AccreditError, AccreditResult},
    ids::{IndicatorId, ProjectId},
    indicator::{Indicator, IndicatorDraft, IndicatorFilter, IndicatorPatch, IndicatorView},
    payload::Payload,
};

use crate::{
    import::{parse_indicator_csv, ImportMode, ImportOutcome, ImportReport, RowFailure},
    snapshot::sort_views,
};

use super::{entity, resource, ComplianceService};

impl ComplianceService {
    /// Indicators matching `filter`, each with its freshly derived due state,
    /// ordered by section then standard.
    pub fn list_indicators(
        &self,
        principal: &Principal,
        filter: &IndicatorFilter,
    ) -> AccreditResult<Vec<IndicatorView>> {
        self.authorize(principal, "read", resource::INDICATOR)?;

        let history = self.repo.list_attestations(None)?;
        let today = self.clock.today();

        let mut views: Vec<IndicatorView> = self
            .repo
            .list_indicators()?
            .into_iter()
            .filter(|i| filter.matches(i))
            .map(|indicator| {
                let due = self.engine.status(&indicator, &history, today);
                IndicatorView { indicator, due }
            })
            .filter(|v| filter.due_status.map_or(true, |s| v.due.due_status == s))
            .collect();
        sort_views(&mut views);
        Ok(views)
    }

    pub fn get_indicator(
        &self,
        principal: &Principal,
        id: IndicatorId,
    ) -> AccreditResult<IndicatorView> {
        self.authorize(principal, "read", resource::INDICATOR)?;
        let indicator = self.require_indicator(id)?;
        let history = self.repo.list_attestations(Some(id))?;
        let due = self.engine.status_of(&history, self.clock.today());
        Ok(IndicatorView { indicator, due })
    }

    pub fn create_indicator(
        &self,
        principal: &Principal,
        draft: IndicatorDraft,
    ) -> AccreditResult<Audited<Indicator>> {
        self.authorize(principal, "create", resource::INDICATOR)?;
        self.validator.validate_indicator(&draft)?.into_result()?;

        let indicator = self.repo.insert_indicator(self.build_indicator(draft))?;
        info!(indicator_id = %indicator.id, standard = %indicator.standard, "indicator created");

        let audit = AuditDraft::new(
            AuditAction::Create,
            entity::INDICATOR,
            indicator.id,
            format!("Created indicator {}", indicator.standard),
        )
        .by(principal)
        .after(&indicator);
        Ok(self.audited(indicator, audit))
    }

    pub fn update_indicator(
        &self,
        principal: &Principal,
        id: IndicatorId,
        patch: IndicatorPatch,
    ) -> AccreditResult<Audited<Indicator>> {
        self.authorize(principal, "update", resource::INDICATOR)?;

        let now = self.clock.now();
        let changed = changed_fields(&patch);
        let validator = &self.validator;
        let modified = self.repo.modify_indicator(id, &mut |indicator: &mut Indicator| {
            apply_patch(indicator, &patch);
            validator
                .validate_indicator(&IndicatorDraft::from(&*indicator))?
                .into_result()?;
            indicator.updated_at = now;
            Ok(())
        })?;
        info!(indicator_id = %id, "indicator updated");

        let audit = AuditDraft::new(
            AuditAction::Update,
            entity::INDICATOR,
            id,
            format!("Updated indicator {}", modified.after.standard),
        )
        .by(principal)
        .before(&modified.before)
        .after(&modified.after)
        .metadata(Payload::object([("changed", Payload::from(changed))]));
        Ok(self.audited(modified.after, audit))
    }

    /// Soft delete: the indicator is deactivated, its history is kept.
    pub fn delete_indicator(
        &self,
        principal: &Principal,
        id: IndicatorId,
    ) -> AccreditResult<Audited<Indicator>> {
        self.authorize(principal, "delete", resource::INDICATOR)?;

        let now = self.clock.now();
        let modified = self.repo.modify_indicator(id, &mut |indicator: &mut Indicator| {
            indicator.is_active = false;
            indicator.updated_at = now;
            Ok(())
        })?;
        info!(indicator_id = %id, "indicator deactivated");

        let audit = AuditDraft::new(
            AuditAction::Delete,
            entity::INDICATOR,
            id,
            format!("Deleted indicator {}", modified.before.standard),
        )
        .by(principal)
        .before(&modified.before)
        .metadata(Payload::object([("soft_delete", Payload::from(true))]));
        Ok(self.audited(modified.after, audit))
    }

    /// Bulk-create indicators from CSV.
    ///
    /// Bad rows are reported, not fatal. The batch writes one `IMPORT` entry
    /// summarising the counts. A document that cannot be read at all is a
    /// `Parse` error and writes nothing.
    pub fn import_indicators(
        &self,
        principal: &Principal,
        csv: &[u8],
        mode: ImportMode,
    ) -> AccreditResult<Audited<ImportReport>> {
        self.authorize(principal, "import", resource::INDICATOR)?;
        if let Some(project) = mode.project_id() {
            self.require_project(project)?;
        }

        let parsed = parse_indicator_csv(csv, mode)?;
        let total = parsed.total();
        let mut failed_rows = parsed.failures;
        let mut created = Vec::with_capacity(parsed.rows.len());

        // From here on every row either commits or lands in `failed_rows`, so
        // the single IMPORT entry always matches what was committed.
        for row in parsed.rows {
            let report = match self.validator.validate_indicator(&row.draft) {
                Ok(report) => report,
                Err(e) => {
                    failed_rows.push(RowFailure {
                        row: row.row,
                        reasons: vec![e.to_string()],
                    });
                    continue;
                }
            };
            if !report.passed() {
                failed_rows.push(RowFailure {
                    row: row.row,
                    reasons: report.messages(),
                });
                continue;
            }
            match self.repo.insert_indicator(self.build_indicator(row.draft)) {
                Ok(indicator) => created.push(indicator.id),
                Err(e) => failed_rows.push(RowFailure {
                    row: row.row,
                    reasons: vec![e.to_string()],
                }),
            }
        }
        failed_rows.sort_by_key(|f| f.row);

        let outcome = ImportOutcome::classify(created.len(), failed_rows.len());
        let report = ImportReport {
            batch_id: format!("import-{}", Uuid::new_v4()),
            mode,
            total,
            created,
            failed_rows,
            outcome,
        };
        info!(
            batch_id = %report.batch_id,
            total = report.total,
            created = report.created_count(),
            skipped = report.skipped(),
            "indicator import finished"
        );

        let audit = AuditDraft::new(
            AuditAction::Import,
            entity::INDICATOR,
            &report.batch_id,
            format!(
                "Imported {} of {} indicators ({} skipped)",
                report.created_count(),
                report.total,
                report.skipped()
            ),
        )
        .by(principal)
        .metadata(report.audit_metadata());
        Ok(self.audited(report, audit))
    }

    fn build_indicator(&self, draft: IndicatorDraft) -> Indicator {
        let now = self.clock.now();
        Indicator {
            id: IndicatorId::new(),
            section: draft.section.trim().to_string(),
            standard: draft.standard.trim().to_string(),
            indicator_text: draft.indicator_text.trim().to_string(),
            evidence_required_text: draft.evidence_required_text,
            responsible_person: draft.responsible_person,
            frequency: draft.frequency,
            evidence_min_rule: draft.evidence_min_rule,
            is_active: draft.is_active,
            is_mandatory: draft.is_mandatory,
            project_id: draft.project_id,
            created_at: now,
            updated_at: now,
        }
    }

    pub(crate) fn require_project(&self, id: ProjectId) -> AccreditResult<()> {
        match self.repo.get_project(id)? {
            Some(_) => Ok(()),
            None => Err(AccreditError::not_found(entity::PROJECT, id)),
        }
    }
}

fn apply_patch(indicator: &mut Indicator, patch: &IndicatorPatch) {
    if let Some(v) = &patch.section {
        indicator.section = v.trim().to_string();
    }
    if let Some(v) = &patch.standard {
        indicator.standard = v.trim().to_string();
    }
    if let Some(v) = &patch.indicator_text {
        indicator.indicator_text = v.trim().to_string();
    }
    if let Some(v) = &patch.evidence_required_text {
        indicator.evidence_required_text = v.clone();
    }
    if let Some(v) = &patch.responsible_person {
        indicator.responsible_person = v.clone();
    }
    if let Some(v) = patch.frequency {
        indicator.frequency = v;
    }
    if let Some(v) = &patch.evidence_min_rule {
        indicator.evidence_min_rule = v.clone();
    }
    if let Some(v) = patch.is_active {
        indicator.is_active = v;
    }
    if let Some(v) = patch.is_mandatory {
        indicator.is_mandatory = v;
    }
    if let Some(v) = patch.project_id {
        indicator.project_id = v;
    }
}

fn changed_fields(patch: &IndicatorPatch) -> Vec<&'static str> {
    [
        ("section", patch.section.is_some()),
        ("standard", patch.standard.is_some()),
        ("indicator_text", patch.indicator_text.is_some()),
        ("evidence_required_text", patch.evidence_required_text.is_some()),
        ("responsible_person", patch.responsible_person.is_some()),
        ("frequency", patch.frequency.is_some()),
        ("evidence_min_rule", patch.evidence_min_rule.is_some()),
        ("is_active", patch.is_active.is_some()),
        ("is_mandatory", patch.is_mandatory.is_some()),
        ("project_id", patch.project_id.is_some()),
    ]
    .into_iter()
    .filter(|(_, set)| *set)
    .map(|(name, _)| name)
    .collect()
}
