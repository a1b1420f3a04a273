//! Collaborator traits for the compliance service.
//!
//! These define the boundary between the core and everything it does not
//! own:
//!
//! - the repositories: durable storage for the four entities
//! - `BlobStore`: evidence file bytes
//! - `AuditSink`: append-only audit trail
//! - `AccessPolicy`: capability check before anything else runs
//! - `InputValidator`: per-unit input rules
//!
//! `ComplianceService` wires them together in the right order. Nothing here
//! performs I/O on its own.

use accredit_contracts::{
    access::{AccessContext, AccessVerdict},
    attestation::AttestationRecord,
    audit::{AuditDraft, AuditExport, AuditFilter, AuditLogEntry, AuditPage, PageRequest},
    config::UploadConstraints,
    error::AccreditResult,
    evidence::{BlobHandle, EvidenceDraft, EvidenceItem, FileUpload},
    ids::{AttestationId, EvidenceId, IndicatorId, ProjectId},
    indicator::{Indicator, IndicatorDraft},
    project::Project,
    validation::ValidationReport,
};

/// The state of a row before and after an atomic modification.
#[derive(Debug, Clone, PartialEq)]
pub struct Modified<T> {
    pub before: T,
    pub after: T,
}

/// A removed row and how many rows that referenced it were unlinked in the
/// same step.
#[derive(Debug, Clone, PartialEq)]
pub struct Removed<T> {
    pub row: T,
    pub unlinked: usize,
}

/// Closure applied to a row under the repository's write lock.
///
/// Returning `Err` aborts the modification and leaves the row unchanged.
pub type Mutator<'a, T> = &'a mut dyn FnMut(&mut T) -> AccreditResult<()>;

// ── Repositories ─────────────────────────────────────────────────────────────

pub trait IndicatorRepository: Send + Sync {
    /// Returns `NotFound` when `indicator.project_id` names no project. The
    /// check and the insert are one step with respect to project removal.
    fn insert_indicator(&self, indicator: Indicator) -> AccreditResult<Indicator>;

    fn get_indicator(&self, id: IndicatorId) -> AccreditResult<Option<Indicator>>;

    /// Every indicator, active or not, in insertion order.
    fn list_indicators(&self) -> AccreditResult<Vec<Indicator>>;

    /// Apply `change` to one indicator atomically.
    ///
    /// Returns `NotFound` when the id does not resolve, or when the changed
    /// row points at a project that does not exist.
    fn modify_indicator(
        &self,
        id: IndicatorId,
        change: Mutator<'_, Indicator>,
    ) -> AccreditResult<Modified<Indicator>>;
}

pub trait AttestationRepository: Send + Sync {
    fn insert_attestation(&self, record: AttestationRecord) -> AccreditResult<AttestationRecord>;

    fn get_attestation(&self, id: AttestationId) -> AccreditResult<Option<AttestationRecord>>;

    /// Records for one indicator, or all of them, in insertion order.
    fn list_attestations(
        &self,
        indicator: Option<IndicatorId>,
    ) -> AccreditResult<Vec<AttestationRecord>>;

    /// Apply `change` to one record atomically. Two concurrent callers never
    /// both observe the same `before`.
    fn modify_attestation(
        &self,
        id: AttestationId,
        change: Mutator<'_, AttestationRecord>,
    ) -> AccreditResult<Modified<AttestationRecord>>;

    /// Physically remove a record and null out the attestation link on every
    /// evidence item pointing at it, in one step. `None` when it was already
    /// gone, in which case nothing is touched.
    fn remove_attestation(
        &self,
        id: AttestationId,
    ) -> AccreditResult<Option<Removed<AttestationRecord>>>;
}

pub trait EvidenceRepository: Send + Sync {
    /// Returns `NotFound` when `item.attestation_id` names no record.
    fn insert_evidence(&self, item: EvidenceItem) -> AccreditResult<EvidenceItem>;

    fn get_evidence(&self, id: EvidenceId) -> AccreditResult<Option<EvidenceItem>>;

    fn list_evidence(&self, indicator: Option<IndicatorId>) -> AccreditResult<Vec<EvidenceItem>>;

    fn remove_evidence(&self, id: EvidenceId) -> AccreditResult<Option<EvidenceItem>>;
}

pub trait ProjectRepository: Send + Sync {
    fn insert_project(&self, project: Project) -> AccreditResult<Project>;

    fn get_project(&self, id: ProjectId) -> AccreditResult<Option<Project>>;

    fn list_projects(&self) -> AccreditResult<Vec<Project>>;

    fn modify_project(
        &self,
        id: ProjectId,
        change: Mutator<'_, Project>,
    ) -> AccreditResult<Modified<Project>>;

    /// Remove a project and clear the project reference on every indicator
    /// linked to it, in one step.
    fn remove_project(&self, id: ProjectId) -> AccreditResult<Option<Removed<Project>>>;
}

/// The full persistence collaborator.
pub trait Repository:
    IndicatorRepository + AttestationRepository + EvidenceRepository + ProjectRepository
{
}

impl<T> Repository for T where
    T: IndicatorRepository + AttestationRepository + EvidenceRepository + ProjectRepository
{
}

// ── Blobs ────────────────────────────────────────────────────────────────────

/// Byte storage for evidence files.
pub trait BlobStore: Send + Sync {
    /// Store the upload and return its handle.
    ///
    /// Implementations reject uploads that break `constraints` with a
    /// `Validation` error and store nothing.
    fn put(&self, upload: &FileUpload, constraints: &UploadConstraints)
        -> AccreditResult<BlobHandle>;

    /// `None` when nothing is stored under `handle`.
    fn get(&self, handle: &BlobHandle) -> AccreditResult<Option<Vec<u8>>>;

    /// `true` only if something was actually removed.
    fn delete(&self, handle: &BlobHandle) -> AccreditResult<bool>;
}

// ── Audit ────────────────────────────────────────────────────────────────────

/// The append-only audit trail.
///
/// Implementations sanitize every payload in the draft, extract the
/// requester IP and user agent, and assign the timestamp themselves. There
/// is no update or delete.
pub trait AuditSink: Send + Sync {
    fn record(&self, draft: AuditDraft) -> AccreditResult<AuditLogEntry>;

    /// One page of matching entries, newest first.
    fn query(&self, filter: &AuditFilter, page: PageRequest) -> AccreditResult<AuditPage>;

    /// Every matching entry as CSV, newest first, with the row count.
    fn export_csv(&self, filter: &AuditFilter) -> AccreditResult<AuditExport>;
}

// ── Access and validation ────────────────────────────────────────────────────

/// Decides whether a principal may run an operation.
///
/// Evaluation must be deterministic and free of I/O.
pub trait AccessPolicy: Send + Sync {
    fn evaluate(&self, ctx: &AccessContext) -> AccreditResult<AccessVerdict>;
}

/// Per-unit input rules, applied before anything is persisted.
pub trait InputValidator: Send + Sync {
    fn validate_indicator(&self, draft: &IndicatorDraft) -> AccreditResult<ValidationReport>;

    fn validate_evidence(
        &self,
        draft: &EvidenceDraft,
        constraints: &UploadConstraints,
    ) -> AccreditResult<ValidationReport>;
}
