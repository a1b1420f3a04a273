//! In-memory implementation of the four entity repositories.
//!
//! Each table sits behind its own `RwLock`. A modification takes the write
//! lock, runs the caller's closure on a copy of the row and writes the copy
//! back only if the closure succeeds, so concurrent modifications of one row
//! are serialised and a failed closure leaves no trace.
//!
//! Operations that span two tables hold both locks for their whole duration.
//! Locks are always taken in the order projects, indicators, attestations,
//! evidence.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use accredit_contracts::{
    attestation::AttestationRecord,
    error::{AccreditError, AccreditResult},
    evidence::EvidenceItem,
    ids::{AttestationId, EvidenceId, IndicatorId, ProjectId},
    indicator::Indicator,
    project::Project,
};
use accredit_core::traits::{
    AttestationRepository, EvidenceRepository, IndicatorRepository, Modified, Mutator,
    ProjectRepository, Removed,
};

/// Rows that can live in a `Table`.
trait Row: Clone {
    type Id: PartialEq + Copy + std::fmt::Display;
    const ENTITY: &'static str;

    fn id(&self) -> Self::Id;
}

impl Row for Indicator {
    type Id = IndicatorId;
    const ENTITY: &'static str = "Indicator";

    fn id(&self) -> IndicatorId {
        self.id
    }
}

impl Row for AttestationRecord {
    type Id = AttestationId;
    const ENTITY: &'static str = "ComplianceRecord";

    fn id(&self) -> AttestationId {
        self.id
    }
}

impl Row for EvidenceItem {
    type Id = EvidenceId;
    const ENTITY: &'static str = "EvidenceItem";

    fn id(&self) -> EvidenceId {
        self.id
    }
}

impl Row for Project {
    type Id = ProjectId;
    const ENTITY: &'static str = "Project";

    fn id(&self) -> ProjectId {
        self.id
    }
}

/// One entity table, in insertion order.
struct Table<T> {
    rows: RwLock<Vec<T>>,
}

impl<T: Row> Table<T> {
    fn new() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
        }
    }

    fn read(&self) -> AccreditResult<RwLockReadGuard<'_, Vec<T>>> {
        self.rows
            .read()
            .map_err(|e| AccreditError::storage(format!("{} table lock poisoned: {}", T::ENTITY, e)))
    }

    fn write(&self) -> AccreditResult<RwLockWriteGuard<'_, Vec<T>>> {
        self.rows
            .write()
            .map_err(|e| AccreditError::storage(format!("{} table lock poisoned: {}", T::ENTITY, e)))
    }

    fn insert(&self, row: T) -> AccreditResult<T> {
        push_row(&mut *self.write()?, row)
    }

    fn get(&self, id: T::Id) -> AccreditResult<Option<T>> {
        Ok(self.read()?.iter().find(|r| r.id() == id).cloned())
    }

    fn filtered(&self, keep: impl Fn(&T) -> bool) -> AccreditResult<Vec<T>> {
        Ok(self.read()?.iter().filter(|r| keep(r)).cloned().collect())
    }

    fn modify(&self, id: T::Id, change: Mutator<'_, T>) -> AccreditResult<Modified<T>> {
        let mut rows = self.write()?;
        let row = rows
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or_else(|| AccreditError::not_found(T::ENTITY, id))?;

        let before = row.clone();
        let mut after = before.clone();
        change(&mut after)?;
        *row = after.clone();
        debug!(entity = T::ENTITY, id = %id, "row modified");
        Ok(Modified { before, after })
    }

    fn remove(&self, id: T::Id) -> AccreditResult<Option<T>> {
        Ok(take_row(&mut *self.write()?, id))
    }
}

fn push_row<T: Row>(rows: &mut Vec<T>, row: T) -> AccreditResult<T> {
    if rows.iter().any(|r| r.id() == row.id()) {
        return Err(AccreditError::storage(format!(
            "{} '{}' already exists",
            T::ENTITY,
            row.id()
        )));
    }
    rows.push(row.clone());
    Ok(row)
}

fn take_row<T: Row>(rows: &mut Vec<T>, id: T::Id) -> Option<T> {
    rows.iter()
        .position(|r| r.id() == id)
        .map(|pos| rows.remove(pos))
}

/// Apply `update` to every row it returns `true` for; returns the count.
fn update_where<T>(rows: &mut [T], mut update: impl FnMut(&mut T) -> bool) -> usize {
    let mut count = 0;
    for row in rows.iter_mut() {
        if update(row) {
            count += 1;
        }
    }
    count
}

/// The in-memory persistence collaborator.
pub struct MemoryStore {
    indicators: Table<Indicator>,
    attestations: Table<AttestationRecord>,
    evidence: Table<EvidenceItem>,
    projects: Table<Project>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            indicators: Table::new(),
            attestations: Table::new(),
            evidence: Table::new(),
            projects: Table::new(),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl IndicatorRepository for MemoryStore {
    fn insert_indicator(&self, indicator: Indicator) -> AccreditResult<Indicator> {
        // Held until the row is in so a concurrent project removal cannot
        // slip between the check and the insert.
        let projects = self.projects.read()?;
        if let Some(project) = indicator.project_id {
            if !projects.iter().any(|p| p.id == project) {
                return Err(AccreditError::not_found(Project::ENTITY, project));
            }
        }
        push_row(&mut *self.indicators.write()?, indicator)
    }

    fn get_indicator(&self, id: IndicatorId) -> AccreditResult<Option<Indicator>> {
        self.indicators.get(id)
    }

    fn list_indicators(&self) -> AccreditResult<Vec<Indicator>> {
        self.indicators.filtered(|_| true)
    }

    fn modify_indicator(
        &self,
        id: IndicatorId,
        change: Mutator<'_, Indicator>,
    ) -> AccreditResult<Modified<Indicator>> {
        let projects = self.projects.read()?;
        self.indicators.modify(id, &mut |indicator: &mut Indicator| {
            change(indicator)?;
            match indicator.project_id {
                Some(project) if !projects.iter().any(|p| p.id == project) => {
                    Err(AccreditError::not_found(Project::ENTITY, project))
                }
                _ => Ok(()),
            }
        })
    }
}

impl AttestationRepository for MemoryStore {
    fn insert_attestation(&self, record: AttestationRecord) -> AccreditResult<AttestationRecord> {
        self.attestations.insert(record)
    }

    fn get_attestation(&self, id: AttestationId) -> AccreditResult<Option<AttestationRecord>> {
        self.attestations.get(id)
    }

    fn list_attestations(
        &self,
        indicator: Option<IndicatorId>,
    ) -> AccreditResult<Vec<AttestationRecord>> {
        self.attestations
            .filtered(|r| indicator.map_or(true, |id| r.indicator_id == id))
    }

    fn modify_attestation(
        &self,
        id: AttestationId,
        change: Mutator<'_, AttestationRecord>,
    ) -> AccreditResult<Modified<AttestationRecord>> {
        self.attestations.modify(id, change)
    }

    fn remove_attestation(
        &self,
        id: AttestationId,
    ) -> AccreditResult<Option<Removed<AttestationRecord>>> {
        let mut records = self.attestations.write()?;
        let mut evidence = self.evidence.write()?;
        let Some(row) = take_row(&mut records, id) else {
            return Ok(None);
        };
        let unlinked = update_where(&mut evidence, |item| {
            if item.attestation_id == Some(id) {
                item.attestation_id = None;
                true
            } else {
                false
            }
        });
        debug!(attestation_id = %id, unlinked, "attestation removed");
        Ok(Some(Removed { row, unlinked }))
    }
}

impl EvidenceRepository for MemoryStore {
    fn insert_evidence(&self, item: EvidenceItem) -> AccreditResult<EvidenceItem> {
        let records = self.attestations.read()?;
        if let Some(attestation) = item.attestation_id {
            if !records.iter().any(|r| r.id == attestation) {
                return Err(AccreditError::not_found(AttestationRecord::ENTITY, attestation));
            }
        }
        push_row(&mut *self.evidence.write()?, item)
    }

    fn get_evidence(&self, id: EvidenceId) -> AccreditResult<Option<EvidenceItem>> {
        self.evidence.get(id)
    }

    fn list_evidence(&self, indicator: Option<IndicatorId>) -> AccreditResult<Vec<EvidenceItem>> {
        self.evidence
            .filtered(|e| indicator.map_or(true, |id| e.indicator_id == id))
    }

    fn remove_evidence(&self, id: EvidenceId) -> AccreditResult<Option<EvidenceItem>> {
        self.evidence.remove(id)
    }
}

impl ProjectRepository for MemoryStore {
    fn insert_project(&self, project: Project) -> AccreditResult<Project> {
        self.projects.insert(project)
    }

    fn get_project(&self, id: ProjectId) -> AccreditResult<Option<Project>> {
        self.projects.get(id)
    }

    fn list_projects(&self) -> AccreditResult<Vec<Project>> {
        self.projects.filtered(|_| true)
    }

    fn modify_project(
        &self,
        id: ProjectId,
        change: Mutator<'_, Project>,
    ) -> AccreditResult<Modified<Project>> {
        self.projects.modify(id, change)
    }

    fn remove_project(&self, id: ProjectId) -> AccreditResult<Option<Removed<Project>>> {
        let mut projects = self.projects.write()?;
        let mut indicators = self.indicators.write()?;
        let Some(row) = take_row(&mut projects, id) else {
            return Ok(None);
        };
        let unlinked = update_where(&mut indicators, |indicator| {
            if indicator.project_id == Some(id) {
                indicator.project_id = None;
                true
            } else {
                false
            }
        });
        debug!(project_id = %id, unlinked, "project removed");
        Ok(Some(Removed { row, unlinked }))
    }
}
