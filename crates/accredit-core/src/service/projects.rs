//! Projects.

use tracing::info;

use accredit_contracts::{
    actor::Principal,
    audit::{AuditAction, AuditDraft, Audited},
    error::{AccreditError, AccreditResult},
    ids::ProjectId,
    payload::Payload,
    project::{Project, ProjectDraft, ProjectPatch},
};

use crate::traits::Removed;

use super::{entity, resource, ComplianceService};

fn require_name(name: &str) -> AccreditResult<()> {
    if name.trim().is_empty() {
        return Err(AccreditError::validation("project name is required"));
    }
    Ok(())
}

impl ComplianceService {
    /// All projects, by name.
    pub fn list_projects(&self, principal: &Principal) -> AccreditResult<Vec<Project>> {
        self.authorize(principal, "read", resource::PROJECT)?;
        let mut projects = self.repo.list_projects()?;
        projects.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(projects)
    }

    pub fn get_project(&self, principal: &Principal, id: ProjectId) -> AccreditResult<Project> {
        self.authorize(principal, "read", resource::PROJECT)?;
        self.repo
            .get_project(id)?
            .ok_or_else(|| AccreditError::not_found(entity::PROJECT, id))
    }

    pub fn create_project(
        &self,
        principal: &Principal,
        draft: ProjectDraft,
    ) -> AccreditResult<Audited<Project>> {
        self.authorize(principal, "create", resource::PROJECT)?;
        require_name(&draft.name)?;

        let now = self.clock.now();
        let project = self.repo.insert_project(Project {
            id: ProjectId::new(),
            name: draft.name.trim().to_string(),
            description: draft.description,
            status: draft.status,
            created_at: now,
            updated_at: now,
        })?;
        info!(project_id = %project.id, name = %project.name, "project created");

        let audit = AuditDraft::new(
            AuditAction::Create,
            entity::PROJECT,
            project.id,
            format!("Created project {}", project.name),
        )
        .by(principal)
        .after(&project);
        Ok(self.audited(project, audit))
    }

    pub fn update_project(
        &self,
        principal: &Principal,
        id: ProjectId,
        patch: ProjectPatch,
    ) -> AccreditResult<Audited<Project>> {
        self.authorize(principal, "update", resource::PROJECT)?;

        let now = self.clock.now();
        let modified = self.repo.modify_project(id, &mut |project: &mut Project| {
            if let Some(name) = &patch.name {
                require_name(name)?;
                project.name = name.trim().to_string();
            }
            if let Some(description) = &patch.description {
                project.description = description.clone();
            }
            if let Some(status) = patch.status {
                project.status = status;
            }
            project.updated_at = now;
            Ok(())
        })?;
        info!(project_id = %id, "project updated");

        let audit = AuditDraft::new(
            AuditAction::Update,
            entity::PROJECT,
            id,
            format!("Updated project {}", modified.after.name),
        )
        .by(principal)
        .before(&modified.before)
        .after(&modified.after);
        Ok(self.audited(modified.after, audit))
    }

    /// Remove a project. Its indicators stay, detached.
    pub fn delete_project(
        &self,
        principal: &Principal,
        id: ProjectId,
    ) -> AccreditResult<Audited<Project>> {
        self.authorize(principal, "delete", resource::PROJECT)?;

        let Removed {
            row: removed,
            unlinked: detached,
        } = self
            .repo
            .remove_project(id)?
            .ok_or_else(|| AccreditError::not_found(entity::PROJECT, id))?;
        info!(project_id = %id, detached_indicators = detached, "project deleted");

        let audit = AuditDraft::new(
            AuditAction::Delete,
            entity::PROJECT,
            id,
            format!("Deleted project {}", removed.name),
        )
        .by(principal)
        .before(&removed)
        .metadata(Payload::object([("detached_indicators", Payload::from(detached))]));
        Ok(self.audited(removed, audit))
    }
}
