//! A seeded demonstration scenario.
//!
//! Four indicators, each landing in a different due state relative to the
//! runtime clock's today:
//!
//! | Indicator                 | Frequency | History                       | Status      |
//! |---------------------------|-----------|-------------------------------|-------------|
//! | Hand hygiene audit        | monthly   | attested 40 days ago          | OVERDUE     |
//! | Crash cart check          | monthly   | attested 28 days ago          | DUE_SOON    |
//! | Sharps container review   | weekly    | attested yesterday, revoked   | NOT_STARTED |
//! | Infection control policy  | one-time  | attested 200 days ago         | COMPLIANT   |
//!
//! All data is fictional.

use chrono::{Days, NaiveDate};
use serde::Serialize;
use tracing::info;

use accredit_contracts::{
    actor::{Actor, Principal},
    attestation::NewAttestation,
    capability::CapabilitySet,
    error::AccreditResult,
    evidence::EvidenceDraft,
    ids::{IndicatorId, ProjectId},
    indicator::{DueStatus, Frequency, IndicatorDraft, IndicatorFilter},
    project::ProjectDraft,
};

use crate::runtime::Runtime;

/// The principal the scenario acts as.
pub fn scenario_admin() -> Principal {
    Principal::user(
        Actor::new("qa-lead", "Quality Lead"),
        CapabilitySet::admin(),
    )
}

/// Ids of everything `seed` created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeededScenario {
    pub project: ProjectId,
    pub overdue: IndicatorId,
    pub due_soon: IndicatorId,
    pub revoked: IndicatorId,
    pub one_time: IndicatorId,
}

/// One row of the scenario printout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioLine {
    pub standard: String,
    pub indicator_text: String,
    pub frequency: Frequency,
    pub status: DueStatus,
    pub last_compliant_on: Option<NaiveDate>,
    pub next_due_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioReport {
    pub as_of: NaiveDate,
    pub lines: Vec<ScenarioLine>,
    pub audit_entries: usize,
    pub chain_verified: bool,
}

fn days_before(today: NaiveDate, days: u64) -> NaiveDate {
    today.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN)
}

/// Populate `runtime` with the scenario data, acting as `principal`.
pub fn seed(runtime: &Runtime, principal: &Principal) -> AccreditResult<SeededScenario> {
    let service = runtime.service();
    let today = service.today();

    let project = service
        .create_project(
            principal,
            ProjectDraft {
                description: Some("Ward 4 accreditation survey".to_string()),
                ..ProjectDraft::new("Infection Prevention")
            },
        )?
        .value;

    let indicator = |standard: &str, text: &str, frequency: Frequency| {
        service
            .create_indicator(
                principal,
                IndicatorDraft {
                    project_id: Some(project.id),
                    responsible_person: Some("Ward Manager".to_string()),
                    ..IndicatorDraft::new("IPC", standard, text).with_frequency(frequency)
                },
            )
            .map(|created| created.value.id)
    };

    let overdue = indicator("IPC.1", "Hand hygiene audit", Frequency::Monthly)?;
    let due_soon = indicator("IPC.2", "Crash cart check", Frequency::Monthly)?;
    let revoked = indicator("IPC.3", "Sharps container review", Frequency::Weekly)?;
    let one_time = indicator("IPC.4", "Infection control policy approved", Frequency::OneTime)?;

    let attest = |id: IndicatorId, days_ago: u64| {
        service
            .create_attestation(principal, NewAttestation::new(id).on(days_before(today, days_ago)))
            .map(|created| created.value)
    };

    let hygiene = attest(overdue, 40)?;
    service.create_evidence(
        principal,
        EvidenceDraft::link(overdue, "https://intranet.example/ipc/hand-hygiene-march.pdf")
            .for_attestation(hygiene.id),
    )?;

    attest(due_soon, 28)?;

    let sharps = attest(revoked, 1)?;
    service.revoke_attestation(principal, sharps.id, "Recorded against the wrong ward")?;

    let policy = attest(one_time, 200)?;
    service.create_evidence(
        principal,
        EvidenceDraft::note(one_time, "Policy signed off by the infection control committee")
            .for_attestation(policy.id),
    )?;

    info!(project_id = %project.id, as_of = %today, "scenario seeded");
    Ok(SeededScenario {
        project: project.id,
        overdue,
        due_soon,
        revoked,
        one_time,
    })
}

/// Seed the scenario and report every indicator's derived state.
pub fn run_scenario(runtime: &Runtime) -> AccreditResult<ScenarioReport> {
    let admin = scenario_admin();
    seed(runtime, &admin)?;

    let lines = runtime
        .service()
        .list_indicators(&admin, &IndicatorFilter::default())?
        .into_iter()
        .map(|view| ScenarioLine {
            standard: view.indicator.standard,
            indicator_text: view.indicator.indicator_text,
            frequency: view.indicator.frequency,
            status: view.due.due_status,
            last_compliant_on: view.due.last_compliant_on,
            next_due_on: view.due.next_due_on,
        })
        .collect();

    let audit = runtime.audit_log();
    Ok(ScenarioReport {
        as_of: runtime.service().today(),
        lines,
        audit_entries: audit.len(),
        chain_verified: audit.verify_integrity(),
    })
}
