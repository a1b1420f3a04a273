//! Indicators and their derived due status.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    ids::{IndicatorId, ProjectId},
    payload::{AuditProjection, Payload},
};

/// How often an indicator must be re-attested.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Frequency {
    #[default]
    OneTime,
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Annually,
}

impl Frequency {
    pub const ALL: [Frequency; 6] = [
        Frequency::OneTime,
        Frequency::Daily,
        Frequency::Weekly,
        Frequency::Monthly,
        Frequency::Quarterly,
        Frequency::Annually,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::OneTime => "ONE_TIME",
            Frequency::Daily => "DAILY",
            Frequency::Weekly => "WEEKLY",
            Frequency::Monthly => "MONTHLY",
            Frequency::Quarterly => "QUARTERLY",
            Frequency::Annually => "ANNUALLY",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = String;

    /// Case-insensitive; accepts `one-time`, `one time` and `ONE_TIME` alike.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace(['-', ' '], "_");
        Frequency::ALL
            .into_iter()
            .find(|f| f.as_str() == normalized)
            .ok_or_else(|| format!("unknown frequency '{}'", s.trim()))
    }
}

/// A recurring compliance obligation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indicator {
    pub id: IndicatorId,
    pub section: String,
    pub standard: String,
    pub indicator_text: String,
    pub evidence_required_text: Option<String>,
    pub responsible_person: Option<String>,
    pub frequency: Frequency,
    /// Minimum evidence counts per evidence type, e.g. `{"file": 1}`.
    pub evidence_min_rule: Option<serde_json::Value>,
    pub is_active: bool,
    pub is_mandatory: bool,
    pub project_id: Option<ProjectId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AuditProjection for Indicator {
    fn audit_projection(&self) -> Payload {
        Payload::object([
            ("id", self.id.into()),
            ("section", self.section.as_str().into()),
            ("standard", self.standard.as_str().into()),
            ("indicator_text", self.indicator_text.as_str().into()),
            ("evidence_required_text", self.evidence_required_text.clone().into()),
            ("responsible_person", self.responsible_person.clone().into()),
            ("frequency", self.frequency.as_str().into()),
            (
                "evidence_min_rule",
                self.evidence_min_rule.clone().map(Payload::from).unwrap_or(Payload::Null),
            ),
            ("is_active", self.is_active.into()),
            ("is_mandatory", self.is_mandatory.into()),
            ("project_id", self.project_id.into()),
        ])
    }
}

fn default_true() -> bool {
    true
}

/// Input for creating an indicator, manually or from an import row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorDraft {
    pub section: String,
    pub standard: String,
    pub indicator_text: String,
    #[serde(default)]
    pub evidence_required_text: Option<String>,
    #[serde(default)]
    pub responsible_person: Option<String>,
    #[serde(default)]
    pub frequency: Frequency,
    #[serde(default)]
    pub evidence_min_rule: Option<serde_json::Value>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default = "default_true")]
    pub is_mandatory: bool,
    #[serde(default)]
    pub project_id: Option<ProjectId>,
}

impl IndicatorDraft {
    /// A minimal active, mandatory, one-time draft.
    pub fn new(
        section: impl Into<String>,
        standard: impl Into<String>,
        indicator_text: impl Into<String>,
    ) -> Self {
        Self {
            section: section.into(),
            standard: standard.into(),
            indicator_text: indicator_text.into(),
            is_active: true,
            is_mandatory: true,
            ..Self::default()
        }
    }

    pub fn with_frequency(mut self, frequency: Frequency) -> Self {
        self.frequency = frequency;
        self
    }
}

/// Partial update of an indicator. `None` leaves a field unchanged; for
/// nullable fields `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorPatch {
    pub section: Option<String>,
    pub standard: Option<String>,
    pub indicator_text: Option<String>,
    pub evidence_required_text: Option<Option<String>>,
    pub responsible_person: Option<Option<String>>,
    pub frequency: Option<Frequency>,
    pub evidence_min_rule: Option<Option<serde_json::Value>>,
    pub is_active: Option<bool>,
    pub is_mandatory: Option<bool>,
    pub project_id: Option<Option<ProjectId>>,
}

/// The derived compliance state of an indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DueStatus {
    NotStarted,
    Compliant,
    DueSoon,
    Overdue,
}

impl DueStatus {
    pub const ALL: [DueStatus; 4] = [
        DueStatus::NotStarted,
        DueStatus::Compliant,
        DueStatus::DueSoon,
        DueStatus::Overdue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DueStatus::NotStarted => "NOT_STARTED",
            DueStatus::Compliant => "COMPLIANT",
            DueStatus::DueSoon => "DUE_SOON",
            DueStatus::Overdue => "OVERDUE",
        }
    }
}

impl fmt::Display for DueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DueStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace(['-', ' '], "_");
        DueStatus::ALL
            .into_iter()
            .find(|d| d.as_str() == normalized)
            .ok_or_else(|| format!("unknown due status '{}'", s.trim()))
    }
}

/// Result of the due-status derivation for one indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DueState {
    pub last_compliant_on: Option<NaiveDate>,
    pub next_due_on: Option<NaiveDate>,
    pub due_status: DueStatus,
}

/// An indicator together with its freshly derived due state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorView {
    #[serde(flatten)]
    pub indicator: Indicator,
    #[serde(flatten)]
    pub due: DueState,
}

impl Indicator {
    /// Case-insensitive substring match over the indicator text, standard
    /// and section.
    pub fn matches_text(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        needle.is_empty()
            || [&self.indicator_text, &self.standard, &self.section]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
    }
}

impl From<&Indicator> for IndicatorDraft {
    fn from(indicator: &Indicator) -> Self {
        Self {
            section: indicator.section.clone(),
            standard: indicator.standard.clone(),
            indicator_text: indicator.indicator_text.clone(),
            evidence_required_text: indicator.evidence_required_text.clone(),
            responsible_person: indicator.responsible_person.clone(),
            frequency: indicator.frequency,
            evidence_min_rule: indicator.evidence_min_rule.clone(),
            is_active: indicator.is_active,
            is_mandatory: indicator.is_mandatory,
            project_id: indicator.project_id,
        }
    }
}

/// Conjunctive indicator listing filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorFilter {
    /// Free text over indicator text, standard and section.
    pub text: Option<String>,
    pub frequency: Option<Frequency>,
    /// Exact section match.
    pub section: Option<String>,
    pub is_active: Option<bool>,
    /// Applied after the due state is derived.
    pub due_status: Option<DueStatus>,
    pub project_id: Option<ProjectId>,
}

impl IndicatorFilter {
    /// Every stored-field criterion. `due_status` is not checked here.
    pub fn matches(&self, indicator: &Indicator) -> bool {
        self.text.as_deref().map_or(true, |q| indicator.matches_text(q))
            && self.frequency.map_or(true, |f| indicator.frequency == f)
            && self
                .section
                .as_deref()
                .map_or(true, |s| indicator.section == s)
            && self.is_active.map_or(true, |a| indicator.is_active == a)
            && self
                .project_id
                .map_or(true, |p| indicator.project_id == Some(p))
    }
}
