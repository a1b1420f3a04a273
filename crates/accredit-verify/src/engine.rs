//! Rule-based input validator.
//!
//! `RuleValidator` implements the `InputValidator` trait from
//! `accredit-core`. Every check runs and every failure is collected, so a
//! rejected import row or form lists all of its problems at once.
//!
//! Indicator drafts:
//! - `section`, `standard` and `indicator_text` must be non-blank;
//! - `evidence_min_rule`, when present, must satisfy [`evidence_min_rule_schema`].
//!
//! Evidence drafts:
//! - `NOTE` needs non-blank `note_text`, `LINK` an `http(s)` URL;
//! - `FILE`, `PHOTO` and `SCREENSHOT` need a non-empty upload within the
//!   configured size and extension limits;
//! - other types must not carry an upload.
//!
//! Extra indicator checks can be registered by the hosting application.

use std::collections::BTreeMap;

use serde_json::{json, Value};
use tracing::{debug, warn};

use accredit_contracts::{
    config::UploadConstraints,
    error::AccreditResult,
    evidence::{EvidenceDraft, EvidenceType},
    indicator::IndicatorDraft,
    validation::ValidationReport,
};
use accredit_core::traits::InputValidator;

/// A caller-supplied indicator check. Returns `Some(message)` on failure.
pub type IndicatorCheckFn = Box<dyn Fn(&IndicatorDraft) -> Option<String> + Send + Sync>;

/// JSON Schema for `evidence_min_rule`: an object of non-negative integer
/// counts keyed by lowercase evidence type.
pub fn evidence_min_rule_schema() -> Value {
    let count = json!({ "type": "integer", "minimum": 0 });
    json!({
        "type": "object",
        "properties": {
            "note": count.clone(),
            "file": count.clone(),
            "photo": count.clone(),
            "screenshot": count.clone(),
            "link": count
        },
        "additionalProperties": false
    })
}

pub struct RuleValidator {
    min_rule_schema: Value,
    /// Named extra checks, run in name order after the built-in ones.
    indicator_checks: BTreeMap<String, IndicatorCheckFn>,
}

impl RuleValidator {
    pub fn new() -> Self {
        Self {
            min_rule_schema: evidence_min_rule_schema(),
            indicator_checks: BTreeMap::new(),
        }
    }

    /// Register an extra indicator check under `name`. Registering the same
    /// name twice replaces the previous check.
    pub fn register_indicator_check(&mut self, name: impl Into<String>, f: IndicatorCheckFn) {
        self.indicator_checks.insert(name.into(), f);
    }

    fn check_min_rule(&self, rule: &Value, report: &mut ValidationReport) {
        match jsonschema::validator_for(&self.min_rule_schema) {
            Ok(validator) => {
                for error in validator.iter_errors(rule) {
                    let location = error.instance_path.to_string();
                    let field = if location.is_empty() {
                        "evidence_min_rule".to_string()
                    } else {
                        format!("evidence_min_rule{}", location.replace('/', "."))
                    };
                    debug!(%field, %error, "evidence_min_rule violation");
                    report.fail(field, error.to_string());
                }
            }
            Err(e) => {
                warn!(error = %e, "evidence_min_rule schema failed to compile");
                report.fail("evidence_min_rule", format!("invalid schema document: {e}"));
            }
        }
    }
}

impl Default for RuleValidator {
    fn default() -> Self {
        Self::new()
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

/// `http://` or `https://` followed by a non-empty host.
fn is_web_url(url: &str) -> bool {
    let url = url.trim();
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    match rest {
        Some(rest) => {
            let host = rest.split(['/', '?', '#']).next().unwrap_or("");
            !host.is_empty() && !host.contains(char::is_whitespace)
        }
        None => false,
    }
}

impl InputValidator for RuleValidator {
    fn validate_indicator(&self, draft: &IndicatorDraft) -> AccreditResult<ValidationReport> {
        let mut report = ValidationReport::default();

        for (field, value) in [
            ("section", &draft.section),
            ("standard", &draft.standard),
            ("indicator_text", &draft.indicator_text),
        ] {
            if value.trim().is_empty() {
                report.fail(field, "is required");
            }
        }

        if let Some(rule) = &draft.evidence_min_rule {
            self.check_min_rule(rule, &mut report);
        }

        for (name, check) in &self.indicator_checks {
            if let Some(message) = check(draft) {
                report.fail(name.as_str(), message);
            }
        }

        if !report.passed() {
            debug!(standard = %draft.standard, failures = report.failures.len(), "indicator draft rejected");
        }
        Ok(report)
    }

    fn validate_evidence(
        &self,
        draft: &EvidenceDraft,
        constraints: &UploadConstraints,
    ) -> AccreditResult<ValidationReport> {
        let mut report = ValidationReport::default();

        match draft.evidence_type {
            EvidenceType::Note => {
                if is_blank(draft.note_text.as_deref()) {
                    report.fail("note_text", "is required for NOTE evidence");
                }
            }
            EvidenceType::Link => match draft.url.as_deref() {
                Some(url) if is_web_url(url) => {}
                Some(_) => report.fail("url", "must be an http or https URL"),
                None => report.fail("url", "is required for LINK evidence"),
            },
            EvidenceType::File | EvidenceType::Photo | EvidenceType::Screenshot => {}
        }

        match (&draft.upload, draft.evidence_type.is_file_backed()) {
            (None, true) => report.fail(
                "file",
                format!("is required for {} evidence", draft.evidence_type),
            ),
            (Some(_), false) => report.fail(
                "file",
                format!("is not accepted for {} evidence", draft.evidence_type),
            ),
            (Some(upload), true) => {
                let size = upload.bytes.len() as u64;
                if size == 0 {
                    report.fail("file", "is empty");
                } else if size > constraints.max_bytes {
                    report.fail(
                        "file",
                        format!(
                            "is {} bytes, above the {} byte limit",
                            size, constraints.max_bytes
                        ),
                    );
                }
                match UploadConstraints::extension_of(&upload.filename) {
                    Some(ext) if constraints.permits_extension(&ext) => {}
                    Some(ext) => report.fail(
                        "file",
                        format!(
                            "extension '.{}' is not allowed (allowed: {})",
                            ext,
                            constraints.allowed_extensions.join(", ")
                        ),
                    ),
                    None => report.fail("file", "has no extension"),
                }
            }
            (None, false) => {}
        }

        Ok(report)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
