//! CSV import of indicators.
//!
//! Two contracts exist and are kept apart:
//!
//! - `ImportMode::Simple`: `Section`, `Standard`, `Indicator` required,
//!   `Evidence Required` and `Responsible Person` optional.
//! - `ImportMode::Project`: `indicator_code`, `section`, `text`,
//!   `frequency`, `mandatory` required; rows land in the given project.
//!
//! Parsing never aborts on a bad row. Each row either becomes an
//! `IndicatorDraft` or a `RowFailure` listing every reason, keyed by its
//! 1-based position among the data rows. Only a structurally unreadable
//! document is an error.

use serde::{Deserialize, Serialize};

use accredit_contracts::{
    error::{AccreditError, AccreditResult},
    ids::{IndicatorId, ProjectId},
    indicator::{Frequency, IndicatorDraft},
    payload::Payload,
};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportMode {
    Simple,
    Project(ProjectId),
}

impl ImportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportMode::Simple => "simple",
            ImportMode::Project(_) => "project",
        }
    }

    pub fn project_id(&self) -> Option<ProjectId> {
        match self {
            ImportMode::Simple => None,
            ImportMode::Project(id) => Some(*id),
        }
    }

    /// Required header names, as documented to users.
    pub fn required_columns(&self) -> &'static [&'static str] {
        match self {
            ImportMode::Simple => &["Section", "Standard", "Indicator"],
            ImportMode::Project(_) => &["indicator_code", "section", "text", "frequency", "mandatory"],
        }
    }
}

/// A row that could not become an indicator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowFailure {
    /// 1-based index among data rows (the header is not counted).
    pub row: usize,
    pub reasons: Vec<String>,
}

impl RowFailure {
    pub fn message(&self) -> String {
        format!("Row {}: {}", self.row, self.reasons.join("; "))
    }
}

/// A row that parsed into a draft.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRow {
    pub row: usize,
    pub draft: IndicatorDraft,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedImport {
    pub rows: Vec<ParsedRow>,
    pub failures: Vec<RowFailure>,
}

impl ParsedImport {
    pub fn total(&self) -> usize {
        self.rows.len() + self.failures.len()
    }
}

/// Overall classification of a finished import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportOutcome {
    /// Every row was created (including the zero-row case).
    Complete,
    /// Some rows created, some rejected.
    Partial,
    /// Rows were rejected and none created.
    Failed,
}

impl ImportOutcome {
    pub fn classify(created: usize, failed: usize) -> Self {
        match (created, failed) {
            (_, 0) => ImportOutcome::Complete,
            (0, _) => ImportOutcome::Failed,
            _ => ImportOutcome::Partial,
        }
    }
}

/// Structured result of an import, returned to the caller and summarised in
/// the single `IMPORT` audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportReport {
    /// Synthetic entity id of the batch, `import-<uuid>`.
    pub batch_id: String,
    pub mode: ImportMode,
    pub total: usize,
    pub created: Vec<IndicatorId>,
    pub failed_rows: Vec<RowFailure>,
    pub outcome: ImportOutcome,
}

impl ImportReport {
    pub fn created_count(&self) -> usize {
        self.created.len()
    }

    pub fn skipped(&self) -> usize {
        self.failed_rows.len()
    }

    /// Audit metadata for the batch.
    pub fn audit_metadata(&self) -> Payload {
        let mut entries = vec![
            ("mode", Payload::from(self.mode.as_str())),
            ("total", Payload::from(self.total)),
            ("created", Payload::from(self.created_count())),
            ("skipped", Payload::from(self.skipped())),
            (
                "errors",
                Payload::from(self.failed_rows.iter().map(RowFailure::message).collect::<Vec<_>>()),
            ),
        ];
        if let Some(project) = self.mode.project_id() {
            entries.push(("project_id", Payload::from(project)));
        }
        Payload::object(entries)
    }
}

/// Parse `bytes` as an indicator CSV under `mode`.
///
/// Header names are matched after trimming and case-insensitively. Missing
/// cells and blank cells are treated alike.
pub fn parse_indicator_csv(bytes: &[u8], mode: ImportMode) -> AccreditResult<ParsedImport> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| AccreditError::Parse {
            reason: format!("unreadable CSV header: {}", e),
        })?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();

    let column = |name: &str| headers.iter().position(|h| h == &name.to_lowercase());

    let mut parsed = ParsedImport::default();
    for (index, record) in reader.records().enumerate() {
        let row = index + 1;
        let record = record.map_err(|e| AccreditError::Parse {
            reason: format!("unreadable CSV at data row {}: {}", row, e),
        })?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        let cell = |name: &str| -> Option<String> {
            column(name)
                .and_then(|idx| record.get(idx))
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let result = match mode {
            ImportMode::Simple => simple_row(&cell),
            ImportMode::Project(project) => project_row(&cell, project),
        };
        match result {
            Ok(draft) => parsed.rows.push(ParsedRow { row, draft }),
            Err(reasons) => parsed.failures.push(RowFailure { row, reasons }),
        }
    }

    Ok(parsed)
}

fn missing(reasons: &mut Vec<String>, value: &Option<String>, column: &str) {
    if value.is_none() {
        reasons.push(format!("missing required field '{}'", column));
    }
}

fn simple_row(cell: &dyn Fn(&str) -> Option<String>) -> Result<IndicatorDraft, Vec<String>> {
    let section = cell("Section");
    let standard = cell("Standard");
    let text = cell("Indicator");

    let mut reasons = Vec::new();
    missing(&mut reasons, &section, "Section");
    missing(&mut reasons, &standard, "Standard");
    missing(&mut reasons, &text, "Indicator");

    match (section, standard, text) {
        (Some(section), Some(standard), Some(text)) if reasons.is_empty() => {
            let mut draft = IndicatorDraft::new(section, standard, text);
            draft.evidence_required_text = cell("Evidence Required");
            draft.responsible_person = cell("Responsible Person");
            Ok(draft)
        }
        _ => Err(reasons),
    }
}

fn project_row(
    cell: &dyn Fn(&str) -> Option<String>,
    project: ProjectId,
) -> Result<IndicatorDraft, Vec<String>> {
    let code = cell("indicator_code");
    let section = cell("section");
    let text = cell("text");
    let frequency_raw = cell("frequency");
    let mandatory_raw = cell("mandatory");

    let mut reasons = Vec::new();
    missing(&mut reasons, &code, "indicator_code");
    missing(&mut reasons, &section, "section");
    missing(&mut reasons, &text, "text");
    missing(&mut reasons, &frequency_raw, "frequency");
    missing(&mut reasons, &mandatory_raw, "mandatory");

    let frequency = match frequency_raw.as_deref().map(str::parse::<Frequency>) {
        Some(Ok(f)) => Some(f),
        Some(Err(e)) => {
            reasons.push(e);
            None
        }
        None => None,
    };
    let mandatory = match mandatory_raw.as_deref().map(parse_flag) {
        Some(Some(flag)) => Some(flag),
        Some(None) => {
            reasons.push(format!(
                "invalid mandatory value '{}' (expected yes/no)",
                mandatory_raw.as_deref().unwrap_or_default()
            ));
            None
        }
        None => None,
    };

    match (code, section, text, frequency, mandatory) {
        (Some(code), Some(section), Some(text), Some(frequency), Some(mandatory))
            if reasons.is_empty() =>
        {
            let mut draft = IndicatorDraft::new(section, code, text).with_frequency(frequency);
            draft.is_mandatory = mandatory;
            draft.project_id = Some(project);
            Ok(draft)
        }
        _ => Err(reasons),
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "yes" | "y" | "true" | "1" => Some(true),
        "no" | "n" | "false" | "0" => Some(false),
        _ => None,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
