//! Input validation reports.

use serde::{Deserialize, Serialize};

use crate::error::{AccreditError, AccreditResult};

/// The outcome of validating one input unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Empty when the input passed.
    pub failures: Vec<ValidationFailure>,
}

/// A single rule failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFailure {
    /// The field the rule applies to, e.g. `"evidence_min_rule"`.
    pub field: String,
    pub message: String,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn fail(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.failures.push(ValidationFailure {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Every failure message, in the order found.
    pub fn messages(&self) -> Vec<String> {
        self.failures
            .iter()
            .map(|f| format!("{}: {}", f.field, f.message))
            .collect()
    }

    /// `Ok(())` on pass, otherwise a single `Validation` error listing every
    /// failure.
    pub fn into_result(self) -> AccreditResult<()> {
        if self.passed() {
            Ok(())
        } else {
            Err(AccreditError::validation(self.messages().join("; ")))
        }
    }
}
