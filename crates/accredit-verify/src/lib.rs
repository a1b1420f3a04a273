//! # accredit-verify
//!
//! Input validation for the compliance tracker. [`RuleValidator`] checks
//! indicator drafts (required text, the evidence-minimum rule against a JSON
//! Schema) and evidence drafts (primary content per type, upload size and
//! extension) before anything is persisted.

pub mod engine;

pub use engine::{evidence_min_rule_schema, IndicatorCheckFn, RuleValidator};
