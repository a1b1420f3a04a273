//! # accredit-audit
//!
//! Append-only, SHA-256 hash-chained audit trail for the compliance tracker.
//!
//! ## Overview
//!
//! Every entry links to the previous one through its hash. Changing any
//! stored field, dropping an entry or reordering entries breaks the chain
//! and is detected by `verify_chain`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use accredit_audit::InMemoryAuditLog;
//! use accredit_core::traits::AuditSink;
//!
//! let log = InMemoryAuditLog::default();
//! log.record(draft)?;
//!
//! assert!(log.verify_integrity());
//! let export = log.export_csv(&AuditFilter::default())?;
//! ```

pub mod chain;
pub mod export;
pub mod memory;
pub mod query;

pub use chain::{hash_entry, verify_chain, GENESIS_HASH};
pub use export::{entries_to_csv, EXPORT_HEADERS};
pub use memory::InMemoryAuditLog;

// ── Tests ─────────────────────────────────────────────────────────────────────
