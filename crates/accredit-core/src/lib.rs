//! # accredit-core
//!
//! The compliance tracker's business logic: due-status derivation, the
//! snapshot builder, CSV import parsing, and `ComplianceService`, which runs
//! every operation through access policy, validation, atomic mutation and
//! audit.
//!
//! Storage, blobs, audit, policy and validation are collaborators behind the
//! traits in [`traits`]; this crate performs no I/O of its own.

pub mod clock;
pub mod due;
pub mod frequency;
pub mod import;
pub mod service;
pub mod snapshot;
pub mod traits;

pub use clock::{Clock, FixedClock, SystemClock};
pub use due::DueStatusEngine;
pub use import::{ImportMode, ImportOutcome, ImportReport};
pub use service::{
    ComplianceService, HealthStatus, RoleChange, SessionEvent, StatusSummary, SummaryPeriod,
};
pub use snapshot::{Snapshot, SnapshotBuilder, SnapshotFilter, StatusCounts};
pub use traits::{AccessPolicy, AuditSink, BlobStore, InputValidator, Repository};
