//! Error types shared by every accredit crate.
//!
//! All fallible operations return `AccreditResult<T>`. The variants are kept
//! distinct so the caller can map each class (validation, denial, not-found,
//! parse) to its own response without inspecting message text.

use thiserror::Error;

/// The unified error type for the compliance tracker.
#[derive(Debug, Error)]
pub enum AccreditError {
    /// Input failed a validation rule (missing field, bad enum value,
    /// oversized or wrong-extension file, illegal state transition).
    #[error("validation failed: {reason}")]
    Validation { reason: String },

    /// The principal lacks the capability required for the operation.
    ///
    /// Raised before any mutation or audit write is attempted.
    #[error("permission denied for '{action}' on '{resource}': {reason}")]
    PermissionDenied {
        action: String,
        resource: String,
        reason: String,
    },

    /// A referenced entity id does not resolve.
    #[error("{entity} '{id}' not found")]
    NotFound { entity: String, id: String },

    /// Structurally malformed input, such as an unreadable CSV document.
    #[error("parse error: {reason}")]
    Parse { reason: String },

    /// The audit sink could not append an entry.
    #[error("audit write failed: {reason}")]
    AuditWriteFailed { reason: String },

    /// The persistence or blob collaborator failed.
    #[error("storage error: {reason}")]
    Storage { reason: String },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    Config { reason: String },
}

impl AccreditError {
    /// Shorthand for a `Validation` error.
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    /// Shorthand for a `NotFound` error.
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Shorthand for a `Storage` error.
    pub fn storage(reason: impl Into<String>) -> Self {
        Self::Storage {
            reason: reason.into(),
        }
    }
}

/// Convenience alias used throughout the accredit crates.
pub type AccreditResult<T> = Result<T, AccreditError>;
