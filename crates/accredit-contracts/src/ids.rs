//! Strongly typed entity identifiers.
//!
//! Every persisted entity is keyed by a v4 UUID wrapped in its own newtype so
//! an attestation id can never be passed where an indicator id is expected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new, unique identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim()).map(Self)
            }
        }

        impl From<$name> for crate::payload::Payload {
            fn from(id: $name) -> Self {
                crate::payload::Payload::Uuid(id.0)
            }
        }
    };
}

entity_id!(
    /// Identifier of an `Indicator`.
    IndicatorId
);
entity_id!(
    /// Identifier of an `AttestationRecord`.
    AttestationId
);
entity_id!(
    /// Identifier of an `EvidenceItem`.
    EvidenceId
);
entity_id!(
    /// Identifier of a `Project`.
    ProjectId
);
entity_id!(
    /// Identifier of an `AuditLogEntry`.
    AuditEntryId
);
