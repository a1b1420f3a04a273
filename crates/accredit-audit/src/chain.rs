//! Hash-chain primitives: hashing and chain integrity verification.
//!
//! Hash input layout (bytes, in order):
//!   1. sequence as 8-byte little-endian
//!   2. prev_hash as UTF-8 bytes (64 ASCII hex chars)
//!   3. canonical JSON of the entry body (every field except `this_hash`)

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use accredit_contracts::{
    audit::{AuditAction, AuditLogEntry},
    error::{AccreditError, AccreditResult},
    ids::AuditEntryId,
    payload::SanitizedPayload,
};

/// The `prev_hash` of the first entry in every chain: 64 hex zeros.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// The hashed view of an entry. Field order is fixed by declaration order.
#[derive(Serialize)]
struct EntryBody<'a> {
    id: &'a AuditEntryId,
    timestamp: &'a DateTime<Utc>,
    actor_id: &'a Option<String>,
    actor_name: &'a Option<String>,
    action: &'a AuditAction,
    entity_type: &'a str,
    entity_id: &'a str,
    summary: &'a str,
    before: &'a Option<SanitizedPayload>,
    after: &'a Option<SanitizedPayload>,
    metadata: &'a SanitizedPayload,
    ip_address: &'a Option<String>,
    user_agent: &'a Option<String>,
}

/// Compute the SHA-256 hash of `entry` as linked to `entry.prev_hash`.
///
/// `entry.this_hash` is ignored, so this can be called on an entry before
/// its hash is filled in. Returns a lowercase 64-character hex string.
pub fn hash_entry(entry: &AuditLogEntry) -> AccreditResult<String> {
    let body = EntryBody {
        id: &entry.id,
        timestamp: &entry.timestamp,
        actor_id: &entry.actor_id,
        actor_name: &entry.actor_name,
        action: &entry.action,
        entity_type: &entry.entity_type,
        entity_id: &entry.entity_id,
        summary: &entry.summary,
        before: &entry.before,
        after: &entry.after,
        metadata: &entry.metadata,
        ip_address: &entry.ip_address,
        user_agent: &entry.user_agent,
    };
    let body_json = serde_json::to_vec(&body).map_err(|e| AccreditError::AuditWriteFailed {
        reason: format!("audit entry is not serializable: {}", e),
    })?;

    let mut hasher = Sha256::new();
    hasher.update(entry.sequence.to_le_bytes());
    hasher.update(entry.prev_hash.as_bytes());
    hasher.update(&body_json);

    Ok(hex::encode(hasher.finalize()))
}

/// Verify the integrity of a chain given in append order.
///
/// Valid when every entry's `sequence` equals its position, its `prev_hash`
/// equals the preceding `this_hash` (or `GENESIS_HASH` for the first), and
/// its `this_hash` matches the recomputed value. An empty chain is valid.
pub fn verify_chain(entries: &[AuditLogEntry]) -> bool {
    let mut expected_prev = GENESIS_HASH.to_string();

    for (position, entry) in entries.iter().enumerate() {
        if entry.sequence != position as u64 || entry.prev_hash != expected_prev {
            return false;
        }
        match hash_entry(entry) {
            Ok(recomputed) if recomputed == entry.this_hash => {}
            _ => return false,
        }
        expected_prev = entry.this_hash.clone();
    }

    true
}
