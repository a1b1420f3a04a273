//! In-memory implementation of `AuditSink`.
//!
//! `InMemoryAuditLog` keeps every entry in a `Vec` behind a `Mutex`. The lock
//! covers sequence assignment, timestamping and hashing, so concurrent
//! writers always produce a single linear chain whose timestamps never go
//! backwards.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info};

use accredit_contracts::{
    audit::{AuditDraft, AuditExport, AuditFilter, AuditLogEntry, AuditPage, PageRequest},
    config::AuditConfig,
    error::{AccreditError, AccreditResult},
    ids::AuditEntryId,
    payload::{sanitize, sanitize_opt, Payload},
};
use accredit_core::{
    clock::{Clock, SystemClock},
    traits::AuditSink,
};

use crate::{
    chain::{hash_entry, verify_chain, GENESIS_HASH},
    export::entries_to_csv,
    query::{newest_first, paginate},
};

// ── Internal mutable state ────────────────────────────────────────────────────

pub(crate) struct InMemoryState {
    /// All entries written so far, in append order.
    pub(crate) entries: Vec<AuditLogEntry>,

    /// The next sequence number to assign.
    pub(crate) sequence: u64,

    /// `this_hash` of the last entry, or `GENESIS_HASH` before the first.
    pub(crate) last_hash: String,
}

// ── Public sink ───────────────────────────────────────────────────────────────

pub struct InMemoryAuditLog {
    config: AuditConfig,
    clock: Arc<dyn Clock>,
    pub(crate) state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryAuditLog {
    pub fn new(config: AuditConfig) -> Self {
        let state = InMemoryState {
            entries: Vec::new(),
            sequence: 0,
            last_hash: GENESIS_HASH.to_string(),
        };
        Self {
            config,
            clock: Arc::new(SystemClock),
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Use `clock` for entry timestamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Every entry in append order.
    pub fn entries(&self) -> AccreditResult<Vec<AuditLogEntry>> {
        Ok(self.lock()?.entries.clone())
    }

    pub fn len(&self) -> usize {
        self.lock().map(|s| s.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `this_hash` of the newest entry, or `GENESIS_HASH` for an empty log.
    pub fn head_hash(&self) -> AccreditResult<String> {
        Ok(self.lock()?.last_hash.clone())
    }

    /// Recheck prev-hash linkage and every entry hash.
    pub fn verify_integrity(&self) -> bool {
        match self.lock() {
            Ok(state) => verify_chain(&state.entries),
            Err(_) => false,
        }
    }

    fn lock(&self) -> AccreditResult<MutexGuard<'_, InMemoryState>> {
        self.state.lock().map_err(|e| AccreditError::AuditWriteFailed {
            reason: format!("audit state lock poisoned: {}", e),
        })
    }
}

impl Default for InMemoryAuditLog {
    fn default() -> Self {
        Self::new(AuditConfig::default())
    }
}

// ── AuditSink impl ────────────────────────────────────────────────────────────

impl AuditSink for InMemoryAuditLog {
    /// Sanitize, stamp, hash and append one entry.
    fn record(&self, draft: AuditDraft) -> AccreditResult<AuditLogEntry> {
        let (ip_address, user_agent) = match &draft.request {
            Some(request) => (request.client_ip(), request.user_agent.clone()),
            None => (None, None),
        };
        let before = sanitize_opt(draft.before.as_ref());
        let after = sanitize_opt(draft.after.as_ref());
        let metadata = match &draft.metadata {
            Some(metadata) => sanitize(metadata),
            None => sanitize(&Payload::Map(Default::default())),
        };

        let mut state = self.lock()?;

        let now = self.clock.now();
        let timestamp = match state.entries.last() {
            Some(last) if last.timestamp > now => last.timestamp,
            _ => now,
        };

        let mut entry = AuditLogEntry {
            id: AuditEntryId::new(),
            sequence: state.sequence,
            timestamp,
            actor_id: draft.actor.as_ref().map(|a| a.id.clone()),
            actor_name: draft.actor.as_ref().map(|a| a.display_name.clone()),
            action: draft.action,
            entity_type: draft.entity_type,
            entity_id: draft.entity_id,
            summary: draft.summary,
            before,
            after,
            metadata,
            ip_address,
            user_agent,
            prev_hash: state.last_hash.clone(),
            this_hash: String::new(),
        };
        entry.this_hash = hash_entry(&entry)?;

        state.sequence += 1;
        state.last_hash = entry.this_hash.clone();
        state.entries.push(entry.clone());

        debug!(
            sequence = entry.sequence,
            action = %entry.action,
            entity_type = %entry.entity_type,
            entity_id = %entry.entity_id,
            "audit entry appended"
        );
        Ok(entry)
    }

    fn query(&self, filter: &AuditFilter, page: PageRequest) -> AccreditResult<AuditPage> {
        let state = self.lock()?;
        Ok(paginate(&state.entries, filter, page, &self.config))
    }

    fn export_csv(&self, filter: &AuditFilter) -> AccreditResult<AuditExport> {
        let state = self.lock()?;
        let entries: Vec<&AuditLogEntry> = newest_first(&state.entries, filter).collect();
        let csv = entries_to_csv(entries.iter().copied())?;
        info!(
            rows = entries.len(),
            bytes = csv.len(),
            head_hash = %state.last_hash,
            "audit log exported"
        );
        Ok(AuditExport {
            rows: entries.len(),
            csv,
        })
    }
}
