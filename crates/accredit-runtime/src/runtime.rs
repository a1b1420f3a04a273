//! Default component wiring.
//!
//! `Runtime` owns one instance of every collaborator and a
//! `ComplianceService` built over them. Handles to the concrete store and
//! audit log are kept so callers can inspect state the service does not
//! expose, such as chain integrity.

use std::sync::Arc;

use tracing::info;

use accredit_audit::InMemoryAuditLog;
use accredit_contracts::{config::AppConfig, error::AccreditResult};
use accredit_core::{
    clock::{Clock, SystemClock},
    traits::{AccessPolicy, BlobStore},
    ComplianceService,
};
use accredit_policy::TomlAccessPolicy;
use accredit_store::{FsBlobStore, MemoryBlobStore, MemoryStore};
use accredit_verify::RuleValidator;

pub struct Runtime {
    service: ComplianceService,
    store: Arc<MemoryStore>,
    blobs: Arc<dyn BlobStore>,
    audit: Arc<InMemoryAuditLog>,
    clock: Arc<dyn Clock>,
}

impl Runtime {
    /// Wire the default components for `config` on the system clock.
    pub fn new(config: AppConfig) -> AccreditResult<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Wire the default components with every timestamp taken from `clock`.
    pub fn with_clock(config: AppConfig, clock: Arc<dyn Clock>) -> AccreditResult<Self> {
        let policy: Arc<dyn AccessPolicy> = match &config.policy.path {
            Some(path) => Arc::new(TomlAccessPolicy::from_file(path)?),
            None => Arc::new(TomlAccessPolicy::embedded()?),
        };

        let blobs: Arc<dyn BlobStore> = match &config.storage.blob_dir {
            Some(dir) => Arc::new(FsBlobStore::open(dir)?),
            None => Arc::new(MemoryBlobStore::new()),
        };

        let store = Arc::new(MemoryStore::new());
        let audit = Arc::new(
            InMemoryAuditLog::new(config.audit.clone()).with_clock(Arc::clone(&clock)),
        );

        let policy_source = config
            .policy
            .path
            .as_ref()
            .map_or_else(|| "embedded".to_string(), |p| p.display().to_string());
        info!(
            policy = %policy_source,
            blobs = if config.storage.blob_dir.is_some() { "filesystem" } else { "memory" },
            "runtime wired"
        );

        let service = ComplianceService::new(
            store.clone(),
            Arc::clone(&blobs),
            audit.clone(),
            policy,
            Arc::new(RuleValidator::new()),
            config,
        )
        .with_clock(Arc::clone(&clock));

        Ok(Self {
            service,
            store,
            blobs,
            audit,
            clock,
        })
    }

    /// An all-default, all-in-memory runtime.
    pub fn in_memory() -> AccreditResult<Self> {
        Self::new(AppConfig::default())
    }

    pub fn service(&self) -> &ComplianceService {
        &self.service
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    pub fn blobs(&self) -> &dyn BlobStore {
        self.blobs.as_ref()
    }

    pub fn audit_log(&self) -> &InMemoryAuditLog {
        &self.audit
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }
}
