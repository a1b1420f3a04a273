//! Runtime configuration.
//!
//! Every field has a default, so an empty TOML document is a valid
//! configuration. Loading from disk lives in `accredit-runtime`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub due_soon: DueSoonConfig,
    pub uploads: UploadConstraints,
    pub audit: AuditConfig,
    pub snapshot: SnapshotConfig,
    pub storage: StorageConfig,
    pub policy: PolicyConfig,
}

/// Due-soon window: `clamp(round(interval_days * ratio), min_days, max_days)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DueSoonConfig {
    pub ratio: f64,
    pub min_days: i64,
    pub max_days: i64,
}

impl Default for DueSoonConfig {
    fn default() -> Self {
        Self {
            ratio: 0.2,
            min_days: 1,
            max_days: 3,
        }
    }
}

/// Limits applied to every evidence upload before it reaches the blob store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConstraints {
    pub max_bytes: u64,
    /// Lowercase extensions without the leading dot.
    pub allowed_extensions: Vec<String>,
}

impl Default for UploadConstraints {
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024 * 1024,
            allowed_extensions: ["pdf", "doc", "docx", "jpg", "jpeg", "png", "xlsx", "xls"]
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

impl UploadConstraints {
    /// Lowercase extension of `filename`, if it has one.
    pub fn extension_of(filename: &str) -> Option<String> {
        let (stem, ext) = filename.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_lowercase())
    }

    pub fn permits_extension(&self, ext: &str) -> bool {
        let ext = ext.to_lowercase();
        self.allowed_extensions.iter().any(|allowed| *allowed == ext)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub default_page_size: usize,
    pub max_page_size: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            default_page_size: 50,
            max_page_size: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Cap on the global recent-attestation and recent-evidence lists.
    pub recent_limit: usize,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self { recent_limit: 50 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for evidence files. In-memory blobs when absent.
    pub blob_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Access policy TOML file. The embedded default policy when absent.
    pub path: Option<PathBuf>,
}
