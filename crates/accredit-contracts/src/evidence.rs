//! Evidence items and file uploads.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    ids::{AttestationId, EvidenceId, IndicatorId},
    payload::{AuditProjection, Payload},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EvidenceType {
    Note,
    File,
    Photo,
    Screenshot,
    Link,
}

impl EvidenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvidenceType::Note => "NOTE",
            EvidenceType::File => "FILE",
            EvidenceType::Photo => "PHOTO",
            EvidenceType::Screenshot => "SCREENSHOT",
            EvidenceType::Link => "LINK",
        }
    }

    /// Types whose primary content is an uploaded file.
    pub fn is_file_backed(&self) -> bool {
        matches!(
            self,
            EvidenceType::File | EvidenceType::Photo | EvidenceType::Screenshot
        )
    }
}

impl fmt::Display for EvidenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque handle returned by the blob store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobHandle(pub String);

impl fmt::Display for BlobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A file persisted in the blob store on behalf of an evidence item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    pub handle: BlobHandle,
    pub original_name: String,
    pub size: u64,
}

/// A proof artifact attached to an indicator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub id: EvidenceId,
    pub indicator_id: IndicatorId,
    /// Optional link to the attestation this evidence supports.
    pub attestation_id: Option<AttestationId>,
    pub evidence_type: EvidenceType,
    pub note_text: Option<String>,
    pub url: Option<String>,
    pub file: Option<StoredFile>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuditProjection for EvidenceItem {
    fn audit_projection(&self) -> Payload {
        Payload::object([
            ("id", self.id.into()),
            ("indicator_id", self.indicator_id.into()),
            ("attestation_id", self.attestation_id.into()),
            ("type", self.evidence_type.as_str().into()),
            ("note_text", self.note_text.clone().into()),
            ("url", self.url.clone().into()),
            (
                "file",
                self.file
                    .as_ref()
                    .map(|f| {
                        Payload::object([
                            ("handle", f.handle.0.as_str().into()),
                            ("name", f.original_name.as_str().into()),
                            ("size", f.size.into()),
                        ])
                    })
                    .unwrap_or(Payload::Null),
            ),
        ])
    }
}

/// Raw bytes of an upload, together with the client-supplied file name.
#[derive(Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }
}

impl fmt::Debug for FileUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileUpload")
            .field("filename", &self.filename)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Input for creating an evidence item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvidenceDraft {
    pub indicator_id: IndicatorId,
    pub attestation_id: Option<AttestationId>,
    pub evidence_type: EvidenceType,
    pub note_text: Option<String>,
    pub url: Option<String>,
    pub upload: Option<FileUpload>,
}

impl EvidenceDraft {
    pub fn note(indicator_id: IndicatorId, text: impl Into<String>) -> Self {
        Self {
            indicator_id,
            attestation_id: None,
            evidence_type: EvidenceType::Note,
            note_text: Some(text.into()),
            url: None,
            upload: None,
        }
    }

    pub fn link(indicator_id: IndicatorId, url: impl Into<String>) -> Self {
        Self {
            indicator_id,
            attestation_id: None,
            evidence_type: EvidenceType::Link,
            note_text: None,
            url: Some(url.into()),
            upload: None,
        }
    }

    pub fn file(indicator_id: IndicatorId, upload: FileUpload) -> Self {
        Self {
            indicator_id,
            attestation_id: None,
            evidence_type: EvidenceType::File,
            note_text: None,
            url: None,
            upload: Some(upload),
        }
    }

    pub fn for_attestation(mut self, attestation_id: AttestationId) -> Self {
        self.attestation_id = Some(attestation_id);
        self
    }
}

/// Bytes returned by an evidence download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvidenceDownload {
    pub filename: String,
    pub bytes: Vec<u8>,
}
