//! Blob stores for evidence files.
//!
//! Both implementations enforce the upload constraints themselves and store
//! nothing for a rejected upload. Handles have the form
//! `evidence/<uuid>.<ext>` with a lowercase extension.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, info};
use uuid::Uuid;

use accredit_contracts::{
    config::UploadConstraints,
    error::{AccreditError, AccreditResult},
    evidence::{BlobHandle, FileUpload},
};
use accredit_core::traits::BlobStore;

const HANDLE_PREFIX: &str = "evidence";

/// Check `upload` against `constraints` and mint its handle.
fn admit(upload: &FileUpload, constraints: &UploadConstraints) -> AccreditResult<BlobHandle> {
    let size = upload.bytes.len() as u64;
    if size > constraints.max_bytes {
        return Err(AccreditError::validation(format!(
            "file '{}' is {} bytes, above the {} byte limit",
            upload.filename, size, constraints.max_bytes
        )));
    }
    let ext = UploadConstraints::extension_of(&upload.filename).ok_or_else(|| {
        AccreditError::validation(format!("file '{}' has no extension", upload.filename))
    })?;
    if !constraints.permits_extension(&ext) {
        return Err(AccreditError::validation(format!(
            "extension '.{}' is not allowed",
            ext
        )));
    }
    Ok(BlobHandle(format!("{}/{}.{}", HANDLE_PREFIX, Uuid::new_v4(), ext)))
}

// ── In-memory ────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<BlobHandle, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> AccreditResult<std::sync::MutexGuard<'_, HashMap<BlobHandle, Vec<u8>>>> {
        self.blobs
            .lock()
            .map_err(|e| AccreditError::storage(format!("blob store lock poisoned: {}", e)))
    }
}

impl BlobStore for MemoryBlobStore {
    fn put(
        &self,
        upload: &FileUpload,
        constraints: &UploadConstraints,
    ) -> AccreditResult<BlobHandle> {
        let handle = admit(upload, constraints)?;
        self.lock()?.insert(handle.clone(), upload.bytes.clone());
        debug!(handle = %handle, size = upload.bytes.len(), "blob stored");
        Ok(handle)
    }

    fn get(&self, handle: &BlobHandle) -> AccreditResult<Option<Vec<u8>>> {
        Ok(self.lock()?.get(handle).cloned())
    }

    fn delete(&self, handle: &BlobHandle) -> AccreditResult<bool> {
        Ok(self.lock()?.remove(handle).is_some())
    }
}

// ── Filesystem ───────────────────────────────────────────────────────────────

/// Stores each blob as a file under `root`, at the path named by its handle.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Use `root` as the storage directory, creating it if needed.
    pub fn open(root: impl Into<PathBuf>) -> AccreditResult<Self> {
        let root = root.into();
        fs::create_dir_all(root.join(HANDLE_PREFIX)).map_err(|e| {
            AccreditError::storage(format!(
                "cannot create blob directory '{}': {}",
                root.display(),
                e
            ))
        })?;
        info!(root = %root.display(), "filesystem blob store opened");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a handle to its file, refusing anything that could escape `root`.
    pub fn path_of(&self, handle: &BlobHandle) -> AccreditResult<PathBuf> {
        let relative = Path::new(&handle.0);
        let confined = relative.starts_with(HANDLE_PREFIX)
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !confined {
            return Err(AccreditError::validation(format!(
                "invalid blob handle '{}'",
                handle
            )));
        }
        Ok(self.root.join(relative))
    }
}

impl BlobStore for FsBlobStore {
    fn put(
        &self,
        upload: &FileUpload,
        constraints: &UploadConstraints,
    ) -> AccreditResult<BlobHandle> {
        let handle = admit(upload, constraints)?;
        let path = self.path_of(&handle)?;
        fs::write(&path, &upload.bytes).map_err(|e| {
            AccreditError::storage(format!("cannot write '{}': {}", path.display(), e))
        })?;
        debug!(handle = %handle, size = upload.bytes.len(), "blob written");
        Ok(handle)
    }

    fn get(&self, handle: &BlobHandle) -> AccreditResult<Option<Vec<u8>>> {
        let path = self.path_of(handle)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AccreditError::storage(format!(
                "cannot read '{}': {}",
                path.display(),
                e
            ))),
        }
    }

    fn delete(&self, handle: &BlobHandle) -> AccreditResult<bool> {
        let path = self.path_of(handle)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(AccreditError::storage(format!(
                "cannot delete '{}': {}",
                path.display(),
                e
            ))),
        }
    }
}
