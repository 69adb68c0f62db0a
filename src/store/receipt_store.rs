//! Single-directory content store for receipt documents.
//!
//! One file per receipt, keyed by its base filename. The store never
//! overwrites: a second document with the same name is rejected so the
//! filename stays a stable key into the database.

use std::path::{Path, PathBuf};

use super::StoreError;

/// Sentinel file that makes store creation observable and idempotent.
const STORE_MARKER: &str = ".ledgera";

/// A document that has been moved into the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    /// Base filename — unique within the store, the key the database uses.
    pub filename: String,
    /// Absolute path of the stored file.
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Directory-backed receipt store.
#[derive(Debug, Clone)]
pub struct ReceiptStore {
    root: PathBuf,
}

impl ReceiptStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The store's root path. Pure — no I/O.
    pub fn location(&self) -> &Path {
        &self.root
    }

    /// Idempotently create the store directory and its marker file.
    pub fn ensure(&self) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.root).map_err(|e| StoreError::CreateFailed {
            path: self.root.clone(),
            source: e,
        })?;

        let marker = self.root.join(STORE_MARKER);
        if !marker.exists() {
            std::fs::write(&marker, b"").map_err(|e| StoreError::CreateFailed {
                path: self.root.clone(),
                source: e,
            })?;
        }
        Ok(())
    }

    /// Move a source file into the store, returning the stored document.
    ///
    /// The destination name is the source's base filename. The store never
    /// overwrites — an existing destination is a conflict and the source is
    /// left untouched.
    ///
    /// Same-volume moves are a single atomic rename. Cross-volume moves fall
    /// back to copy-to-temp, fsync, rename-into-place, then source deletion —
    /// only that final deletion sits outside the atomic part, so a crash
    /// there leaves the same content at both paths.
    pub fn move_in(&self, source: &Path) -> Result<StoredDocument, StoreError> {
        if !source.exists() {
            return Err(StoreError::SourceNotFound(source.to_path_buf()));
        }
        if !source.is_file() {
            return Err(StoreError::NotAFile(source.to_path_buf()));
        }

        let filename = source
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| StoreError::InvalidFilename(source.to_path_buf()))?;

        let destination = self.root.join(&filename);
        if destination.exists() {
            return Err(StoreError::DestinationExists(filename));
        }

        if std::fs::rename(source, &destination).is_err() {
            self.copy_across_volumes(source, &destination, &filename)?;
        }

        let size_bytes = std::fs::metadata(&destination)?.len();

        tracing::info!(
            file = %filename,
            size = size_bytes,
            "Receipt moved into store"
        );

        Ok(StoredDocument {
            filename,
            path: destination,
            size_bytes,
        })
    }

    /// Cross-volume fallback: copy to a temp name, fsync, rename into place,
    /// then delete the source.
    fn copy_across_volumes(
        &self,
        source: &Path,
        destination: &Path,
        filename: &str,
    ) -> Result<(), StoreError> {
        let staging = self.root.join(format!("{filename}.part"));

        std::fs::copy(source, &staging)?;
        std::fs::File::open(&staging)?.sync_all()?;
        std::fs::rename(&staging, destination)?;
        // The destination is already in place; a failure here leaves the
        // content at both paths (the residual non-atomicity of the move).
        std::fs::remove_file(source)?;
        Ok(())
    }

    /// Look up a document already in the store by filename.
    pub fn document(&self, filename: &str) -> Result<StoredDocument, StoreError> {
        let path = self.root.join(filename);
        if !path.is_file() {
            return Err(StoreError::DocumentNotFound(filename.to_string()));
        }
        let size_bytes = std::fs::metadata(&path)?.len();
        Ok(StoredDocument {
            filename: filename.to_string(),
            path,
            size_bytes,
        })
    }

    /// Whether a document with this filename is present.
    pub fn contains(&self, filename: &str) -> bool {
        self.root.join(filename).is_file()
    }
}
