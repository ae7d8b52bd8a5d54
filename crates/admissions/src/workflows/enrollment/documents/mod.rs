//! Document store adapter: validates uploads, stages them on local disk, and hands them to an
//! [`ObjectStore`] backend.

mod detect;
mod drive;
mod local;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info};

use super::domain::DocumentLocation;

pub use detect::{detect, detect_file, Detected, DocumentFormat};
pub use drive::{drive_file_id, drive_location, GoogleDriveClient};
pub use local::LocalObjectStore;

/// Contract used by the enrollment workflow for attachments.
pub trait DocumentStore: Send + Sync {
    fn store(&self, content: &[u8], filename: &str)
        -> Result<DocumentLocation, DocumentStoreError>;
    fn delete(&self, location: &DocumentLocation) -> Result<(), DocumentStoreError>;
}

/// Backend receiving an already validated, staged file.
pub trait ObjectStore: Send + Sync {
    fn put(
        &self,
        key: &str,
        staged: &Path,
        content_type: &mime::Mime,
    ) -> Result<DocumentLocation, ObjectStoreError>;
    fn remove(&self, location: &DocumentLocation) -> Result<(), ObjectStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ObjectStoreError {
    #[error("object store operation failed: {0}")]
    Backend(String),
    #[error("object store runtime unavailable: {0}")]
    Runtime(String),
    #[error("location '{0}' does not belong to this object store")]
    ForeignLocation(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum DocumentStoreError {
    #[error("document '{0}' has no usable file name")]
    InvalidName(String),
    #[error("document '{filename}' is empty")]
    Empty { filename: String },
    #[error("document '{filename}' exceeds the {limit} byte upload limit")]
    TooLarge { filename: String, limit: u64 },
    #[error("document '{filename}' is executable content and was rejected")]
    Executable { filename: String },
    #[error("invalid file type for '{filename}'. Supported files are PDF and images")]
    UnsupportedType { filename: String },
    #[error("unable to stage document: {0}")]
    Staging(#[source] std::io::Error),
    #[error(transparent)]
    Backend(#[from] ObjectStoreError),
}

impl DocumentStoreError {
    /// True when the upload itself was refused, as opposed to a storage failure.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            DocumentStoreError::InvalidName(_)
                | DocumentStoreError::Empty { .. }
                | DocumentStoreError::TooLarge { .. }
                | DocumentStoreError::Executable { .. }
                | DocumentStoreError::UnsupportedType { .. }
        )
    }
}

/// Staging parameters for [`StagedDocumentStore`].
#[derive(Debug, Clone)]
pub struct StagingSettings {
    pub staging_dir: PathBuf,
    pub folder: String,
    pub max_file_bytes: u64,
}

/// Writes each upload to a temporary file, validates it, and transfers it to the backend.
/// The temporary copy is removed on every exit path.
#[derive(Debug)]
pub struct StagedDocumentStore<O> {
    backend: O,
    settings: StagingSettings,
}

impl<O> StagedDocumentStore<O>
where
    O: ObjectStore,
{
    pub fn new(backend: O, settings: StagingSettings) -> Self {
        Self { backend, settings }
    }

    pub fn backend(&self) -> &O {
        &self.backend
    }

    fn stage(
        &self,
        content: &[u8],
        name: &str,
    ) -> Result<tempfile::NamedTempFile, DocumentStoreError> {
        let suffix = Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default();

        let mut staged = tempfile::Builder::new()
            .prefix("upload-")
            .suffix(&suffix)
            .tempfile_in(&self.settings.staging_dir)
            .map_err(DocumentStoreError::Staging)?;
        staged
            .write_all(content)
            .map_err(DocumentStoreError::Staging)?;
        staged.flush().map_err(DocumentStoreError::Staging)?;
        Ok(staged)
    }
}

impl<O> DocumentStore for StagedDocumentStore<O>
where
    O: ObjectStore,
{
    fn store(
        &self,
        content: &[u8],
        filename: &str,
    ) -> Result<DocumentLocation, DocumentStoreError> {
        let name = sanitize_filename(filename)
            .ok_or_else(|| DocumentStoreError::InvalidName(filename.to_string()))?;

        if content.is_empty() {
            return Err(DocumentStoreError::Empty { filename: name });
        }
        if content.len() as u64 > self.settings.max_file_bytes {
            return Err(DocumentStoreError::TooLarge {
                filename: name,
                limit: self.settings.max_file_bytes,
            });
        }

        let staged = self.stage(content, &name)?;
        let format = match detect_file(staged.path()).map_err(DocumentStoreError::Staging)? {
            Detected::Supported(format) => format,
            Detected::Executable => {
                return Err(DocumentStoreError::Executable { filename: name })
            }
            Detected::Unsupported => {
                return Err(DocumentStoreError::UnsupportedType { filename: name })
            }
        };

        let key = object_key(&self.settings.folder, &name, &upload_stamp());
        debug!(%key, content_type = format.essence(), "uploading staged document");
        let location = self.backend.put(&key, staged.path(), &format.mime())?;

        info!(%key, %location, bytes = content.len(), "document stored");
        Ok(location)
    }

    fn delete(&self, location: &DocumentLocation) -> Result<(), DocumentStoreError> {
        if location.as_str().trim().is_empty() {
            return Ok(());
        }

        self.backend.remove(location)?;
        info!(%location, "document deleted");
        Ok(())
    }
}

/// Reduce a client supplied name to a safe final path component.
pub fn sanitize_filename(raw: &str) -> Option<String> {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    let cleaned: String = base
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_') {
                ch
            } else {
                '_'
            }
        })
        .collect();

    let meaningful = cleaned.trim_matches(|ch: char| ch == '.' || ch == '_');
    if meaningful.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Backend key `{folder}/{stamp}_{name}`; an empty folder keeps the object at the root.
pub fn object_key(folder: &str, name: &str, stamp: &str) -> String {
    let folder = folder.trim_matches('/');
    if folder.is_empty() {
        format!("{stamp}_{name}")
    } else {
        format!("{folder}/{stamp}_{name}")
    }
}

static UPLOAD_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Epoch milliseconds plus a process-wide sequence, so uploads sharing a name and a
/// millisecond still get distinct keys.
fn upload_stamp() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let sequence = UPLOAD_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{millis}-{sequence}")
}
