use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::{ObjectStore, ObjectStoreError};
use crate::workflows::enrollment::domain::DocumentLocation;

const SCHEME: &str = "file://";

/// Filesystem backend; objects live under `root` and are addressed by `file://` URLs.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    /// Creates `root` when missing.
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root: root.canonicalize()?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, location: &DocumentLocation) -> Result<PathBuf, ObjectStoreError> {
        let foreign = || ObjectStoreError::ForeignLocation(location.to_string());
        let raw = location.as_str().strip_prefix(SCHEME).ok_or_else(foreign)?;
        let path = PathBuf::from(raw);
        if !path.starts_with(&self.root) || path.components().any(is_parent_dir) {
            return Err(foreign());
        }
        Ok(path)
    }
}

fn is_parent_dir(component: std::path::Component<'_>) -> bool {
    matches!(component, std::path::Component::ParentDir)
}

impl ObjectStore for LocalObjectStore {
    fn put(
        &self,
        key: &str,
        staged: &Path,
        _content_type: &mime::Mime,
    ) -> Result<DocumentLocation, ObjectStoreError> {
        let destination = self.root.join(key);
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(staged, &destination)?;
        Ok(DocumentLocation(format!("{SCHEME}{}", destination.display())))
    }

    fn remove(&self, location: &DocumentLocation) -> Result<(), ObjectStoreError> {
        let path = self.path_for(location)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
