use std::fs::File as LocalFile;
use std::path::Path;

use google_drive3::{api::File, api::Scope, DriveHub};
use tokio::runtime::Runtime;

use super::{ObjectStore, ObjectStoreError};
use crate::workflows::enrollment::domain::DocumentLocation;

const DRIVE_FILE_PREFIX: &str = "https://drive.google.com/file/d/";

/// Thin wrapper around the generated google-drive3 client allowing the synchronous
/// enrollment workflow to keep documents in a shared Drive folder.
///
/// Build one per process and share it; calls block on the wrapped runtime, so they
/// must not be issued from inside an async task.
///
/// Request metadata and location parsing are unit tested; the HTTP round trips need a
/// live Drive and are not exercised by the test suite.
pub struct GoogleDriveClient<C>
where
    C: google_drive3::common::Connector + Send + Sync + 'static,
{
    hub: DriveHub<C>,
    runtime: Runtime,
    parent_folder_id: Option<String>,
}

impl<C> GoogleDriveClient<C>
where
    C: google_drive3::common::Connector + Send + Sync + 'static,
{
    pub fn new(hub: DriveHub<C>, runtime: Runtime, parent_folder_id: Option<String>) -> Self {
        Self {
            hub,
            runtime,
            parent_folder_id,
        }
    }

    pub fn with_runtime(
        hub: DriveHub<C>,
        parent_folder_id: Option<String>,
    ) -> Result<Self, ObjectStoreError> {
        let runtime = Runtime::new().map_err(|err| ObjectStoreError::Runtime(err.to_string()))?;
        Ok(Self::new(hub, runtime, parent_folder_id))
    }

    fn map_error<E: std::fmt::Display>(err: E) -> ObjectStoreError {
        ObjectStoreError::Backend(err.to_string())
    }
}

impl<C> std::fmt::Debug for GoogleDriveClient<C>
where
    C: google_drive3::common::Connector + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleDriveClient")
            .field("parent_folder_id", &self.parent_folder_id)
            .finish_non_exhaustive()
    }
}

impl<C> ObjectStore for GoogleDriveClient<C>
where
    C: google_drive3::common::Connector + Send + Sync + 'static,
{
    fn put(
        &self,
        key: &str,
        staged: &Path,
        content_type: &mime::Mime,
    ) -> Result<DocumentLocation, ObjectStoreError> {
        let metadata = upload_metadata(key, content_type, self.parent_folder_id.as_deref());
        let reader = LocalFile::open(staged)?;

        let result = self.runtime.block_on(async {
            self.hub
                .files()
                .create(metadata)
                .param("fields", "id")
                .supports_all_drives(true)
                .add_scope(Scope::File)
                .upload(reader, content_type.clone())
                .await
        });

        let (_, file) = result.map_err(GoogleDriveClient::<C>::map_error)?;
        created_location(file)
    }

    fn remove(&self, location: &DocumentLocation) -> Result<(), ObjectStoreError> {
        let file_id = removable_file_id(location)?;

        let result = self.runtime.block_on(async {
            self.hub
                .files()
                .delete(file_id)
                .supports_all_drives(true)
                .add_scope(Scope::File)
                .doit()
                .await
        });

        result.map(|_| ()).map_err(GoogleDriveClient::<C>::map_error)
    }
}

/// Drive keeps names flat, so the key's folder separators are folded into the name.
fn upload_metadata(key: &str, content_type: &mime::Mime, parent: Option<&str>) -> File {
    File {
        name: Some(key.replace('/', "_")),
        mime_type: Some(content_type.essence_str().to_string()),
        parents: parent.map(|parent| vec![parent.to_string()]),
        ..File::default()
    }
}

fn created_location(file: File) -> Result<DocumentLocation, ObjectStoreError> {
    file.id
        .filter(|id| !id.is_empty())
        .map(|id| drive_location(&id))
        .ok_or_else(|| ObjectStoreError::Backend("drive returned no file id".to_string()))
}

fn removable_file_id(location: &DocumentLocation) -> Result<&str, ObjectStoreError> {
    drive_file_id(location).ok_or_else(|| ObjectStoreError::ForeignLocation(location.to_string()))
}

/// Canonical viewer URL stored on the student record.
pub fn drive_location(file_id: &str) -> DocumentLocation {
    DocumentLocation(format!("{DRIVE_FILE_PREFIX}{file_id}/view"))
}

/// Recover the Drive file id from a location produced by [`drive_location`].
pub fn drive_file_id(location: &DocumentLocation) -> Option<&str> {
    let rest = location.as_str().strip_prefix(DRIVE_FILE_PREFIX)?;
    let id = rest.split('/').next()?;
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_id_round_trips_through_location() {
        let location = drive_location("1AbC-xyz_09");
        assert_eq!(
            location.as_str(),
            "https://drive.google.com/file/d/1AbC-xyz_09/view"
        );
        assert_eq!(drive_file_id(&location), Some("1AbC-xyz_09"));
    }

    #[test]
    fn foreign_locations_have_no_file_id() {
        let local = DocumentLocation("file:///srv/storage/students/1_a.pdf".to_string());
        assert_eq!(drive_file_id(&local), None);

        let truncated = DocumentLocation("https://drive.google.com/file/d/".to_string());
        assert_eq!(drive_file_id(&truncated), None);
    }

    #[test]
    fn upload_metadata_flattens_key_and_targets_parent() {
        let metadata = upload_metadata(
            "students/1700000000000-3_marksheet.pdf",
            &mime::APPLICATION_PDF,
            Some("folder-42"),
        );

        assert_eq!(
            metadata.name.as_deref(),
            Some("students_1700000000000-3_marksheet.pdf")
        );
        assert_eq!(metadata.mime_type.as_deref(), Some("application/pdf"));
        assert_eq!(metadata.parents, Some(vec!["folder-42".to_string()]));

        let unparented = upload_metadata("scan.png", &mime::IMAGE_PNG, None);
        assert_eq!(unparented.parents, None);
    }

    #[test]
    fn created_file_needs_an_id() {
        let created = File {
            id: Some("1AbC".to_string()),
            ..File::default()
        };
        assert_eq!(
            created_location(created).expect("location"),
            drive_location("1AbC")
        );

        for id in [None, Some(String::new())] {
            let err = created_location(File {
                id,
                ..File::default()
            })
            .expect_err("missing id");
            assert!(matches!(err, ObjectStoreError::Backend(_)));
        }
    }

    #[test]
    fn removing_a_non_drive_location_is_refused() {
        let local = DocumentLocation("file:///srv/storage/students/1_a.pdf".to_string());
        assert!(matches!(
            removable_file_id(&local),
            Err(ObjectStoreError::ForeignLocation(_))
        ));
        assert_eq!(
            removable_file_id(&drive_location("1AbC")).expect("drive id"),
            "1AbC"
        );
    }
}
