use std::path::Path;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::workflows::enrollment::documents::{
    DocumentStore, DocumentStoreError, ObjectStore, ObjectStoreError,
};
use crate::workflows::enrollment::domain::{
    Course, DocumentLocation, DocumentSet, DocumentUpload, EnrollmentSubmission, Institute,
    PersonalDetails, Student, StudentDocuments, StudentDraft, StudentId, VerificationStatus,
};
use crate::workflows::enrollment::repository::{
    RepositoryError, StudentPredicate, StudentRepository,
};
use crate::workflows::enrollment::{InMemoryStudentStore, StudentEnrollmentService};

pub(super) const PDF_BYTES: &[u8] = b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog >>\nendobj\n";
pub(super) const PNG_BYTES: &[u8] = &[
    0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, b'I', b'H', b'D', b'R',
];
pub(super) const JPEG_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

pub(super) type TestService =
    StudentEnrollmentService<InMemoryStudentStore, InMemoryStudentStore, MemoryDocuments>;

pub(super) fn date(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").expect("valid date")
}

pub(super) fn institutes() -> Vec<Institute> {
    vec![
        Institute {
            id: 1,
            code: "INST1".to_string(),
            name: "Government Polytechnic".to_string(),
        },
        Institute {
            id: 2,
            code: "INST2".to_string(),
            name: "City Arts College".to_string(),
        },
    ]
}

pub(super) fn courses() -> Vec<Course> {
    vec![
        Course {
            id: 10,
            code: "CS101".to_string(),
            name: "Diploma in Computer Science".to_string(),
            description: None,
        },
        Course {
            id: 20,
            code: "ME201".to_string(),
            name: "Diploma in Mechanical Engineering".to_string(),
            description: Some("Three year programme".to_string()),
        },
    ]
}

pub(super) fn reference_store() -> Arc<InMemoryStudentStore> {
    Arc::new(InMemoryStudentStore::with_reference_data(
        institutes(),
        courses(),
    ))
}

pub(super) fn upload(filename: &str, content: &[u8]) -> DocumentUpload {
    DocumentUpload {
        filename: filename.to_string(),
        content: content.to_vec(),
    }
}

pub(super) fn submission() -> EnrollmentSubmission {
    EnrollmentSubmission {
        personal: PersonalDetails {
            first_name: "Asha".to_string(),
            surname: "Verma".to_string(),
            email: Some("asha.verma@example.org".to_string()),
            mobile_number: Some("9876543210".to_string()),
            date_of_birth: Some(date("2006-04-12")),
        },
        center_code: "C01".to_string(),
        institute_code: "INST1".to_string(),
        course_code: "CS101".to_string(),
        academic_year: Some("2024-25".to_string()),
        enrollment_date: None,
        documents: DocumentSet {
            high_school_marksheet: upload("hs_marksheet.pdf", PDF_BYTES),
            high_school_certificate: upload("hs_certificate.png", PNG_BYTES),
            intermediate_marksheet: upload("inter_marksheet.jpg", JPEG_BYTES),
            intermediate_certificate: upload("inter_certificate.pdf", PDF_BYTES),
        },
    }
}

pub(super) fn build_service(
    documents: MemoryDocuments,
) -> (Arc<InMemoryStudentStore>, Arc<MemoryDocuments>, TestService) {
    let store = reference_store();
    let documents = Arc::new(documents);
    let service = StudentEnrollmentService::new(store.clone(), store.clone(), documents.clone());
    (store, documents, service)
}

/// Record as the repository would hold it, for states the workflow cannot reach on a given day.
pub(super) fn draft(
    enrolled: NaiveDate,
    status: VerificationStatus,
    verified: NaiveDate,
) -> StudentDraft {
    let sample = submission();
    StudentDraft {
        personal: sample.personal,
        center_code: sample.center_code,
        institute: institutes().remove(0),
        course: courses().remove(0),
        academic_year: sample.academic_year,
        enrollment_date: enrolled,
        verification_status: status,
        verification_date: Some(verified),
        provisional_enrollment_number: "CS101-seeded".to_string(),
        documents: StudentDocuments::default(),
    }
}

/// Enroll the sample student on `enrolled` and return the stored record.
pub(super) fn enrolled_student(service: &TestService, enrolled: NaiveDate) -> Student {
    let mut submission = submission();
    submission.enrollment_date = Some(enrolled);
    service
        .enroll(submission, enrolled)
        .expect("sample enrollment succeeds")
}

#[derive(Debug, Default)]
struct DocumentLog {
    calls: usize,
    stored: Vec<(DocumentLocation, String)>,
    deleted: Vec<DocumentLocation>,
}

/// Document store fake keeping locations in memory; can fail a given store call or every delete.
#[derive(Debug, Default)]
pub(super) struct MemoryDocuments {
    log: Mutex<DocumentLog>,
    fail_on_store: Option<usize>,
    fail_deletes: bool,
}

impl MemoryDocuments {
    /// Fail the `call`-th store request (1-based).
    pub(super) fn failing_on(call: usize) -> Self {
        Self {
            fail_on_store: Some(call),
            ..Self::default()
        }
    }

    pub(super) fn failing_deletes() -> Self {
        Self {
            fail_deletes: true,
            ..Self::default()
        }
    }

    pub(super) fn live(&self) -> Vec<DocumentLocation> {
        let log = self.log.lock().expect("log lock");
        log.stored
            .iter()
            .map(|(location, _)| location.clone())
            .filter(|location| !log.deleted.contains(location))
            .collect()
    }

    pub(super) fn deleted(&self) -> Vec<DocumentLocation> {
        self.log.lock().expect("log lock").deleted.clone()
    }

    pub(super) fn stored_count(&self) -> usize {
        self.log.lock().expect("log lock").stored.len()
    }
}

impl DocumentStore for MemoryDocuments {
    fn store(
        &self,
        _content: &[u8],
        filename: &str,
    ) -> Result<DocumentLocation, DocumentStoreError> {
        let mut log = self.log.lock().expect("log lock");
        log.calls += 1;
        if self.fail_on_store == Some(log.calls) {
            return Err(DocumentStoreError::Backend(ObjectStoreError::Backend(
                "quota exceeded".to_string(),
            )));
        }

        let location = DocumentLocation(format!("memory://{}/{}", log.calls, filename));
        log.stored.push((location.clone(), filename.to_string()));
        Ok(location)
    }

    fn delete(&self, location: &DocumentLocation) -> Result<(), DocumentStoreError> {
        if self.fail_deletes {
            return Err(DocumentStoreError::Backend(ObjectStoreError::Backend(
                "delete refused".to_string(),
            )));
        }
        self.log
            .lock()
            .expect("log lock")
            .deleted
            .push(location.clone());
        Ok(())
    }
}

/// Object store backend that refuses every upload.
#[derive(Debug, Default)]
pub(super) struct OfflineBackend;

impl ObjectStore for OfflineBackend {
    fn put(
        &self,
        _key: &str,
        staged: &Path,
        _content_type: &mime::Mime,
    ) -> Result<DocumentLocation, ObjectStoreError> {
        assert!(staged.exists(), "staged file present during upload");
        Err(ObjectStoreError::Backend("drive offline".to_string()))
    }

    fn remove(&self, _location: &DocumentLocation) -> Result<(), ObjectStoreError> {
        Err(ObjectStoreError::Backend("drive offline".to_string()))
    }
}

/// Repository whose writes always fail.
#[derive(Debug, Default)]
pub(super) struct UnavailableRepository;

impl StudentRepository for UnavailableRepository {
    fn insert(&self, _draft: StudentDraft) -> Result<Student, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn replace(&self, _current: &Student, _next: Student) -> Result<Student, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn transition_where(
        &self,
        _predicates: &[StudentPredicate],
        _status: VerificationStatus,
    ) -> Result<Vec<Student>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: StudentId) -> Result<Option<Student>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn remove(&self, _id: StudentId) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn find(&self, _predicates: &[StudentPredicate]) -> Result<Vec<Student>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

type Interleaved = Box<dyn FnOnce(&InMemoryStudentStore) + Send>;

/// Repository over the in-memory store that runs another writer's change once, right before the
/// next write, to reproduce a request racing the workflow.
pub(super) struct RacingRepository {
    inner: Arc<InMemoryStudentStore>,
    before_write: Mutex<Option<Interleaved>>,
}

impl RacingRepository {
    pub(super) fn new(inner: Arc<InMemoryStudentStore>) -> Self {
        Self {
            inner,
            before_write: Mutex::new(None),
        }
    }

    pub(super) fn before_next_write(
        &self,
        change: impl FnOnce(&InMemoryStudentStore) + Send + 'static,
    ) {
        *self.before_write.lock().expect("hook lock") = Some(Box::new(change));
    }

    fn interleave(&self) {
        let change = self.before_write.lock().expect("hook lock").take();
        if let Some(change) = change {
            change(&self.inner);
        }
    }
}

impl StudentRepository for RacingRepository {
    fn insert(&self, draft: StudentDraft) -> Result<Student, RepositoryError> {
        self.inner.insert(draft)
    }

    fn replace(&self, current: &Student, next: Student) -> Result<Student, RepositoryError> {
        self.interleave();
        self.inner.replace(current, next)
    }

    fn transition_where(
        &self,
        predicates: &[StudentPredicate],
        status: VerificationStatus,
    ) -> Result<Vec<Student>, RepositoryError> {
        self.interleave();
        self.inner.transition_where(predicates, status)
    }

    fn fetch(&self, id: StudentId) -> Result<Option<Student>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn remove(&self, id: StudentId) -> Result<(), RepositoryError> {
        self.inner.remove(id)
    }

    fn find(&self, predicates: &[StudentPredicate]) -> Result<Vec<Student>, RepositoryError> {
        self.inner.find(predicates)
    }
}

pub(super) type RacingService =
    StudentEnrollmentService<RacingRepository, InMemoryStudentStore, MemoryDocuments>;

pub(super) fn build_racing_service(
    documents: MemoryDocuments,
) -> (
    Arc<InMemoryStudentStore>,
    Arc<RacingRepository>,
    Arc<MemoryDocuments>,
    RacingService,
) {
    let store = reference_store();
    let repository = Arc::new(RacingRepository::new(store.clone()));
    let documents = Arc::new(documents);
    let service =
        StudentEnrollmentService::new(repository.clone(), store.clone(), documents.clone());
    (store, repository, documents, service)
}

pub(super) fn staging_entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).expect("read staging dir").count()
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
