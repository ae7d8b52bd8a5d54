use std::sync::Arc;

use axum::http::StatusCode;
use chrono::NaiveDate;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::documents::{DocumentStore, DocumentStoreError};
use super::domain::{
    DocumentLocation, DocumentSet, DocumentUpload, EnrollmentSubmission, Student, StudentDraft,
    StudentDocuments, StudentId, StudentUpdate, VerificationStatus,
};
use super::repository::{
    ReferenceCatalog, RepositoryError, StudentFilter, StudentPredicate, StudentRepository,
};
use super::verification::VerificationPolicy;

/// Service composing the student repository, reference catalog, and document store.
pub struct StudentEnrollmentService<R, C, D> {
    pub(super) repository: Arc<R>,
    catalog: Arc<C>,
    documents: Arc<D>,
    pub(super) policy: VerificationPolicy,
}

impl<R, C, D> StudentEnrollmentService<R, C, D>
where
    R: StudentRepository + 'static,
    C: ReferenceCatalog + 'static,
    D: DocumentStore + 'static,
{
    pub fn new(repository: Arc<R>, catalog: Arc<C>, documents: Arc<D>) -> Self {
        Self::with_policy(repository, catalog, documents, VerificationPolicy::default())
    }

    pub fn with_policy(
        repository: Arc<R>,
        catalog: Arc<C>,
        documents: Arc<D>,
        policy: VerificationPolicy,
    ) -> Self {
        Self {
            repository,
            catalog,
            documents,
            policy,
        }
    }

    pub fn policy(&self) -> VerificationPolicy {
        self.policy
    }

    /// Enroll a new student: resolve references, store the four documents, and persist the
    /// record as `PENDING` with a provisional enrollment number.
    pub fn enroll(
        &self,
        submission: EnrollmentSubmission,
        today: NaiveDate,
    ) -> Result<Student, EnrollmentServiceError> {
        validate_submission(&submission)?;

        let institute = self
            .catalog
            .institute_by_code(&submission.institute_code)?
            .ok_or_else(|| {
                EnrollmentServiceError::InstituteNotFound(submission.institute_code.clone())
            })?;
        let course = self
            .catalog
            .course_by_code(&submission.course_code)?
            .ok_or_else(|| EnrollmentServiceError::CourseNotFound(submission.course_code.clone()))?;

        let documents = self.store_documents(submission.documents)?;

        let draft = StudentDraft {
            personal: submission.personal,
            center_code: submission.center_code.trim().to_string(),
            provisional_enrollment_number: provisional_enrollment_number(&course.code),
            institute,
            course,
            academic_year: normalize_optional(submission.academic_year),
            enrollment_date: submission.enrollment_date.unwrap_or(today),
            verification_status: VerificationStatus::Pending,
            verification_date: Some(today),
            documents,
        };

        match self.repository.insert(draft.clone()) {
            Ok(student) => {
                info!(
                    student_id = %student.id,
                    provisional = %student.provisional_enrollment_number,
                    "student enrolled"
                );
                Ok(student)
            }
            Err(err) => {
                error!(error = %err, "failed to persist enrollment; discarding stored documents");
                self.discard(draft.documents.locations());
                Err(err.into())
            }
        }
    }

    /// Replace provided documents (old object deleted first), apply field changes, and put the
    /// record back into `PENDING`.
    pub fn update(
        &self,
        id: StudentId,
        changes: StudentUpdate,
        today: NaiveDate,
    ) -> Result<Student, EnrollmentServiceError> {
        let current = self.get(id)?;
        if current.verification_status == VerificationStatus::Closed {
            return Err(EnrollmentServiceError::InvalidTransition {
                id,
                from: VerificationStatus::Closed,
                to: VerificationStatus::Pending,
            });
        }
        validate_update(&changes)?;

        let mut student = current.clone();
        let StudentUpdate {
            first_name,
            surname,
            email,
            mobile_number,
            date_of_birth,
            center_code,
            academic_year,
            documents,
        } = changes;

        let mut replaced = Vec::new();
        for (kind, upload) in documents.into_entries() {
            let Some(upload) = upload else {
                continue;
            };

            match self.replace_document(student.documents.get(kind).as_ref(), &upload) {
                Ok(location) => {
                    replaced.push(location.clone());
                    *student.documents.get_mut(kind) = Some(location);
                }
                Err(err) => {
                    error!(
                        student_id = %id,
                        document = kind.label(),
                        error = %err,
                        "document replacement failed"
                    );
                    self.discard(replaced.iter());
                    return Err(err.into());
                }
            }
        }

        if let Some(value) = first_name {
            student.personal.first_name = value.trim().to_string();
        }
        if let Some(value) = surname {
            student.personal.surname = value.trim().to_string();
        }
        if email.is_some() {
            student.personal.email = email;
        }
        if mobile_number.is_some() {
            student.personal.mobile_number = mobile_number;
        }
        if date_of_birth.is_some() {
            student.personal.date_of_birth = date_of_birth;
        }
        if let Some(value) = center_code {
            student.center_code = value.trim().to_string();
        }
        if academic_year.is_some() {
            student.academic_year = normalize_optional(academic_year);
        }

        student.verification_status = VerificationStatus::Pending;
        student.verification_date = Some(today);

        match self.repository.replace(&current, student) {
            Ok(student) => {
                info!(student_id = %id, replaced = replaced.len(), "student updated");
                Ok(student)
            }
            Err(err) => {
                self.discard(replaced.iter());
                Err(err.into())
            }
        }
    }

    pub fn get(&self, id: StudentId) -> Result<Student, EnrollmentServiceError> {
        self.repository
            .fetch(id)?
            .ok_or(EnrollmentServiceError::StudentNotFound(id))
    }

    pub fn list(&self, filter: &StudentFilter) -> Result<Vec<Student>, EnrollmentServiceError> {
        Ok(self.repository.find(&filter.predicates())?)
    }

    pub fn by_status(
        &self,
        status: VerificationStatus,
    ) -> Result<Vec<Student>, EnrollmentServiceError> {
        Ok(self
            .repository
            .find(&[StudentPredicate::Status(status)])?)
    }

    /// Administrative delete: stored documents go first, then the record.
    pub fn delete(&self, id: StudentId) -> Result<Student, EnrollmentServiceError> {
        let student = self.get(id)?;

        for location in student.documents.locations() {
            if let Err(err) = self.documents.delete(location) {
                error!(
                    student_id = %id,
                    %location,
                    error = %err,
                    "failed to delete student document"
                );
                return Err(err.into());
            }
        }

        self.repository.remove(id)?;
        info!(student_id = %id, "student and associated documents deleted");
        Ok(student)
    }

    fn store_documents(
        &self,
        uploads: DocumentSet<DocumentUpload>,
    ) -> Result<StudentDocuments, EnrollmentServiceError> {
        let mut stored = StudentDocuments::default();
        for (kind, upload) in uploads.into_entries() {
            match self.documents.store(&upload.content, &upload.filename) {
                Ok(location) => *stored.get_mut(kind) = Some(location),
                Err(err) => {
                    if err.is_rejection() {
                        warn!(document = kind.label(), error = %err, "document rejected");
                    } else {
                        error!(document = kind.label(), error = %err, "document upload failed");
                    }
                    self.discard(stored.locations());
                    return Err(err.into());
                }
            }
        }
        Ok(stored)
    }

    fn replace_document(
        &self,
        previous: Option<&DocumentLocation>,
        upload: &DocumentUpload,
    ) -> Result<DocumentLocation, DocumentStoreError> {
        if let Some(previous) = previous {
            self.documents.delete(previous)?;
        }
        self.documents.store(&upload.content, &upload.filename)
    }

    /// Best-effort cleanup of objects stored by a step that did not complete.
    fn discard<'a>(&self, locations: impl IntoIterator<Item = &'a DocumentLocation>) {
        for location in locations {
            if let Err(err) = self.documents.delete(location) {
                warn!(%location, error = %err, "unable to discard orphaned document");
            }
        }
    }
}

pub fn provisional_enrollment_number(course_code: &str) -> String {
    format!("{}-{}", course_code, Uuid::new_v4())
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}

pub(super) fn require(field: &str, value: &str) -> Result<(), EnrollmentServiceError> {
    if value.trim().is_empty() {
        Err(EnrollmentServiceError::Validation(format!(
            "{field} must not be blank"
        )))
    } else {
        Ok(())
    }
}

fn validate_submission(submission: &EnrollmentSubmission) -> Result<(), EnrollmentServiceError> {
    require("first_name", &submission.personal.first_name)?;
    require("surname", &submission.personal.surname)?;
    require(
        "academic_year",
        submission.academic_year.as_deref().unwrap_or_default(),
    )?;
    require("center_code", &submission.center_code)?;
    require("institute_code", &submission.institute_code)?;
    require("course_code", &submission.course_code)
}

fn validate_update(changes: &StudentUpdate) -> Result<(), EnrollmentServiceError> {
    let present = [
        ("first_name", changes.first_name.as_deref()),
        ("surname", changes.surname.as_deref()),
        ("center_code", changes.center_code.as_deref()),
    ];
    for (field, value) in present {
        if let Some(value) = value {
            require(field, value)?;
        }
    }
    Ok(())
}

/// Error raised by the enrollment and verification workflows.
#[derive(Debug, thiserror::Error)]
pub enum EnrollmentServiceError {
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("institute with code {0} not found")]
    InstituteNotFound(String),
    #[error("course with code {0} not found")]
    CourseNotFound(String),
    #[error("student {0} not found")]
    StudentNotFound(StudentId),
    #[error("student {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: StudentId,
        from: VerificationStatus,
        to: VerificationStatus,
    },
    #[error(transparent)]
    Document(#[from] DocumentStoreError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl EnrollmentServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            EnrollmentServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            EnrollmentServiceError::Document(err) if err.is_rejection() => StatusCode::BAD_REQUEST,
            EnrollmentServiceError::InstituteNotFound(_)
            | EnrollmentServiceError::CourseNotFound(_)
            | EnrollmentServiceError::StudentNotFound(_)
            | EnrollmentServiceError::Repository(RepositoryError::NotFound) => {
                StatusCode::NOT_FOUND
            }
            EnrollmentServiceError::InvalidTransition { .. }
            | EnrollmentServiceError::Repository(RepositoryError::Conflict(_)) => {
                StatusCode::CONFLICT
            }
            EnrollmentServiceError::Document(_)
            | EnrollmentServiceError::Repository(RepositoryError::Unavailable(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}
