//! Student enrollment and document verification workflows.
//!
//! Enrollment resolves the institute and course references, stores the four academic
//! documents through a [`DocumentStore`], and persists a `PENDING` record carrying a
//! provisional enrollment number. Verification moves pending records to `VERIFIED` or
//! `REJECTED`; a periodic sweep closes rejections left unrevised past the retention window.

pub mod documents;
pub mod domain;
pub mod memory;
pub mod repository;
pub mod router;
pub mod service;
pub mod sweeper;
pub mod verification;

#[cfg(test)]
mod tests;

pub use documents::{
    DocumentStore, DocumentStoreError, GoogleDriveClient, LocalObjectStore, ObjectStore,
    ObjectStoreError, StagedDocumentStore, StagingSettings,
};
pub use domain::{
    Course, DocumentKind, DocumentLocation, DocumentSet, DocumentUpload, EnrollmentSubmission,
    Institute, PersonalDetails, Student, StudentDocuments, StudentDraft, StudentId,
    StudentUpdate, VerificationStatus,
};
pub use memory::InMemoryStudentStore;
pub use repository::{
    ReferenceCatalog, RepositoryError, StudentFilter, StudentPredicate, StudentRepository,
};
pub use router::{enrollment_router, upload_body_limit};
pub use service::{provisional_enrollment_number, EnrollmentServiceError, StudentEnrollmentService};
pub use sweeper::{spawn_rejection_sweeper, SweepSchedule};
pub use verification::{final_enrollment_number, VerificationPolicy};
