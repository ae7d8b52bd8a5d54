use chrono::NaiveDate;
use serde::Deserialize;

use super::domain::{Course, Institute, Student, StudentDraft, StudentId, VerificationStatus};

/// Storage abstraction for student records so the service can be exercised in isolation.
pub trait StudentRepository: Send + Sync {
    fn insert(&self, draft: StudentDraft) -> Result<Student, RepositoryError>;
    /// Write `next` only while the stored record still equals `current`; a record changed by
    /// another writer since it was read yields `Conflict`.
    fn replace(&self, current: &Student, next: Student) -> Result<Student, RepositoryError>;
    /// Move every record matching all predicates to `status` as one atomic step and return the
    /// updated records, ordered by id.
    fn transition_where(
        &self,
        predicates: &[StudentPredicate],
        status: VerificationStatus,
    ) -> Result<Vec<Student>, RepositoryError>;
    fn fetch(&self, id: StudentId) -> Result<Option<Student>, RepositoryError>;
    fn remove(&self, id: StudentId) -> Result<(), RepositoryError>;
    /// Records matching every predicate, ordered by id.
    fn find(&self, predicates: &[StudentPredicate]) -> Result<Vec<Student>, RepositoryError>;
}

/// Lookup of the static institute and course reference data.
pub trait ReferenceCatalog: Send + Sync {
    fn institute_by_code(&self, code: &str) -> Result<Option<Institute>, RepositoryError>;
    fn course_by_code(&self, code: &str) -> Result<Option<Course>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("student {0} was modified concurrently")]
    Conflict(StudentId),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Single condition of a student query. A query is the conjunction of its predicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudentPredicate {
    InstituteId(u64),
    CourseId(u64),
    AcademicYear(String),
    AcademicYearMissing,
    Status(VerificationStatus),
    EnrolledOnOrBefore(NaiveDate),
    VerifiedBefore(NaiveDate),
}

impl StudentPredicate {
    pub fn matches(&self, student: &Student) -> bool {
        match self {
            StudentPredicate::InstituteId(id) => student.institute.id == *id,
            StudentPredicate::CourseId(id) => student.course.id == *id,
            StudentPredicate::AcademicYear(year) => {
                student.academic_year.as_deref() == Some(year.as_str())
            }
            StudentPredicate::AcademicYearMissing => student.academic_year.is_none(),
            StudentPredicate::Status(status) => student.verification_status == *status,
            StudentPredicate::EnrolledOnOrBefore(date) => student.enrollment_date <= *date,
            StudentPredicate::VerifiedBefore(date) => student
                .verification_date
                .is_some_and(|verified| verified < *date),
        }
    }
}

/// A present academic year filters by value; a blank one selects records without a year.
pub fn academic_year_predicate(year: Option<&str>) -> Option<StudentPredicate> {
    let year = year?.trim();
    if year.is_empty() {
        Some(StudentPredicate::AcademicYearMissing)
    } else {
        Some(StudentPredicate::AcademicYear(year.to_string()))
    }
}

/// Optional listing filters accepted by the admin screens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StudentFilter {
    #[serde(default)]
    pub institute_id: Option<u64>,
    #[serde(default)]
    pub course_id: Option<u64>,
    #[serde(default)]
    pub academic_year: Option<String>,
    #[serde(default)]
    pub status: Option<VerificationStatus>,
}

impl StudentFilter {
    pub fn predicates(&self) -> Vec<StudentPredicate> {
        let mut predicates = Vec::new();
        if let Some(id) = self.institute_id {
            predicates.push(StudentPredicate::InstituteId(id));
        }
        if let Some(id) = self.course_id {
            predicates.push(StudentPredicate::CourseId(id));
        }
        predicates.extend(academic_year_predicate(self.academic_year.as_deref()));
        if let Some(status) = self.status {
            predicates.push(StudentPredicate::Status(status));
        }
        predicates
    }
}
