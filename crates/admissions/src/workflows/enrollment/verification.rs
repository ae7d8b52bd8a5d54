use chrono::{Datelike, Days, NaiveDate};
use tracing::info;

use super::documents::DocumentStore;
use super::domain::{Student, StudentId, VerificationStatus};
use super::repository::{
    academic_year_predicate, ReferenceCatalog, StudentPredicate, StudentRepository,
};
use super::service::{EnrollmentServiceError, StudentEnrollmentService};

/// Time windows governing the verification lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerificationPolicy {
    /// Days a rejected record stays open for revision before the sweep closes it.
    pub rejection_retention_days: u32,
    /// Days after enrollment at which a pending record is reported as overdue.
    pub pending_alert_days: u32,
}

impl Default for VerificationPolicy {
    fn default() -> Self {
        Self {
            rejection_retention_days: 14,
            pending_alert_days: 21,
        }
    }
}

impl VerificationPolicy {
    /// Rejections verified strictly before this date are stale. `None` when the window reaches
    /// past the earliest representable date, so no record can be stale.
    pub fn rejection_cutoff(&self, today: NaiveDate) -> Option<NaiveDate> {
        today.checked_sub_days(Days::new(u64::from(self.rejection_retention_days)))
    }

    /// Pending records enrolled on or before this date are overdue.
    pub fn pending_cutoff(&self, today: NaiveDate) -> Option<NaiveDate> {
        today.checked_sub_days(Days::new(u64::from(self.pending_alert_days)))
    }
}

pub fn final_enrollment_number(year: i32, center_code: &str, id: StudentId) -> String {
    format!("EN{year}{center_code}{id}")
}

impl<R, C, D> StudentEnrollmentService<R, C, D>
where
    R: StudentRepository + 'static,
    C: ReferenceCatalog + 'static,
    D: DocumentStore + 'static,
{
    /// Record an administrator decision on a pending student.
    pub fn verify(
        &self,
        id: StudentId,
        decision: VerificationStatus,
        remarks: Option<String>,
        today: NaiveDate,
    ) -> Result<Student, EnrollmentServiceError> {
        if !matches!(
            decision,
            VerificationStatus::Verified | VerificationStatus::Rejected
        ) {
            return Err(EnrollmentServiceError::Validation(format!(
                "verification decision must be VERIFIED or REJECTED, got {decision}"
            )));
        }

        let current = self.get(id)?;
        if current.verification_status != VerificationStatus::Pending {
            return Err(EnrollmentServiceError::InvalidTransition {
                id,
                from: current.verification_status,
                to: decision,
            });
        }

        let mut student = current.clone();
        student.verification_status = decision;
        student.verification_date = Some(today);
        student.admin_remarks = remarks
            .map(|raw| raw.trim().to_string())
            .filter(|trimmed| !trimmed.is_empty());

        match decision {
            VerificationStatus::Verified => {
                student.enrollment_number = Some(final_enrollment_number(
                    today.year(),
                    &student.center_code,
                    student.id,
                ));
            }
            _ => student.requires_revision = true,
        }

        let student = self.repository.replace(&current, student)?;
        info!(
            student_id = %id,
            decision = %decision,
            enrollment_number = student.enrollment_number.as_deref().unwrap_or("-"),
            "verification recorded"
        );
        Ok(student)
    }

    /// Close every rejection whose verification date is older than the retention window.
    pub fn close_stale_rejections(
        &self,
        today: NaiveDate,
    ) -> Result<Vec<Student>, EnrollmentServiceError> {
        let Some(cutoff) = self.policy.rejection_cutoff(today) else {
            return Ok(Vec::new());
        };
        let closed = self.repository.transition_where(
            &[
                StudentPredicate::Status(VerificationStatus::Rejected),
                StudentPredicate::VerifiedBefore(cutoff),
            ],
            VerificationStatus::Closed,
        )?;
        if closed.is_empty() {
            return Ok(closed);
        }

        info!(count = closed.len(), %cutoff, "closed stale rejections");
        Ok(closed)
    }

    /// Pending records enrolled at least `pending_alert_days` ago.
    pub fn pending_overdue(
        &self,
        course_id: Option<u64>,
        academic_year: Option<&str>,
        today: NaiveDate,
    ) -> Result<Vec<Student>, EnrollmentServiceError> {
        let Some(cutoff) = self.policy.pending_cutoff(today) else {
            return Ok(Vec::new());
        };
        let mut predicates = vec![
            StudentPredicate::Status(VerificationStatus::Pending),
            StudentPredicate::EnrolledOnOrBefore(cutoff),
        ];
        if let Some(course_id) = course_id {
            predicates.push(StudentPredicate::CourseId(course_id));
        }
        predicates.extend(academic_year_predicate(academic_year));

        Ok(self.repository.find(&predicates)?)
    }
}
