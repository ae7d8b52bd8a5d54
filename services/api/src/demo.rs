use crate::infra::{parse_date, seeded_store};
use admissions::error::AppError;
use admissions::workflows::enrollment::{
    DocumentSet, DocumentUpload, EnrollmentSubmission, LocalObjectStore, PersonalDetails,
    StagedDocumentStore, StagingSettings, Student, StudentEnrollmentService, VerificationStatus,
};
use chrono::{Duration, Local, NaiveDate};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

const SAMPLE_PDF: &[u8] = b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n%%EOF\n";
const SAMPLE_PNG: &[u8] = &[
    0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, b'I', b'H', b'D', b'R',
];

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Enrollment date for the sample student (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Keep uploaded documents under this directory instead of a throwaway one.
    #[arg(long)]
    pub(crate) storage_root: Option<PathBuf>,
    /// Reject the sample student and run the stale-rejection sweep instead of verifying.
    #[arg(long)]
    pub(crate) reject: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        today,
        storage_root,
        reject,
    } = args;
    let today = today.unwrap_or_else(|| Local::now().date_naive());

    let scratch = tempfile::tempdir()?;
    let root = storage_root.unwrap_or_else(|| scratch.path().join("objects"));
    let documents = StagedDocumentStore::new(
        LocalObjectStore::new(&root)?,
        StagingSettings {
            staging_dir: scratch.path().to_path_buf(),
            folder: "students".to_string(),
            max_file_bytes: 5 * 1024 * 1024,
        },
    );
    let store = seeded_store();
    let service = StudentEnrollmentService::new(store.clone(), store, Arc::new(documents));

    println!("Admissions workflow demo");
    println!("  Enrollment date: {}", today);
    println!("  Document storage: {}", root.display());

    let student = service.enroll(demo_submission(today), today)?;
    println!("\nEnrollment");
    render_student(&student);

    let decided_on = today + Duration::days(3);
    if reject {
        let rejected = service.verify(
            student.id,
            VerificationStatus::Rejected,
            Some("Intermediate marksheet is not legible".to_string()),
            decided_on,
        )?;
        println!("\nRejection ({})", decided_on);
        render_student(&rejected);

        let sweep_day = decided_on + Duration::days(i64::from(
            service.policy().rejection_retention_days + 1,
        ));
        let closed = service.close_stale_rejections(sweep_day)?;
        println!("\nStale rejection sweep ({})", sweep_day);
        if closed.is_empty() {
            println!("  No records closed");
        }
        for student in &closed {
            println!(
                "  Closed student {} ({} {})",
                student.id, student.personal.first_name, student.personal.surname
            );
        }
    } else {
        let verified = service.verify(
            student.id,
            VerificationStatus::Verified,
            Some("Originals checked at the centre".to_string()),
            decided_on,
        )?;
        println!("\nVerification ({})", decided_on);
        render_student(&verified);
    }

    let overdue = service.pending_overdue(None, None, today + Duration::days(30))?;
    println!("\nPending records overdue 30 days after enrollment: {}", overdue.len());

    Ok(())
}

fn demo_submission(today: NaiveDate) -> EnrollmentSubmission {
    let upload = |filename: &str, content: &[u8]| DocumentUpload {
        filename: filename.to_string(),
        content: content.to_vec(),
    };

    EnrollmentSubmission {
        personal: PersonalDetails {
            first_name: "Priya".to_string(),
            surname: "Nair".to_string(),
            email: Some("priya.nair@example.org".to_string()),
            mobile_number: Some("9811100022".to_string()),
            date_of_birth: NaiveDate::from_ymd_opt(2006, 8, 14),
        },
        center_code: "LKO01".to_string(),
        institute_code: "INST1".to_string(),
        course_code: "CS101".to_string(),
        academic_year: Some(academic_year(today)),
        enrollment_date: Some(today),
        documents: DocumentSet {
            high_school_marksheet: upload("high-school-marksheet.pdf", SAMPLE_PDF),
            high_school_certificate: upload("high-school-certificate.png", SAMPLE_PNG),
            intermediate_marksheet: upload("intermediate-marksheet.pdf", SAMPLE_PDF),
            intermediate_certificate: upload("intermediate-certificate.png", SAMPLE_PNG),
        },
    }
}

/// Session label such as `2024-25`; sessions start in July.
fn academic_year(today: NaiveDate) -> String {
    use chrono::Datelike;
    let start = if today.month() >= 7 {
        today.year()
    } else {
        today.year() - 1
    };
    format!("{}-{:02}", start, (start + 1) % 100)
}

fn render_student(student: &Student) {
    println!(
        "  Student {}: {} {} ({} / {})",
        student.id,
        student.personal.first_name,
        student.personal.surname,
        student.institute.code,
        student.course.code
    );
    println!("  Status: {}", student.verification_status);
    println!(
        "  Provisional enrollment number: {}",
        student.provisional_enrollment_number
    );
    println!(
        "  Final enrollment number: {}",
        student.enrollment_number.as_deref().unwrap_or("not assigned")
    );
    if let Some(remarks) = &student.admin_remarks {
        println!("  Remarks: {}", remarks);
    }
    if student.requires_revision {
        println!("  Revision requested");
    }
    for location in student.documents.locations() {
        println!("  Document: {}", location);
    }
}
