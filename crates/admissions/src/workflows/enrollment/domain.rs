use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Repository-assigned identifier for a student record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentId(pub u64);

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Verification lifecycle of a student record. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    Pending,
    Verified,
    Rejected,
    Closed,
}

impl VerificationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            VerificationStatus::Pending => "PENDING",
            VerificationStatus::Verified => "VERIFIED",
            VerificationStatus::Rejected => "REJECTED",
            VerificationStatus::Closed => "CLOSED",
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Institute {
    pub id: u64,
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: u64,
    pub code: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Retrievable handle (URL) for a stored document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentLocation(pub String);

impl DocumentLocation {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The four documents every enrollment carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    HighSchoolMarksheet,
    HighSchoolCertificate,
    IntermediateMarksheet,
    IntermediateCertificate,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 4] = [
        DocumentKind::HighSchoolMarksheet,
        DocumentKind::HighSchoolCertificate,
        DocumentKind::IntermediateMarksheet,
        DocumentKind::IntermediateCertificate,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            DocumentKind::HighSchoolMarksheet => "high_school_marksheet",
            DocumentKind::HighSchoolCertificate => "high_school_certificate",
            DocumentKind::IntermediateMarksheet => "intermediate_marksheet",
            DocumentKind::IntermediateCertificate => "intermediate_certificate",
        }
    }
}

/// One slot per [`DocumentKind`]; reused for uploads, replacements, and stored locations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSet<T> {
    pub high_school_marksheet: T,
    pub high_school_certificate: T,
    pub intermediate_marksheet: T,
    pub intermediate_certificate: T,
}

impl<T> DocumentSet<T> {
    pub fn get(&self, kind: DocumentKind) -> &T {
        match kind {
            DocumentKind::HighSchoolMarksheet => &self.high_school_marksheet,
            DocumentKind::HighSchoolCertificate => &self.high_school_certificate,
            DocumentKind::IntermediateMarksheet => &self.intermediate_marksheet,
            DocumentKind::IntermediateCertificate => &self.intermediate_certificate,
        }
    }

    pub fn get_mut(&mut self, kind: DocumentKind) -> &mut T {
        match kind {
            DocumentKind::HighSchoolMarksheet => &mut self.high_school_marksheet,
            DocumentKind::HighSchoolCertificate => &mut self.high_school_certificate,
            DocumentKind::IntermediateMarksheet => &mut self.intermediate_marksheet,
            DocumentKind::IntermediateCertificate => &mut self.intermediate_certificate,
        }
    }

    pub fn into_entries(self) -> [(DocumentKind, T); 4] {
        [
            (DocumentKind::HighSchoolMarksheet, self.high_school_marksheet),
            (DocumentKind::HighSchoolCertificate, self.high_school_certificate),
            (DocumentKind::IntermediateMarksheet, self.intermediate_marksheet),
            (
                DocumentKind::IntermediateCertificate,
                self.intermediate_certificate,
            ),
        ]
    }
}

impl DocumentSet<Option<DocumentLocation>> {
    pub fn locations(&self) -> impl Iterator<Item = &DocumentLocation> {
        DocumentKind::ALL
            .into_iter()
            .filter_map(move |kind| self.get(kind).as_ref())
    }
}

/// Locations of a student's stored documents.
pub type StudentDocuments = DocumentSet<Option<DocumentLocation>>;

/// Raw document as submitted by the portal. Content is base64 in JSON payloads.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentUpload {
    pub filename: String,
    #[serde(with = "base64_content")]
    pub content: Vec<u8>,
}

impl fmt::Debug for DocumentUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentUpload")
            .field("filename", &self.filename)
            .field("bytes", &self.content.len())
            .finish()
    }
}

mod base64_content {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        STANDARD
            .decode(raw.trim())
            .map_err(|err| serde::de::Error::custom(format!("invalid base64 content: {err}")))
    }
}

/// Personal fields captured on the enrollment form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalDetails {
    pub first_name: String,
    pub surname: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub mobile_number: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
}

/// Enrollment form submitted for a new student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentSubmission {
    #[serde(flatten)]
    pub personal: PersonalDetails,
    pub center_code: String,
    pub institute_code: String,
    pub course_code: String,
    #[serde(default)]
    pub academic_year: Option<String>,
    #[serde(default)]
    pub enrollment_date: Option<NaiveDate>,
    pub documents: DocumentSet<DocumentUpload>,
}

/// Partial update of an existing student. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentUpdate {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub surname: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub mobile_number: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub center_code: Option<String>,
    #[serde(default)]
    pub academic_year: Option<String>,
    #[serde(default)]
    pub documents: DocumentSet<Option<DocumentUpload>>,
}

/// Student fields before the repository assigns an identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentDraft {
    pub personal: PersonalDetails,
    pub center_code: String,
    pub institute: Institute,
    pub course: Course,
    pub academic_year: Option<String>,
    pub enrollment_date: NaiveDate,
    pub verification_status: VerificationStatus,
    pub verification_date: Option<NaiveDate>,
    pub provisional_enrollment_number: String,
    pub documents: StudentDocuments,
}

impl StudentDraft {
    pub fn into_student(self, id: StudentId) -> Student {
        Student {
            id,
            personal: self.personal,
            center_code: self.center_code,
            institute: self.institute,
            course: self.course,
            academic_year: self.academic_year,
            enrollment_date: self.enrollment_date,
            verification_status: self.verification_status,
            verification_date: self.verification_date,
            admin_remarks: None,
            requires_revision: false,
            provisional_enrollment_number: self.provisional_enrollment_number,
            enrollment_number: None,
            documents: self.documents,
        }
    }
}

/// Persisted student record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    #[serde(flatten)]
    pub personal: PersonalDetails,
    pub center_code: String,
    pub institute: Institute,
    pub course: Course,
    pub academic_year: Option<String>,
    pub enrollment_date: NaiveDate,
    pub verification_status: VerificationStatus,
    pub verification_date: Option<NaiveDate>,
    pub admin_remarks: Option<String>,
    pub requires_revision: bool,
    pub provisional_enrollment_number: String,
    /// Final enrollment number; only assigned once the record is verified.
    pub enrollment_number: Option<String>,
    pub documents: StudentDocuments,
}
