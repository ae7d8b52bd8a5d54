use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use admissions::config::StorageConfig;
use admissions::workflows::enrollment::{
    Course, InMemoryStudentStore, Institute, LocalObjectStore, StagedDocumentStore,
    StudentEnrollmentService,
};
use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;

pub(crate) type DocumentBackend = StagedDocumentStore<LocalObjectStore>;
pub(crate) type ApiService =
    StudentEnrollmentService<InMemoryStudentStore, InMemoryStudentStore, DocumentBackend>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Institutes known to the portal until the reference tables move out of process.
pub(crate) fn seed_institutes() -> Vec<Institute> {
    [
        (1, "INST1", "Government Polytechnic, Lucknow"),
        (2, "INST2", "Institute of Commerce and Management, Kanpur"),
        (3, "INST3", "Regional Paramedical Institute, Varanasi"),
    ]
    .into_iter()
    .map(|(id, code, name)| Institute {
        id,
        code: code.to_string(),
        name: name.to_string(),
    })
    .collect()
}

pub(crate) fn seed_courses() -> Vec<Course> {
    [
        (1, "CS101", "Diploma in Computer Science", None),
        (2, "BC201", "Bachelor of Commerce", None),
        (
            3,
            "PM110",
            "Diploma in Medical Lab Technology",
            Some("Two year programme with hospital internship"),
        ),
    ]
    .into_iter()
    .map(|(id, code, name, description)| Course {
        id,
        code: code.to_string(),
        name: name.to_string(),
        description: description.map(str::to_string),
    })
    .collect()
}

pub(crate) fn seeded_store() -> Arc<InMemoryStudentStore> {
    Arc::new(InMemoryStudentStore::with_reference_data(
        seed_institutes(),
        seed_courses(),
    ))
}

/// Local filesystem document store rooted at the configured storage directory.
pub(crate) fn document_backend(storage: &StorageConfig) -> std::io::Result<DocumentBackend> {
    std::fs::create_dir_all(&storage.staging_dir)?;
    let backend = LocalObjectStore::new(&storage.root)?;
    Ok(StagedDocumentStore::new(backend, storage.staging_settings()))
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
