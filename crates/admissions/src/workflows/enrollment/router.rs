use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use super::documents::DocumentStore;
use super::domain::{
    DocumentKind, EnrollmentSubmission, StudentId, StudentUpdate, VerificationStatus,
};
use super::repository::{ReferenceCatalog, StudentFilter, StudentRepository};
use super::service::{EnrollmentServiceError, StudentEnrollmentService};

type SharedService<R, C, D> = Arc<StudentEnrollmentService<R, C, D>>;

/// Headroom for the non-document fields of a submission.
const ENVELOPE_BYTES: usize = 64 * 1024;

/// Largest JSON body needed to carry every document at `max_file_bytes`, base64 encoded.
pub fn upload_body_limit(max_file_bytes: u64) -> usize {
    let encoded = max_file_bytes.div_ceil(3).saturating_mul(4);
    let documents = encoded.saturating_mul(DocumentKind::ALL.len() as u64);
    usize::try_from(documents)
        .unwrap_or(usize::MAX)
        .saturating_add(ENVELOPE_BYTES)
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerificationRequest {
    pub status: VerificationStatus,
    #[serde(default)]
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OverdueQuery {
    #[serde(default)]
    pub course_id: Option<u64>,
    #[serde(default)]
    pub academic_year: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepSummary {
    pub count: usize,
    pub closed: Vec<StudentId>,
}

/// Router builder exposing enrollment and verification endpoints. Request bodies may be up to
/// `body_limit` bytes; see [`upload_body_limit`].
pub fn enrollment_router<R, C, D>(service: SharedService<R, C, D>, body_limit: usize) -> Router
where
    R: StudentRepository + 'static,
    C: ReferenceCatalog + 'static,
    D: DocumentStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/students",
            post(enroll_handler::<R, C, D>).get(list_handler::<R, C, D>),
        )
        .route(
            "/api/v1/students/:student_id",
            get(get_handler::<R, C, D>)
                .put(update_handler::<R, C, D>)
                .delete(delete_handler::<R, C, D>),
        )
        .route(
            "/api/v1/students/:student_id/verification",
            post(verify_handler::<R, C, D>),
        )
        .route(
            "/api/v1/verification/overdue",
            get(overdue_handler::<R, C, D>),
        )
        .route(
            "/api/v1/verification/sweep",
            post(sweep_handler::<R, C, D>),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(service)
}

pub(crate) async fn enroll_handler<R, C, D>(
    State(service): State<SharedService<R, C, D>>,
    Json(submission): Json<EnrollmentSubmission>,
) -> Response
where
    R: StudentRepository + 'static,
    C: ReferenceCatalog + 'static,
    D: DocumentStore + 'static,
{
    let outcome = run_blocking(service, move |service, today| {
        service.enroll(submission, today)
    })
    .await;

    match outcome {
        Ok(student) => (StatusCode::CREATED, Json(student)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn list_handler<R, C, D>(
    State(service): State<SharedService<R, C, D>>,
    Query(filter): Query<StudentFilter>,
) -> Response
where
    R: StudentRepository + 'static,
    C: ReferenceCatalog + 'static,
    D: DocumentStore + 'static,
{
    match run_blocking(service, move |service, _| service.list(&filter)).await {
        Ok(students) => (StatusCode::OK, Json(students)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn get_handler<R, C, D>(
    State(service): State<SharedService<R, C, D>>,
    Path(student_id): Path<u64>,
) -> Response
where
    R: StudentRepository + 'static,
    C: ReferenceCatalog + 'static,
    D: DocumentStore + 'static,
{
    let id = StudentId(student_id);
    match run_blocking(service, move |service, _| service.get(id)).await {
        Ok(student) => (StatusCode::OK, Json(student)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn update_handler<R, C, D>(
    State(service): State<SharedService<R, C, D>>,
    Path(student_id): Path<u64>,
    Json(changes): Json<StudentUpdate>,
) -> Response
where
    R: StudentRepository + 'static,
    C: ReferenceCatalog + 'static,
    D: DocumentStore + 'static,
{
    let id = StudentId(student_id);
    let outcome = run_blocking(service, move |service, today| {
        service.update(id, changes, today)
    })
    .await;

    match outcome {
        Ok(student) => (StatusCode::OK, Json(student)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn delete_handler<R, C, D>(
    State(service): State<SharedService<R, C, D>>,
    Path(student_id): Path<u64>,
) -> Response
where
    R: StudentRepository + 'static,
    C: ReferenceCatalog + 'static,
    D: DocumentStore + 'static,
{
    let id = StudentId(student_id);
    match run_blocking(service, move |service, _| service.delete(id)).await {
        Ok(_) => {
            let payload = json!({
                "id": id,
                "message": "student and associated documents deleted",
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn verify_handler<R, C, D>(
    State(service): State<SharedService<R, C, D>>,
    Path(student_id): Path<u64>,
    Json(request): Json<VerificationRequest>,
) -> Response
where
    R: StudentRepository + 'static,
    C: ReferenceCatalog + 'static,
    D: DocumentStore + 'static,
{
    let id = StudentId(student_id);
    let outcome = run_blocking(service, move |service, today| {
        service.verify(id, request.status, request.remarks, today)
    })
    .await;

    match outcome {
        Ok(student) => (StatusCode::OK, Json(student)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn overdue_handler<R, C, D>(
    State(service): State<SharedService<R, C, D>>,
    Query(query): Query<OverdueQuery>,
) -> Response
where
    R: StudentRepository + 'static,
    C: ReferenceCatalog + 'static,
    D: DocumentStore + 'static,
{
    let outcome = run_blocking(service, move |service, today| {
        service.pending_overdue(query.course_id, query.academic_year.as_deref(), today)
    })
    .await;

    match outcome {
        Ok(students) => (StatusCode::OK, Json(students)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn sweep_handler<R, C, D>(
    State(service): State<SharedService<R, C, D>>,
) -> Response
where
    R: StudentRepository + 'static,
    C: ReferenceCatalog + 'static,
    D: DocumentStore + 'static,
{
    match run_blocking(service, |service, today| service.close_stale_rejections(today)).await {
        Ok(closed) => {
            let summary = SweepSummary {
                count: closed.len(),
                closed: closed.into_iter().map(|student| student.id).collect(),
            };
            (StatusCode::OK, Json(summary)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

/// Failure of a handler: either the workflow refused the call or the blocking task died.
pub(crate) enum HandlerError {
    Service(EnrollmentServiceError),
    Join(tokio::task::JoinError),
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        match self {
            HandlerError::Service(err) => {
                let status = err.status_code();
                if status.is_server_error() {
                    error!(error = %err, "enrollment request failed");
                }
                let payload = json!({
                    "error": err.to_string(),
                });
                (status, Json(payload)).into_response()
            }
            HandlerError::Join(err) => {
                error!(error = %err, "enrollment task aborted");
                let payload = json!({
                    "error": "internal error",
                });
                (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
            }
        }
    }
}

/// Storage backends block, so workflow calls run on the blocking pool with today's date.
async fn run_blocking<R, C, D, T, F>(
    service: SharedService<R, C, D>,
    call: F,
) -> Result<T, HandlerError>
where
    R: StudentRepository + 'static,
    C: ReferenceCatalog + 'static,
    D: DocumentStore + 'static,
    T: Send + 'static,
    F: FnOnce(&StudentEnrollmentService<R, C, D>, NaiveDate) -> Result<T, EnrollmentServiceError>
        + Send
        + 'static,
{
    let today = Local::now().date_naive();
    tokio::task::spawn_blocking(move || call(&service, today))
        .await
        .map_err(HandlerError::Join)?
        .map_err(HandlerError::Service)
}
