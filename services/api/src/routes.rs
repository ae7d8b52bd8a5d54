use crate::infra::{ApiService, AppState};
use admissions::workflows::enrollment::enrollment_router;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_enrollment_routes(
    service: Arc<ApiService>,
    body_limit: usize,
) -> axum::Router {
    enrollment_router(service, body_limit)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{document_backend, seeded_store};
    use admissions::config::StorageConfig;
    use admissions::workflows::enrollment::upload_body_limit;
    use axum::body::Body;
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::AtomicBool;
    use tower::ServiceExt;

    fn test_router(ready: bool) -> (axum::Router, tempfile::TempDir) {
        let storage = tempfile::tempdir().expect("storage dir");
        let config = StorageConfig {
            root: storage.path().join("objects"),
            folder: "students".to_string(),
            staging_dir: storage.path().join("staging"),
            max_file_bytes: 1024,
        };
        let store = seeded_store();
        let documents = document_backend(&config).expect("document backend");
        let service = Arc::new(ApiService::new(store.clone(), store, Arc::new(documents)));

        let state = AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };
        let router = with_enrollment_routes(service, upload_body_limit(config.max_file_bytes))
            .layer(Extension(state));
        (router, storage)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request")
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let Json(body) = healthcheck().await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn readiness_follows_flag() {
        let (router, _storage) = test_router(false);
        let response = router.oneshot(get("/ready")).await.expect("response");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let (router, _storage) = test_router(true);
        let response = router.oneshot(get("/ready")).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn metrics_endpoint_serves_prometheus_text() {
        let (router, _storage) = test_router(true);
        let response = router.oneshot(get("/metrics")).await.expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; version=0.0.4"
        );
    }

    #[tokio::test]
    async fn enrollment_routes_are_mounted() {
        let (router, _storage) = test_router(true);

        let listed = router
            .clone()
            .oneshot(get("/api/v1/students"))
            .await
            .expect("response");
        assert_eq!(listed.status(), StatusCode::OK);

        let missing = router
            .oneshot(get("/api/v1/students/42"))
            .await
            .expect("response");
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }
}
