use crate::cli::ServeArgs;
use crate::infra::{document_backend, seeded_store, ApiService, AppState};
use crate::routes::with_enrollment_routes;
use admissions::config::AppConfig;
use admissions::error::AppError;
use admissions::telemetry;
use admissions::workflows::enrollment::{spawn_rejection_sweeper, upload_body_limit};
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = seeded_store();
    let documents = Arc::new(document_backend(&config.storage)?);
    let service = Arc::new(ApiService::with_policy(
        store.clone(),
        store,
        documents,
        config.verification.policy(),
    ));

    let shutdown = CancellationToken::new();
    let sweeper = match config.verification.sweep_schedule() {
        Some(schedule) => Some(spawn_rejection_sweeper(
            service.clone(),
            schedule,
            shutdown.clone(),
        )),
        None => {
            warn!("rejection sweep disabled; stale rejections will stay open");
            None
        }
    };

    let app = with_enrollment_routes(
        service,
        upload_body_limit(config.storage.max_file_bytes),
    )
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        storage_root = %config.storage.root.display(),
        "admissions service ready"
    );

    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!(error = %err, "unable to listen for shutdown signal");
            }
            info!("shutdown signal received");
            signal.cancel();
        })
        .await?;

    shutdown.cancel();
    if let Some(sweeper) = sweeper {
        if let Err(err) = sweeper.await {
            error!(error = %err, "rejection sweeper ended abnormally");
        }
    }
    Ok(())
}
