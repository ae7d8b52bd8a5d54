use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::documents::DocumentStore;
use super::repository::{ReferenceCatalog, StudentRepository};
use super::service::StudentEnrollmentService;

/// Cadence of the stale-rejection sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepSchedule {
    pub interval: Duration,
    pub run_on_startup: bool,
}

/// Spawn the background task closing stale rejections until `shutdown` is cancelled.
pub fn spawn_rejection_sweeper<R, C, D>(
    service: Arc<StudentEnrollmentService<R, C, D>>,
    schedule: SweepSchedule,
    shutdown: CancellationToken,
) -> JoinHandle<()>
where
    R: StudentRepository + 'static,
    C: ReferenceCatalog + 'static,
    D: DocumentStore + 'static,
{
    tokio::spawn(async move {
        info!(
            interval_secs = schedule.interval.as_secs(),
            retention_days = service.policy().rejection_retention_days,
            "rejection sweeper started"
        );

        if schedule.run_on_startup {
            info!("performing initial rejection sweep on startup");
            sweep_once(&service).await;
        }

        // tokio rejects a zero period.
        let mut interval = tokio::time::interval(schedule.interval.max(Duration::from_millis(1)));
        // The first tick completes immediately.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    sweep_once(&service).await;
                }
                _ = shutdown.cancelled() => {
                    info!("rejection sweeper shutting down");
                    break;
                }
            }
        }
    })
}

async fn sweep_once<R, C, D>(service: &Arc<StudentEnrollmentService<R, C, D>>)
where
    R: StudentRepository + 'static,
    C: ReferenceCatalog + 'static,
    D: DocumentStore + 'static,
{
    let service = Arc::clone(service);
    let today = Local::now().date_naive();
    let outcome =
        tokio::task::spawn_blocking(move || service.close_stale_rejections(today)).await;

    match outcome {
        Ok(Ok(closed)) => info!(closed = closed.len(), %today, "rejection sweep finished"),
        Ok(Err(err)) => error!(error = %err, "rejection sweep failed"),
        Err(err) => error!(error = %err, "rejection sweep task panicked"),
    }
}
