//! Background job scheduler.
//!
//! Registers the nightly full resync that rebuilds `cached_clients` from
//! WooCommerce, catching anything the webhooks missed.

use std::sync::Arc;

use mealcrm_sync::SyncOptions;
use mealcrm_woo::WooClient;
use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Builds and starts the background job scheduler.
///
/// With no `schedule` the scheduler starts empty. The returned handle must be
/// kept alive for the lifetime of the process; dropping it stops all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised, the
/// cron expression is invalid, or the scheduler fails to start.
pub async fn build_scheduler(
    pool: PgPool,
    woo: WooClient,
    options: SyncOptions,
    schedule: Option<&str>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    match schedule {
        Some(cron) => register_resync_job(&scheduler, pool, woo, options, cron).await?,
        None => tracing::info!("scheduler: nightly resync disabled"),
    }

    scheduler.start().await?;
    Ok(scheduler)
}

async fn register_resync_job(
    scheduler: &JobScheduler,
    pool: PgPool,
    woo: WooClient,
    options: SyncOptions,
    cron: &str,
) -> Result<(), JobSchedulerError> {
    let pool = Arc::new(pool);
    let woo = Arc::new(woo);
    let options = Arc::new(options);

    let job = Job::new_async(cron, move |_uuid, _lock| {
        let pool = Arc::clone(&pool);
        let woo = Arc::clone(&woo);
        let options = Arc::clone(&options);

        Box::pin(async move {
            tracing::info!("scheduler: starting nightly resync");
            match mealcrm_sync::recorded_full_sync(&pool, &*woo, &options, "scheduler")
                .await
            {
                Ok(recorded) => tracing::info!(
                    run_id = %recorded.run_id,
                    status = recorded.status,
                    pages_fetched = recorded.report.pages_fetched,
                    clients_upserted = recorded.report.clients_upserted,
                    failed_batches = recorded.report.failed_batches,
                    "scheduler: nightly resync complete"
                ),
                Err(e) => tracing::error!(error = %e, "scheduler: nightly resync could not be recorded"),
            }
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron = %cron, "scheduler: registered nightly resync job");
    Ok(())
}
