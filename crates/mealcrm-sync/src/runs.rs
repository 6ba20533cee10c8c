//! Full syncs recorded in `sync_runs`.

use mealcrm_db::DbError;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{full_sync, OrderSource, SyncOptions, SyncReport};

#[derive(Debug, Clone, Serialize)]
pub struct RecordedSync {
    pub run_id: Uuid,
    pub status: &'static str,
    pub report: SyncReport,
}

/// Runs [`full_sync`] against the database and records it as a sync run.
///
/// The run is marked `failed` only when not a single page could be fetched;
/// a later page failure or failed batches still complete the run, with the
/// fetch error kept in `error_message`.
///
/// # Errors
///
/// Returns [`DbError`] if the run row cannot be created or updated. Sync
/// failures themselves are reported in the returned [`SyncReport`].
pub async fn recorded_full_sync(
    pool: &PgPool,
    source: &dyn OrderSource,
    options: &SyncOptions,
    trigger_source: &str,
) -> Result<RecordedSync, DbError> {
    let run = mealcrm_db::start_sync_run(pool, trigger_source).await?;
    tracing::info!(run_id = %run.public_id, trigger_source, "sync run started");

    let report = full_sync(source, pool, options).await;

    let status = match (&report.fetch_error, report.pages_fetched) {
        (Some(error), 0) => {
            mealcrm_db::fail_sync_run(pool, run.id, error).await?;
            "failed"
        }
        (error, _) => {
            mealcrm_db::complete_sync_run(pool, run.id, report.run_stats(), error.as_deref())
                .await?;
            "succeeded"
        }
    };

    tracing::info!(run_id = %run.public_id, status, "sync run finished");
    Ok(RecordedSync {
        run_id: run.public_id,
        status,
        report,
    })
}
