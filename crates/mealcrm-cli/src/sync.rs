//! `sync` command handlers.

use clap::Subcommand;
use mealcrm_sync::SyncOptions;

/// Sub-commands available under `sync`.
#[derive(Debug, Subcommand)]
pub enum SyncCommands {
    /// Rebuild cached clients from every WooCommerce order
    Clients {
        /// Override the configured page ceiling
        #[arg(long)]
        max_pages: Option<u32>,
    },
    /// Show recent sync runs
    Runs {
        /// Maximum number of runs to show
        #[arg(long, default_value = "10")]
        limit: i64,
    },
}

pub(crate) async fn run(
    pool: &sqlx::PgPool,
    config: &mealcrm_core::AppConfig,
    command: SyncCommands,
) -> anyhow::Result<()> {
    match command {
        SyncCommands::Clients { max_pages } => run_sync_clients(pool, config, max_pages).await,
        SyncCommands::Runs { limit } => show_runs(pool, limit).await,
    }
}

/// Runs a recorded full sync and prints its report.
///
/// # Errors
///
/// Returns an error if the WooCommerce client cannot be built or the run
/// cannot be recorded. Page and batch failures are reported, not raised.
async fn run_sync_clients(
    pool: &sqlx::PgPool,
    config: &mealcrm_core::AppConfig,
    max_pages: Option<u32>,
) -> anyhow::Result<()> {
    let woo = mealcrm_sync::woo_client_from_config(config)
        .map_err(|e| anyhow::anyhow!("failed to build WooCommerce client: {e}"))?;

    let mut options = SyncOptions::from_app_config(config);
    if let Some(max_pages) = max_pages {
        options.max_pages = max_pages.max(1);
    }

    let recorded = mealcrm_sync::recorded_full_sync(pool, &woo, &options, "cli").await?;
    let report = &recorded.report;

    println!(
        "sync {} {}: {} page(s), {} order(s), {} client(s) upserted, {} skipped without email, {} failed batch(es)",
        recorded.run_id,
        recorded.status,
        report.pages_fetched,
        report.orders_seen,
        report.clients_upserted,
        report.orders_skipped_no_email,
        report.failed_batches,
    );
    if let Some(ref error) = report.fetch_error {
        eprintln!("warning: fetching stopped early: {error}");
    }

    Ok(())
}

async fn show_runs(pool: &sqlx::PgPool, limit: i64) -> anyhow::Result<()> {
    let runs = mealcrm_db::list_recent_sync_runs(pool, limit.clamp(1, 200)).await?;
    if runs.is_empty() {
        println!("no sync runs recorded");
        return Ok(());
    }

    for run in runs {
        println!(
            "{}  {:<9}  {:<9}  {:>4} pages  {:>6} orders  {:>6} clients  {}",
            run.started_at.format("%Y-%m-%d %H:%M"),
            run.trigger_source,
            run.status,
            run.pages_fetched,
            run.orders_seen,
            run.clients_upserted,
            run.error_message.as_deref().unwrap_or(""),
        );
    }

    Ok(())
}
