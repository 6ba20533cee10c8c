mod clients;
mod sync;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::{clients::ClientCommands, sync::SyncCommands};

#[derive(Debug, Parser)]
#[command(name = "mealcrm-cli")]
#[command(about = "mealcrm command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Reconcile the client cache with WooCommerce
    Sync {
        #[command(subcommand)]
        command: SyncCommands,
    },
    /// Look up clients and their orders
    Clients {
        #[command(subcommand)]
        command: ClientCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check database connectivity
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("mealcrm-cli ready; run with --help for commands");
        return Ok(());
    };

    let config = mealcrm_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = mealcrm_db::PoolConfig::from_app_config(&config);
    let pool = mealcrm_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        Commands::Db { command } => match command {
            DbCommands::Ping => {
                mealcrm_db::health_check(&pool).await?;
                println!("database ok");
            }
            DbCommands::Migrate => {
                mealcrm_db::run_migrations(&pool).await?;
                println!("migrations applied");
            }
        },
        Commands::Sync { command } => sync::run(&pool, &config, command).await?,
        Commands::Clients { command } => clients::run(&pool, &config, command).await?,
    }

    Ok(())
}
