//! `clients` command handlers. Output is JSON so it can be piped into `jq`.

use std::str::FromStr;

use clap::Subcommand;
use mealcrm_core::{ClientSource, Identifier};
use mealcrm_sync::ClientFilter;

/// Sub-commands available under `clients`.
#[derive(Debug, Subcommand)]
pub enum ClientCommands {
    /// Resolve a client by id, phone or email
    Show {
        /// CRM/cache UUID, phone number or email address
        identifier: String,
    },
    /// List a client's CRM and WooCommerce orders, newest first
    Orders { identifier: String },
    /// Browse the merged client directory
    List {
        /// Case-insensitive match on name, email or phone
        #[arg(long)]
        search: Option<String>,
        /// crm, guest or registered
        #[arg(long)]
        source: Option<String>,
        #[arg(long, default_value = "1")]
        page: u32,
        #[arg(long, default_value = "50")]
        per_page: u32,
    },
}

pub(crate) async fn run(
    pool: &sqlx::PgPool,
    config: &mealcrm_core::AppConfig,
    command: ClientCommands,
) -> anyhow::Result<()> {
    match command {
        ClientCommands::Show { identifier } => {
            let woo = mealcrm_sync::woo_client_from_config(config)?;
            let view = mealcrm_sync::resolve_client(
                &woo,
                pool,
                &Identifier::parse(&identifier),
                config.search_window,
            )
            .await?
            .ok_or_else(|| anyhow::anyhow!("client '{identifier}' not found"))?;
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
        ClientCommands::Orders { identifier } => {
            let woo = mealcrm_sync::woo_client_from_config(config)?;
            let items = mealcrm_sync::client_orders(
                &woo,
                pool,
                &Identifier::parse(&identifier),
                config.search_window,
            )
            .await?
            .ok_or_else(|| anyhow::anyhow!("client '{identifier}' not found"))?;
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
        ClientCommands::List {
            search,
            source,
            page,
            per_page,
        } => {
            let filter = ClientFilter {
                search,
                source: source.as_deref().map(ClientSource::from_str).transpose()?,
                page: Some(page),
                per_page: Some(per_page),
            };
            let page = mealcrm_sync::list_clients(pool, &filter).await?;
            println!("{}", serde_json::to_string_pretty(&page)?);
        }
    }

    Ok(())
}
