use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_num = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let value = parse_num(var, default)?;
        u32::try_from(value).map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_positive_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let value = parse_u32(var, default)?;
        if value == 0 {
            return Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(value)
    };

    let database_url = require("DATABASE_URL")?;
    let woo_base_url = require("WOOCOMMERCE_URL")?;
    let woo_consumer_key = require("WOOCOMMERCE_CONSUMER_KEY")?;
    let woo_consumer_secret = require("WOOCOMMERCE_CONSUMER_SECRET")?;
    let woo_webhook_secret = optional("WOOCOMMERCE_WEBHOOK_SECRET");

    let env = parse_environment(&or_default("MEALCRM_ENV", "development"))?;

    let bind_addr = or_default("MEALCRM_BIND_ADDR", "0.0.0.0:3000")
        .parse::<SocketAddr>()
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: "MEALCRM_BIND_ADDR".to_string(),
            reason: e.to_string(),
        })?;
    let log_level = or_default("MEALCRM_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("MEALCRM_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("MEALCRM_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_num("MEALCRM_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let woo_request_timeout_secs = parse_num("MEALCRM_WOO_REQUEST_TIMEOUT_SECS", "30")?;
    let woo_user_agent = or_default("MEALCRM_WOO_USER_AGENT", "mealcrm/0.1");
    let woo_max_retries = parse_u32("MEALCRM_WOO_MAX_RETRIES", "0")?;
    let woo_retry_backoff_base_secs = parse_num("MEALCRM_WOO_RETRY_BACKOFF_BASE_SECS", "2")?;

    let sync_max_pages = parse_positive_u32("MEALCRM_SYNC_MAX_PAGES", "50")?;
    let sync_page_size = parse_positive_u32("MEALCRM_SYNC_PAGE_SIZE", "100")?;
    if sync_page_size > 100 {
        return Err(ConfigError::InvalidEnvVar {
            var: "MEALCRM_SYNC_PAGE_SIZE".to_string(),
            reason: "WooCommerce accepts at most 100 records per page".to_string(),
        });
    }
    let sync_batch_size = parse_positive_u32("MEALCRM_SYNC_BATCH_SIZE", "100")? as usize;
    let sync_inter_page_delay_ms = parse_num("MEALCRM_SYNC_INTER_PAGE_DELAY_MS", "0")?;
    let search_window = parse_positive_u32("MEALCRM_SEARCH_WINDOW", "100")?;
    let sync_schedule = parse_schedule(&or_default("MEALCRM_SYNC_SCHEDULE", "0 0 3 * * *"));

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        woo_base_url,
        woo_consumer_key,
        woo_consumer_secret,
        woo_webhook_secret,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        woo_request_timeout_secs,
        woo_user_agent,
        woo_max_retries,
        woo_retry_backoff_base_secs,
        sync_max_pages,
        sync_page_size,
        sync_batch_size,
        sync_inter_page_delay_ms,
        search_window,
        sync_schedule,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s.trim() {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "MEALCRM_ENV".to_string(),
            reason: format!("expected development, test, or production, got '{other}'"),
        }),
    }
}

/// `off`, `none`, and empty values disable the scheduled resync.
fn parse_schedule(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "" | "off" | "none" | "disabled" => None,
        _ => Some(trimmed.to_string()),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
