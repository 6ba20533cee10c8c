pub mod app_config;
pub mod clients;
pub mod config;
pub mod dates;
pub mod identity;

pub use app_config::{AppConfig, Environment};
pub use clients::{ClientOrderItem, ClientSource, ClientView, OrderOrigin};
pub use config::{load_app_config, load_app_config_from_env};
pub use dates::{parse_order_date, EPOCH};
pub use identity::{contact_matches, normalize_email, normalize_phone, Identifier};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid client source: {0}")]
    InvalidClientSource(String),

    #[error("invalid order origin: {0}")]
    InvalidOrderOrigin(String),
}
