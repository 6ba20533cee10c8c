use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub woo_base_url: String,
    pub woo_consumer_key: String,
    pub woo_consumer_secret: String,
    /// `None` puts the webhook endpoint in open mode (no signature check).
    pub woo_webhook_secret: Option<String>,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub woo_request_timeout_secs: u64,
    pub woo_user_agent: String,
    pub woo_max_retries: u32,
    pub woo_retry_backoff_base_secs: u64,
    pub sync_max_pages: u32,
    pub sync_page_size: u32,
    pub sync_batch_size: usize,
    pub sync_inter_page_delay_ms: u64,
    pub search_window: u32,
    /// Cron expression for the nightly resync, or `None` when disabled.
    pub sync_schedule: Option<String>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("woo_base_url", &self.woo_base_url)
            .field("woo_consumer_key", &"[redacted]")
            .field("woo_consumer_secret", &"[redacted]")
            .field(
                "woo_webhook_secret",
                &self.woo_webhook_secret.as_ref().map(|_| "[redacted]"),
            )
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("woo_request_timeout_secs", &self.woo_request_timeout_secs)
            .field("woo_user_agent", &self.woo_user_agent)
            .field("woo_max_retries", &self.woo_max_retries)
            .field(
                "woo_retry_backoff_base_secs",
                &self.woo_retry_backoff_base_secs,
            )
            .field("sync_max_pages", &self.sync_max_pages)
            .field("sync_page_size", &self.sync_page_size)
            .field("sync_batch_size", &self.sync_batch_size)
            .field("sync_inter_page_delay_ms", &self.sync_inter_page_delay_ms)
            .field("search_window", &self.search_window)
            .field("sync_schedule", &self.sync_schedule)
            .finish()
    }
}
