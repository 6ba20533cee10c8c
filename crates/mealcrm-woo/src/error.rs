use thiserror::Error;

#[derive(Debug, Error)]
pub enum WooError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("rate limited by WooCommerce (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("resource not found: {url}")]
    NotFound { url: String },

    #[error("WooCommerce rejected the API credentials for {url}")]
    Unauthorized { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("invalid WooCommerce base URL \"{base_url}\": {reason}")]
    InvalidBaseUrl { base_url: String, reason: String },
}

impl WooError {
    /// `true` for a 404 from the store, which callers usually map to "absent".
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
