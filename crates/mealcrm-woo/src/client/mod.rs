//! HTTP client for the WooCommerce REST API.

mod customers;
mod orders;

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::error::WooError;
use crate::pagination::PageMeta;
use crate::retry::retry_with_backoff;

pub use orders::OrderQuery;

/// `customer_id` WooCommerce reports for guest checkouts.
pub const GUEST_CUSTOMER_ID: i64 = 0;

/// Largest `per_page` WooCommerce accepts.
pub const MAX_PER_PAGE: u32 = 100;

const API_PREFIX: &str = "wp-json/wc/v3";

/// REST API key pair generated under WooCommerce → Settings → Advanced.
#[derive(Clone)]
pub struct WooCredentials {
    pub consumer_key: String,
    pub consumer_secret: String,
}

impl std::fmt::Debug for WooCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WooCredentials")
            .field("consumer_key", &"[redacted]")
            .field("consumer_secret", &"[redacted]")
            .finish()
    }
}

/// HTTP client for one WooCommerce store.
///
/// Authenticates with HTTP basic auth using the consumer key/secret, maps
/// 401/403/404/429 and other non-2xx responses to typed errors, and exposes
/// the `X-WP-*` pagination headers alongside list results.
///
/// Transient errors (429, network failures) are retried with exponential
/// backoff up to `max_retries` additional attempts.
#[derive(Debug, Clone)]
pub struct WooClient {
    pub(super) client: Client,
    pub(super) api_base: reqwest::Url,
    pub(super) credentials: WooCredentials,
    pub(super) max_retries: u32,
    pub(super) backoff_base_secs: u64,
}

impl WooClient {
    /// Creates a client for the store at `base_url`
    /// (e.g. `https://shop.example.com`, or a WordPress subdirectory install).
    ///
    /// # Errors
    ///
    /// Returns [`WooError::InvalidBaseUrl`] if `base_url` is not an absolute
    /// http(s) URL, or [`WooError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        base_url: &str,
        credentials: WooCredentials,
        timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_base_secs: u64,
    ) -> Result<Self, WooError> {
        let api_base = Self::api_base(base_url)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            api_base,
            credentials,
            max_retries,
            backoff_base_secs,
        })
    }

    /// Builds the `…/wp-json/wc/v3/` base, keeping any subdirectory path.
    fn api_base(base_url: &str) -> Result<reqwest::Url, WooError> {
        let invalid = |reason: String| WooError::InvalidBaseUrl {
            base_url: base_url.to_owned(),
            reason,
        };
        let parsed = reqwest::Url::parse(base_url.trim()).map_err(|e| invalid(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme '{}'", parsed.scheme())));
        }
        let root = parsed.as_str().trim_end_matches('/');
        reqwest::Url::parse(&format!("{root}/{API_PREFIX}/")).map_err(|e| invalid(e.to_string()))
    }

    /// Full URL for an API path such as `orders` or `customers/7`.
    pub(super) fn endpoint(&self, path: &str) -> Result<reqwest::Url, WooError> {
        self.api_base
            .join(path.trim_start_matches('/'))
            .map_err(|e| WooError::InvalidBaseUrl {
                base_url: self.api_base.to_string(),
                reason: e.to_string(),
            })
    }

    /// Issues an authenticated GET and decodes the JSON body.
    pub(super) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        context: &str,
    ) -> Result<(T, PageMeta), WooError> {
        let mut url = self.endpoint(path)?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }

        retry_with_backoff(self.max_retries, self.backoff_base_secs, || {
            let url = url.clone();
            async move {
                let response = self
                    .client
                    .get(url.clone())
                    .basic_auth(
                        &self.credentials.consumer_key,
                        Some(&self.credentials.consumer_secret),
                    )
                    .header(reqwest::header::ACCEPT, "application/json")
                    .send()
                    .await?;
                let status = response.status();
                let url = url.to_string();

                if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    let retry_after_secs = response
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(60);
                    return Err(WooError::RateLimited { retry_after_secs });
                }
                if status == reqwest::StatusCode::NOT_FOUND {
                    return Err(WooError::NotFound { url });
                }
                if status == reqwest::StatusCode::UNAUTHORIZED
                    || status == reqwest::StatusCode::FORBIDDEN
                {
                    return Err(WooError::Unauthorized { url });
                }
                if !status.is_success() {
                    return Err(WooError::UnexpectedStatus {
                        status: status.as_u16(),
                        url,
                    });
                }

                let meta = PageMeta::from_headers(response.headers());
                let body = response.text().await?;
                let parsed =
                    serde_json::from_str::<T>(&body).map_err(|e| WooError::Deserialize {
                        context: context.to_owned(),
                        source: e,
                    })?;
                Ok((parsed, meta))
            }
        })
        .await
    }
}

#[cfg(test)]
#[path = "../client_test.rs"]
mod tests;
