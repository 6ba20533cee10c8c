//! WooCommerce pagination metadata.
//!
//! List endpoints report `X-WP-Total` (record count) and `X-WP-TotalPages`
//! (page count for the requested `per_page`) as response headers.

use reqwest::header::HeaderMap;

pub const TOTAL_HEADER: &str = "x-wp-total";
pub const TOTAL_PAGES_HEADER: &str = "x-wp-totalpages";

/// Pagination headers from a list response. Missing or malformed headers
/// yield `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageMeta {
    pub total: Option<u64>,
    pub total_pages: Option<u32>,
}

impl PageMeta {
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            total: parse_header(headers, TOTAL_HEADER),
            total_pages: parse_header(headers, TOTAL_PAGES_HEADER),
        }
    }

    /// Whether `page` (1-based) is the last page according to the headers.
    ///
    /// Without a `total_pages` header the answer is `false`; callers then rely
    /// on an empty page or their own page ceiling to stop.
    #[must_use]
    pub fn is_last_page(&self, page: u32) -> bool {
        self.total_pages.is_some_and(|total| page >= total)
    }
}

fn parse_header<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<T>().ok())
}
