use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Where a client record comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientSource {
    /// Entered manually through the CRM.
    Crm,
    /// Derived from WooCommerce orders placed without an account.
    Guest,
    /// Derived from WooCommerce orders with a registered customer account.
    Registered,
}

impl ClientSource {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Crm => "crm",
            Self::Guest => "guest",
            Self::Registered => "registered",
        }
    }
}

impl FromStr for ClientSource {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "crm" => Ok(Self::Crm),
            "guest" => Ok(Self::Guest),
            "registered" => Ok(Self::Registered),
            other => Err(CoreError::InvalidClientSource(other.to_owned())),
        }
    }
}

/// Unified client view returned by identity resolution and the directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientView {
    /// UUID for CRM/cached clients; the lookup string for clients found only
    /// in WooCommerce.
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postcode: Option<String>,
    pub source: ClientSource,
    pub wc_customer_id: Option<i64>,
    /// Approximate; see the cached-client aggregate.
    pub order_count: i64,
    pub last_order_date: Option<DateTime<Utc>>,
}

impl ClientView {
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_owned()
    }
}

/// Provenance of an order in a client's merged order list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderOrigin {
    Crm,
    #[serde(rename = "woocommerce")]
    WooCommerce,
}

impl OrderOrigin {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Crm => "crm",
            Self::WooCommerce => "woocommerce",
        }
    }
}

impl FromStr for OrderOrigin {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "crm" => Ok(Self::Crm),
            "woocommerce" => Ok(Self::WooCommerce),
            other => Err(CoreError::InvalidOrderOrigin(other.to_owned())),
        }
    }
}

/// One row of a client's merged order list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientOrderItem {
    pub id: String,
    pub product: String,
    /// `YYYY-MM-DD`, or whatever unparsable value the source held.
    pub start_date: String,
    pub duration: String,
    pub status: String,
    pub payment_method: String,
    pub origin: OrderOrigin,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_source_round_trips_through_str() {
        for source in [ClientSource::Crm, ClientSource::Guest, ClientSource::Registered] {
            assert_eq!(source.as_str().parse::<ClientSource>().unwrap(), source);
        }
        assert!("vip".parse::<ClientSource>().is_err());
    }

    #[test]
    fn order_origin_serializes_as_woocommerce() {
        let json = serde_json::to_string(&OrderOrigin::WooCommerce).unwrap();
        assert_eq!(json, "\"woocommerce\"");
        assert_eq!(serde_json::to_string(&OrderOrigin::Crm).unwrap(), "\"crm\"");
    }

    #[test]
    fn display_name_trims_missing_parts() {
        let view = ClientView {
            id: "x".to_owned(),
            first_name: "Ana".to_owned(),
            last_name: String::new(),
            email: None,
            phone: None,
            address: None,
            city: None,
            postcode: None,
            source: ClientSource::Guest,
            wc_customer_id: None,
            order_count: 1,
            last_order_date: None,
        };
        assert_eq!(view.display_name(), "Ana");
    }
}
