//! Customer endpoints.

use crate::error::WooError;
use crate::types::WcCustomer;

use super::WooClient;

impl WooClient {
    /// Fetches a registered customer by id.
    ///
    /// # Errors
    ///
    /// Returns [`WooError::NotFound`] for an unknown id, or any transport,
    /// status, or decoding error.
    pub async fn get_customer(&self, customer_id: i64) -> Result<WcCustomer, WooError> {
        let (customer, _) = self
            .get_json::<WcCustomer>(
                &format!("customers/{customer_id}"),
                &[],
                &format!("customer {customer_id}"),
            )
            .await?;
        Ok(customer)
    }

    /// Lists registered customers whose account email equals `email` exactly.
    ///
    /// Guest buyers have no customer record and are never returned here.
    ///
    /// # Errors
    ///
    /// Returns any transport, status, or decoding error.
    pub async fn find_customers_by_email(&self, email: &str) -> Result<Vec<WcCustomer>, WooError> {
        let (customers, _) = self
            .get_json::<Vec<WcCustomer>>(
                "customers",
                &[("email", email.trim().to_owned()), ("role", "all".to_owned())],
                "customers by email",
            )
            .await?;
        Ok(customers)
    }
}
