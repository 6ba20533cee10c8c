use mealcrm_db::DbError;
use mealcrm_woo::WooError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("order source error: {0}")]
    Source(#[from] WooError),

    #[error("client store error: {0}")]
    Store(#[from] DbError),

    #[error("invalid webhook payload: {0}")]
    InvalidPayload(#[source] serde_json::Error),
}
