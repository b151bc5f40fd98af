//! Typed repositories over the persistent store.
//!
//! # Tables
//!
//! - `user_account` - Mirrored identity-provider accounts
//! - `address` - Shipping addresses, one per checkout
//! - `product` - Catalog rows
//! - `subscription` - Recurring orders
//! - `payment` - Payment records per subscription
//! - `shipping` - Shipments
//! - `campaign` - Marketing campaigns
//!
//! Rows are decoded with serde at this boundary. A row that doesn't match the
//! model is reported as `DataCorruption` rather than patched up.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p vitalis-cli -- migrate
//! ```

pub mod addresses;
pub mod campaigns;
pub mod payments;
pub mod products;
pub mod shipments;
pub mod subscriptions;
pub mod users;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::store::{Row, StoreError};

pub use addresses::AddressRepository;
pub use campaigns::CampaignRepository;
pub use payments::PaymentRepository;
pub use products::ProductRepository;
pub use shipments::ShipmentRepository;
pub use subscriptions::SubscriptionRepository;
pub use users::UserRepository;

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The store call failed.
    #[error("store error: {0}")]
    Store(StoreError),

    /// A row came back in a shape the model does not accept.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate id).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl From<StoreError> for RepositoryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(message) => Self::Conflict(message),
            other => Self::Store(other),
        }
    }
}

/// Serialize an insert/patch model into a store row.
pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Row, RepositoryError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(row)) => Ok(row),
        Ok(other) => Err(RepositoryError::DataCorruption(format!(
            "expected an object to write, got {other}"
        ))),
        Err(e) => Err(RepositoryError::DataCorruption(format!(
            "failed to encode row: {e}"
        ))),
    }
}

/// Decode a store row into a model.
pub(crate) fn decode<T: DeserializeOwned>(row: Row) -> Result<T, RepositoryError> {
    serde_json::from_value(Value::Object(row)).map_err(|e| {
        RepositoryError::DataCorruption(format!(
            "invalid {} row: {e}",
            std::any::type_name::<T>().rsplit("::").next().unwrap_or("store")
        ))
    })
}

/// Decode every row, failing on the first bad one.
pub(crate) fn decode_all<T: DeserializeOwned>(rows: Vec<Row>) -> Result<Vec<T>, RepositoryError> {
    rows.into_iter().map(decode).collect()
}

/// Decode the first row, if any.
pub(crate) fn decode_first<T: DeserializeOwned>(rows: Vec<Row>) -> Result<Option<T>, RepositoryError> {
    rows.into_iter().next().map(decode).transpose()
}
