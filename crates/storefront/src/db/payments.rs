//! Payment repository.

use super::{RepositoryError, decode, decode_all, encode};
use crate::models::{NewPayment, Payment};
use crate::store::{PersistentStore, Query, Table};

/// Repository for `payment` rows.
pub struct PaymentRepository<'a> {
    store: &'a dyn PersistentStore,
}

impl<'a> PaymentRepository<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn PersistentStore) -> Self {
        Self { store }
    }

    /// Record a payment.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the insert fails.
    pub async fn create(&self, payment: &NewPayment) -> Result<Payment, RepositoryError> {
        decode(self.store.insert(Table::Payment, encode(payment)?).await?)
    }

    /// All payments, most recent first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the query fails.
    pub async fn list(&self) -> Result<Vec<Payment>, RepositoryError> {
        let rows = self
            .store
            .select(Table::Payment, &Query::new().order_by("payment_date", false))
            .await?;
        decode_all(rows)
    }
}
