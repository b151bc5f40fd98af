//! Address repository.

use vitalis_core::UserId;

use super::{RepositoryError, decode, decode_all, encode};
use crate::models::{Address, NewAddress};
use crate::store::{PersistentStore, Query, Table};

/// Repository for `address` rows.
pub struct AddressRepository<'a> {
    store: &'a dyn PersistentStore,
}

impl<'a> AddressRepository<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn PersistentStore) -> Self {
        Self { store }
    }

    /// Insert an address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the insert fails.
    pub async fn create(&self, address: &NewAddress) -> Result<Address, RepositoryError> {
        let row = self.store.insert(Table::Address, encode(address)?).await?;
        decode(row)
    }

    /// A user's addresses, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the query fails.
    pub async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Address>, RepositoryError> {
        let query = Query::new()
            .eq("user_id", user_id.as_str())
            .order_by("created_at", false);
        decode_all(self.store.select(Table::Address, &query).await?)
    }
}
