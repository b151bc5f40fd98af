//! Shipment repository.

use vitalis_core::ShipmentId;

use super::{RepositoryError, decode, decode_all, decode_first, encode};
use crate::models::{NewShipment, Shipment, ShipmentPatch};
use crate::store::{Filter, PersistentStore, Query, Table};

/// Repository for `shipping` rows.
pub struct ShipmentRepository<'a> {
    store: &'a dyn PersistentStore,
}

impl<'a> ShipmentRepository<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn PersistentStore) -> Self {
        Self { store }
    }

    /// Insert a shipment.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the insert fails.
    pub async fn create(&self, shipment: &NewShipment) -> Result<Shipment, RepositoryError> {
        decode(self.store.insert(Table::Shipping, encode(shipment)?).await?)
    }

    /// All shipments.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the query fails.
    pub async fn list(&self) -> Result<Vec<Shipment>, RepositoryError> {
        decode_all(self.store.select(Table::Shipping, &Query::new()).await?)
    }

    /// Apply a partial update (status, tracking number, ship date).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no shipment has that id.
    pub async fn update(&self, id: &ShipmentId, patch: &ShipmentPatch) -> Result<Shipment, RepositoryError> {
        let rows = self
            .store
            .update(Table::Shipping, &[Filter::eq("id", id.as_str())], encode(patch)?)
            .await?;
        decode_first(rows)?.ok_or(RepositoryError::NotFound)
    }
}
