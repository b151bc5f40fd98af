//! Product repository.

use vitalis_core::ProductId;

use super::{RepositoryError, decode, decode_all, decode_first, encode};
use crate::models::{NewProduct, Product, ProductPatch};
use crate::store::{Filter, PersistentStore, Query, Table};

/// Repository for `product` rows.
pub struct ProductRepository<'a> {
    store: &'a dyn PersistentStore,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn PersistentStore) -> Self {
        Self { store }
    }

    /// All products ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the query fails.
    pub async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = self
            .store
            .select(Table::Product, &Query::new().order_by("id", true))
            .await?;
        decode_all(rows)
    }

    /// Get a product by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the query fails.
    pub async fn get(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let rows = self
            .store
            .select(Table::Product, &Query::new().eq("id", id.as_str()).limit(1))
            .await?;
        decode_first(rows)
    }

    /// Insert a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the id is taken.
    pub async fn create(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        decode(self.store.insert(Table::Product, encode(product)?).await?)
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no product has that id.
    pub async fn update(&self, id: &ProductId, patch: &ProductPatch) -> Result<Product, RepositoryError> {
        let rows = self
            .store
            .update(Table::Product, &[Filter::eq("id", id.as_str())], encode(patch)?)
            .await?;
        decode_first(rows)?.ok_or(RepositoryError::NotFound)
    }

    /// Insert the product, or overwrite every field if it exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if any store call fails.
    pub async fn upsert(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        if self.get(&product.id).await?.is_none() {
            return self.create(product).await;
        }
        let patch = ProductPatch {
            name: Some(product.name.clone()),
            base_price: Some(product.base_price),
            category: Some(product.category.clone()),
            description: product.description.clone(),
        };
        self.update(&product.id, &patch).await
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no product has that id.
    pub async fn delete(&self, id: &ProductId) -> Result<(), RepositoryError> {
        let removed = self
            .store
            .delete(Table::Product, &[Filter::eq("id", id.as_str())])
            .await?;
        if removed == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
