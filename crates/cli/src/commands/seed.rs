//! Catalog seeding.
//!
//! Writes one `product` row per catalog product, priced at the monthly list
//! price from the pricing tables. Safe to re-run: existing rows are updated
//! in place.

use vitalis_core::ProductKind;
use vitalis_storefront::db::ProductRepository;
use vitalis_storefront::models::NewProduct;

use super::{CliError, connect_store};

/// Upsert the catalog rows.
///
/// # Errors
///
/// Returns an error if the store can't be reached or a write fails.
pub async fn products() -> Result<usize, CliError> {
    let store = connect_store().await?;
    let repo = ProductRepository::new(store.as_ref());

    for kind in ProductKind::ALL {
        let product = repo.upsert(&NewProduct::from_catalog(kind)).await?;
        tracing::info!(
            id = %product.id,
            base_price = %product.base_price,
            "Seeded product"
        );
    }

    tracing::info!(count = ProductKind::ALL.len(), "Catalog seeded");
    Ok(ProductKind::ALL.len())
}
