//! Product catalog administration.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, patch},
};
use serde::Serialize;
use tracing::instrument;

use vitalis_core::ProductId;

use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::{NewProduct, Product, ProductPatch};
use crate::routes::{ApiJson, Success, success};
use crate::state::AppState;

/// Build the products router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products", get(index).post(create))
        .route("/products/{id}", patch(update).delete(destroy))
}

#[derive(Debug, Serialize)]
pub struct ProductList {
    pub products: Vec<Product>,
}

#[derive(Debug, Serialize)]
pub struct ProductBody {
    pub product: Product,
}

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub deleted: ProductId,
}

#[instrument(skip_all)]
pub async fn index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Success<ProductList>>> {
    let products = ProductRepository::new(state.store()).list().await?;
    Ok(success(ProductList { products }))
}

/// Add a catalog row.
///
/// The row's price is the list price shown in the catalog; order amounts
/// always come from the pricing tables.
#[instrument(skip_all)]
pub async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiJson(product): ApiJson<NewProduct>,
) -> Result<Json<Success<ProductBody>>> {
    if product.id.is_blank() || product.name.trim().is_empty() {
        return Err(AppError::Validation(
            "Product id and name are required".to_string(),
        ));
    }
    if product.base_price.is_sign_negative() {
        return Err(AppError::Validation(
            "Base price cannot be negative".to_string(),
        ));
    }
    let product = ProductRepository::new(state.store()).create(&product).await?;
    tracing::info!(admin_id = %admin.id, product_id = %product.id, "Product created");
    Ok(success(ProductBody { product }))
}

#[instrument(skip(state, admin, patch))]
pub async fn update(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<ProductPatch>,
) -> Result<Json<Success<ProductBody>>> {
    if patch.base_price.is_some_and(|price| price.is_sign_negative()) {
        return Err(AppError::Validation(
            "Base price cannot be negative".to_string(),
        ));
    }
    let product = ProductRepository::new(state.store())
        .update(&ProductId::new(id), &patch)
        .await?;
    tracing::info!(admin_id = %admin.id, product_id = %product.id, "Product updated");
    Ok(success(ProductBody { product }))
}

#[instrument(skip(state, admin))]
pub async fn destroy(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Success<Deleted>>> {
    let id = ProductId::new(id);
    ProductRepository::new(state.store()).delete(&id).await?;
    tracing::info!(admin_id = %admin.id, product_id = %id, "Product deleted");
    Ok(success(Deleted { deleted: id }))
}
