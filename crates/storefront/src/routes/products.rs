//! Product route handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use tracing::instrument;

use vitalis_core::ProductId;

use super::{Success, success};
use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::models::Product;
use crate::state::AppState;

/// Product listing body.
#[derive(Debug, Serialize)]
pub struct ProductList {
    pub products: Vec<Product>,
}

/// Single product body.
#[derive(Debug, Serialize)]
pub struct ProductDetail {
    pub product: Product,
}

/// List the catalog.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<Success<ProductList>>> {
    let products = ProductRepository::new(state.store()).list().await?;
    Ok(success(ProductList { products }))
}

/// Show one product.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Success<ProductDetail>>> {
    let product = ProductRepository::new(state.store())
        .get(&ProductId::new(id.as_str()))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product {id} not found")))?;
    Ok(success(ProductDetail { product }))
}
