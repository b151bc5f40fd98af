//! Price quote handlers.
//!
//! Quotes come straight from the pricing tables; nothing here touches the
//! store.

use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use vitalis_core::{BillingFrequency, Money, PackageTier, ProductKind, pricing};

use super::{ApiQuery, Success, success};
use crate::error::Result;

/// `?product=&frequency=`
#[derive(Debug, Deserialize)]
pub struct QuoteParams {
    pub product: String,
    pub frequency: String,
}

/// Subscription quote body.
#[derive(Debug, Serialize)]
pub struct Quote {
    pub product: ProductKind,
    pub frequency: BillingFrequency,
    pub price: Money,
}

/// `?product=&tier=`
#[derive(Debug, Deserialize)]
pub struct DistributorParams {
    pub product: String,
    pub tier: String,
}

/// Distributor package quote body.
#[derive(Debug, Serialize)]
pub struct DistributorQuote {
    pub product: ProductKind,
    pub tier: PackageTier,
    pub units: u32,
    pub unit_price: Money,
    pub price: Money,
}

/// Quote a subscription price.
#[instrument]
pub async fn quote(ApiQuery(params): ApiQuery<QuoteParams>) -> Result<Json<Success<Quote>>> {
    let product: ProductKind = params.product.parse()?;
    let frequency: BillingFrequency = params.frequency.parse()?;
    let price = pricing::price(product, frequency)?;
    Ok(success(Quote {
        product,
        frequency,
        price,
    }))
}

/// Quote a distributor package.
///
/// The caller is treated as a distributor; retail accounts don't reach this
/// endpoint from the storefront UI.
#[instrument]
pub async fn distributor(
    ApiQuery(params): ApiQuery<DistributorParams>,
) -> Result<Json<Success<DistributorQuote>>> {
    let product: ProductKind = params.product.parse()?;
    let tier: PackageTier = params.tier.parse()?;
    let unit_price = pricing::distributor_unit_price(product, tier)?;
    let price = pricing::distributor_price(product, tier, true)?;
    Ok(success(DistributorQuote {
        product,
        tier,
        units: tier.units(),
        unit_price,
        price,
    }))
}
