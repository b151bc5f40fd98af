//! Pricing resolver.
//!
//! Prices come from fixed lookup tables, never from runtime heuristics. The
//! annual column for single formulas happens to equal
//! `round(monthly × 0.8 × 12, 2)`; the tests hold the table to that rule, but
//! the resolver only ever reads the table.
//!
//! The bundle does not follow the rule: its monthly (169.00) and one-time
//! (199.00) prices are merchandising constants. Both are kept as explicit
//! entries rather than reconciled.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use thiserror::Error;

use crate::catalog::{BillingFrequency, PackageTier, ProductKind, PurchaseOption};
use crate::types::Money;

/// Errors raised when a price is requested outside the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    #[error("unknown product: {0}")]
    UnknownProduct(String),

    #[error("unknown billing frequency: {0}")]
    UnknownFrequency(String),

    #[error("unknown package tier: {0}")]
    UnknownTier(String),

    #[error("{product} is not sold as a one-time purchase")]
    NoOneTimePrice { product: ProductKind },

    #[error("{product} is not offered in distributor packages")]
    NoDistributorPrice { product: ProductKind },

    #[error("package tiers are only available to distributors")]
    DistributorOnly,
}

/// One row of the price sheet.
struct PriceRow {
    monthly: Decimal,
    annual: Decimal,
    one_time: Option<Decimal>,
    /// Per-unit price for the 10, 30 and 60 packs.
    distributor: Option<[Decimal; 3]>,
}

const fn row(product: ProductKind) -> PriceRow {
    match product {
        ProductKind::Vision => PriceRow {
            monthly: dec!(39.99),
            annual: dec!(383.90),
            one_time: None,
            distributor: Some([dec!(64.90), dec!(61.90), dec!(59.90)]),
        },
        ProductKind::Neuro => PriceRow {
            monthly: dec!(44.99),
            annual: dec!(431.90),
            one_time: None,
            distributor: Some([dec!(69.90), dec!(66.90), dec!(63.90)]),
        },
        ProductKind::Fortify => PriceRow {
            monthly: dec!(34.99),
            annual: dec!(335.90),
            one_time: None,
            distributor: Some([dec!(54.90), dec!(51.90), dec!(49.90)]),
        },
        ProductKind::Complete => PriceRow {
            monthly: dec!(169.00),
            annual: dec!(1622.40),
            one_time: Some(dec!(199.00)),
            distributor: None,
        },
    }
}

/// Subscription price for one billing period.
///
/// Total over the enum domain; string inputs go through [`price_str`].
///
/// # Errors
///
/// Never fails for enum inputs today; the `Result` keeps the signature aligned
/// with the other resolvers so callers handle the domain uniformly.
pub const fn price(product: ProductKind, frequency: BillingFrequency) -> Result<Money, PricingError> {
    let row = row(product);
    let amount = match frequency {
        BillingFrequency::Monthly => row.monthly,
        BillingFrequency::Annual => row.annual,
    };
    Ok(Money {
        amount,
        currency_code: crate::types::CurrencyCode::USD,
    })
}

/// Subscription price from raw request strings.
///
/// # Errors
///
/// Returns [`PricingError::UnknownProduct`] or
/// [`PricingError::UnknownFrequency`] for values outside the catalog.
pub fn price_str(product: &str, frequency: &str) -> Result<Money, PricingError> {
    let product: ProductKind = product.parse()?;
    let frequency: BillingFrequency = frequency.parse()?;
    price(product, frequency)
}

/// Monthly base (list) price, as stored on the `product` row.
#[must_use]
pub const fn base_price(product: ProductKind) -> Money {
    Money {
        amount: row(product).monthly,
        currency_code: crate::types::CurrencyCode::USD,
    }
}

/// One-time purchase price.
///
/// # Errors
///
/// Returns [`PricingError::NoOneTimePrice`] for products only sold on
/// subscription.
pub fn one_time_price(product: ProductKind) -> Result<Money, PricingError> {
    row(product)
        .one_time
        .map(Money::usd)
        .ok_or(PricingError::NoOneTimePrice { product })
}

/// Per-unit distributor price for a package tier.
///
/// # Errors
///
/// Returns [`PricingError::NoDistributorPrice`] when the product has no
/// distributor price breaks.
pub fn distributor_unit_price(product: ProductKind, tier: PackageTier) -> Result<Money, PricingError> {
    let breaks = row(product)
        .distributor
        .ok_or(PricingError::NoDistributorPrice { product })?;
    let unit = match tier {
        PackageTier::Ten => breaks[0],
        PackageTier::Thirty => breaks[1],
        PackageTier::Sixty => breaks[2],
    };
    Ok(Money::usd(unit))
}

/// Total price of a distributor package: per-unit price × units in the tier.
///
/// # Errors
///
/// Returns [`PricingError::DistributorOnly`] when `is_distributor` is false,
/// and [`PricingError::NoDistributorPrice`] for products without breaks.
pub fn distributor_price(
    product: ProductKind,
    tier: PackageTier,
    is_distributor: bool,
) -> Result<Money, PricingError> {
    if !is_distributor {
        return Err(PricingError::DistributorOnly);
    }
    Ok(distributor_unit_price(product, tier)?.times(tier.units()))
}

/// Unit price for a cart line.
///
/// # Errors
///
/// Propagates the domain error of the underlying resolver.
pub fn purchase_price(product: ProductKind, option: PurchaseOption) -> Result<Money, PricingError> {
    match option {
        PurchaseOption::OneTime => one_time_price(product),
        PurchaseOption::Subscription { frequency } => price(product, frequency),
        PurchaseOption::Distributor { tier } => distributor_price(product, tier, true),
    }
}
