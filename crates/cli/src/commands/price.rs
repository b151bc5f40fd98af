//! Price lookups against the pricing tables.

#![allow(clippy::print_stdout)]

use vitalis_core::{BillingFrequency, PackageTier, ProductKind, pricing};

use super::CliError;

/// Print a subscription quote.
///
/// # Errors
///
/// Returns an error for a product or frequency outside the catalog.
pub fn quote(product: &str, frequency: &str) -> Result<(), CliError> {
    println!("{}", quote_line(product, frequency)?);
    Ok(())
}

/// Print a distributor package quote.
///
/// # Errors
///
/// Returns an error for an unknown product or tier, or a product without
/// distributor pricing.
pub fn distributor(product: &str, tier: &str) -> Result<(), CliError> {
    println!("{}", distributor_line(product, tier)?);
    Ok(())
}

/// Print the full price sheet.
pub fn table() {
    for line in table_lines() {
        println!("{line}");
    }
}

fn quote_line(product: &str, frequency: &str) -> Result<String, CliError> {
    let product: ProductKind = product.parse()?;
    let frequency: BillingFrequency = frequency.parse()?;
    let price = pricing::price(product, frequency)?;
    Ok(format!("{} ({frequency}): {price}", product.display_name()))
}

fn distributor_line(product: &str, tier: &str) -> Result<String, CliError> {
    let product: ProductKind = product.parse()?;
    let tier: PackageTier = tier.parse()?;
    let unit = pricing::distributor_unit_price(product, tier)?;
    let total = pricing::distributor_price(product, tier, true)?;
    Ok(format!(
        "{} {tier}: {unit} per unit, {total} total",
        product.display_name()
    ))
}

fn table_lines() -> Vec<String> {
    let mut lines = vec![format!(
        "{:<18} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
        "product", "monthly", "annual", "one-time", "10-pack", "30-pack", "60-pack"
    )];

    for product in ProductKind::ALL {
        let cell = |price: Option<vitalis_core::Money>| {
            price.map_or_else(|| "-".to_string(), |p| p.amount.to_string())
        };
        let monthly = pricing::price(product, BillingFrequency::Monthly).ok();
        let annual = pricing::price(product, BillingFrequency::Annual).ok();
        let one_time = pricing::one_time_price(product).ok();
        let tiers: Vec<String> = PackageTier::ALL
            .into_iter()
            .map(|tier| cell(pricing::distributor_unit_price(product, tier).ok()))
            .collect();

        lines.push(format!(
            "{:<18} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
            product.display_name(),
            cell(monthly),
            cell(annual),
            cell(one_time),
            tiers.first().map_or("-", String::as_str),
            tiers.get(1).map_or("-", String::as_str),
            tiers.get(2).map_or("-", String::as_str),
        ));
    }
    lines
}
