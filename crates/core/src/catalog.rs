//! Product catalog enumerations.
//!
//! The storefront sells a small fixed line-up. Everything that prices, bills,
//! or ships an item speaks in these enums; free-form strings from requests are
//! parsed here and rejected when they fall outside the catalog.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::pricing::PricingError;

/// A product in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductKind {
    Vision,
    Neuro,
    Fortify,
    /// The bundle of all three formulas.
    Complete,
}

impl ProductKind {
    /// Every product, in display order.
    pub const ALL: [Self; 4] = [Self::Vision, Self::Neuro, Self::Fortify, Self::Complete];

    /// Catalog id (`product.id` / `subscription.product_type`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Vision => "vision",
            Self::Neuro => "neuro",
            Self::Fortify => "fortify",
            Self::Complete => "complete",
        }
    }

    /// Customer-facing product name.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Vision => "Vision Formula",
            Self::Neuro => "Neuro Formula",
            Self::Fortify => "Fortify Formula",
            Self::Complete => "Complete Bundle",
        }
    }

    /// Catalog category.
    #[must_use]
    pub const fn category(self) -> &'static str {
        match self {
            Self::Vision | Self::Neuro | Self::Fortify => "supplement",
            Self::Complete => "bundle",
        }
    }

    /// Whether this is the multi-product bundle.
    #[must_use]
    pub const fn is_bundle(self) -> bool {
        matches!(self, Self::Complete)
    }
}

impl fmt::Display for ProductKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductKind {
    type Err = PricingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vision" => Ok(Self::Vision),
            "neuro" => Ok(Self::Neuro),
            "fortify" => Ok(Self::Fortify),
            "complete" => Ok(Self::Complete),
            _ => Err(PricingError::UnknownProduct(s.to_owned())),
        }
    }
}

/// Subscription billing frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingFrequency {
    Monthly,
    Annual,
}

impl BillingFrequency {
    /// Months between consecutive payments.
    #[must_use]
    pub const fn months(self) -> u32 {
        match self {
            Self::Monthly => 1,
            Self::Annual => 12,
        }
    }

    /// Lowercase wire value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Annual => "annual",
        }
    }

    /// The plan type recorded on the subscription row.
    #[must_use]
    pub const fn plan_type(self) -> PlanType {
        match self {
            Self::Monthly => PlanType::Monthly,
            Self::Annual => PlanType::Annual,
        }
    }
}

impl fmt::Display for BillingFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BillingFrequency {
    type Err = PricingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "monthly" => Ok(Self::Monthly),
            "annual" | "annually" | "yearly" => Ok(Self::Annual),
            _ => Err(PricingError::UnknownFrequency(s.to_owned())),
        }
    }
}

/// Plan label stored on subscription rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlanType {
    #[serde(rename = "Monthly Subscription")]
    Monthly,
    #[serde(rename = "Annual Subscription")]
    Annual,
}

impl PlanType {
    /// Billing frequency this plan bills at.
    #[must_use]
    pub const fn frequency(self) -> BillingFrequency {
        match self {
            Self::Monthly => BillingFrequency::Monthly,
            Self::Annual => BillingFrequency::Annual,
        }
    }
}

/// Distributor bulk package size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PackageTier {
    #[serde(rename = "10-pack")]
    Ten,
    #[serde(rename = "30-pack")]
    Thirty,
    #[serde(rename = "60-pack")]
    Sixty,
}

impl PackageTier {
    /// Every tier, smallest first.
    pub const ALL: [Self; 3] = [Self::Ten, Self::Thirty, Self::Sixty];

    /// Number of units in the package.
    #[must_use]
    pub const fn units(self) -> u32 {
        match self {
            Self::Ten => 10,
            Self::Thirty => 30,
            Self::Sixty => 60,
        }
    }
}

impl fmt::Display for PackageTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-pack", self.units())
    }
}

impl FromStr for PackageTier {
    type Err = PricingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.trim_end_matches("-pack") {
            "10" => Ok(Self::Ten),
            "30" => Ok(Self::Thirty),
            "60" => Ok(Self::Sixty),
            _ => Err(PricingError::UnknownTier(s.to_owned())),
        }
    }
}

/// How a cart line is being bought.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PurchaseOption {
    OneTime,
    Subscription { frequency: BillingFrequency },
    Distributor { tier: PackageTier },
}

impl PurchaseOption {
    /// Key fragment used to build cart line ids.
    #[must_use]
    pub fn key(self) -> String {
        match self {
            Self::OneTime => "one-time".to_owned(),
            Self::Subscription { frequency } => frequency.as_str().to_owned(),
            Self::Distributor { tier } => format!("distributor-{}", tier.units()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_product_parse_is_case_insensitive() {
        assert_eq!("Vision".parse::<ProductKind>().unwrap(), ProductKind::Vision);
        assert_eq!(
            " complete ".parse::<ProductKind>().unwrap(),
            ProductKind::Complete
        );
        assert!(matches!(
            "multivitamin".parse::<ProductKind>(),
            Err(PricingError::UnknownProduct(_))
        ));
    }

    #[test]
    fn test_frequency_parse() {
        assert_eq!(
            "annual".parse::<BillingFrequency>().unwrap(),
            BillingFrequency::Annual
        );
        assert!(matches!(
            "weekly".parse::<BillingFrequency>(),
            Err(PricingError::UnknownFrequency(_))
        ));
    }

    #[test]
    fn test_tier_parse_accepts_both_spellings() {
        assert_eq!("30".parse::<PackageTier>().unwrap(), PackageTier::Thirty);
        assert_eq!("60-pack".parse::<PackageTier>().unwrap(), PackageTier::Sixty);
        assert!("20-pack".parse::<PackageTier>().is_err());
    }

    #[test]
    fn test_plan_type_wire_values() {
        let json = serde_json::to_string(&BillingFrequency::Annual.plan_type()).unwrap();
        assert_eq!(json, "\"Annual Subscription\"");
        let plan: PlanType = serde_json::from_str("\"Monthly Subscription\"").unwrap();
        assert_eq!(plan.frequency(), BillingFrequency::Monthly);
    }

    #[test]
    fn test_purchase_option_keys() {
        assert_eq!(PurchaseOption::OneTime.key(), "one-time");
        assert_eq!(
            PurchaseOption::Subscription {
                frequency: BillingFrequency::Monthly
            }
            .key(),
            "monthly"
        );
        assert_eq!(
            PurchaseOption::Distributor {
                tier: PackageTier::Thirty
            }
            .key(),
            "distributor-30"
        );
    }
}
