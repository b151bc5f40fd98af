//! Vitalis Core - shared domain types and pure business rules.
//!
//! Used by the storefront service and the `vitalis` CLI:
//! - `storefront` - JSON API, order workflow, account sessions
//! - `cli` - migrations, catalog seeding, price quotes
//!
//! # Architecture
//!
//! No I/O lives here: no database, no HTTP, no clock beyond `billing::today_at`.
//! Everything in this crate is deterministic and unit-testable.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, money, and statuses
//! - [`catalog`] - Product, frequency, and package tier enums
//! - [`pricing`] - Fixed price tables and the pricing resolver
//! - [`billing`] - Next-payment date rule
//! - [`cart`] - Cart line aggregation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod billing;
pub mod cart;
pub mod catalog;
pub mod pricing;
pub mod types;

pub use cart::{Cart, CartError, CartItem, MAX_LINE_QUANTITY};
pub use catalog::{BillingFrequency, PackageTier, PlanType, ProductKind, PurchaseOption};
pub use pricing::PricingError;
pub use types::*;
