//! Payment records.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use vitalis_core::{PaymentId, PaymentStatus, SubscriptionId};

/// A payment row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub subscription_id: SubscriptionId,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub payment_date: NaiveDate,
    pub transaction_id: String,
}

/// Insert model for `payment`.
#[derive(Debug, Clone, Serialize)]
pub struct NewPayment {
    pub subscription_id: SubscriptionId,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub payment_date: NaiveDate,
    pub transaction_id: String,
}
