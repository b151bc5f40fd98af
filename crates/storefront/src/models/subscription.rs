//! Subscription rows.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use vitalis_core::{
    AddressId, BillingFrequency, PlanType, ProductKind, SubscriptionId, SubscriptionStatus, UserId,
};

use super::Payment;

/// A subscription row, optionally with its payments embedded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub user_id: UserId,
    pub address_id: AddressId,
    pub start_date: NaiveDate,
    pub next_payment_due_date: NaiveDate,
    pub status: SubscriptionStatus,
    pub plan_type: PlanType,
    pub product_type: ProductKind,
    pub created_at: DateTime<Utc>,
    /// Embedded `payment` rows, present when the select asked for them.
    #[serde(rename(deserialize = "payment"), default)]
    pub payments: Vec<Payment>,
}

impl Subscription {
    #[must_use]
    pub const fn frequency(&self) -> BillingFrequency {
        self.plan_type.frequency()
    }
}

/// Insert model for `subscription`.
#[derive(Debug, Clone, Serialize)]
pub struct NewSubscription {
    pub user_id: UserId,
    pub address_id: AddressId,
    pub start_date: NaiveDate,
    pub next_payment_due_date: NaiveDate,
    pub status: SubscriptionStatus,
    pub plan_type: PlanType,
    pub product_type: ProductKind,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_decodes_embedded_payments() {
        let row = json!({
            "id": "s1",
            "user_id": "u1",
            "address_id": "a1",
            "start_date": "2025-01-15",
            "next_payment_due_date": "2025-02-15",
            "status": "ACTIVE",
            "plan_type": "Monthly Subscription",
            "product_type": "vision",
            "created_at": "2025-01-15T10:00:00+00:00",
            "payment": [{
                "id": "p1",
                "subscription_id": "s1",
                "amount": 39.99,
                "status": "SUCCESS",
                "payment_date": "2025-01-15",
                "transaction_id": "ORD-123456"
            }]
        });

        let subscription: Subscription = serde_json::from_value(row).unwrap();
        assert_eq!(subscription.frequency(), BillingFrequency::Monthly);
        assert_eq!(subscription.payments.len(), 1);

        let out = serde_json::to_value(&subscription).unwrap();
        assert!(out.get("payments").is_some());
    }

    #[test]
    fn test_unknown_product_type_is_rejected() {
        let row = json!({
            "id": "s1",
            "user_id": "u1",
            "address_id": "a1",
            "start_date": "2025-01-15",
            "next_payment_due_date": "2025-02-15",
            "status": "ACTIVE",
            "plan_type": "Monthly Subscription",
            "product_type": "multivitamin",
            "created_at": "2025-01-15T10:00:00+00:00"
        });
        assert!(serde_json::from_value::<Subscription>(row).is_err());
    }
}
