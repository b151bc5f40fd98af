//! Status enums for subscriptions, payments, shipments, and campaigns.
//!
//! Wire values match the strings stored in the backing tables.

use serde::{Deserialize, Serialize};

/// Subscription lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    #[default]
    Active,
    Paused,
    Canceled,
}

impl SubscriptionStatus {
    /// Whether an admin may move a subscription from `self` to `next`.
    ///
    /// Active and paused subscriptions toggle between each other and can be
    /// canceled; canceled is terminal.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Active, Self::Paused)
                | (Self::Paused, Self::Active)
                | (Self::Active | Self::Paused, Self::Canceled)
        )
    }

    /// Wire value as stored in the `subscription.status` column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Paused => "PAUSED",
            Self::Canceled => "CANCELED",
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment record status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Success,
    Failed,
}

/// Shipment delivery status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    #[default]
    Pending,
    Shipped,
    InTransit,
    Delivered,
    Returned,
}

/// Marketing campaign status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CampaignStatus {
    #[default]
    Draft,
    Active,
    Paused,
    Completed,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_subscription_transitions() {
        use SubscriptionStatus::{Active, Canceled, Paused};

        assert!(Active.can_transition_to(Paused));
        assert!(Paused.can_transition_to(Active));
        assert!(Active.can_transition_to(Canceled));
        assert!(Paused.can_transition_to(Canceled));

        assert!(!Canceled.can_transition_to(Active));
        assert!(!Canceled.can_transition_to(Paused));
        assert!(!Active.can_transition_to(Active));
    }

    #[test]
    fn test_wire_values() {
        assert_eq!(
            serde_json::to_string(&SubscriptionStatus::Canceled).unwrap(),
            "\"CANCELED\""
        );
        assert_eq!(
            serde_json::to_string(&DeliveryStatus::InTransit).unwrap(),
            "\"IN_TRANSIT\""
        );
        let status: PaymentStatus = serde_json::from_str("\"SUCCESS\"").unwrap();
        assert_eq!(status, PaymentStatus::Success);
    }
}
