//! Subscription repository.

use serde_json::json;

use vitalis_core::{SubscriptionId, SubscriptionStatus, UserId};

use super::{RepositoryError, decode, decode_all, decode_first, encode};
use crate::models::{NewSubscription, Subscription};
use crate::store::{Filter, PersistentStore, Query, Table};

/// Repository for `subscription` rows.
pub struct SubscriptionRepository<'a> {
    store: &'a dyn PersistentStore,
}

impl<'a> SubscriptionRepository<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn PersistentStore) -> Self {
        Self { store }
    }

    /// Insert a subscription.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the insert fails.
    pub async fn create(&self, subscription: &NewSubscription) -> Result<Subscription, RepositoryError> {
        decode(
            self.store
                .insert(Table::Subscription, encode(subscription)?)
                .await?,
        )
    }

    /// A user's subscriptions with their payments, in one select.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if any row (or embedded
    /// payment) is malformed.
    pub async fn list_for_user_with_payments(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Subscription>, RepositoryError> {
        let query = Query::new()
            .eq("user_id", user_id.as_str())
            .order_by("created_at", false)
            .embed(Table::Payment, "subscription_id");
        decode_all(self.store.select(Table::Subscription, &query).await?)
    }

    /// Every subscription with payments, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the query fails.
    pub async fn list_with_payments(&self) -> Result<Vec<Subscription>, RepositoryError> {
        let query = Query::new()
            .order_by("created_at", false)
            .embed(Table::Payment, "subscription_id");
        decode_all(self.store.select(Table::Subscription, &query).await?)
    }

    /// Get a subscription by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the query fails.
    pub async fn get(&self, id: &SubscriptionId) -> Result<Option<Subscription>, RepositoryError> {
        let rows = self
            .store
            .select(Table::Subscription, &Query::new().eq("id", id.as_str()).limit(1))
            .await?;
        decode_first(rows)
    }

    /// Move a subscription from `from` to `to`.
    ///
    /// The update only matches while the row still has status `from`, so two
    /// racing changes can't both apply. Transition rules are enforced by the
    /// caller.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no subscription has that id, or
    /// `RepositoryError::Conflict` if its status is no longer `from`.
    pub async fn set_status(
        &self,
        id: &SubscriptionId,
        from: SubscriptionStatus,
        to: SubscriptionStatus,
    ) -> Result<Subscription, RepositoryError> {
        let rows = self
            .store
            .update(
                Table::Subscription,
                &[Filter::eq("id", id.as_str()), Filter::eq("status", from.as_str())],
                encode(&json!({ "status": to }))?,
            )
            .await?;
        if let Some(updated) = decode_first(rows)? {
            return Ok(updated);
        }
        match self.get(id).await? {
            Some(current) => Err(RepositoryError::Conflict(format!(
                "subscription {id} is {}, not {from}",
                current.status
            ))),
            None => Err(RepositoryError::NotFound),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::store::{MemoryStore, Row};

    fn subscription_row(id: &str, status: &str) -> Row {
        match json!({
            "id": id,
            "user_id": "u1",
            "status": status,
            "plan_type": "Monthly Subscription",
            "product_type": "vision",
            "start_date": "2025-01-15",
            "next_payment_due_date": "2025-02-15",
            "address_id": "a1",
            "created_at": "2025-01-15T00:00:00Z",
        }) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn test_set_status_requires_expected_status() {
        let store = MemoryStore::new();
        store.seed(Table::Subscription, subscription_row("s1", "CANCELED")).await;
        let repo = SubscriptionRepository::new(&store);

        let err = repo
            .set_status(&SubscriptionId::new("s1"), SubscriptionStatus::Active, SubscriptionStatus::Paused)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
        let row = repo.get(&SubscriptionId::new("s1")).await.unwrap().unwrap();
        assert_eq!(row.status, SubscriptionStatus::Canceled);

        let err = repo
            .set_status(&SubscriptionId::new("nope"), SubscriptionStatus::Active, SubscriptionStatus::Paused)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }
}
