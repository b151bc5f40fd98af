//! Campaign repository.

use vitalis_core::CampaignId;

use super::{RepositoryError, decode, decode_all, decode_first, encode};
use crate::models::{Campaign, CampaignPatch, NewCampaign};
use crate::store::{Filter, PersistentStore, Query, Table};

/// Repository for `campaign` rows.
pub struct CampaignRepository<'a> {
    store: &'a dyn PersistentStore,
}

impl<'a> CampaignRepository<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn PersistentStore) -> Self {
        Self { store }
    }

    /// All campaigns, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the query fails.
    pub async fn list(&self) -> Result<Vec<Campaign>, RepositoryError> {
        let rows = self
            .store
            .select(Table::Campaign, &Query::new().order_by("created_at", false))
            .await?;
        decode_all(rows)
    }

    /// Get a campaign by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the query fails.
    pub async fn get(&self, id: &CampaignId) -> Result<Option<Campaign>, RepositoryError> {
        let rows = self
            .store
            .select(Table::Campaign, &Query::new().eq("id", id.as_str()).limit(1))
            .await?;
        decode_first(rows)
    }

    /// Insert a campaign.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the insert fails.
    pub async fn create(&self, campaign: &NewCampaign) -> Result<Campaign, RepositoryError> {
        decode(self.store.insert(Table::Campaign, encode(campaign)?).await?)
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no campaign has that id.
    pub async fn update(&self, id: &CampaignId, patch: &CampaignPatch) -> Result<Campaign, RepositoryError> {
        let rows = self
            .store
            .update(Table::Campaign, &[Filter::eq("id", id.as_str())], encode(patch)?)
            .await?;
        decode_first(rows)?.ok_or(RepositoryError::NotFound)
    }

    /// Delete a campaign.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no campaign has that id.
    pub async fn delete(&self, id: &CampaignId) -> Result<(), RepositoryError> {
        let removed = self
            .store
            .delete(Table::Campaign, &[Filter::eq("id", id.as_str())])
            .await?;
        if removed == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use vitalis_core::CampaignStatus;

    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_campaign_crud() {
        let store = MemoryStore::new();
        let repo = CampaignRepository::new(&store);

        let created = repo
            .create(&NewCampaign {
                name: "Spring launch".into(),
                campaign_type: "email".into(),
                status: CampaignStatus::Draft,
                start_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
                end_date: None,
                budget: dec!(500),
                spent: dec!(0),
                leads: 0,
                conversions: 0,
            })
            .await
            .unwrap();
        assert_eq!(created.status, CampaignStatus::Draft);

        let updated = repo
            .update(
                &created.id,
                &CampaignPatch {
                    status: Some(CampaignStatus::Active),
                    leads: Some(12),
                    ..CampaignPatch::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, CampaignStatus::Active);
        assert_eq!(updated.leads, 12);
        assert_eq!(updated.name, "Spring launch");

        assert_eq!(repo.list().await.unwrap().len(), 1);
        repo.delete(&created.id).await.unwrap();
        assert!(repo.get(&created.id).await.unwrap().is_none());
        assert!(matches!(
            repo.delete(&created.id).await,
            Err(RepositoryError::NotFound)
        ));
    }
}
