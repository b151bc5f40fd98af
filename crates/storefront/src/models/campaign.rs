//! Marketing campaigns (admin CRUD).

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use vitalis_core::{CampaignId, CampaignStatus};

/// A campaign row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub name: String,
    /// Free-form channel label ("email", "social", ...).
    #[serde(rename = "type")]
    pub campaign_type: String,
    pub status: CampaignStatus,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub budget: Decimal,
    pub spent: Decimal,
    pub leads: i64,
    pub conversions: i64,
    pub created_at: DateTime<Utc>,
}

/// Insert model for `campaign`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCampaign {
    pub name: String,
    #[serde(rename = "type")]
    pub campaign_type: String,
    #[serde(default)]
    pub status: CampaignStatus,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    pub budget: Decimal,
    #[serde(default)]
    pub spent: Decimal,
    #[serde(default)]
    pub leads: i64,
    #[serde(default)]
    pub conversions: i64,
}

impl NewCampaign {
    /// Check the fields a campaign cannot be saved without.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason for the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Campaign name is required".to_string());
        }
        if self.budget.is_sign_negative() || self.spent.is_sign_negative() {
            return Err("Budget and spend cannot be negative".to_string());
        }
        if self.leads < 0 || self.conversions < 0 {
            return Err("Leads and conversions cannot be negative".to_string());
        }
        if self.end_date.is_some_and(|end| end < self.start_date) {
            return Err("End date is before the start date".to_string());
        }
        Ok(())
    }
}

/// Partial update for `campaign`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub campaign_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CampaignStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spent: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leads: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversions: Option<i64>,
}
