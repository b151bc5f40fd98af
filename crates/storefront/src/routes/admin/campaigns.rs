//! Campaign CRUD.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use serde::Serialize;
use tracing::instrument;

use vitalis_core::CampaignId;

use crate::db::CampaignRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::{Campaign, CampaignPatch, NewCampaign};
use crate::routes::{ApiJson, Success, success};
use crate::state::AppState;

/// Build the campaigns router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/campaigns", get(index).post(create))
        .route("/campaigns/{id}", get(show).patch(update).delete(destroy))
}

#[derive(Debug, Serialize)]
pub struct CampaignList {
    pub campaigns: Vec<Campaign>,
}

#[derive(Debug, Serialize)]
pub struct CampaignBody {
    pub campaign: Campaign,
}

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub deleted: CampaignId,
}

#[instrument(skip_all)]
pub async fn index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Success<CampaignList>>> {
    let campaigns = CampaignRepository::new(state.store()).list().await?;
    Ok(success(CampaignList { campaigns }))
}

#[instrument(skip(state, _admin))]
pub async fn show(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Success<CampaignBody>>> {
    let campaign = CampaignRepository::new(state.store())
        .get(&CampaignId::new(id.as_str()))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Campaign {id} not found")))?;
    Ok(success(CampaignBody { campaign }))
}

#[instrument(skip_all)]
pub async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiJson(campaign): ApiJson<NewCampaign>,
) -> Result<Json<Success<CampaignBody>>> {
    campaign.validate().map_err(AppError::Validation)?;
    let campaign = CampaignRepository::new(state.store())
        .create(&campaign)
        .await?;
    tracing::info!(admin_id = %admin.id, campaign_id = %campaign.id, "Campaign created");
    Ok(success(CampaignBody { campaign }))
}

#[instrument(skip(state, admin, patch))]
pub async fn update(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<CampaignPatch>,
) -> Result<Json<Success<CampaignBody>>> {
    let campaign = CampaignRepository::new(state.store())
        .update(&CampaignId::new(id), &patch)
        .await?;
    tracing::info!(admin_id = %admin.id, campaign_id = %campaign.id, "Campaign updated");
    Ok(success(CampaignBody { campaign }))
}

#[instrument(skip(state, admin))]
pub async fn destroy(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Success<Deleted>>> {
    let id = CampaignId::new(id);
    CampaignRepository::new(state.store()).delete(&id).await?;
    tracing::info!(admin_id = %admin.id, campaign_id = %id, "Campaign deleted");
    Ok(success(Deleted { deleted: id }))
}
