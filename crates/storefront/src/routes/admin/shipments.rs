//! Shipment listing and status updates.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, patch},
};
use serde::Serialize;
use tracing::instrument;

use vitalis_core::ShipmentId;

use crate::db::ShipmentRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::{Shipment, ShipmentPatch};
use crate::routes::{ApiJson, Success, success};
use crate::state::AppState;

/// Build the shipments router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/shipments", get(index))
        .route("/shipments/{id}", patch(update))
}

#[derive(Debug, Serialize)]
pub struct ShipmentList {
    pub shipments: Vec<Shipment>,
}

#[derive(Debug, Serialize)]
pub struct ShipmentBody {
    pub shipment: Shipment,
}

pub async fn index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Success<ShipmentList>>> {
    let shipments = ShipmentRepository::new(state.store()).list().await?;
    Ok(success(ShipmentList { shipments }))
}

/// Update delivery status, tracking number, or ship date.
#[instrument(skip(state, admin, patch))]
pub async fn update(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<ShipmentPatch>,
) -> Result<Json<Success<ShipmentBody>>> {
    if patch == ShipmentPatch::default() {
        return Err(AppError::Validation("Nothing to update".to_string()));
    }
    let shipment = ShipmentRepository::new(state.store())
        .update(&ShipmentId::new(id), &patch)
        .await?;
    tracing::info!(
        admin_id = %admin.id,
        shipment_id = %shipment.id,
        delivery_status = ?shipment.delivery_status,
        "Shipment updated"
    );
    Ok(success(ShipmentBody { shipment }))
}
