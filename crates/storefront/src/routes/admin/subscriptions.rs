//! Subscription listing and status changes.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, patch},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use vitalis_core::{SubscriptionId, SubscriptionStatus};

use crate::db::{RepositoryError, SubscriptionRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::Subscription;
use crate::routes::{ApiJson, Success, success};
use crate::state::AppState;

/// Build the subscriptions router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/subscriptions", get(index))
        .route("/subscriptions/{id}/status", patch(set_status))
}

#[derive(Debug, Serialize)]
pub struct SubscriptionList {
    pub subscriptions: Vec<Subscription>,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionBody {
    pub subscription: Subscription,
}

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: SubscriptionStatus,
}

/// Every subscription, with payments.
pub async fn index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Success<SubscriptionList>>> {
    let subscriptions = SubscriptionRepository::new(state.store())
        .list_with_payments()
        .await?;
    Ok(success(SubscriptionList { subscriptions }))
}

/// Pause, resume, or cancel a subscription.
///
/// Canceled is terminal; any move the lifecycle doesn't allow is rejected
/// before the store is touched.
#[instrument(skip(state, admin))]
pub async fn set_status(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(change): ApiJson<StatusChange>,
) -> Result<Json<Success<SubscriptionBody>>> {
    let repo = SubscriptionRepository::new(state.store());
    let id = SubscriptionId::new(id);
    let current = repo
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Subscription {id} not found")))?;

    if !current.status.can_transition_to(change.status) {
        return Err(AppError::Validation(format!(
            "Cannot change a {} subscription to {}",
            current.status, change.status
        )));
    }

    let subscription = match repo.set_status(&id, current.status, change.status).await {
        Ok(subscription) => subscription,
        Err(RepositoryError::Conflict(_)) => {
            tracing::warn!(subscription_id = %id, to = %change.status, "Subscription changed concurrently");
            return Err(AppError::Validation(format!(
                "Subscription {id} was changed by someone else, reload and try again"
            )));
        }
        Err(err) => return Err(err.into()),
    };
    tracing::info!(
        admin_id = %admin.id,
        subscription_id = %id,
        from = %current.status,
        to = %subscription.status,
        "Subscription status changed"
    );
    Ok(success(SubscriptionBody { subscription }))
}
