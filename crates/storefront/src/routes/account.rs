//! Account route handlers (require auth).

use axum::{Json, extract::State};
use serde::Serialize;
use tracing::instrument;

use super::{Success, success};
use crate::db::{AddressRepository, SubscriptionRepository};
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::{Address, Subscription};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SubscriptionList {
    pub subscriptions: Vec<Subscription>,
}

#[derive(Debug, Serialize)]
pub struct AddressList {
    pub addresses: Vec<Address>,
}

/// The caller's subscriptions, each with its payments.
#[instrument(skip_all)]
pub async fn subscriptions(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Success<SubscriptionList>>> {
    let subscriptions = SubscriptionRepository::new(state.store())
        .list_for_user_with_payments(&user.id)
        .await?;
    Ok(success(SubscriptionList { subscriptions }))
}

/// The caller's saved addresses.
#[instrument(skip_all)]
pub async fn addresses(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Success<AddressList>>> {
    let addresses = AddressRepository::new(state.store())
        .list_for_user(&user.id)
        .await?;
    Ok(success(AddressList { addresses }))
}
