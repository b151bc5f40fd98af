//! Cart route handlers.
//!
//! The cart lives in the tower-sessions session under [`keys::CART`]. Lines
//! are priced server-side when they are added.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use vitalis_core::{Cart, CartItem, Money, ProductKind, PurchaseOption};

use super::{ApiJson, Success, success};
use crate::error::{AppError, Result};
use crate::middleware::OptionalAuth;
use crate::models::{AddressInput, session::keys};
use crate::services::{Identity, OrderResult};
use crate::state::AppState;

/// Cart body returned by every cart endpoint.
#[derive(Debug, Serialize)]
pub struct CartView {
    pub items: Vec<CartItem>,
    pub subtotal: Money,
    pub item_count: u32,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            items: cart.items().to_vec(),
            subtotal: cart.subtotal(),
            item_count: cart.item_count(),
        }
    }
}

/// Wrapper so the cart nests under `"cart"` in the envelope.
#[derive(Debug, Serialize)]
pub struct CartBody {
    pub cart: CartView,
}

/// Add-to-cart request.
#[derive(Debug, Deserialize)]
pub struct AddToCart {
    pub product: ProductKind,
    pub option: PurchaseOption,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

const fn default_quantity() -> u32 {
    1
}

/// Quantity update request.
#[derive(Debug, Deserialize)]
pub struct UpdateCart {
    pub item_id: String,
    pub quantity: i64,
}

/// Line removal request.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCart {
    pub item_id: String,
}

/// Checkout request.
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub address: AddressInput,
    #[serde(default)]
    pub utc_offset_minutes: Option<i32>,
}

/// Checkout body.
#[derive(Debug, Serialize)]
pub struct CheckoutBody {
    pub orders: Vec<OrderResult>,
}

// =============================================================================
// Session Helpers
// =============================================================================

async fn load_cart(session: &Session) -> Result<Cart> {
    Ok(session.get::<Cart>(keys::CART).await?.unwrap_or_default())
}

async fn save_cart(session: &Session, cart: &Cart) -> Result<Json<Success<CartBody>>> {
    session.insert(keys::CART, cart).await?;
    Ok(success(CartBody { cart: cart.into() }))
}

// =============================================================================
// Handlers
// =============================================================================

/// Show the cart.
pub async fn show(session: Session) -> Result<Json<Success<CartBody>>> {
    let cart = load_cart(&session).await?;
    Ok(success(CartBody {
        cart: (&cart).into(),
    }))
}

/// Add a line (merging with an existing line for the same product + option).
#[instrument(skip(session))]
pub async fn add(
    session: Session,
    ApiJson(request): ApiJson<AddToCart>,
) -> Result<Json<Success<CartBody>>> {
    let item = CartItem::priced(request.product, request.option, request.quantity)?;
    let mut cart = load_cart(&session).await?;
    cart.add_item(item)?;
    save_cart(&session, &cart).await
}

/// Set a line's quantity; zero or below removes it.
#[instrument(skip(session))]
pub async fn update(
    session: Session,
    ApiJson(request): ApiJson<UpdateCart>,
) -> Result<Json<Success<CartBody>>> {
    let mut cart = load_cart(&session).await?;
    cart.update_quantity(&request.item_id, request.quantity)?;
    save_cart(&session, &cart).await
}

/// Remove a line.
#[instrument(skip(session))]
pub async fn remove(
    session: Session,
    ApiJson(request): ApiJson<RemoveFromCart>,
) -> Result<Json<Success<CartBody>>> {
    let mut cart = load_cart(&session).await?;
    if !cart.remove_item(&request.item_id) {
        return Err(AppError::NotFound(format!(
            "No cart line {}",
            request.item_id
        )));
    }
    save_cart(&session, &cart).await
}

/// Empty the cart.
pub async fn clear(session: Session) -> Result<Json<Success<CartBody>>> {
    let mut cart = load_cart(&session).await?;
    cart.clear();
    save_cart(&session, &cart).await
}

/// Check the cart out as subscription orders.
///
/// The cart is cleared only when every order was placed. On a partial
/// failure the error body lists the orders that did go through.
#[instrument(skip_all)]
pub async fn checkout(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(current): OptionalAuth,
    ApiJson(request): ApiJson<CheckoutRequest>,
) -> Result<Json<Success<CheckoutBody>>> {
    let identity = current.map(|user| Identity::new(user.id));
    let cart = load_cart(&session).await?;

    let result = state
        .order_workflow()
        .checkout(
            identity.as_ref(),
            &cart,
            request.address,
            request.utc_offset_minutes,
        )
        .await;

    match result {
        Ok(orders) => {
            session.insert(keys::CART, Cart::new()).await?;
            Ok(success(CheckoutBody { orders }))
        }
        Err(failure) => {
            if !failure.placed.is_empty() {
                let remaining = without_placed(cart, &failure.placed);
                session.insert(keys::CART, &remaining).await?;
            }
            Err(failure.into())
        }
    }
}

/// Take one unit off the matching line for every order already placed, so a
/// retry doesn't order them twice.
fn without_placed(mut cart: Cart, placed: &[OrderResult]) -> Cart {
    for order in placed {
        let id = CartItem::key(
            order.product,
            PurchaseOption::Subscription {
                frequency: order.frequency,
            },
        );
        cart.remove_one(&id);
    }
    cart
}
