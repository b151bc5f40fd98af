//! Order workflow.
//!
//! Placing an order writes four rows in sequence: address, subscription,
//! shipment, payment. The store offers no transaction across them, so the
//! workflow is a forward-only saga: each step either succeeds and advances
//! [`OrderProgress`], or fails and stops with the progress so far attached to
//! the error. Nothing is retried and nothing is rolled back; the ids in the
//! progress are what an operator needs to reconcile a partial order.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{FixedOffset, NaiveDate, Offset, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use vitalis_core::billing::{next_payment_due_date, offset_from_minutes, today_at};
use vitalis_core::{
    AddressId, BillingFrequency, Cart, DeliveryStatus, Money, PaymentId, PaymentStatus,
    PricingError, ProductKind, PurchaseOption, ShipmentId, SubscriptionId, SubscriptionStatus,
    UserId, pricing,
};

use crate::db::{
    AddressRepository, PaymentRepository, RepositoryError, ShipmentRepository,
    SubscriptionRepository,
};
use crate::error::{ErrorKind, add_breadcrumb};
use crate::models::{AddressInput, NewAddress, NewPayment, NewShipment, NewSubscription};
use crate::store::PersistentStore;

/// Default bound on a single store round trip.
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(10);

/// Most orders a single checkout may place.
pub const MAX_CHECKOUT_ORDERS: u32 = 10;

/// Generate an order number: `ORD-` followed by six random digits.
///
/// Not checked for uniqueness.
#[must_use]
pub fn generate_order_number() -> String {
    let n: u32 = rand::rng().random_range(0..1_000_000);
    format!("ORD-{n:06}")
}

/// A verified caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
}

impl Identity {
    pub fn new(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

/// What the customer is ordering.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OrderRequest {
    pub address: AddressInput,
    pub product: ProductKind,
    pub frequency: BillingFrequency,
    /// Caller's offset from UTC in minutes, used to date the order.
    #[serde(default)]
    pub utc_offset_minutes: Option<i32>,
    /// Explicit first renewal date instead of the frequency rule.
    #[serde(default)]
    pub next_payment_override: Option<NaiveDate>,
}

/// How far an order got.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OrderStage {
    Started,
    AddressCreated,
    SubscriptionCreated,
    ShipmentCreated,
    PaymentCreated,
}

/// Furthest stage reached and the ids created along the way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderProgress {
    pub stage: OrderStage,
    pub order_number: String,
    pub address_id: Option<AddressId>,
    pub subscription_id: Option<SubscriptionId>,
    pub shipment_id: Option<ShipmentId>,
    pub payment_id: Option<PaymentId>,
}

impl OrderProgress {
    fn new(order_number: String) -> Self {
        Self {
            stage: OrderStage::Started,
            order_number,
            address_id: None,
            subscription_id: None,
            shipment_id: None,
            payment_id: None,
        }
    }
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderResult {
    pub order_number: String,
    pub subscription_id: SubscriptionId,
    pub payment_id: PaymentId,
    pub shipment_id: ShipmentId,
    pub address_id: AddressId,
    pub product: ProductKind,
    pub frequency: BillingFrequency,
    pub amount: Money,
    pub start_date: NaiveDate,
    pub next_payment_due_date: NaiveDate,
}

/// Why a store step failed.
#[derive(Debug, Error)]
pub enum StepFailure {
    #[error(transparent)]
    Store(#[from] RepositoryError),

    #[error("timed out after {}s", .0.as_secs())]
    TimedOut(Duration),
}

/// Errors from placing an order.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("You must be signed in to place an order")]
    Unauthenticated,

    #[error("{0}")]
    ValidationFailed(String),

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error("Could not save the shipping address: {source}")]
    AddressCreationFailed {
        progress: Box<OrderProgress>,
        source: StepFailure,
    },

    #[error("Could not create the subscription: {source}")]
    SubscriptionCreationFailed {
        progress: Box<OrderProgress>,
        source: StepFailure,
    },

    #[error("Could not create the shipment: {source}")]
    ShipmentCreationFailed {
        progress: Box<OrderProgress>,
        source: StepFailure,
    },

    #[error("Could not record the payment: {source}")]
    PaymentRecordingFailed {
        progress: Box<OrderProgress>,
        source: StepFailure,
    },
}

impl OrderError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthenticated => ErrorKind::Unauthenticated,
            Self::ValidationFailed(_) => ErrorKind::ValidationFailed,
            Self::Pricing(_) => ErrorKind::PricingDomainError,
            Self::AddressCreationFailed { .. } => ErrorKind::AddressCreationFailed,
            Self::SubscriptionCreationFailed { .. } => ErrorKind::SubscriptionCreationFailed,
            Self::ShipmentCreationFailed { .. } => ErrorKind::ShipmentCreationFailed,
            Self::PaymentRecordingFailed { .. } => ErrorKind::PaymentRecordingFailed,
        }
    }

    /// Message safe to show a customer: step failures name the step but not
    /// the store's error text.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::AddressCreationFailed { .. } => "Could not save the shipping address".to_string(),
            Self::SubscriptionCreationFailed { .. } => {
                "Could not create the subscription".to_string()
            }
            Self::ShipmentCreationFailed { .. } => "Could not create the shipment".to_string(),
            Self::PaymentRecordingFailed { .. } => "Could not record the payment".to_string(),
            other => other.to_string(),
        }
    }

    /// Progress at the point of failure, for step failures.
    #[must_use]
    pub fn progress(&self) -> Option<&OrderProgress> {
        match self {
            Self::AddressCreationFailed { progress, .. }
            | Self::SubscriptionCreationFailed { progress, .. }
            | Self::ShipmentCreationFailed { progress, .. }
            | Self::PaymentRecordingFailed { progress, .. } => Some(progress.as_ref()),
            _ => None,
        }
    }
}

/// Cart checkout stopped part-way.
#[derive(Debug, Error)]
#[error("{error} ({} order(s) placed before the failure)", .placed.len())]
pub struct CheckoutFailure {
    /// Orders completed before the failing one.
    pub placed: Vec<OrderResult>,
    #[source]
    pub error: OrderError,
}

/// Places orders against a persistent store.
#[derive(Clone)]
pub struct OrderWorkflow {
    store: Arc<dyn PersistentStore>,
    step_timeout: Duration,
    fallback_offset: FixedOffset,
    start_date: Option<NaiveDate>,
}

impl OrderWorkflow {
    #[must_use]
    pub fn new(store: Arc<dyn PersistentStore>) -> Self {
        Self {
            store,
            step_timeout: DEFAULT_STEP_TIMEOUT,
            fallback_offset: Utc.fix(),
            start_date: None,
        }
    }

    /// Bound each store round trip.
    #[must_use]
    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = timeout;
        self
    }

    /// Offset used when a request carries none.
    #[must_use]
    pub fn with_fallback_offset(mut self, offset: FixedOffset) -> Self {
        self.fallback_offset = offset;
        self
    }

    /// Date every order as `date` instead of today.
    #[must_use]
    pub fn with_start_date(mut self, date: NaiveDate) -> Self {
        self.start_date = Some(date);
        self
    }

    /// Place a single subscription order.
    ///
    /// Identity, address, and price are all checked before the first write.
    ///
    /// # Errors
    ///
    /// - `Unauthenticated` when there is no caller identity
    /// - `ValidationFailed` for a blank address field or a bad date input
    /// - `Pricing` for a product/frequency the pricing tables reject
    /// - one of the four step errors, carrying the progress reached
    #[instrument(
        skip(self, identity, request),
        fields(
            user_id = tracing::field::Empty,
            product = %request.product,
            frequency = %request.frequency,
            order_number = tracing::field::Empty,
        )
    )]
    pub async fn place_order(
        &self,
        identity: Option<&Identity>,
        request: OrderRequest,
    ) -> Result<OrderResult, OrderError> {
        let user_id = identity
            .map(|identity| &identity.user_id)
            .filter(|id| !id.is_blank())
            .ok_or(OrderError::Unauthenticated)?
            .clone();
        tracing::Span::current().record("user_id", user_id.as_str());

        let address = request.address.normalized();
        let missing = address.missing_fields();
        if !missing.is_empty() {
            return Err(OrderError::ValidationFailed(format!(
                "Missing address fields: {}",
                missing.join(", ")
            )));
        }

        let amount = pricing::price(request.product, request.frequency)?;
        let start_date = self.start_date(request.utc_offset_minutes)?;
        let next_due = match request.next_payment_override {
            Some(date) if date <= start_date => {
                return Err(OrderError::ValidationFailed(
                    "Next payment date must be after the start date".to_string(),
                ));
            }
            Some(date) => date,
            None => next_payment_due_date(start_date, request.frequency).ok_or_else(|| {
                OrderError::ValidationFailed("Start date is out of range".to_string())
            })?,
        };

        let order_number = generate_order_number();
        tracing::Span::current().record("order_number", order_number.as_str());
        let mut progress = OrderProgress::new(order_number.clone());
        let store = self.store.as_ref();

        let address = match self
            .step(AddressRepository::new(store).create(&NewAddress {
                user_id: user_id.clone(),
                input: address,
            }))
            .await
        {
            Ok(address) => address,
            Err(source) => {
                return Err(failed(OrderError::AddressCreationFailed {
                    progress: Box::new(progress),
                    source,
                }));
            }
        };
        progress.stage = OrderStage::AddressCreated;
        progress.address_id = Some(address.id.clone());

        let subscription = match self
            .step(SubscriptionRepository::new(store).create(&NewSubscription {
                user_id,
                address_id: address.id.clone(),
                start_date,
                next_payment_due_date: next_due,
                status: SubscriptionStatus::Active,
                plan_type: request.frequency.plan_type(),
                product_type: request.product,
            }))
            .await
        {
            Ok(subscription) => subscription,
            Err(source) => {
                return Err(failed(OrderError::SubscriptionCreationFailed {
                    progress: Box::new(progress),
                    source,
                }));
            }
        };
        progress.stage = OrderStage::SubscriptionCreated;
        progress.subscription_id = Some(subscription.id.clone());

        let shipment = match self
            .step(ShipmentRepository::new(store).create(&NewShipment {
                subscription_id: Some(subscription.id.clone()),
                address_id: address.id.clone(),
                delivery_status: DeliveryStatus::Pending,
                tracking_number: Some(order_number.clone()),
            }))
            .await
        {
            Ok(shipment) => shipment,
            Err(source) => {
                return Err(failed(OrderError::ShipmentCreationFailed {
                    progress: Box::new(progress),
                    source,
                }));
            }
        };
        progress.stage = OrderStage::ShipmentCreated;
        progress.shipment_id = Some(shipment.id.clone());

        let payment = match self
            .step(PaymentRepository::new(store).create(&NewPayment {
                subscription_id: subscription.id.clone(),
                amount: amount.amount,
                status: PaymentStatus::Success,
                payment_date: start_date,
                transaction_id: order_number.clone(),
            }))
            .await
        {
            Ok(payment) => payment,
            Err(source) => {
                return Err(failed(OrderError::PaymentRecordingFailed {
                    progress: Box::new(progress),
                    source,
                }));
            }
        };
        progress.stage = OrderStage::PaymentCreated;
        progress.payment_id = Some(payment.id.clone());

        tracing::info!(
            stage = ?progress.stage,
            order_number = %progress.order_number,
            subscription_id = ?progress.subscription_id.as_ref().map(SubscriptionId::as_str),
            payment_id = ?progress.payment_id.as_ref().map(PaymentId::as_str),
            amount = %amount,
            "Order placed"
        );
        add_breadcrumb(
            "order",
            "Order placed",
            Some(&[
                ("order_number", progress.order_number.as_str()),
                ("subscription_id", subscription.id.as_str()),
            ]),
        );

        Ok(OrderResult {
            order_number,
            subscription_id: subscription.id,
            payment_id: payment.id,
            shipment_id: shipment.id,
            address_id: address.id,
            product: request.product,
            frequency: request.frequency,
            amount,
            start_date,
            next_payment_due_date: next_due,
        })
    }

    /// Place one order per unit of every subscription line in the cart.
    ///
    /// Lines are processed in cart order and the first failure stops the
    /// checkout. One-time and distributor lines are fulfilled outside this
    /// workflow, so a cart holding any is rejected before anything is written.
    ///
    /// # Errors
    ///
    /// Returns a `CheckoutFailure` carrying the orders placed before the
    /// failing one.
    #[instrument(skip_all, fields(lines = cart.items().len()))]
    pub async fn checkout(
        &self,
        identity: Option<&Identity>,
        cart: &Cart,
        address: AddressInput,
        utc_offset_minutes: Option<i32>,
    ) -> Result<Vec<OrderResult>, CheckoutFailure> {
        let reject = |message: &str| CheckoutFailure {
            placed: Vec::new(),
            error: OrderError::ValidationFailed(message.to_string()),
        };
        if cart.is_empty() {
            return Err(reject("Your cart is empty"));
        }
        if cart.item_count() > MAX_CHECKOUT_ORDERS {
            return Err(reject(&format!(
                "A checkout can place at most {MAX_CHECKOUT_ORDERS} orders"
            )));
        }

        let mut lines = Vec::with_capacity(cart.items().len());
        for item in cart.items() {
            match item.option {
                PurchaseOption::Subscription { frequency } => {
                    lines.push((item.product, frequency, item.quantity));
                }
                PurchaseOption::OneTime | PurchaseOption::Distributor { .. } => {
                    return Err(reject(
                        "One-time and distributor items can't be checked out as subscriptions",
                    ));
                }
            }
        }

        let mut placed = Vec::new();
        for (product, frequency, quantity) in lines {
            for _ in 0..quantity {
                let request = OrderRequest {
                    address: address.clone(),
                    product,
                    frequency,
                    utc_offset_minutes,
                    next_payment_override: None,
                };
                match self.place_order(identity, request).await {
                    Ok(result) => placed.push(result),
                    Err(error) => return Err(CheckoutFailure { placed, error }),
                }
            }
        }
        Ok(placed)
    }

    fn start_date(&self, utc_offset_minutes: Option<i32>) -> Result<NaiveDate, OrderError> {
        if let Some(date) = self.start_date {
            return Ok(date);
        }
        let offset = match utc_offset_minutes {
            Some(minutes) => offset_from_minutes(minutes).ok_or_else(|| {
                OrderError::ValidationFailed(format!("UTC offset {minutes} is out of range"))
            })?,
            None => self.fallback_offset,
        };
        Ok(today_at(offset))
    }

    /// Run one store round trip under the step timeout.
    async fn step<T>(
        &self,
        fut: impl Future<Output = Result<T, RepositoryError>>,
    ) -> Result<T, StepFailure> {
        match tokio::time::timeout(self.step_timeout, fut).await {
            Ok(result) => result.map_err(StepFailure::Store),
            Err(_) => Err(StepFailure::TimedOut(self.step_timeout)),
        }
    }
}

/// Log a step failure and leave a breadcrumb before handing it back.
fn failed(err: OrderError) -> OrderError {
    if let Some(progress) = err.progress() {
        tracing::error!(
            step = err.kind().as_str(),
            stage = ?progress.stage,
            order_number = %progress.order_number,
            address_id = ?progress.address_id.as_ref().map(AddressId::as_str),
            subscription_id = ?progress.subscription_id.as_ref().map(SubscriptionId::as_str),
            shipment_id = ?progress.shipment_id.as_ref().map(ShipmentId::as_str),
            error = %err,
            "Order step failed"
        );
        // Debug prints the variant name, which is also its serialized form.
        let stage = format!("{:?}", progress.stage);
        add_breadcrumb(
            "order",
            err.kind().as_str(),
            Some(&[
                ("order_number", progress.order_number.as_str()),
                ("stage", stage.as_str()),
            ]),
        );
    }
    err
}
