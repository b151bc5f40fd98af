//! Unified error handling with Sentry integration.
//!
//! Every failure the API reports carries an [`ErrorKind`] code. Handlers
//! return `Result<T, AppError>`; `AppError` renders the JSON envelope
//! `{"success": false, "error": "<Kind>", "message": "..."}` and captures
//! server-side failures to Sentry before responding.

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use vitalis_core::{CartError, PricingError};

use crate::db::RepositoryError;
use crate::services::{CheckoutFailure, OrderError, SessionError};

/// Machine-readable failure codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    Unauthenticated,
    ValidationFailed,
    AddressCreationFailed,
    SubscriptionCreationFailed,
    ShipmentCreationFailed,
    PaymentRecordingFailed,
    PricingDomainError,
    StoreUnavailable,
    InvalidCredentials,
    ProviderUnavailable,
    MirrorRowCreationFailed,
    Forbidden,
    NotFound,
    Internal,
}

impl ErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unauthenticated => "Unauthenticated",
            Self::ValidationFailed => "ValidationFailed",
            Self::AddressCreationFailed => "AddressCreationFailed",
            Self::SubscriptionCreationFailed => "SubscriptionCreationFailed",
            Self::ShipmentCreationFailed => "ShipmentCreationFailed",
            Self::PaymentRecordingFailed => "PaymentRecordingFailed",
            Self::PricingDomainError => "PricingDomainError",
            Self::StoreUnavailable => "StoreUnavailable",
            Self::InvalidCredentials => "InvalidCredentials",
            Self::ProviderUnavailable => "ProviderUnavailable",
            Self::MirrorRowCreationFailed => "MirrorRowCreationFailed",
            Self::Forbidden => "Forbidden",
            Self::NotFound => "NotFound",
            Self::Internal => "Internal",
        }
    }

    /// HTTP status for this kind.
    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            Self::Unauthenticated
            | Self::ValidationFailed
            | Self::PricingDomainError
            | Self::InvalidCredentials => StatusCode::BAD_REQUEST,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::AddressCreationFailed
            | Self::SubscriptionCreationFailed
            | Self::ShipmentCreationFailed
            | Self::PaymentRecordingFailed
            | Self::StoreUnavailable
            | Self::ProviderUnavailable
            | Self::MirrorRowCreationFailed
            | Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Repository operation failed.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Order workflow failed.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Cart checkout stopped part-way.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutFailure),

    /// Login/registration failed.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Price requested outside the catalog.
    #[error("Pricing error: {0}")]
    Pricing(#[from] PricingError),

    /// Cart edit rejected.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// HTTP session storage failed.
    #[error("Session store error: {0}")]
    SessionStore(#[from] tower_sessions::session::Error),

    /// User is not authenticated.
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Authenticated but not allowed.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Repository(RepositoryError::NotFound) => ErrorKind::NotFound,
            Self::Repository(RepositoryError::Conflict(_)) | Self::Validation(_) => {
                ErrorKind::ValidationFailed
            }
            Self::Repository(_) => ErrorKind::StoreUnavailable,
            Self::Order(err) => err.kind(),
            Self::Checkout(failure) => failure.error.kind(),
            Self::Session(err) => err.kind(),
            Self::Pricing(_) | Self::Cart(CartError::Pricing(_)) => ErrorKind::PricingDomainError,
            Self::Cart(CartError::QuantityOutOfRange) => ErrorKind::ValidationFailed,
            Self::Cart(CartError::UnknownLine(_)) => ErrorKind::NotFound,
            Self::SessionStore(_) | Self::Internal(_) => ErrorKind::Internal,
            Self::Unauthenticated(_) => ErrorKind::Unauthenticated,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::NotFound(_) => ErrorKind::NotFound,
        }
    }

    /// Message safe to show the client.
    fn public_message(&self) -> String {
        match self {
            Self::Repository(RepositoryError::NotFound) => "Not found".to_string(),
            Self::Repository(RepositoryError::Conflict(_)) => {
                "A record with this id already exists".to_string()
            }
            Self::Repository(_) => "The store is unavailable, please try again".to_string(),
            Self::SessionStore(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Session(SessionError::ProviderUnavailable(_)) => {
                "Sign-in is temporarily unavailable, please try again".to_string()
            }
            Self::Session(SessionError::MirrorRowCreationFailed(_)) => {
                "Could not set up your account, please try again".to_string()
            }
            Self::Session(SessionError::StoreUnavailable(_)) => {
                "Could not load account data, please try again".to_string()
            }
            Self::Order(err) => err.public_message(),
            Self::Checkout(failure) => format!(
                "{} ({} order(s) placed before the failure)",
                failure.error.public_message(),
                failure.placed.len()
            ),
            Self::Session(err) => err.to_string(),
            Self::Pricing(err) => err.to_string(),
            Self::Cart(err) => err.to_string(),
            Self::Unauthenticated(msg)
            | Self::Forbidden(msg)
            | Self::NotFound(msg)
            | Self::Validation(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let status = kind.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                kind = %kind,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let mut body = json!({
            "success": false,
            "error": kind,
            "message": self.public_message(),
        });
        let progress = match &self {
            Self::Order(err) => err.progress(),
            Self::Checkout(failure) => failure.error.progress(),
            _ => None,
        };
        if let Some(progress) = progress {
            body["progress"] = json!(progress);
        }
        if let Self::Checkout(failure) = &self {
            body["placed"] = json!(failure.placed);
        }

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb to the current Sentry scope.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
