//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `orders` - Order workflow (address → subscription → shipment → payment)
//! - `session` - Account session manager (login, registration, logout)

pub mod orders;
pub mod session;

pub use orders::{
    CheckoutFailure, Identity, OrderError, OrderProgress, OrderRequest, OrderResult, OrderStage,
    OrderWorkflow, StepFailure,
};
pub use session::{Registration, SessionError, SessionManager, SessionSnapshot};
