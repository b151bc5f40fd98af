//! Row models for the storefront tables.
//!
//! Each table has a read model (what the store returns, decoded with serde and
//! rejected if the shape is wrong) and, where the service writes to it, a
//! `New*` insert model and a `*Patch` for partial updates.

pub mod address;
pub mod campaign;
pub mod payment;
pub mod product;
pub mod session;
pub mod shipment;
pub mod subscription;
pub mod user;

pub use address::{Address, AddressInput, NewAddress};
pub use campaign::{Campaign, CampaignPatch, NewCampaign};
pub use payment::{NewPayment, Payment};
pub use product::{NewProduct, Product, ProductPatch};
pub use session::CurrentUser;
pub use shipment::{NewShipment, Shipment, ShipmentPatch};
pub use subscription::{NewSubscription, Subscription};
pub use user::{NewUser, User};
