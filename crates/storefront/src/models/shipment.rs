//! Shipment rows (`shipping` table).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use vitalis_core::{AddressId, DeliveryStatus, ShipmentId, SubscriptionId};

/// A shipment row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shipment {
    pub id: ShipmentId,
    pub subscription_id: Option<SubscriptionId>,
    pub address_id: AddressId,
    pub shipment_date: Option<NaiveDate>,
    pub delivery_status: DeliveryStatus,
    pub tracking_number: Option<String>,
}

/// Insert model for `shipping`.
#[derive(Debug, Clone, Serialize)]
pub struct NewShipment {
    pub subscription_id: Option<SubscriptionId>,
    pub address_id: AddressId,
    pub delivery_status: DeliveryStatus,
    pub tracking_number: Option<String>,
}

/// Partial update for `shipping`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_status: Option<DeliveryStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipment_date: Option<NaiveDate>,
}
